//! Содержит реализацию типажа `Deserialize` для меток и ссылок на ресурсы, а также
//! десериализатор меток, используемый для чтения имен полей структур

use std::fmt;
use std::marker::PhantomData;
use serde::forward_to_deserialize_any;
use serde::de::{Deserialize, Deserializer, Error, IntoDeserializer, Visitor};

use crate::{Label, ResRef};

/// Структура для конвертации событий десериализации от serde в объект `Label`
struct LabelVisitor;

impl<'de> Visitor<'de> for LabelVisitor {
  type Value = Label;

  fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
    formatter.write_str("a string with length in UTF-8 <=16, byte buffer with length <=16, or char")
  }

  #[inline]
  fn visit_char<E>(self, value: char) -> Result<Label, E>
    where E: Error,
  {
    self.visit_string(value.to_string())
  }
  #[inline]
  fn visit_str<E>(self, value: &str) -> Result<Label, E>
    where E: Error,
  {
    self.visit_bytes(value.as_bytes())
  }

  #[inline]
  fn visit_bytes<E>(self, value: &[u8]) -> Result<Label, E>
    where E: Error,
  {
    use crate::error::Error::TooLongLabel;

    match Label::from_bytes(value) {
      Ok(label) => Ok(label),
      Err(TooLongLabel(len)) => Err(E::invalid_length(len, &self)),
      Err(err) => Err(E::custom(err)),
    }
  }
}

/// Десериализует метку из строки или массива байт
impl<'de> Deserialize<'de> for Label {
  #[inline]
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where D: Deserializer<'de>,
  {
    deserializer.deserialize_any(LabelVisitor)
  }
}

/// Структура для конвертации событий десериализации от serde в объект `ResRef`
struct ResRefVisitor;

impl<'de> Visitor<'de> for ResRefVisitor {
  type Value = ResRef;

  fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
    formatter.write_str("a string or byte buffer with length <=16")
  }

  #[inline]
  fn visit_str<E>(self, value: &str) -> Result<ResRef, E>
    where E: Error,
  {
    self.visit_bytes(value.as_bytes())
  }
  #[inline]
  fn visit_bytes<E>(self, value: &[u8]) -> Result<ResRef, E>
    where E: Error,
  {
    use crate::error::Error::TooLongResRef;

    match ResRef::from_bytes(value) {
      Ok(resref) => Ok(resref),
      Err(TooLongResRef(len)) => Err(E::invalid_length(len, &self)),
      Err(err) => Err(E::custom(err)),
    }
  }
}

/// Десериализует ссылку на ресурс из строки или массива байт
impl<'de> Deserialize<'de> for ResRef {
  #[inline]
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where D: Deserializer<'de>,
  {
    deserializer.deserialize_any(ResRefVisitor)
  }
}

///////////////////////////////////////////////////////////////////////////////////////////////////

/// Десериализатор, в котором источником данных является метка
#[derive(Debug)]
pub struct LabelDeserializer<E> {
  /// Источник данных, из которого достаются данные для десериализации других структур
  value: Label,
  /// Фиктивный элемент, для связывания типа ошибки `E`
  marker: PhantomData<E>,
}
impl<'de, E> IntoDeserializer<'de, E> for Label
  where E: Error,
{
  type Deserializer = LabelDeserializer<E>;

  #[inline]
  fn into_deserializer(self) -> Self::Deserializer {
    LabelDeserializer { value: self, marker: PhantomData }
  }
}
impl<'de, E> Deserializer<'de> for LabelDeserializer<E>
  where E: Error,
{
  type Error = E;

  fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where V: Visitor<'de>,
  {
    if let Ok(str) = self.value.as_str() {
      return visitor.visit_str(str);
    }
    visitor.visit_bytes(self.value.as_bytes())
  }

  forward_to_deserialize_any!(
    bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str
    string bytes byte_buf option unit unit_struct newtype_struct seq
    tuple tuple_struct map struct enum identifier ignored_any
  );
}
