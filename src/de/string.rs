//! Десериализаторы ключей и значений локализованных строк

use std::marker::PhantomData;

use serde::forward_to_deserialize_any;
use serde::de::{Deserializer, Error, IntoDeserializer, Visitor};
use serde::de::value::MapDeserializer;

use crate::string::{LocString, StringKey};

impl<'de, E> IntoDeserializer<'de, E> for StringKey
  where E: Error,
{
  type Deserializer = StringKeyDeserializer<E>;

  #[inline]
  fn into_deserializer(self) -> Self::Deserializer {
    StringKeyDeserializer { value: self, marker: PhantomData }
  }
}

/// Десериализатор ключа части локализованной строки. Ключ читается как число
/// `language * 2 + gender`, в том же виде, в каком он хранится в файле
#[derive(Debug)]
pub struct StringKeyDeserializer<E> {
  /// Читаемый ключ
  value: StringKey,
  /// Фиктивный элемент, для связывания типа ошибки `E`
  marker: PhantomData<E>,
}

impl<'de, E> Deserializer<'de> for StringKeyDeserializer<E>
  where E: Error,
{
  type Error = E;

  fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where V: Visitor<'de>,
  {
    visitor.visit_u32(self.value.into())
  }

  forward_to_deserialize_any!(
    bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str
    string bytes byte_buf option unit unit_struct newtype_struct seq
    tuple tuple_struct map struct enum identifier ignored_any
  );
}

///////////////////////////////////////////////////////////////////////////////////////////////////

/// Десериализатор локализованной строки, заимствованной из дерева.
///
/// Строка без собственных текстов читается как `i32` с индексом в таблице строк. Строка,
/// содержащая тексты, читается как отображение из ключа (см. [`StringKeyDeserializer`])
/// в текст; индекс в таблице строк при этом не передается.
///
/// [`StringKeyDeserializer`]: struct.StringKeyDeserializer.html
#[derive(Debug)]
pub struct LocStringDeserializer<'de, E> {
  /// Читаемая строка
  value: &'de LocString,
  /// Фиктивный элемент, для связывания типа ошибки `E`
  marker: PhantomData<E>,
}

impl<'de, E> LocStringDeserializer<'de, E> {
  /// Создает десериализатор для указанной строки
  #[inline]
  pub fn new(value: &'de LocString) -> Self {
    LocStringDeserializer { value, marker: PhantomData }
  }
}

impl<'de, E> Deserializer<'de> for LocStringDeserializer<'de, E>
  where E: Error,
{
  type Error = E;

  fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where V: Visitor<'de>,
  {
    if self.value.strings.is_empty() {
      return visitor.visit_i32(self.value.str_ref.0);
    }
    let entries = self.value.strings.iter().map(|s| (s.key, s.string.as_str()));
    MapDeserializer::new(entries).deserialize_any(visitor)
  }

  forward_to_deserialize_any!(
    bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str
    string bytes byte_buf option unit unit_struct newtype_struct seq
    tuple tuple_struct map struct enum identifier ignored_any
  );
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;
  use serde::Deserialize;
  use serde::de::value::Error;

  use super::LocStringDeserializer;
  use crate::string::{Gender, Language, LocString, StrRef};

  #[test]
  fn external_string_is_str_ref() {
    let value = LocString::external(StrRef(-1));
    let de = LocStringDeserializer::<Error>::new(&value);
    assert_eq!(i32::deserialize(de).unwrap(), -1);
  }

  #[test]
  fn internal_string_is_map_of_keys() {
    let mut value = LocString::external(StrRef(12));
    value.set((Language::French, Gender::Female), "Bonjour");
    value.set((Language::English, Gender::Male), "Hello");

    let de = LocStringDeserializer::<Error>::new(&value);
    let map = BTreeMap::<u32, String>::deserialize(de).unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map.get(&0).map(String::as_str), Some("Hello"));
    assert_eq!(map.get(&3).map(String::as_str), Some("Bonjour"));
  }
}
