//! Содержит реализацию структуры, описывающей название поля в GFF файле и реализацию типажей для
//! конвертации других типов данных в метку и обратно

use std::fmt;
use std::result::Result;
use std::str::{from_utf8, FromStr, Utf8Error};
use crate::error::Error;

/// Описание названия поля структуры GFF файла. GFF файл состоит из дерева структур, а каждая
/// структура -- из полей с именем и значением. Имена полей представлены данной структурой.
///
/// Метки сравниваются побайтно, с учетом регистра.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label([u8; 16]);

impl Label {
  /// Возвращает представление данной метки как текста, если он представлен в виде `UTF-8` строки
  pub fn as_str(&self) -> Result<&str, Utf8Error> {
    from_utf8(self.as_bytes())
  }
  /// Возвращает значащие байты метки, без завершающих нулевых байт
  pub fn as_bytes(&self) -> &[u8] {
    // Во внутреннем представлении данные метки продолжаются до первого нулевого символа,
    // однако сам нулевой символ не храниться -- это просто заполнитель
    let len = self.0.iter().position(|&b| b == 0).unwrap_or(self.0.len());
    &self.0[..len]
  }

  /// Пытается создать метку из указанного массива байт.
  ///
  /// # Ошибки
  /// В случае, если длина среза превышает 16 байт, возвращается ошибка
  /// [`Error::TooLongLabel`](./error/enum.Error.html#variant.TooLongLabel)
  pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
    if bytes.len() > 16 {
      return Err(Error::TooLongLabel(bytes.len()));
    }

    let mut storage: [u8; 16] = Default::default();
    storage[..bytes.len()].copy_from_slice(bytes);
    Ok(storage.into())
  }
  /// Создает метку из 16 байт, прочитанных из таблицы меток файла. Некоторые редакторы
  /// дополняют метки пробелами вместо нулевых байт, такие метки приводятся к каноническому
  /// виду, чтобы поиск по ним давал тот же результат
  pub(crate) fn from_wire(mut bytes: [u8; 16]) -> Self {
    let mut end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    while end > 0 && bytes[end - 1] == b' ' {
      end -= 1;
    }
    for b in bytes[end..].iter_mut() {
      *b = 0;
    }
    Label(bytes)
  }
}

impl fmt::Debug for Label {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    if let Ok(value) = self.as_str() {
      return write!(f, "Label({})", value);
    }
    write!(f, "Label(")?;
    self.0.fmt(f)?;
    write!(f, ")")
  }
}

impl fmt::Display for Label {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    let value = self.as_str().map_err(|_| fmt::Error)?;
    write!(f, "{}", value)
  }
}

impl From<[u8; 16]> for Label {
  fn from(arr: [u8; 16]) -> Self { Label(arr) }
}

impl AsRef<[u8]> for Label {
  fn as_ref(&self) -> &[u8] { &self.0 }
}

impl FromStr for Label {
  type Err = Error;

  #[inline]
  fn from_str(value: &str) -> Result<Self, Error> {
    Self::from_bytes(value.as_bytes())
  }
}
