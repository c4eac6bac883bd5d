//! Содержит реализацию структуры, описывающей ссылку на ресурс и реализацию типажей для
//! конвертации других типов данных в ссылку и обратно

use std::fmt;
use std::str::{self, FromStr, Utf8Error};
use std::string::FromUtf8Error;

use crate::error::Error;

/// Максимальная длина ссылки на ресурс в байтах
pub const MAX_RESREF_LEN: usize = 16;

/// Представляет ссылку на игровой ресурс, которым может быть шаблон объекта.
///
/// Ссылка содержит не более 16 байт. В файле завершающие пробелы и нулевые байты являются
/// заполнителем, в памяти ссылка хранится без них
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct ResRef(pub(crate) Vec<u8>);

impl ResRef {
  /// Создает ссылку на ресурс из указанных байт, отбрасывая завершающие пробелы и нулевые байты.
  ///
  /// # Ошибки
  /// В случае, если длина ссылки превышает 16 байт, возвращается ошибка
  /// [`Error::TooLongResRef`](./error/enum.Error.html#variant.TooLongResRef)
  pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
    let len = bytes.iter().rposition(|&b| b != 0 && b != b' ').map_or(0, |i| i + 1);
    if len > MAX_RESREF_LEN {
      return Err(Error::TooLongResRef(len));
    }
    Ok(ResRef(bytes[..len].to_owned()))
  }
  /// Возвращает представление данной ссылки на ресурс как строки, если она представлена в виде `UTF-8` строки
  #[inline]
  pub fn as_str(&self) -> Result<&str, Utf8Error> {
    str::from_utf8(&self.0)
  }
  /// Возвращает представление данной ссылки на ресурс как строки, если она представлена в виде `UTF-8` строки
  #[inline]
  pub fn as_string(self) -> Result<String, FromUtf8Error> {
    String::from_utf8(self.0)
  }
  /// Проверяет, является ли ссылка пустой
  #[inline]
  pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl fmt::Debug for ResRef {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    if let Ok(value) = str::from_utf8(&self.0) {
      return write!(f, "{}", value);
    }
    self.0.fmt(f)
  }
}

impl fmt::Display for ResRef {
  #[inline]
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    let value = self.as_str().map_err(|_| fmt::Error)?;
    write!(f, "{}", value)
  }
}

impl AsRef<[u8]> for ResRef {
  #[inline]
  fn as_ref(&self) -> &[u8] { &self.0 }
}

impl FromStr for ResRef {
  type Err = Error;

  #[inline]
  fn from_str(str: &str) -> Result<Self, Self::Err> { Self::from_bytes(str.as_bytes()) }
}

impl PartialEq<str> for ResRef {
  #[inline]
  fn eq(&self, other: &str) -> bool { self.0 == other.as_bytes() }
}
impl<'a> PartialEq<&'a str> for ResRef {
  #[inline]
  fn eq(&self, other: &&'a str) -> bool { self.0 == other.as_bytes() }
}
