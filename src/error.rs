//! Реализация структуры, описывающей ошибки кодирования или декодирования GFF

use std::borrow::Cow;
use std::fmt;
use std::error;
use std::io;
use std::result;

use serde::de;

use crate::raw::FieldType;
use crate::sig::Signature;
use crate::ver::Version;

use self::Error::*;

/// Виды ошибок, который могут возникнуть при чтении и интерпретации GFF-файла
#[derive(Debug)]
pub enum Error {
  /// Произошла ошибка чтения или записи из/в нижележащего буфера
  Io(io::Error),
  /// Произошла ошибка кодирования или декодирования строки, например, из-за использования
  /// символа, не поддерживаемого кодировкой
  Encoding(Cow<'static, str>),
  /// Первые 4 байта файла не являются ни одной из зарегистрированных сигнатур
  InvalidSignature(Signature),
  /// Версия файла не поддерживается выбранной игрой
  UnsupportedVersion(Version),
  /// Заголовок файла поврежден: файл короче заголовка, или одна из секций начинается
  /// внутри заголовка, или продолжается за концом файла
  CorruptHeader {
    /// Название секции, описание которой некорректно
    section: &'static str,
    /// Смещение секции от начала файла
    offset: u64,
    /// Размер секции в байтах
    size: u64,
    /// Размер всего файла в байтах
    file_len: u64,
  },
  /// Обращение к элементу таблицы за ее пределами
  CorruptTable {
    /// Название таблицы, к которой производилось обращение
    table: &'static str,
    /// Номер элемента или смещение, по которому производилось обращение
    index: u64,
    /// Количество элементов или байт в таблице
    len: u64,
  },
  /// Поле не может быть прочитано или записано: неизвестный тип поля, данные поля выходят за
  /// пределы области данных, или данные противоречат сами себе
  MalformedField {
    /// Номер поля в таблице полей
    field: u32,
    /// Идентификатор типа поля
    tag: u32,
    /// Описание проблемы
    reason: &'static str,
  },
  /// Тип поля существует, но не поддерживается выбранной игрой
  UnsupportedFieldType(FieldType),
  /// На структуру с указанным номером ссылаются несколько полей или списков. Такое возможно при
  /// наличии циклов или разделяемых структур, которые формат не допускает
  StructReused(u32),
  /// Некорректное значение для метки. Метка не должна превышать по длине 16 байт в UTF-8,
  /// но указанное значение больше. Ошибка содержит длину текста, который пытаются преобразовать
  TooLongLabel(usize),
  /// Некорректное значение для ссылки на ресурс. Ссылка не должна превышать по длине 16 байт,
  /// но указанное значение больше. Ошибка содержит длину текста, который пытаются преобразовать
  TooLongResRef(usize),
  /// Ошибка при отображении дерева на пользовательский тип данных
  Deserialize(String),
}
/// Тип результата, используемый в методах данной библиотеки
pub type Result<T> = result::Result<T, Error>;

impl fmt::Display for Error {
  fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
    match *self {
      Io(ref err) => err.fmt(fmt),
      Encoding(ref msg) => msg.fmt(fmt),
      InvalidSignature(sig) => write!(fmt, "Invalid GFF signature '{}'", sig),
      UnsupportedVersion(ver) => write!(fmt, "Unsupported GFF version '{}'", ver),
      CorruptHeader { section, offset, size, file_len } => write!(fmt,
        "Corrupt GFF header: section '{}' (offset: {}, size: {}) does not fit between header and end of file (length: {})",
        section, offset, size, file_len
      ),
      CorruptTable { table, index, len } => write!(fmt,
        "Corrupt GFF table '{}': index {} is out of bounds (length: {})", table, index, len
      ),
      MalformedField { field, tag, reason } => write!(fmt,
        "Malformed GFF field #{} (tag: {}): {}", field, tag, reason
      ),
      UnsupportedFieldType(ty) => write!(fmt, "Field type {:?} is not supported by the selected game", ty),
      StructReused(index) => write!(fmt, "Struct #{} is referenced more than once", index),
      TooLongLabel(len) => write!(fmt, "Too long label: label can contain up to 16 bytes, but string contains {} bytes in UTF-8", len),
      TooLongResRef(len) => write!(fmt, "Too long resref: resref can contain up to 16 bytes, but string contains {} bytes", len),
      Deserialize(ref msg) => msg.fmt(fmt),
    }
  }
}

impl error::Error for Error {
  fn source(&self) -> Option<&(dyn error::Error + 'static)> {
    match *self {
      Io(ref err) => Some(err),
      _ => None,
    }
  }
}

impl From<io::Error> for Error {
  fn from(value: io::Error) -> Self { Io(value) }
}
/// Реализация для конвертации из ошибок кодирования библиотеки `encodings`
impl From<Cow<'static, str>> for Error {
  fn from(value: Cow<'static, str>) -> Self { Encoding(value) }
}

impl de::Error for Error {
  fn custom<T: fmt::Display>(msg: T) -> Self {
    Deserialize(msg.to_string())
  }
}
