//! Содержит описания структур заголовка GFF файла

use std::io::{Read, Write};
use byteorder::{LE, ReadBytesExt, WriteBytesExt};

use crate::config::Config;
use crate::error::{Error, Result};
pub use crate::sig::*;
pub use crate::ver::*;

/// Размер заголовка GFF файла в байтах: сигнатура, версия и описания 6-ти областей
pub const HEADER_SIZE: u32 = 4 + 4 + 8 * 6;

/// Размер записи о структуре в таблице структур
pub const STRUCT_SIZE: u32 = 3 * 4;
/// Размер записи о поле в таблице полей
pub const FIELD_SIZE: u32 = 3 * 4;
/// Размер записи о метке в таблице меток
pub const LABEL_SIZE: u32 = 16;

/// Описание области файла, описывающей местоположение списков записей в файле
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Section {
  /// Смещение в байтах от начала файла в сериализованном виде
  pub offset: u32,
  /// Количество записей по смещению `offset`. Размер записи зависит от конкретного поля
  pub count:  u32,
}

impl Section {
  /// Читает описание области из потока
  #[inline]
  pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
    Ok(Section {
      offset: reader.read_u32::<LE>()?,
      count:  reader.read_u32::<LE>()?,
    })
  }
  /// Записывает описание области файла в поток
  #[inline]
  pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
    writer.write_u32::<LE>(self.offset)?;
    writer.write_u32::<LE>(self.count)?;
    Ok(())
  }
  /// Проверяет, что область целиком располагается после заголовка и до конца файла
  ///
  /// # Параметры
  /// - `name`: название области для сообщения об ошибке
  /// - `record`: размер одной записи области в байтах
  /// - `file_len`: размер всего файла в байтах
  fn validate(&self, name: &'static str, record: u32, file_len: u64) -> Result<()> {
    let offset = self.offset as u64;
    let size   = self.count as u64 * record as u64;

    if offset < HEADER_SIZE as u64 || offset + size > file_len {
      return Err(Error::CorruptHeader { section: name, offset, size, file_len });
    }
    Ok(())
  }
}

///////////////////////////////////////////////////////////////////////////////////////////////////

/// Заголовок GFF файла. Заголовок содержит вид файла, версию формата и информацию о
/// 6 областях, файла, содержащих данные:
/// - Список структур в файле
/// - Общий список полей всех структур файла
/// - Список уникальных названий полей
/// - Список с данными полей
/// - Вспомогательный список для индексов для сложных структур данных
/// - Вспомогательный список для хранения списочных значений полей
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
  /// Конкретный вид GFF файла
  pub signature: Signature,
  /// Версия файла
  pub version: Version,

  /// Содержит смещение в байтах от начала файла области с расположением
  /// структур и их количество
  pub structs: Section,

  /// Содержит смещение в байтах от начала файла области с расположением
  /// полей структур и их количество
  pub fields: Section,

  /// Содержит смещение в байтах от начала файла области с расположением
  /// меток полей в структурах и их количество
  pub labels: Section,

  /// Содержит смещение в байтах от начала файла области с расположением
  /// сериализованных значений полей и суммарное число байт данных
  pub field_data: Section,

  /// Содержит смещение в байтах от начала файла области с расположением
  /// индексов полей и их суммарный размер в байтах
  pub field_indices: Section,

  /// Содержит смещение в байтах от начала файла области с расположением
  /// индексов списков и их суммарный размер в байтах
  pub list_indices: Section,
}

impl Header {
  /// Создает заголовок для пустого файла с указанным типом
  #[inline]
  pub fn new(signature: Signature) -> Self {
    Self::with_version(signature, Version::V3_2)
  }
  /// Создает заголовок для пустого файла с указанным типом и версией
  #[inline]
  pub fn with_version(signature: Signature, version: Version) -> Self {
    Header {
      signature,
      version,
      structs:       Section::default(),
      fields:        Section::default(),
      labels:        Section::default(),
      field_data:    Section::default(),
      field_indices: Section::default(),
      list_indices:  Section::default(),
    }
  }
  /// Читает значение GFF заголовка из потока
  pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
    Ok(Header {
      signature:     Signature::read(reader)?,
      version:       Version::read(reader)?,

      structs:       Section::read(reader)?,
      fields:        Section::read(reader)?,
      labels:        Section::read(reader)?,
      field_data:    Section::read(reader)?,
      field_indices: Section::read(reader)?,
      list_indices:  Section::read(reader)?,
    })
  }
  /// Читает заголовок из начала буфера с содержимым всего файла. В отличие от [`read`],
  /// сообщает о слишком коротком буфере ошибкой [`Error::CorruptHeader`]
  ///
  /// [`read`]: #method.read
  /// [`Error::CorruptHeader`]: ../error/enum.Error.html#variant.CorruptHeader
  pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
    if bytes.len() < HEADER_SIZE as usize {
      return Err(Error::CorruptHeader {
        section:  "header",
        offset:   0,
        size:     HEADER_SIZE as u64,
        file_len: bytes.len() as u64,
      });
    }
    Self::read(&mut &bytes[..HEADER_SIZE as usize])
  }
  /// Записывает значение GFF заголовка в поток
  pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
    self.signature.write(writer)?;
    self.version.write(writer)?;

    self.structs.write(writer)?;
    self.fields.write(writer)?;
    self.labels.write(writer)?;
    self.field_data.write(writer)?;
    self.field_indices.write(writer)?;
    self.list_indices.write(writer)
  }
  /// Проверяет, что заголовок описывает файл, который может быть прочитан с указанной
  /// конфигурацией: сигнатура зарегистрирована, версия поддерживается, а все области
  /// располагаются между концом заголовка и концом файла.
  ///
  /// Проверка не гарантирует корректность ссылок внутри областей, они проверяются при
  /// обращении к конкретным записям.
  ///
  /// # Параметры
  /// - `file_len`: размер всего файла в байтах
  /// - `config`: набор допустимых сигнатур и версий
  pub fn validate(&self, file_len: u64, config: &Config) -> Result<()> {
    if !config.accepts_signature(self.signature) {
      return Err(Error::InvalidSignature(self.signature));
    }
    if !config.profile().supports_version(self.version) {
      return Err(Error::UnsupportedVersion(self.version));
    }

    self.structs      .validate("structs",       STRUCT_SIZE, file_len)?;
    self.fields       .validate("fields",        FIELD_SIZE,  file_len)?;
    self.labels       .validate("labels",        LABEL_SIZE,  file_len)?;
    self.field_data   .validate("field data",    1,           file_len)?;
    self.field_indices.validate("field indices", 1,           file_len)?;
    self.list_indices .validate("list indices",  1,           file_len)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Config;

  /// Создает заголовок, все области которого пусты и расположены сразу после заголовка
  fn empty(signature: Signature, version: Version) -> Header {
    let section = Section { offset: HEADER_SIZE, count: 0 };
    Header {
      structs:       section,
      fields:        section,
      labels:        section,
      field_data:    section,
      field_indices: section,
      list_indices:  section,
      ..Header::with_version(signature, version)
    }
  }

  #[test]
  fn write_then_read() {
    let mut header = empty(Signature::UTT, Version::V3_2);
    header.structs.count = 1;
    header.list_indices = Section { offset: 120, count: 8 };

    let mut bytes = Vec::new();
    header.write(&mut bytes).unwrap();
    assert_eq!(bytes.len(), HEADER_SIZE as usize);
    assert_eq!(&bytes[0..8], b"UTT V3.2");
    assert_eq!(Header::from_bytes(&bytes).unwrap(), header);
  }

  #[test]
  fn short_buffer_is_corrupt() {
    match Header::from_bytes(b"UTT V3.2") {
      Err(Error::CorruptHeader { section: "header", file_len: 8, .. }) => {},
      res => panic!("unexpected result: {:?}", res),
    }
  }

  #[test]
  fn validate_checks_signature_then_version() {
    let config = Config::default();

    let header = empty(Signature::Other(*b"ABC "), Version::from(*b"V9.9"));
    match header.validate(56, &config) {
      Err(Error::InvalidSignature(Signature::Other(sig))) => assert_eq!(&sig, b"ABC "),
      res => panic!("unexpected result: {:?}", res),
    }

    let header = empty(Signature::ARE, Version::from(*b"V9.9"));
    match header.validate(56, &config) {
      Err(Error::UnsupportedVersion(ver)) => assert_eq!(ver.to_string(), "V9.9"),
      res => panic!("unexpected result: {:?}", res),
    }

    let header = empty(Signature::ARE, Version::V3_2);
    assert!(header.validate(56, &config).is_ok());
  }

  #[test]
  fn validate_checks_section_bounds() {
    let config = Config::default();

    let mut header = empty(Signature::ARE, Version::V3_2);
    header.labels.offset = 40;
    match header.validate(56, &config) {
      Err(Error::CorruptHeader { section: "labels", offset: 40, .. }) => {},
      res => panic!("unexpected result: {:?}", res),
    }

    let mut header = empty(Signature::ARE, Version::V3_2);
    header.structs.count = 2;
    match header.validate(56 + 12, &config) {
      Err(Error::CorruptHeader { section: "structs", size: 24, file_len: 68, .. }) => {},
      res => panic!("unexpected result: {:?}", res),
    }
  }
}
