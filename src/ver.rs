//! Содержит реализацию структуры, описывающей версию GFF файла, реализацию типажей для
//! конвертации других типов данных в версию и обратно и известные версии файлов

use std::fmt::{self, Display, Formatter};
use std::io::{Read, Write, Result};

/// Версия формата файла. Записана во вторых 4-х байтах файла, сразу после сигнатуры
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Version([u8; 4]);

impl Version {
  /// Версия GFF формата, являющаяся текущей. Заголовки, создаваемые без указания версии,
  /// имеют данную версию в качестве умолчания.
  pub const V3_2: Version = Version(*b"V3.2");
  /// Версия, встречающаяся в файлах Star Wars: Knights of the Old Republic
  pub const V3_3: Version = Version(*b"V3.3");
  /// Версия, встречающаяся в файлах поздних игр на движке Odyssey
  pub const V4_0: Version = Version(*b"V4.0");
  /// Версия, встречающаяся в файлах поздних игр на движке Odyssey
  pub const V4_1: Version = Version(*b"V4.1");

  /// Создает новый объект версии из старшей и младшей половины версии
  #[inline]
  pub const fn new(major: u8, minor: u8) -> Self {
    Version([b'V', major + b'0', b'.', minor + b'0'])
  }
  /// Старший номер версии формата файла, хранимый в байте 1 версии
  #[inline]
  pub fn major(&self) -> u8 { self.0[1].wrapping_sub(b'0') }
  /// Младший номер версии формата файла, хранимый в байте 3 версии
  #[inline]
  pub fn minor(&self) -> u8 { self.0[3].wrapping_sub(b'0') }

  /// Читает версию файла из потока
  #[inline]
  pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
    let mut version = Version([0u8; 4]);
    reader.read_exact(&mut version.0)?;
    Ok(version)
  }
  /// Записывает версию файла в поток
  #[inline]
  pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
    writer.write_all(&self.0)
  }
}

impl From<[u8; 4]> for Version {
  #[inline]
  fn from(arr: [u8; 4]) -> Self { Version(arr) }
}

impl AsRef<[u8]> for Version {
  #[inline]
  fn as_ref(&self) -> &[u8] { &self.0 }
}

impl Display for Version {
  /// Выводит версию в поток в том виде, в каком она записана в файле, например, `V3.2`.
  /// Непечатаемые байты выводятся их кодами
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    for &b in self.0.iter() {
      if b.is_ascii_graphic() {
        write!(f, "{}", b as char)?;
      } else {
        write!(f, "\\x{:02x}", b)?;
      }
    }
    Ok(())
  }
}
