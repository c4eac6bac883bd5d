//! Вспомогательный модуль, содержащий описание структур, непосредственно хранимых
//! в GFF файле на диске. Обычно нет необходимости использовать данный модуль -- он
//! может понадобиться только при отладке
use std::io::{Read, Write};
use byteorder::{LE, ReadBytesExt, WriteBytesExt};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::header::{Header, Section, STRUCT_SIZE, FIELD_SIZE, LABEL_SIZE};
use crate::index::{Index, StructIndex, FieldIndex, LabelIndex, FieldIndicesIndex, ListIndicesIndex, DataIndex};
use crate::Label;

/// Типы полей, которые возможно встретить в GFF файле
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum FieldType {
  /// Беззнаковое байтовое значение (от 0 до 255), занимающее один байт
  UInt8,
  /// Знаковое байтовое значение (от -128 до 127), занимающее один байт
  Int8,
  /// Беззнаковое целое (от 0 до 65535), занимающее 2 байта
  UInt16,
  /// Знаковое целое (от -32768 до 32767), занимающее 2 байта
  Int16,
  /// Беззнаковое целое (от 0 до 4294967296), занимающее 4 байта
  UInt32,
  /// Знаковое целое (от -2147483648 до 2147483647), занимающее 4 байта
  Int32,
  /// Беззнаковое целое (от 0 до примерно 18e+18), занимающее 8 байт
  UInt64,
  /// Знаковое целое (примерно от -9e+18 до +9e+18), занимающее 8 байт
  Int64,
  /// Число с плавающей запятой одинарной точности, занимающее 4 байта
  Single,
  /// Число с плавающей запятой двойной точности, занимающее 8 байт
  Double,
  /// Нелокализуемая строка.
  ///
  /// Данный вид строк не должен использоваться для текста, который может увидеть игрок, так как
  /// он будет одинаковым независимо от языка клиента игры. Область применения данного типа -
  /// текст для разработчиков/дизайнеров уровней, например, тегов объектов, используемых в скриптах.
  String,
  /// Имя файла ресурса, до 16 символов
  ResRef,
  /// Локализуемая строка. Содержит `StrRef` и несколько строк, каждую со своим номером языка
  LocString,
  /// Произвольные данные любой длины
  Binary,
  /// Вложенная структура
  Struct,
  /// Список значений любой длины
  List,
  /// Кватернион ориентации объекта из 4-х чисел с плавающей запятой
  Vector4,
  /// Вектор позиции объекта из 3-х чисел с плавающей запятой
  Vector3,
}
impl FieldType {
  /// Возвращает `true`, если данные поля указанного типа хранятся не в структуре [`Field`], а
  /// в отдельной области полей GFF файла. Поля типа `Struct` и `List` хранятся совершенно отдельно
  /// и данный метод для них возвращает `false`
  ///
  /// [`Field`]: struct.Field.html
  #[inline]
  pub fn is_complex(&self) -> bool {
    use self::FieldType::*;

    match *self {
      UInt64 | Int64 | Double | String | ResRef | LocString | Binary | Vector4 | Vector3 => true,
      _ => false
    }
  }
  /// Возвращает `true`, если данные поля указанного типа хранятся внутри структуры [`Field`]
  ///
  /// [`Field`]: struct.Field.html
  #[inline]
  pub fn is_simple(&self) -> bool {
    !self.is_complex() && *self != FieldType::Struct && *self != FieldType::List
  }
  /// Получает тип поля по его идентификатору, записанному в файле
  #[inline]
  pub fn from_u32(value: u32) -> Option<Self> {
    use self::FieldType::*;

    Some(match value {
       0 => UInt8,
       1 => Int8,
       2 => UInt16,
       3 => Int16,
       4 => UInt32,
       5 => Int32,
       6 => UInt64,
       7 => Int64,
       8 => Single,
       9 => Double,
      10 => String,
      11 => ResRef,
      12 => LocString,
      13 => Binary,
      14 => Struct,
      15 => List,
      16 => Vector4,
      17 => Vector3,
      _ => return None,
    })
  }
}

/// Описание структуры, как оно хранится в GFF файле
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Struct {
  /// Идентификатор типа структуры. Игрой на самом деле почти никогда не используется.
  /// Корневая структура обычно имеет идентификатор `0xFFFF_FFFF`
  pub tag: u32,
  /// Или индекс в массив полей (если `self.fields == 1`), или в смещение в массиве индексов полей
  pub offset: u32,
  /// Количество полей структуры
  pub fields: u32,
}
impl Struct {
  /// Читает 12 байт значения структуры из потока
  #[inline]
  pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
    Ok(Struct {
      tag:    reader.read_u32::<LE>()?,
      offset: reader.read_u32::<LE>()?,
      fields: reader.read_u32::<LE>()?,
    })
  }
  /// Записывает 12 байт значения структуры в поток
  #[inline]
  pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
    writer.write_u32::<LE>(self.tag)?;
    writer.write_u32::<LE>(self.offset)?;
    writer.write_u32::<LE>(self.fields)?;
    Ok(())
  }
}

/// Описание поля структуры, как оно хранится в GFF файле
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
  /// Идентификатор типа поля
  pub tag: u32,
  /// Индекс в массив меток, определяющий метку, привязанную к данному полю
  pub label: u32,
  /// Сами данные для простых данных или смещение в массиве с данными для комплексных
  /// типов. Также, если поле представляет собой структуру, то это индекс в массиве
  /// структур, а если список -- байтовое смещение в массиве списков (хотя сам массив списков
  /// состоит из элементов размером 4 байта).
  pub data: [u8; 4],
}
impl Field {
  /// Читает 12 байт значения поля из потока
  #[inline]
  pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
    let tag   = reader.read_u32::<LE>()?;
    let label = reader.read_u32::<LE>()?;
    let mut data = [0u8; 4];
    reader.read_exact(&mut data)?;

    Ok(Field { tag, label, data })
  }
  /// Записывает 12 байт значения поля в поток
  #[inline]
  pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
    writer.write_u32::<LE>(self.tag)?;
    writer.write_u32::<LE>(self.label)?;
    writer.write_all(&self.data)?;
    Ok(())
  }
  /// Интерпретирует данные поля как индекс или смещение
  #[inline]
  pub fn value(&self) -> u32 {
    u32::from_le_bytes(self.data)
  }
}

/// Описание всей структуры GFF файла, как она хранится в GFF файле
#[derive(Debug, Clone, PartialEq)]
pub struct Gff {
  /// Заголовок файла, содержащий метаинформацию о нем: тип содержимого, версию структуры,
  /// количество и местоположение структур в файле
  pub header:        Header,
  /// Список структур внутри GFF файла. Структура -- группирующий элемент, состоящий
  /// из [полей], помеченных [метками]
  ///
  /// [полей]: struct.Field.html
  /// [метками]: ../struct.Label.html
  pub structs:       Vec<Struct>,
  /// Список полей из всех структур GFF файла. Каждое поле ссылается на [метку] и данные,
  /// а также имеет некоторый тип
  ///
  /// [метку]: ../struct.Label.html
  pub fields:        Vec<Field>,
  /// Список меток из всех полей GFF файла. В корректном GFF файле каждая метка должна быть
  /// уникальна, однако неуникальность не является фатальной ошибкой -- просто неэффективным
  /// расходованием места
  pub labels:        Vec<Label>,
  /// Данные для значений полей, которые не влезают в 4 байта и не могут храниться в структуре
  /// [поля](struct.Field.html)
  pub field_data:    Vec<u8>,
  /// Плоский массив, содержащий индексы полей, которые входят в каждую структуру, содержащую
  /// более одного поля. Например, при наличии двух структур, первая из которых ссылается на поля
  /// 0 и 1, а вторая на поля 2, 3 и 4, массив может содержать `[0, 1, 2, 3, 4]` или `[2, 3, 4, 0, 1]`,
  /// в зависимости от того, в каком порядке будут записаны структуры
  pub field_indices: Vec<u32>,
  /// Плоский массив индексов структуры, которые входят в списки. Каждый подсписок начинается
  /// с числа, указывающего его размер: например, `[2| 1, 3]` и `[3| 0, 2, 4]`
  pub list_indices:  Vec<u32>,
}

/// Возвращает срез буфера, занимаемый указанной областью. Область должна быть предварительно
/// проверена методом [`Header::validate`](../header/struct.Header.html#method.validate)
#[inline]
fn section<'a>(bytes: &'a [u8], section: &Section, record: u32) -> &'a [u8] {
  let start = section.offset as usize;
  let end   = start + section.count as usize * record as usize;
  &bytes[start..end]
}

/// Читает из области массив 4-х байтовых индексов. Размер области должен быть кратен 4-м
fn read_indices(bytes: &[u8], name: &'static str) -> Result<Vec<u32>> {
  if bytes.len() % 4 != 0 {
    return Err(Error::CorruptTable { table: name, index: bytes.len() as u64, len: bytes.len() as u64 });
  }
  let mut vec = vec![0u32; bytes.len() / 4];
  let mut reader = bytes;
  reader.read_u32_into::<LE>(&mut vec[..])?;
  Ok(vec)
}

macro_rules! read_exact {
  ($bytes:expr, $section:expr, $type:ident, $size:expr) => ({
    let mut reader = section($bytes, &$section, $size);
    let mut vec = Vec::with_capacity($section.count as usize);
    for _ in 0..$section.count {
      vec.push($type::read(&mut reader)?);
    }
    vec
  });
}

macro_rules! write_all {
  ($writer:expr, $list:expr) => (
    for elem in &$list {
      elem.write($writer)?;
    }
  );
  ($writer:expr, $list:expr, LE) => (
    for elem in &$list {
      $writer.write_u32::<LE>(*elem)?;
    }
  );
}

impl Gff {
  /// Читает все таблицы GFF файла из буфера, содержащего весь файл. Перед чтением таблиц
  /// заголовок проверяется на соответствие настройкам `config`
  pub fn read(bytes: &[u8], config: &Config) -> Result<Gff> {
    let header = Header::from_bytes(bytes)?;
    header.validate(bytes.len() as u64, config)?;

    let structs = read_exact!(bytes, header.structs, Struct, STRUCT_SIZE);
    let fields  = read_exact!(bytes, header.fields , Field,  FIELD_SIZE);

    let labels = section(bytes, &header.labels, LABEL_SIZE)
      .chunks(LABEL_SIZE as usize)
      .map(|chunk| {
        let mut label = [0u8; 16];
        label.copy_from_slice(chunk);
        Label::from_wire(label)
      })
      .collect();

    let field_data    = section(bytes, &header.field_data, 1).to_vec();
    let field_indices = read_indices(section(bytes, &header.field_indices, 1), "field indices")?;
    let list_indices  = read_indices(section(bytes, &header.list_indices, 1), "list indices")?;

    Ok(Gff { header, structs, fields, labels, field_data, field_indices, list_indices })
  }
  /// Записывает всю GFF структуру в указанный поток в каноническом порядке: заголовок,
  /// структуры, поля, метки, данные полей, индексы полей, индексы списков
  pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
    self.header.write(writer)?;
    write_all!(writer, self.structs);
    write_all!(writer, self.fields);
    for label in &self.labels {
      writer.write_all(label.as_ref())?;
    }
    writer.write_all(&self.field_data)?;
    write_all!(writer, self.field_indices, LE);
    write_all!(writer, self.list_indices, LE);
    Ok(())
  }
//-------------------------------------------------------------------------------------------------
// Доступ к записям таблиц с проверкой границ
//-------------------------------------------------------------------------------------------------
  /// Возвращает описание структуры по ее номеру
  #[inline]
  pub fn struct_(&self, index: StructIndex) -> Result<&Struct> {
    Ok(&self.structs[index.check(1, self.structs.len())?])
  }
  /// Возвращает описание поля по его номеру
  #[inline]
  pub fn field(&self, index: FieldIndex) -> Result<&Field> {
    Ok(&self.fields[index.check(1, self.fields.len())?])
  }
  /// Возвращает метку по ее номеру
  #[inline]
  pub fn label(&self, index: LabelIndex) -> Result<Label> {
    Ok(self.labels[index.check(1, self.labels.len())?])
  }
  /// Возвращает номера полей структуры, содержащей несколько полей
  ///
  /// # Параметры
  /// - `index`: смещение в байтах от начала таблицы индексов полей
  /// - `count`: количество полей в структуре
  pub fn field_indices(&self, index: FieldIndicesIndex, count: u32) -> Result<&[u32]> {
    let start = Self::element(index, self.field_indices.len())?;
    let start = FieldIndicesIndex(start).check(count as usize, self.field_indices.len())?;
    Ok(&self.field_indices[start..start + count as usize])
  }
  /// Возвращает номера структур, являющихся элементами списка
  ///
  /// # Параметры
  /// - `index`: смещение в байтах от начала таблицы индексов списков
  pub fn list_indices(&self, index: ListIndicesIndex) -> Result<&[u32]> {
    let start = Self::element(index, self.list_indices.len())?;
    let start = ListIndicesIndex(start).check(1, self.list_indices.len())?;
    let count = self.list_indices[start];
    let first = ListIndicesIndex(start as u32 + 1).check(count as usize, self.list_indices.len())?;
    Ok(&self.list_indices[first..first + count as usize])
  }
  /// Возвращает область данных полей, начиная с указанного смещения и до ее конца.
  /// Смещение, равное размеру области, допустимо и дает пустой срез
  #[inline]
  pub fn data(&self, index: DataIndex) -> Result<&[u8]> {
    let start = index.check(0, self.field_data.len())?;
    Ok(&self.field_data[start..])
  }
  /// Преобразует смещение в байтах в таблице 4-х байтовых индексов в номер элемента
  #[inline]
  fn element<I: Index>(index: I, len: usize) -> Result<u32> {
    if index.value() % 4 != 0 {
      return Err(Error::CorruptTable { table: I::TABLE, index: index.value() as u64, len: len as u64 * 4 });
    }
    Ok(index.value() / 4)
  }
}
