//! Построение дерева GFF файла в памяти по прочитанным таблицам. См. описание функции [`decode`]
//!
//! [`decode`]: fn.decode.html

use std::io::Read;
use std::slice;
use byteorder::{ByteOrder, LE};
use log::{debug, trace, warn};

use crate::{LocString, ResRef, StrRef, SubString};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::index::{DataIndex, FieldIndex, FieldIndicesIndex, LabelIndex, ListIndicesIndex, StructIndex};
use crate::raw::{self, FieldType, Gff};
use crate::resref::MAX_RESREF_LEN;
use crate::string::StringKey;
use crate::value::{Struct, StructId, Tree, Value};

/// Читает данные поля, хранящиеся в области данных полей. Выход за пределы данных
/// сообщается ошибкой [`Error::MalformedField`] для читаемого поля
///
/// [`Error::MalformedField`]: ../error/enum.Error.html#variant.MalformedField
struct Payload<'a> {
  /// Еще не прочитанные данные
  input: &'a [u8],
  /// Номер поля, данные которого читаются
  field: u32,
  /// Тег типа поля, данные которого читаются
  tag: u32,
  /// Описание ошибки при нехватке данных
  overflow: &'static str,
}

impl<'a> Payload<'a> {
  /// Создает читателя для данных, расположенных в указанном смещении от начала области
  fn new(gff: &'a Gff, index: u32, field: &raw::Field) -> Result<Self> {
    let mut payload = Payload {
      input: &[],
      field: index,
      tag: field.tag,
      overflow: "value runs past the end of the field data",
    };
    payload.input = match gff.data(DataIndex(field.value())) {
      Ok(input) => input,
      Err(_) => return Err(payload.malformed("offset points outside of the field data")),
    };
    Ok(payload)
  }
  #[inline]
  fn malformed(&self, reason: &'static str) -> Error {
    Error::MalformedField { field: self.field, tag: self.tag, reason }
  }
  /// Отделяет от данных `size` байт
  fn take(&mut self, size: usize) -> Result<&'a [u8]> {
    if self.input.len() < size {
      return Err(self.malformed(self.overflow));
    }
    let (head, tail) = self.input.split_at(size);
    self.input = tail;
    Ok(head)
  }
  /// Отделяет от данных `size` байт и возвращает читателя, ограниченного ими
  fn sub(&mut self, size: usize, overflow: &'static str) -> Result<Self> {
    Ok(Payload { input: self.take(size)?, field: self.field, tag: self.tag, overflow })
  }
  #[inline]
  fn u8(&mut self) -> Result<u8> { Ok(self.take(1)?[0]) }
  #[inline]
  fn u32(&mut self) -> Result<u32> { Ok(LE::read_u32(self.take(4)?)) }
  #[inline]
  fn u64(&mut self) -> Result<u64> { Ok(LE::read_u64(self.take(8)?)) }
  /// Читает 4 байта длины и следующие за ними байты
  #[inline]
  fn bytes(&mut self) -> Result<&'a [u8]> {
    let size = self.u32()? as usize;
    self.take(size)
  }
  /// Читает `N` чисел с плавающей запятой одинарной точности
  fn floats(&mut self, out: &mut [f32]) -> Result<()> {
    let bytes = self.take(out.len() * 4)?;
    for (value, chunk) in out.iter_mut().zip(bytes.chunks(4)) {
      *value = LE::read_f32(chunk);
    }
    Ok(())
  }
}

/// Строит дерево из таблиц GFF файла, начиная с корневой структуры
struct Builder<'a> {
  /// Прочитанные таблицы файла
  gff: &'a Gff,
  /// Кодировка строк и набор допустимых типов полей
  config: &'a Config,
  /// Отметки о том, что на структуру файла с данным номером уже есть ссылка
  visited: Vec<bool>,
  /// Хранилище структур строящегося дерева
  structs: Vec<Struct>,
  /// Структуры файла, на которые найдены ссылки, но которые еще не прочитаны, и номера,
  /// под которыми они будут храниться в дереве
  pending: Vec<(StructIndex, StructId)>,
}

impl<'a> Builder<'a> {
  fn new(gff: &'a Gff, config: &'a Config) -> Self {
    Builder {
      gff,
      config,
      visited: vec![false; gff.structs.len()],
      structs: Vec::with_capacity(gff.structs.len()),
      pending: Vec::new(),
    }
  }
  fn build(mut self) -> Result<Tree> {
    if self.gff.structs.is_empty() {
      return Err(Error::CorruptTable { table: "structs", index: 0, len: 0 });
    }
    let root = self.reference(0)?;
    debug_assert_eq!(root, StructId::ROOT);

    while let Some((index, id)) = self.pending.pop() {
      let value = self.read_struct(index)?;
      self.structs[id.index()] = value;
    }

    let orphans = self.visited.iter().filter(|v| !**v).count();
    if orphans > 0 {
      warn!("{} struct(s) not reachable from the root were dropped", orphans);
    }

    let header = &self.gff.header;
    Ok(Tree::from_parts(header.signature, header.version, self.structs))
  }
  /// Регистрирует ссылку на структуру файла и возвращает номер, под которым она будет
  /// храниться в дереве. Повторная ссылка на ту же структуру является ошибкой
  fn reference(&mut self, index: u32) -> Result<StructId> {
    let index = StructIndex(index);
    self.gff.struct_(index)?;

    let slot = &mut self.visited[index.0 as usize];
    if *slot {
      return Err(Error::StructReused(index.0));
    }
    *slot = true;

    let id = StructId(self.structs.len() as u32);
    self.structs.push(Struct::default());
    self.pending.push((index, id));
    Ok(id)
  }
  /// Читает все поля структуры файла
  fn read_struct(&mut self, index: StructIndex) -> Result<Struct> {
    let gff = self.gff;
    let raw = gff.struct_(index)?;
    trace!("struct #{}: tag {:#x}, {} field(s)", index.0, raw.tag, raw.fields);

    let fields: &[u32] = match raw.fields {
      0 => &[],
      1 => slice::from_ref(&raw.offset),
      n => gff.field_indices(FieldIndicesIndex(raw.offset), n)?,
    };

    let mut result = Struct::new(raw.tag);
    for &field_index in fields {
      let field = gff.field(FieldIndex(field_index))?;
      let label = gff.label(LabelIndex(field.label))?;
      let value = self.read_value(field_index, field)?;

      if result.insert(label, value).is_some() {
        warn!("struct #{} has several fields labeled '{:?}', the last one is kept", index.0, label);
      }
    }
    Ok(result)
  }
  /// Читает значение поля в соответствии с его типом
  fn read_value(&mut self, index: u32, field: &raw::Field) -> Result<Value> {
    let gff = self.gff;
    let ty = match FieldType::from_u32(field.tag) {
      Some(ty) => ty,
      None => return Err(Error::MalformedField { field: index, tag: field.tag, reason: "unknown field type" }),
    };
    if !self.config.profile().supports_type(ty) {
      return Err(Error::UnsupportedFieldType(ty));
    }

    let data = &field.data;
    let value = match ty {
      FieldType::UInt8  => Value::UInt8(data[0]),
      FieldType::Int8   => Value::Int8(data[0] as i8),
      FieldType::UInt16 => Value::UInt16(LE::read_u16(data)),
      FieldType::Int16  => Value::Int16(LE::read_i16(data)),
      FieldType::UInt32 => Value::UInt32(LE::read_u32(data)),
      FieldType::Int32  => Value::Int32(LE::read_i32(data)),
      FieldType::Single => Value::Single(LE::read_f32(data)),

      FieldType::Struct => Value::Struct(self.reference(field.value())?),
      FieldType::List => {
        let items = gff.list_indices(ListIndicesIndex(field.value()))?;
        let mut list = Vec::with_capacity(items.len());
        for &item in items {
          list.push(self.reference(item)?);
        }
        Value::List(list)
      },

      _ => self.read_complex(ty, Payload::new(gff, index, field)?)?,
    };
    Ok(value)
  }
  /// Читает значение поля, хранящееся в области данных полей
  fn read_complex(&self, ty: FieldType, mut data: Payload) -> Result<Value> {
    Ok(match ty {
      FieldType::UInt64 => Value::UInt64(data.u64()?),
      FieldType::Int64  => Value::Int64(data.u64()? as i64),
      FieldType::Double => Value::Double(f64::from_bits(data.u64()?)),
      FieldType::String => Value::String(self.config.decode_str(data.bytes()?)?),
      FieldType::ResRef => {
        let size = data.u8()? as usize;
        if size > MAX_RESREF_LEN {
          return Err(data.malformed("resref is longer than 16 bytes"));
        }
        Value::ResRef(ResRef::from_bytes(data.take(size)?)?)
      },
      FieldType::LocString => {
        let size = data.u32()? as usize;
        let mut data = data.sub(size, "localized string runs past its declared size")?;

        let str_ref = StrRef(data.u32()? as i32);
        let count = data.u32()?;
        let mut strings = Vec::new();
        for _ in 0..count {
          let key = StringKey::from(data.u32()?);
          let string = self.config.decode_str(data.bytes()?)?;
          strings.push(SubString { key, string });
        }
        Value::LocString(LocString { str_ref, strings })
      },
      FieldType::Binary => Value::Binary(data.bytes()?.to_vec()),
      FieldType::Vector4 => {
        let mut value = [0f32; 4];
        data.floats(&mut value)?;
        Value::Vector4(value)
      },
      FieldType::Vector3 => {
        let mut value = [0f32; 3];
        data.floats(&mut value)?;
        Value::Vector3(value)
      },
      _ => return Err(data.malformed("field is not stored in the field data")),
    })
  }
}

/// Читает GFF файл из буфера, содержащего весь файл, с настройками по умолчанию: принимаются
/// все известные сигнатуры, версии и типы полей, строки декодируются как `UTF-8`.
///
/// # Ошибки
/// Файл разбирается целиком: при любой ошибке дерево не возвращается. Виды ошибок описаны
/// в перечислении [`Error`](../error/enum.Error.html)
#[inline]
pub fn decode(bytes: &[u8]) -> Result<Tree> {
  decode_with(bytes, &Config::default())
}

/// Читает GFF файл из буфера, содержащего весь файл, с указанными настройками
///
/// # Пример
/// ```rust
/// use gff_tree::{decode_with, encode, Config, Game, Signature, Tree};
///
/// let mut tree = Tree::new(Signature::UTT);
/// tree.root_mut().insert("TrapFlag".parse().unwrap(), 1u8);
///
/// let bytes = encode(&tree, Game::Nwn, Signature::UTT).unwrap();
/// let decoded = decode_with(&bytes, &Config::for_game(Game::Nwn)).unwrap();
/// assert_eq!(decoded.root().get_u8("TrapFlag"), Some(1));
/// ```
pub fn decode_with(bytes: &[u8], config: &Config) -> Result<Tree> {
  let gff = Gff::read(bytes, config)?;
  debug!(
    "decoding {} {}: {} struct(s), {} field(s), {} label(s), {} byte(s) of field data",
    gff.header.signature, gff.header.version,
    gff.structs.len(), gff.fields.len(), gff.labels.len(), gff.field_data.len(),
  );
  Builder::new(&gff, config).build()
}

/// Читает весь поток и разбирает его как GFF файл с настройками по умолчанию
pub fn from_reader<R: Read>(mut reader: R) -> Result<Tree> {
  let mut bytes = Vec::new();
  reader.read_to_end(&mut bytes)?;
  decode(&bytes)
}

#[cfg(test)]
mod tests {
  use byteorder::{LE, WriteBytesExt};

  use super::*;
  use crate::game::Game;
  use crate::header::{Header, Section, Signature, Version, HEADER_SIZE};
  use crate::Label;

  /// Описание файла, собираемого вручную
  #[derive(Default)]
  struct Raw {
    structs: Vec<raw::Struct>,
    fields: Vec<raw::Field>,
    labels: Vec<&'static str>,
    field_data: Vec<u8>,
    field_indices: Vec<u32>,
    list_indices: Vec<u32>,
  }

  impl Raw {
    fn field(&mut self, tag: FieldType, label: u32, value: u32) -> u32 {
      self.fields.push(raw::Field { tag: tag as u32, label, data: value.to_le_bytes() });
      self.fields.len() as u32 - 1
    }
    fn build(self) -> Vec<u8> {
      let mut offset = HEADER_SIZE;
      let mut next = |count: usize, size: u32| {
        let section = Section { offset, count: count as u32 };
        offset += count as u32 * size;
        section
      };
      let mut header = Header::with_version(Signature::GIT, Version::V3_2);
      header.structs       = next(self.structs.len(), 12);
      header.fields        = next(self.fields.len(), 12);
      header.labels        = next(self.labels.len(), 16);
      header.field_data    = next(self.field_data.len(), 1);
      header.field_indices = next(self.field_indices.len() * 4, 1);
      header.list_indices  = next(self.list_indices.len() * 4, 1);

      let gff = Gff {
        header,
        structs: self.structs,
        fields: self.fields,
        labels: self.labels.iter().map(|l| l.parse::<Label>().unwrap()).collect(),
        field_data: self.field_data,
        field_indices: self.field_indices,
        list_indices: self.list_indices,
      };
      let mut bytes = Vec::new();
      gff.write(&mut bytes).unwrap();
      bytes
    }
  }

  fn root(fields: u32, offset: u32) -> raw::Struct {
    raw::Struct { tag: 0xFFFF_FFFF, offset, fields }
  }

  #[test]
  fn reads_inline_and_indirect_values() {
    let mut gff = Raw::default();
    gff.labels = vec!["Byte", "Name", "Big"];
    gff.field(FieldType::UInt8, 0, 7);
    gff.field(FieldType::String, 1, 0);
    gff.field(FieldType::Int64, 2, 9);
    gff.field_data.write_u32::<LE>(5).unwrap();
    gff.field_data.extend_from_slice(b"hello");
    gff.field_data.write_i64::<LE>(-2).unwrap();
    gff.field_indices = vec![0, 1, 2];
    gff.structs.push(root(3, 0));

    let tree = decode(&gff.build()).unwrap();
    let root = tree.root();
    assert_eq!(root.tag(), 0xFFFF_FFFF);
    assert_eq!(root.get_u8("Byte"), Some(7));
    assert_eq!(root.get_str("Name"), Some("hello"));
    assert_eq!(root.get_i64("Big"), Some(-2));
  }

  #[test]
  fn single_field_index_is_inline() {
    let mut gff = Raw::default();
    gff.labels = vec!["Unused", "Value"];
    gff.field(FieldType::Int32, 0, 1);
    gff.field(FieldType::Int32, 1, (-5i32) as u32);
    gff.structs.push(root(1, 1));

    let tree = decode(&gff.build()).unwrap();
    assert_eq!(tree.root().len(), 1);
    assert_eq!(tree.root().get_i32("Value"), Some(-5));
  }

  #[test]
  fn nested_lists_and_structs() {
    let mut gff = Raw::default();
    gff.labels = vec!["List", "Inner", "X"];
    gff.structs.push(root(1, 0));
    gff.field(FieldType::List, 0, 0);
    gff.list_indices = vec![3, 1, 2, 3];
    for i in 0..3 {
      // Элемент списка содержит одну вложенную структуру с одним полем
      let inner = gff.field(FieldType::Struct, 1, 4 + i);
      gff.structs.push(raw::Struct { tag: i, offset: inner, fields: 1 });
    }
    for i in 0..3 {
      let x = gff.field(FieldType::UInt32, 2, i * 10);
      gff.structs.push(raw::Struct { tag: 100 + i, offset: x, fields: 1 });
    }

    let tree = decode(&gff.build()).unwrap();
    let items = tree.root().get_list("List").unwrap();
    assert_eq!(items.len(), 3);
    for (i, &item) in items.iter().enumerate() {
      assert_eq!(tree[item].tag(), i as u32);
      let inner = tree[item].get_struct("Inner").unwrap();
      assert_eq!(tree[inner].tag(), 100 + i as u32);
      assert_eq!(tree[inner].get_u32("X"), Some(i as u32 * 10));
    }
  }

  #[test]
  fn loc_string_without_substrings() {
    let mut gff = Raw::default();
    gff.labels = vec!["Name"];
    gff.field(FieldType::LocString, 0, 0);
    gff.field_data.write_u32::<LE>(8).unwrap();
    gff.field_data.write_i32::<LE>(42).unwrap();
    gff.field_data.write_u32::<LE>(0).unwrap();
    gff.structs.push(root(1, 0));

    let tree = decode(&gff.build()).unwrap();
    let name = tree.root().get_loc_string("Name").unwrap();
    assert_eq!(name.str_ref, StrRef(42));
    assert!(name.strings.is_empty());
  }

  #[test]
  fn loc_string_substrings_must_fit() {
    let mut gff = Raw::default();
    gff.labels = vec!["Name"];
    gff.field(FieldType::LocString, 0, 0);
    gff.field_data.write_u32::<LE>(8).unwrap();
    gff.field_data.write_i32::<LE>(-1).unwrap();
    gff.field_data.write_u32::<LE>(1).unwrap();
    gff.field_data.write_u32::<LE>(0).unwrap();
    gff.field_data.write_u32::<LE>(2).unwrap();
    gff.field_data.extend_from_slice(b"hi");
    gff.structs.push(root(1, 0));

    match decode(&gff.build()) {
      Err(Error::MalformedField { field: 0, tag: 12, .. }) => {},
      res => panic!("unexpected result: {:?}", res),
    }
  }

  #[test]
  fn payload_outside_of_field_data() {
    let mut gff = Raw::default();
    gff.labels = vec!["Blob"];
    gff.field(FieldType::Binary, 0, 0);
    gff.field_data.write_u32::<LE>(100).unwrap();
    gff.structs.push(root(1, 0));

    match decode(&gff.build()) {
      Err(Error::MalformedField { tag: 13, .. }) => {},
      res => panic!("unexpected result: {:?}", res),
    }
  }

  #[test]
  fn field_offset_past_field_data() {
    let mut gff = Raw::default();
    gff.labels = vec!["Blob"];
    gff.field(FieldType::Binary, 0, 5);
    gff.field_data.write_u32::<LE>(0).unwrap();
    gff.structs.push(root(1, 0));

    match decode(&gff.build()) {
      Err(Error::MalformedField { tag: 13, reason, .. }) => assert!(reason.contains("outside")),
      res => panic!("unexpected result: {:?}", res),
    }
  }

  #[test]
  fn unknown_field_type() {
    let mut gff = Raw::default();
    gff.labels = vec!["What"];
    gff.fields.push(raw::Field { tag: 18, label: 0, data: [0; 4] });
    gff.structs.push(root(1, 0));

    match decode(&gff.build()) {
      Err(Error::MalformedField { tag: 18, .. }) => {},
      res => panic!("unexpected result: {:?}", res),
    }
  }

  #[test]
  fn field_type_not_allowed_by_game() {
    let mut gff = Raw::default();
    gff.labels = vec!["Position"];
    gff.field(FieldType::Vector3, 0, 0);
    gff.field_data = vec![0; 12];
    gff.structs.push(root(1, 0));
    let bytes = gff.build();

    assert!(decode(&bytes).is_ok());
    match decode_with(&bytes, &Config::for_game(Game::Nwn)) {
      Err(Error::UnsupportedFieldType(FieldType::Vector3)) => {},
      res => panic!("unexpected result: {:?}", res),
    }
  }

  #[test]
  fn struct_referenced_twice() {
    let mut gff = Raw::default();
    gff.labels = vec!["A", "B"];
    gff.field(FieldType::Struct, 0, 1);
    gff.field(FieldType::Struct, 1, 1);
    gff.field_indices = vec![0, 1];
    gff.structs.push(root(2, 0));
    gff.structs.push(raw::Struct { tag: 0, offset: 0, fields: 0 });

    match decode(&gff.build()) {
      Err(Error::StructReused(1)) => {},
      res => panic!("unexpected result: {:?}", res),
    }
  }

  #[test]
  fn cycle_to_root() {
    let mut gff = Raw::default();
    gff.labels = vec!["Parent"];
    gff.field(FieldType::Struct, 0, 0);
    gff.structs.push(root(1, 0));

    match decode(&gff.build()) {
      Err(Error::StructReused(0)) => {},
      res => panic!("unexpected result: {:?}", res),
    }
  }

  #[test]
  fn duplicate_labels_keep_last_value() {
    let mut gff = Raw::default();
    gff.labels = vec!["A", "B"];
    gff.field(FieldType::UInt8, 0, 1);
    gff.field(FieldType::UInt8, 1, 2);
    gff.field(FieldType::UInt8, 0, 3);
    gff.field_indices = vec![0, 1, 2];
    gff.structs.push(root(3, 0));

    let tree = decode(&gff.build()).unwrap();
    let labels: Vec<_> = tree.root().iter().map(|(l, _)| l.to_string()).collect();
    assert_eq!(labels, vec!["A", "B"]);
    assert_eq!(tree.root().get_u8("A"), Some(3));
  }

  #[test]
  fn unreachable_structs_are_dropped() {
    let mut gff = Raw::default();
    gff.structs.push(root(0, 0));
    gff.structs.push(raw::Struct { tag: 1, offset: 0, fields: 0 });

    let tree = decode(&gff.build()).unwrap();
    assert_eq!(tree.len(), 1);
  }

  #[test]
  fn empty_struct_table() {
    match decode(&Raw::default().build()) {
      Err(Error::CorruptTable { table: "structs", .. }) => {},
      res => panic!("unexpected result: {:?}", res),
    }
  }

  #[test]
  fn dangling_list_item() {
    let mut gff = Raw::default();
    gff.labels = vec!["List"];
    gff.field(FieldType::List, 0, 0);
    gff.list_indices = vec![1, 5];
    gff.structs.push(root(1, 0));

    match decode(&gff.build()) {
      Err(Error::CorruptTable { table: "structs", index: 5, .. }) => {},
      res => panic!("unexpected result: {:?}", res),
    }
  }

  #[test]
  fn reads_from_stream() {
    let mut gff = Raw::default();
    gff.labels = vec!["Value"];
    gff.field(FieldType::UInt16, 0, 513);
    gff.structs.push(root(1, 0));
    let bytes = gff.build();

    let tree = from_reader(&bytes[..]).unwrap();
    assert_eq!(tree.signature, Signature::GIT);
    assert_eq!(tree.root().get_u16("Value"), Some(513));
  }
}
