//! Запись дерева GFF файла в двоичный формат Bioware GFF (Generic File Format)

use std::io::Write;
use byteorder::{LE, WriteBytesExt};
use indexmap::IndexSet;
use log::{debug, trace};

use crate::{Label, LocString};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::game::Game;
use crate::header::{Header, Section, Signature, Version, HEADER_SIZE, STRUCT_SIZE, FIELD_SIZE, LABEL_SIZE};
use crate::index::LabelIndex;
use crate::raw::{self, FieldType, Gff};
use crate::resref::MAX_RESREF_LEN;
use crate::value::{StructId, Tree, Value};

/// Вспомогательная структура, описывающая индекс списка полей структуры, для типобезопасности.
/// Любая GFF структура, имеющая более одного поля, ссылается по такому индексу на список с
/// перечислением имеющихся у нее полей
#[derive(Debug, Copy, Clone)]
struct FieldListIndex(usize);

/// Вспомогательная структура, описывающая индекс списка элементов GFF списка, для типобезопасности
#[derive(Debug, Copy, Clone)]
struct ListIndex(usize);

/// Промежуточное представление записываемых структур. Содержит данные, которые после
/// небольшого преобразования, возможного только после обхода всего дерева, могут
/// быть записаны в файл
#[derive(Debug)]
enum Struct {
  /// Структура без полей
  NoFields { tag: u32 },
  /// Структура, состоящая только из одного поля, содержит индекс этого поля
  OneField { tag: u32, field: u32 },
  /// Структура, состоящая из двух и более полей. Содержит индекс списка и количество полей
  MultiField { tag: u32, list: FieldListIndex, fields: u32 },
}
impl Struct {
  /// Преобразует промежуточное представление в окончательное, которое может быть записано в файл
  #[inline]
  fn into_raw(&self, offsets: &[u32]) -> raw::Struct {
    use self::Struct::*;

    match *self {
      NoFields { tag }                 => raw::Struct { tag, offset: 0,               fields: 0 },
      OneField { tag, field }          => raw::Struct { tag, offset: field,           fields: 1 },
      MultiField { tag, list, fields } => raw::Struct { tag, offset: offsets[list.0], fields },
    }
  }
}

/// Промежуточное представление записываемого поля структуры. Содержит данные, которые после
/// небольшого преобразования, возможного только после обхода всего дерева, могут
/// быть записаны в файл
#[derive(Debug)]
enum Field {
  /// Поле, значение которого хранится в самой записи поля: либо непосредственно, либо
  /// в виде смещения в области данных полей, которое известно сразу после записи данных
  Simple { label: LabelIndex, tag: FieldType, data: [u8; 4] },
  /// Поле со вложенной структурой. Номер структуры в файле известен только после обхода
  /// всего дерева
  Struct { label: LabelIndex, struct_: StructId },
  /// Поле, представленное списком структур. Содержит индекс списка в массиве
  /// [`list_indices`](struct.Serializer.html#field.list_indices)
  List   { label: LabelIndex, list: ListIndex },
}
impl Field {
  /// Преобразует промежуточное представление в окончательное, которое может быть записано в файл
  ///
  /// # Параметры
  /// - `slots`: номера, под которыми структуры дерева записываются в файл
  /// - `offsets`: смещения списков в таблице индексов списков
  #[inline]
  fn into_raw(&self, slots: &[u32], offsets: &[u32]) -> raw::Field {
    use self::Field::*;

    match *self {
      Simple { label, tag, data } => raw::Field { tag: tag as u32, label: label.0, data },
      Struct { label, struct_ } => raw::Field {
        tag: FieldType::Struct as u32,
        label: label.0,
        data: slots[struct_.index()].to_le_bytes(),
      },
      List { label, list } => raw::Field {
        tag: FieldType::List as u32,
        label: label.0,
        data: offsets[list.0].to_le_bytes(),
      },
    }
  }
}

/// Структура для записи дерева в формат Bioware GFF.
///
/// Запись выполняется в два прохода. Первый проход обходит дерево от корня в глубину,
/// назначая структурам номера в порядке их посещения, дописывая данные комплексных
/// полей в область данных и собирая уникальные метки. Второй проход вычисляет
/// все смещения и формирует таблицы файла.
#[derive(Debug)]
pub struct Serializer<'a> {
  /// Кодировка строк и набор допустимых типов полей
  config: &'a Config,
  /// Массив, содержащий описания структур в файле
  structs: Vec<Struct>,
  /// Массив, содержащий описания полей структур в файле
  fields: Vec<Field>,
  /// Множество, содержащие названия всех полей всех структур файла в порядке их добавления
  labels: IndexSet<Label>,
  /// Массив, содержащий данные комплексных полей
  field_data: Vec<u8>,
  /// Массив списков с индексами полей структур. Каждый элемент массива описывает набор
  /// полей одной структуры, которая содержит более одного поля
  field_indices: Vec<Vec<u32>>,
  /// Массив списков со структурами, содержащимися в каждом списке. Общее количество
  /// полей-списков равно размеру массива.
  list_indices: Vec<Vec<StructId>>,
  /// Номера, под которыми структуры дерева записываются в файл. Структуры, не
  /// достижимые из корня, не записываются
  slots: Vec<Option<u32>>,
}

impl<'a> Serializer<'a> {
  /// Создает сериализатор, использующий указанные настройки
  pub fn new(config: &'a Config) -> Self {
    Serializer {
      config,
      structs: Vec::new(),
      fields: Vec::new(),
      labels: IndexSet::new(),
      field_data: Vec::new(),
      field_indices: Vec::new(),
      list_indices: Vec::new(),
      slots: Vec::new(),
    }
  }
  /// Обходит дерево от корня и собирает все данные, необходимые для записи файла.
  ///
  /// # Ошибки
  /// - [`Error::StructReused`], если на одну структуру дерева есть несколько ссылок
  /// - [`Error::CorruptTable`], если поле ссылается на отсутствующую в дереве структуру
  /// - [`Error::UnsupportedFieldType`], если тип поля не допускается настройками
  ///
  /// [`Error::StructReused`]: ../error/enum.Error.html#variant.StructReused
  /// [`Error::CorruptTable`]: ../error/enum.Error.html#variant.CorruptTable
  /// [`Error::UnsupportedFieldType`]: ../error/enum.Error.html#variant.UnsupportedFieldType
  pub fn collect(&mut self, tree: &Tree) -> Result<()> {
    self.slots = vec![None; tree.len()];
    let mut seen = vec![false; tree.len()];
    seen[0] = true;

    let mut stack = vec![StructId::ROOT];
    let mut children = Vec::new();
    while let Some(id) = stack.pop() {
      self.add_struct(tree, id, &mut children)?;

      for &child in &children {
        let slot = match seen.get_mut(child.index()) {
          Some(slot) => slot,
          None => return Err(Error::CorruptTable { table: "structs", index: child.0 as u64, len: tree.len() as u64 }),
        };
        if *slot {
          return Err(Error::StructReused(child.0));
        }
        *slot = true;
      }
      // Первый дочерний элемент должен быть обработан первым
      stack.extend(children.drain(..).rev());
    }
    Ok(())
  }
  /// Добавляет в список известных названий полей для сериализации указанное и возвращает
  /// его индекс в этом списке. Если такое поле уже имеется в индексе, не добавляет его
  /// повторно.
  #[inline]
  fn add_label(&mut self, label: Label) -> LabelIndex {
    let (index, _) = self.labels.insert_full(label);
    LabelIndex(index as u32)
  }
  /// Добавляет в список структур структуру дерева вместе со всеми ее полями
  ///
  /// # Параметры
  /// - `id`: номер записываемой структуры в дереве
  /// - `children`: сюда в порядке следования полей записываются номера структур, на
  ///   которые ссылаются поля структуры
  fn add_struct(&mut self, tree: &Tree, id: StructId, children: &mut Vec<StructId>) -> Result<()> {
    let value = &tree[id];
    let slot = self.structs.len() as u32;
    self.slots[id.index()] = Some(slot);
    trace!("struct {:?} -> #{}: tag {:#x}, {} field(s)", id, slot, value.tag(), value.len());

    let first = self.fields.len() as u32;
    for (label, value) in value {
      let label = self.add_label(*label);
      let field = self.add_field(label, value, children)?;
      self.fields.push(field);
    }

    let tag = value.tag();
    let entry = match value.len() {
      0 => Struct::NoFields { tag },
      1 => Struct::OneField { tag, field: first },
      n => {
        let list = FieldListIndex(self.field_indices.len());
        self.field_indices.push((first..first + n as u32).collect());
        Struct::MultiField { tag, list, fields: n as u32 }
      },
    };
    self.structs.push(entry);
    Ok(())
  }
  /// Формирует промежуточное представление поля. Данные комплексных значений сразу
  /// записываются в область данных полей
  fn add_field(&mut self, label: LabelIndex, value: &Value, children: &mut Vec<StructId>) -> Result<Field> {
    let tag = value.field_type();
    if !self.config.profile().supports_type(tag) {
      return Err(Error::UnsupportedFieldType(tag));
    }

    let mut data = [0u8; 4];
    {
      let mut storage = &mut data[..];
      match *value {
        Value::UInt8(val)  => storage.write_u8(val)?,
        Value::Int8(val)   => storage.write_i8(val)?,
        Value::UInt16(val) => storage.write_u16::<LE>(val)?,
        Value::Int16(val)  => storage.write_i16::<LE>(val)?,
        Value::UInt32(val) => storage.write_u32::<LE>(val)?,
        Value::Int32(val)  => storage.write_i32::<LE>(val)?,
        Value::Single(val) => storage.write_f32::<LE>(val)?,

        Value::Struct(id) => {
          children.push(id);
          return Ok(Field::Struct { label, struct_: id });
        },
        Value::List(ref items) => {
          children.extend_from_slice(items);
          let list = ListIndex(self.list_indices.len());
          self.list_indices.push(items.clone());
          return Ok(Field::List { label, list });
        },

        _ => {
          let offset = self.field_data.len() as u32;
          self.write_complex(value)?;
          storage.write_u32::<LE>(offset)?;
        },
      }
    }
    Ok(Field::Simple { label, tag, data })
  }
  /// Дописывает данные комплексного значения в область данных полей
  fn write_complex(&mut self, value: &Value) -> Result<()> {
    let data = &mut self.field_data;
    match *value {
      Value::UInt64(val) => data.write_u64::<LE>(val)?,
      Value::Int64(val)  => data.write_i64::<LE>(val)?,
      Value::Double(val) => data.write_f64::<LE>(val)?,
      Value::String(ref val) => {
        let bytes = self.config.encode_str(val)?;
        data.write_u32::<LE>(bytes.len() as u32)?;
        data.extend_from_slice(&bytes);
      },
      Value::ResRef(ref val) => {
        let bytes = val.as_ref();
        if bytes.len() > MAX_RESREF_LEN {
          return Err(Error::TooLongResRef(bytes.len()));
        }
        data.write_u8(bytes.len() as u8)?;
        data.extend_from_slice(bytes);
      },
      Value::LocString(ref val) => {
        let body = encode_loc_string(val, self.config)?;
        data.write_u32::<LE>(body.len() as u32)?;
        data.extend_from_slice(&body);
      },
      Value::Binary(ref val) => {
        data.write_u32::<LE>(val.len() as u32)?;
        data.extend_from_slice(val);
      },
      Value::Vector4(ref val) => for &f in val { data.write_f32::<LE>(f)?; },
      Value::Vector3(ref val) => for &f in val { data.write_f32::<LE>(f)?; },
      _ => unreachable!("value {:?} is stored inline", value.field_type()),
    }
    Ok(())
  }
  /// Создает заголовок файла на основе его содержания
  fn make_header(&self, signature: Signature, version: Version) -> Header {
    struct Builder {
      offset: u32,
    }
    impl Builder {
      #[inline]
      fn add_section(&mut self, count: usize, size: u32) -> Section {
        let section = Section { offset: self.offset, count: count as u32 };
        self.offset += section.count * size;
        section
      }
    }

    let field_indices = self.field_indices.iter().fold(0, |sum, v| sum + v.len());
    let list_indices  = self.list_indices.iter().fold(0, |sum, v| sum + v.len() + 1);

    let mut builder = Builder { offset: HEADER_SIZE };
    Header {
      signature,
      version,
      structs:       builder.add_section(self.structs.len(), STRUCT_SIZE),
      fields:        builder.add_section(self.fields.len(),  FIELD_SIZE),
      labels:        builder.add_section(self.labels.len(),  LABEL_SIZE),
      field_data:    builder.add_section(self.field_data.len(), 1),
      // Количество в двух последних секциях задается в байтах, а не элементах
      field_indices: builder.add_section(field_indices * 4, 1),
      list_indices:  builder.add_section(list_indices * 4, 1),
    }
  }
  /// Вычисляет смещения, на которые нужно заменить индексы в структурах для ссылки на списки их полей
  fn calc_field_offsets(&self) -> Vec<u32> {
    let mut offsets = Vec::with_capacity(self.field_indices.len());
    let mut last_offset = 0;
    for elements in self.field_indices.iter() {
      offsets.push(last_offset as u32);
      last_offset += elements.len() * 4;
    }
    offsets
  }
  /// Вычисляет смещения, на которые нужно заменить индексы, хранимые в поле с типом List
  fn calc_list_offsets(&self) -> Vec<u32> {
    let mut offsets = Vec::with_capacity(self.list_indices.len());
    let mut last_offset = 0;
    for elements in self.list_indices.iter() {
      offsets.push(last_offset as u32);
      // +1 для длины списка
      last_offset += (elements.len() + 1) * 4;
    }
    offsets
  }
  /// Формирует таблицы файла из собранных данных
  pub fn into_raw(self, signature: Signature, version: Version) -> Gff {
    let header = self.make_header(signature, version);

    // Все структуры, на которые ссылаются поля, посещены при обходе
    let slots: Vec<u32> = self.slots.iter().map(|s| s.unwrap_or(u32::max_value())).collect();
    let field_offsets = self.calc_field_offsets();
    let list_offsets  = self.calc_list_offsets();

    let structs = self.structs.iter().map(|s| s.into_raw(&field_offsets)).collect();
    let fields  = self.fields.iter().map(|f| f.into_raw(&slots, &list_offsets)).collect();

    let mut list_indices = Vec::new();
    for list in &self.list_indices {
      list_indices.push(list.len() as u32);
      list_indices.extend(list.iter().map(|id| slots[id.index()]));
    }

    Gff {
      header,
      structs,
      fields,
      labels: self.labels.into_iter().collect(),
      field_data: self.field_data,
      field_indices: self.field_indices.into_iter().flatten().collect(),
      list_indices,
    }
  }
}

/// Кодирует содержимое локализованной строки, следующее за ее размером
fn encode_loc_string(value: &LocString, config: &Config) -> Result<Vec<u8>> {
  let mut body = Vec::new();
  body.write_i32::<LE>(value.str_ref.0)?;
  body.write_u32::<LE>(value.strings.len() as u32)?;
  for sub in &value.strings {
    let bytes = config.encode_str(&sub.string)?;
    body.write_u32::<LE>(sub.key.into())?;
    body.write_u32::<LE>(bytes.len() as u32)?;
    body.extend_from_slice(&bytes);
  }
  Ok(body)
}

/// Записывает дерево в поток в формате GFF с указанными настройками. В заголовок записывается
/// версия дерева: прочитанная из файла, либо `V3.2` для деревьев, созданных с нуля. Версия,
/// не допустимая настройками, приводит к ошибке [`Error::UnsupportedVersion`].
///
/// Файл формируется целиком до начала записи, поэтому при ошибке формирования в поток
/// ничего не записывается.
///
/// # Параметры
/// - `writer`: поток для записи
/// - `tree`: записываемое дерево
/// - `signature`: вид файла; должен быть допустим в настройках
/// - `config`: кодировка строк, допустимые сигнатуры, версии и типы полей
///
/// [`Error::UnsupportedVersion`]: ../error/enum.Error.html#variant.UnsupportedVersion
pub fn to_writer<W: Write>(mut writer: W, tree: &Tree, signature: Signature, config: &Config) -> Result<()> {
  if !config.accepts_signature(signature) {
    return Err(Error::InvalidSignature(signature));
  }
  let version = tree.version;
  if !config.profile().supports_version(version) {
    return Err(Error::UnsupportedVersion(version));
  }

  let mut ser = Serializer::new(config);
  ser.collect(tree)?;
  let gff = ser.into_raw(signature, version);
  debug!(
    "encoding {} {}: {} struct(s), {} field(s), {} label(s), {} byte(s) of field data",
    signature, version, gff.structs.len(), gff.fields.len(), gff.labels.len(), gff.field_data.len(),
  );
  gff.write(&mut writer)
}

/// Записывает дерево в массив байт в формате GFF с указанными настройками
#[inline]
pub fn encode_with(tree: &Tree, signature: Signature, config: &Config) -> Result<Vec<u8>> {
  let mut vec = Vec::new();
  to_writer(&mut vec, tree, signature, config)?;
  Ok(vec)
}

/// Записывает дерево в массив байт в формате GFF для указанной игры. Поля, тип которых не
/// поддерживается игрой, приводят к ошибке [`Error::UnsupportedFieldType`].
///
/// [`Error::UnsupportedFieldType`]: ../error/enum.Error.html#variant.UnsupportedFieldType
#[inline]
pub fn encode(tree: &Tree, game: Game, signature: Signature) -> Result<Vec<u8>> {
  encode_with(tree, signature, &Config::for_game(game))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{LocString, ResRef, StrRef};
  use crate::parser::decode;
  use crate::value::Struct;

  fn label(name: &str) -> Label { name.parse().unwrap() }

  fn header(bytes: &[u8]) -> Header {
    Header::from_bytes(bytes).unwrap()
  }

  #[test]
  fn empty_tree() {
    let tree = Tree::new(Signature::IFO);
    let bytes = encode(&tree, Game::Nwn, Signature::IFO).unwrap();

    assert_eq!(bytes.len(), HEADER_SIZE as usize + STRUCT_SIZE as usize);
    assert_eq!(&bytes[0..8], b"IFO V3.2");
    let header = header(&bytes);
    assert_eq!(header.structs, Section { offset: 56, count: 1 });
    assert_eq!(header.list_indices, Section { offset: 68, count: 0 });
    assert_eq!(&bytes[56..60], &[0xFF, 0xFF, 0xFF, 0xFF]);
  }

  #[test]
  fn inline_values_do_not_use_field_data() {
    let mut tree = Tree::new(Signature::UTI);
    tree.root_mut().insert(label("Cost"), 1000u32);
    tree.root_mut().insert(label("Charges"), 5u8);
    let bytes = encode(&tree, Game::Nwn, Signature::UTI).unwrap();
    assert_eq!(header(&bytes).field_data.count, 0);
  }

  #[test]
  fn string_writes_length_and_text() {
    let mut tree = Tree::new(Signature::UTI);
    tree.root_mut().insert(label("Tag"), "sword");
    let bytes = encode(&tree, Game::Nwn, Signature::UTI).unwrap();

    let header = header(&bytes);
    assert_eq!(header.field_data.count, 4 + 5);
    let start = header.field_data.offset as usize;
    assert_eq!(&bytes[start..start + 9], b"\x05\0\0\0sword");
  }

  #[test]
  fn resref_uses_one_byte_length() {
    let mut tree = Tree::new(Signature::UTT);
    tree.root_mut().insert(label("TemplateResRef"), "trig01".parse::<ResRef>().unwrap());
    let bytes = encode(&tree, Game::Nwn, Signature::UTT).unwrap();

    let header = header(&bytes);
    let start = header.field_data.offset as usize;
    assert_eq!(header.field_data.count, 7);
    assert_eq!(&bytes[start..start + 7], b"\x06trig01");
  }

  #[test]
  fn loc_string_size_is_recomputed() {
    let mut tree = Tree::new(Signature::UTC);
    tree.root_mut().insert(label("FirstName"), LocString::external(StrRef(17)));
    let bytes = encode(&tree, Game::Nwn, Signature::UTC).unwrap();

    let header = header(&bytes);
    let start = header.field_data.offset as usize;
    assert_eq!(header.field_data.count, 12);
    assert_eq!(&bytes[start..start + 12], &[8, 0, 0, 0, 17, 0, 0, 0, 0, 0, 0, 0]);

    let tree = decode(&bytes).unwrap();
    assert_eq!(tree.root().get_loc_string("FirstName"), Some(&LocString::external(StrRef(17))));
  }

  #[test]
  fn labels_are_shared() {
    let mut tree = Tree::new(Signature::GIT);
    let mut items = Vec::new();
    for i in 0..3u32 {
      let mut item = Struct::new(i);
      item.insert(label("Tag"), i);
      items.push(tree.add_struct(item));
    }
    tree.root_mut().insert(label("List"), items);

    let bytes = encode(&tree, Game::K1, Signature::GIT).unwrap();
    let header = header(&bytes);
    assert_eq!(header.labels.count, 2);
    assert_eq!(header.structs.count, 4);
    assert_eq!(header.list_indices.count, 4 * 4);
  }

  #[test]
  fn structs_are_numbered_depth_first() {
    let mut tree = Tree::new(Signature::GIT);
    let leaf = tree.add_struct(Struct::new(3));
    let mut a = Struct::new(1);
    a.insert(label("Leaf"), leaf);
    let a = tree.add_struct(a);
    let b = tree.add_struct(Struct::new(2));
    tree.root_mut().insert(label("A"), a);
    tree.root_mut().insert(label("B"), b);

    let config = Config::default();
    let mut ser = Serializer::new(&config);
    ser.collect(&tree).unwrap();
    let gff = ser.into_raw(Signature::GIT, Version::V3_2);
    let tags: Vec<_> = gff.structs.iter().map(|s| s.tag).collect();
    assert_eq!(tags, vec![0xFFFF_FFFF, 1, 3, 2]);
  }

  #[test]
  fn vector_requires_kotor() {
    let mut tree = Tree::new(Signature::GIT);
    tree.root_mut().insert(label("Position"), [1.0f32, 2.0, 3.0]);

    match encode(&tree, Game::Nwn, Signature::GIT) {
      Err(Error::UnsupportedFieldType(FieldType::Vector3)) => {},
      res => panic!("unexpected result: {:?}", res),
    }
    let bytes = encode(&tree, Game::K2, Signature::GIT).unwrap();
    assert_eq!(header(&bytes).field_data.count, 12);
  }

  #[test]
  fn shared_struct_is_rejected() {
    let mut tree = Tree::new(Signature::GIT);
    let child = tree.add_struct(Struct::new(0));
    tree.root_mut().insert(label("A"), child);
    tree.root_mut().insert(label("B"), vec![child]);

    match encode(&tree, Game::K1, Signature::GIT) {
      Err(Error::StructReused(id)) => assert_eq!(id, child.0),
      res => panic!("unexpected result: {:?}", res),
    }
  }

  #[test]
  fn cycle_is_rejected() {
    let mut tree = Tree::new(Signature::GIT);
    tree.root_mut().insert(label("Self"), StructId::ROOT);

    match encode(&tree, Game::K1, Signature::GIT) {
      Err(Error::StructReused(0)) => {},
      res => panic!("unexpected result: {:?}", res),
    }
  }

  #[test]
  fn dangling_struct_is_rejected() {
    let mut tree = Tree::new(Signature::GIT);
    tree.root_mut().insert(label("Missing"), StructId(10));

    match encode(&tree, Game::K1, Signature::GIT) {
      Err(Error::CorruptTable { table: "structs", index: 10, .. }) => {},
      res => panic!("unexpected result: {:?}", res),
    }
  }

  #[test]
  fn tree_version_is_written() {
    let mut tree = Tree::new(Signature::UTT);
    tree.version = Version::V4_1;

    let bytes = encode(&tree, Game::K2, Signature::UTT).unwrap();
    assert_eq!(&bytes[0..8], b"UTT V4.1");

    match encode(&tree, Game::K1, Signature::UTT) {
      Err(Error::UnsupportedVersion(Version::V4_1)) => {},
      res => panic!("unexpected result: {:?}", res),
    }
  }

  #[test]
  fn unregistered_signature_is_rejected() {
    let tree = Tree::new(Signature::Other(*b"ABC "));
    assert!(encode(&tree, Game::K1, Signature::Other(*b"ABC ")).is_err());

    let config = Config::default().register(Signature::Other(*b"ABC "));
    let bytes = encode_with(&tree, Signature::Other(*b"ABC "), &config).unwrap();
    assert_eq!(&bytes[0..4], b"ABC ");
  }
}
