//! Содержит описание дерева GFF файла в памяти: хранилище структур, сами структуры и значения их полей

use std::collections::HashSet;
use std::ops;
use indexmap::IndexMap;
use indexmap::map::{Iter, IterMut};

use crate::{Label, LocString, ResRef};
use crate::header::{Signature, Version};
use crate::raw::FieldType;

/// Идентификатор типа, используемый корневой структурой файла
pub const ROOT_TAG: u32 = 0xFFFF_FFFF;

/// Номер структуры в хранилище структур [дерева](struct.Tree.html). Корневая структура
/// всегда имеет номер 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StructId(pub(crate) u32);

impl StructId {
  /// Идентификатор корневой структуры дерева
  pub const ROOT: StructId = StructId(0);

  /// Возвращает порядковый номер структуры в хранилище
  #[inline]
  pub fn index(&self) -> usize { self.0 as usize }
}

/// Значение поля GFF структуры
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
  /// Беззнаковое байтовое значение
  UInt8(u8),
  /// Знаковое байтовое значение
  Int8(i8),
  /// Беззнаковое 2-х байтовое целое
  UInt16(u16),
  /// Знаковое 2-х байтовое целое
  Int16(i16),
  /// Беззнаковое 4-х байтовое целое
  UInt32(u32),
  /// Знаковое 4-х байтовое целое
  Int32(i32),
  /// Беззнаковое 8-ми байтовое целое
  UInt64(u64),
  /// Знаковое 8-ми байтовое целое
  Int64(i64),
  /// Число с плавающей запятой одинарной точности
  Single(f32),
  /// Число с плавающей запятой двойной точности
  Double(f64),
  /// Нелокализуемая строка
  String(String),
  /// Имя файла ресурса
  ResRef(ResRef),
  /// Локализуемая строка
  LocString(LocString),
  /// Произвольные двоичные данные
  Binary(Vec<u8>),
  /// Вложенная структура, хранящаяся в том же дереве
  Struct(StructId),
  /// Список структур, хранящихся в том же дереве
  List(Vec<StructId>),
  /// Кватернион ориентации объекта
  Vector4([f32; 4]),
  /// Позиция объекта
  Vector3([f32; 3]),
}

impl Value {
  /// Возвращает тип поля, которым значение будет записано в файл
  pub fn field_type(&self) -> FieldType {
    use self::Value::*;

    match *self {
      UInt8(_)     => FieldType::UInt8,
      Int8(_)      => FieldType::Int8,
      UInt16(_)    => FieldType::UInt16,
      Int16(_)     => FieldType::Int16,
      UInt32(_)    => FieldType::UInt32,
      Int32(_)     => FieldType::Int32,
      UInt64(_)    => FieldType::UInt64,
      Int64(_)     => FieldType::Int64,
      Single(_)    => FieldType::Single,
      Double(_)    => FieldType::Double,
      String(_)    => FieldType::String,
      ResRef(_)    => FieldType::ResRef,
      LocString(_) => FieldType::LocString,
      Binary(_)    => FieldType::Binary,
      Struct(_)    => FieldType::Struct,
      List(_)      => FieldType::List,
      Vector4(_)   => FieldType::Vector4,
      Vector3(_)   => FieldType::Vector3,
    }
  }
}

macro_rules! from_primitive {
  ($($type:ty => $variant:ident),* $(,)*) => (
    $(
      impl From<$type> for Value {
        #[inline]
        fn from(value: $type) -> Self { Value::$variant(value) }
      }
    )*
  );
}
from_primitive!(
  u8  => UInt8,
  i8  => Int8,
  u16 => UInt16,
  i16 => Int16,
  u32 => UInt32,
  i32 => Int32,
  u64 => UInt64,
  i64 => Int64,
  f32 => Single,
  f64 => Double,
  String    => String,
  ResRef    => ResRef,
  LocString => LocString,
  Vec<u8>   => Binary,
  StructId  => Struct,
  Vec<StructId> => List,
  [f32; 4]  => Vector4,
  [f32; 3]  => Vector3,
);

impl<'a> From<&'a str> for Value {
  #[inline]
  fn from(value: &'a str) -> Self { Value::String(value.to_owned()) }
}

///////////////////////////////////////////////////////////////////////////////////////////////////

/// Структура GFF файла: тег типа и упорядоченный набор полей. Порядок полей совпадает с
/// порядком их добавления и сохраняется при записи в файл. Поиск полей по метке
/// чувствителен к регистру.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Struct {
  /// Идентификатор типа структуры
  tag: u32,
  /// Поля структуры в порядке их добавления
  fields: IndexMap<Label, Value>,
}

/// Генерирует метод получения значения поля конкретного типа
macro_rules! getter {
  ($name:ident, $variant:ident => ref $type:ty) => (
    /// Возвращает ссылку на значение поля, если поле существует и имеет соответствующий тип
    #[inline]
    pub fn $name(&self, label: &str) -> Option<&$type> {
      match self.get(label) {
        Some(Value::$variant(value)) => Some(value),
        _ => None,
      }
    }
  );
  ($name:ident, $variant:ident => $type:ty) => (
    /// Возвращает значение поля, если поле существует и имеет соответствующий тип
    #[inline]
    pub fn $name(&self, label: &str) -> Option<$type> {
      match self.get(label) {
        Some(&Value::$variant(value)) => Some(value),
        _ => None,
      }
    }
  );
}

impl Struct {
  /// Создает пустую структуру с указанным тегом типа
  #[inline]
  pub fn new(tag: u32) -> Self {
    Struct { tag, fields: IndexMap::new() }
  }
  /// Идентификатор типа структуры
  #[inline]
  pub fn tag(&self) -> u32 { self.tag }
  /// Изменяет идентификатор типа структуры
  #[inline]
  pub fn set_tag(&mut self, tag: u32) { self.tag = tag; }

  /// Добавляет поле в структуру. Если поле с такой меткой уже существует, его значение заменяется
  /// новым, позиция поля при этом не меняется, а старое значение возвращается.
  #[inline]
  pub fn insert<V: Into<Value>>(&mut self, label: Label, value: V) -> Option<Value> {
    self.fields.insert(label, value.into())
  }
  /// Возвращает значение поля с указанной меткой. Метки длиннее 16 байт никогда не
  /// находятся, так как не могут храниться в структуре
  #[inline]
  pub fn get(&self, label: &str) -> Option<&Value> {
    let label: Label = label.parse().ok()?;
    self.fields.get(&label)
  }
  /// Возвращает изменяемую ссылку на значение поля с указанной меткой
  #[inline]
  pub fn get_mut(&mut self, label: &str) -> Option<&mut Value> {
    let label: Label = label.parse().ok()?;
    self.fields.get_mut(&label)
  }
  /// Удаляет поле из структуры, сохраняя порядок оставшихся полей
  #[inline]
  pub fn remove(&mut self, label: &str) -> Option<Value> {
    let label: Label = label.parse().ok()?;
    self.fields.shift_remove(&label)
  }
  /// Количество полей в структуре
  #[inline]
  pub fn len(&self) -> usize { self.fields.len() }
  /// Возвращает `true`, если в структуре нет полей
  #[inline]
  pub fn is_empty(&self) -> bool { self.fields.is_empty() }
  /// Итератор по полям структуры в порядке их добавления
  #[inline]
  pub fn iter(&self) -> Iter<Label, Value> { self.fields.iter() }
  /// Итератор по полям структуры с возможностью изменения значений
  #[inline]
  pub fn iter_mut(&mut self) -> IterMut<Label, Value> { self.fields.iter_mut() }

  getter!(get_u8,  UInt8  => u8);
  getter!(get_i8,  Int8   => i8);
  getter!(get_u16, UInt16 => u16);
  getter!(get_i16, Int16  => i16);
  getter!(get_u32, UInt32 => u32);
  getter!(get_i32, Int32  => i32);
  getter!(get_u64, UInt64 => u64);
  getter!(get_i64, Int64  => i64);
  getter!(get_f32, Single => f32);
  getter!(get_f64, Double => f64);
  getter!(get_struct, Struct => StructId);
  getter!(get_vector4, Vector4 => [f32; 4]);
  getter!(get_vector3, Vector3 => [f32; 3]);

  getter!(get_resref, ResRef => ref ResRef);
  getter!(get_loc_string, LocString => ref LocString);

  /// Возвращает значение строкового поля
  #[inline]
  pub fn get_str(&self, label: &str) -> Option<&str> {
    match self.get(label) {
      Some(Value::String(value)) => Some(value.as_str()),
      _ => None,
    }
  }
  /// Возвращает данные двоичного поля
  #[inline]
  pub fn get_binary(&self, label: &str) -> Option<&[u8]> {
    match self.get(label) {
      Some(Value::Binary(value)) => Some(value.as_slice()),
      _ => None,
    }
  }
  /// Возвращает номера структур-элементов списка
  #[inline]
  pub fn get_list(&self, label: &str) -> Option<&[StructId]> {
    match self.get(label) {
      Some(Value::List(value)) => Some(value.as_slice()),
      _ => None,
    }
  }
}

impl<'a> IntoIterator for &'a Struct {
  type Item = (&'a Label, &'a Value);
  type IntoIter = Iter<'a, Label, Value>;

  #[inline]
  fn into_iter(self) -> Self::IntoIter { self.iter() }
}

///////////////////////////////////////////////////////////////////////////////////////////////////

/// Дерево GFF файла в памяти. Все структуры дерева хранятся в одном хранилище и ссылаются
/// друг на друга по [номерам](struct.StructId.html), корневая структура всегда находится
/// в ячейке 0.
///
/// Деревья сравниваются структурно: два дерева равны, если равны их корневые структуры с учетом
/// содержимого всех вложенных структур, независимо от расположения структур в хранилище.
/// Сигнатура и версия при сравнении не учитываются.
///
/// # Пример
/// ```rust
/// use gff_tree::{Tree, Signature, Struct, Value};
///
/// let mut tree = Tree::new(Signature::UTT);
/// let item = tree.add_struct(Struct::new(0));
/// tree[item].insert("Tag".parse().unwrap(), "trigger");
/// tree.root_mut().insert("Items".parse().unwrap(), vec![item]);
///
/// assert_eq!(tree.len(), 2);
/// assert_eq!(tree.root().get_list("Items"), Some(&[item][..]));
/// ```
#[derive(Debug, Clone)]
pub struct Tree {
  /// Вид файла, из которого прочитано дерево
  pub signature: Signature,
  /// Версия формата файла, из которого прочитано дерево
  pub version: Version,
  /// Хранилище структур, корневая структура -- первая
  structs: Vec<Struct>,
}

impl Tree {
  /// Создает дерево, состоящее из одной пустой корневой структуры
  #[inline]
  pub fn new(signature: Signature) -> Self {
    Tree {
      signature,
      version: Version::V3_2,
      structs: vec![Struct::new(ROOT_TAG)],
    }
  }
  /// Создает дерево из готового набора структур. Набор не должен быть пустым
  #[inline]
  pub(crate) fn from_parts(signature: Signature, version: Version, structs: Vec<Struct>) -> Self {
    debug_assert!(!structs.is_empty());
    Tree { signature, version, structs }
  }
  /// Корневая структура дерева
  #[inline]
  pub fn root(&self) -> &Struct { &self.structs[0] }
  /// Изменяемая ссылка на корневую структуру дерева
  #[inline]
  pub fn root_mut(&mut self) -> &mut Struct { &mut self.structs[0] }
  /// Возвращает структуру с указанным номером, если она есть в дереве
  #[inline]
  pub fn get(&self, id: StructId) -> Option<&Struct> { self.structs.get(id.index()) }
  /// Возвращает изменяемую ссылку на структуру с указанным номером, если она есть в дереве
  #[inline]
  pub fn get_mut(&mut self, id: StructId) -> Option<&mut Struct> { self.structs.get_mut(id.index()) }
  /// Помещает структуру в хранилище и возвращает ее номер. Чтобы структура попала в файл,
  /// на нее должно ссылаться поле типа `Struct` или `List` одной из записываемых структур
  #[inline]
  pub fn add_struct(&mut self, value: Struct) -> StructId {
    let id = StructId(self.structs.len() as u32);
    self.structs.push(value);
    id
  }
  /// Количество структур в хранилище, включая корневую
  #[inline]
  pub fn len(&self) -> usize { self.structs.len() }

  /// Сравнивает структуры этого и другого дерева, включая все вложенные в них структуры.
  /// Каждая пара структур сравнивается один раз, поэтому сравнение завершается и на деревьях
  /// с циклическими ссылками
  fn struct_eq(&self, left: StructId, other: &Tree, right: StructId) -> bool {
    let mut stack = vec![(left, right)];
    let mut visited = HashSet::new();

    while let Some((l, r)) = stack.pop() {
      if !visited.insert((l, r)) {
        continue;
      }
      let (l, r) = match (self.get(l), other.get(r)) {
        (Some(l), Some(r)) => (l, r),
        _ => return false,
      };
      if l.tag != r.tag || l.len() != r.len() {
        return false;
      }
      for (label, lvalue) in l {
        let rvalue = match r.fields.get(label) {
          Some(value) => value,
          None => return false,
        };
        match (lvalue, rvalue) {
          (Value::Struct(a), Value::Struct(b)) => stack.push((*a, *b)),
          (Value::List(a), Value::List(b)) => {
            if a.len() != b.len() {
              return false;
            }
            stack.extend(a.iter().cloned().zip(b.iter().cloned()));
          },
          (a, b) => if !value_eq(a, b) { return false; },
        }
      }
    }
    true
  }
}

/// Сравнивает значения полей, не являющихся ссылками на структуры. Числа с плавающей запятой
/// сравниваются побитово: значение `NaN`, прочитанное из файла, равно самому себе
fn value_eq(left: &Value, right: &Value) -> bool {
  fn bits(values: &[f32]) -> impl Iterator<Item = u32> + '_ {
    values.iter().map(|v| v.to_bits())
  }

  match (left, right) {
    (Value::Single(a),  Value::Single(b))  => a.to_bits() == b.to_bits(),
    (Value::Double(a),  Value::Double(b))  => a.to_bits() == b.to_bits(),
    (Value::Vector4(a), Value::Vector4(b)) => bits(a).eq(bits(b)),
    (Value::Vector3(a), Value::Vector3(b)) => bits(a).eq(bits(b)),
    (a, b) => a == b,
  }
}

impl PartialEq for Tree {
  fn eq(&self, other: &Tree) -> bool {
    self.struct_eq(StructId::ROOT, other, StructId::ROOT)
  }
}

impl ops::Index<StructId> for Tree {
  type Output = Struct;

  #[inline]
  fn index(&self, id: StructId) -> &Struct { &self.structs[id.index()] }
}
impl ops::IndexMut<StructId> for Tree {
  #[inline]
  fn index_mut(&mut self, id: StructId) -> &mut Struct { &mut self.structs[id.index()] }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn label(name: &str) -> Label { name.parse().unwrap() }

  #[test]
  fn insert_keeps_position_and_replaces_value() {
    let mut s = Struct::new(1);
    assert_eq!(s.insert(label("A"), 1u8), None);
    assert_eq!(s.insert(label("B"), 2u8), None);
    assert_eq!(s.insert(label("A"), 3u8), Some(Value::UInt8(1)));

    let labels: Vec<_> = s.iter().map(|(l, _)| l.to_string()).collect();
    assert_eq!(labels, vec!["A", "B"]);
    assert_eq!(s.get_u8("A"), Some(3));
  }

  #[test]
  fn typed_getters_check_variant() {
    let mut s = Struct::new(0);
    s.insert(label("Name"), "door");
    s.insert(label("Pos"), [1.0f32, 2.0, 3.0]);

    assert_eq!(s.get_str("Name"), Some("door"));
    assert_eq!(s.get_u32("Name"), None);
    assert_eq!(s.get_vector3("Pos"), Some([1.0, 2.0, 3.0]));
    assert_eq!(s.get("name"), None);
    assert_eq!(s.get("this_label_is_too_long"), None);

    assert_eq!(s.remove("Name"), Some(Value::String("door".into())));
    assert_eq!(s.len(), 1);
  }

  #[test]
  fn field_type_of_values() {
    assert_eq!(Value::from(1u64).field_type(), FieldType::UInt64);
    assert_eq!(Value::List(vec![]).field_type(), FieldType::List);
    assert_eq!(Value::Vector4([0.0; 4]).field_type(), FieldType::Vector4);
  }

  #[test]
  fn new_tree_has_root() {
    let tree = Tree::new(Signature::ARE);
    assert_eq!(tree.len(), 1);
    assert_eq!(tree.root().tag(), ROOT_TAG);
    assert!(tree.root().is_empty());
  }

  #[test]
  fn equality_ignores_arena_layout() {
    // В первом дереве вложенная структура добавлена раньше неиспользуемой, во втором -- позже
    let mut first = Tree::new(Signature::GIT);
    let child = first.add_struct(Struct::new(5));
    first[child].insert(label("X"), 1i32);
    first.root_mut().insert(label("Child"), child);

    let mut second = Tree::new(Signature::GIT);
    second.add_struct(Struct::new(99));
    let child = second.add_struct(Struct::new(5));
    second[child].insert(label("X"), 1i32);
    second.root_mut().insert(label("Child"), child);

    assert_eq!(first, second);

    second[child].insert(label("X"), 2i32);
    assert_ne!(first, second);
  }

  #[test]
  fn equality_compares_lists_element_wise() {
    let mut first = Tree::new(Signature::GIT);
    let a = first.add_struct(Struct::new(1));
    let b = first.add_struct(Struct::new(2));
    first.root_mut().insert(label("List"), vec![a, b]);

    let mut second = first.clone();
    second.root_mut().insert(label("List"), vec![b, a]);
    assert_ne!(first, second);

    second.root_mut().insert(label("List"), vec![a]);
    assert_ne!(first, second);
  }

  #[test]
  fn equality_terminates_on_cycles() {
    let mut tree = Tree::new(Signature::GIT);
    tree.root_mut().insert(label("Self"), StructId::ROOT);
    let child = tree.add_struct(Struct::new(1));
    tree[child].insert(label("Parent"), StructId::ROOT);
    tree.root_mut().insert(label("Child"), vec![child, child]);

    assert_eq!(tree, tree.clone());

    let mut other = tree.clone();
    other[child].set_tag(2);
    assert_ne!(tree, other);
  }

  #[test]
  fn equality_compares_floats_bitwise() {
    let mut tree = Tree::new(Signature::GIT);
    tree.root_mut().insert(label("Single"), f32::NAN);
    tree.root_mut().insert(label("Double"), f64::NAN);
    tree.root_mut().insert(label("Position"), [0.0f32, f32::NAN, 1.0]);
    assert_eq!(tree, tree.clone());

    let mut other = tree.clone();
    other.root_mut().insert(label("Single"), -0.0f32);
    let mut zero = tree.clone();
    zero.root_mut().insert(label("Single"), 0.0f32);
    assert_ne!(zero, other);
  }
}
