//! Десериализатор, позволяющий прочитать любой тип, реализующий `serde::Deserialize`, из
//! дерева GFF файла. Структуры дерева читаются как отображения из меток в значения полей,
//! списки -- как последовательности структур.

use std::slice;
use indexmap::map::Iter;
use serde::forward_to_deserialize_any;
use serde::de::{self, DeserializeSeed, IntoDeserializer, Visitor};
use serde::de::value::SeqDeserializer;

use crate::Label;
use crate::error::{Error, Result};
use crate::value::{StructId, Tree, Value};

mod string;
mod value;

pub use self::string::{LocStringDeserializer, StringKeyDeserializer};
pub use self::value::LabelDeserializer;

/// Возвращает структуру дерева или ошибку, если такой структуры нет
#[inline]
fn get<'de>(tree: &'de Tree, id: StructId) -> Result<&'de crate::value::Struct> {
  tree.get(id).ok_or_else(|| Error::CorruptTable {
    table: "structs",
    index: id.0 as u64,
    len: tree.len() as u64,
  })
}

/// Десериализатор структуры дерева. Структура читается как отображение из меток полей
/// в их значения
#[derive(Debug, Clone, Copy)]
pub struct StructDeserializer<'de> {
  /// Дерево, содержащее структуру
  tree: &'de Tree,
  /// Номер читаемой структуры
  id: StructId,
}

impl<'de> StructDeserializer<'de> {
  /// Создает десериализатор для указанной структуры дерева
  #[inline]
  pub fn new(tree: &'de Tree, id: StructId) -> Self {
    StructDeserializer { tree, id }
  }
}

impl<'de> de::Deserializer<'de> for StructDeserializer<'de> {
  type Error = Error;

  #[inline]
  fn is_human_readable(&self) -> bool { false }

  fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where V: Visitor<'de>,
  {
    let value = get(self.tree, self.id)?;
    visitor.visit_map(StructAccess { tree: self.tree, iter: value.iter(), value: None })
  }
  /// Любая структура может быть прочитана как `unit`, независимо от ее содержимого
  #[inline]
  fn deserialize_unit<V>(self, visitor: V) -> Result<V::Value>
    where V: Visitor<'de>,
  {
    get(self.tree, self.id)?;
    visitor.visit_unit()
  }
  #[inline]
  fn deserialize_unit_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where V: Visitor<'de>,
  {
    self.deserialize_unit(visitor)
  }
  /// Структура всегда разбирается, как `Some(...)`
  #[inline]
  fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where V: Visitor<'de>,
  {
    visitor.visit_some(self)
  }
  #[inline]
  fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where V: Visitor<'de>,
  {
    visitor.visit_newtype_struct(self)
  }
  #[inline]
  fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value>
    where V: Visitor<'de>,
  {
    visitor.visit_unit()
  }

  forward_to_deserialize_any!(
    bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str
    string bytes byte_buf seq tuple tuple_struct map struct enum identifier
  );
}

/// Доступ к полям структуры для посетителя отображения
struct StructAccess<'de> {
  /// Дерево, содержащее структуру
  tree: &'de Tree,
  /// Итератор по полям структуры
  iter: Iter<'de, Label, Value>,
  /// Значение поля, метка которого была прочитана последней
  value: Option<&'de Value>,
}

impl<'de> de::MapAccess<'de> for StructAccess<'de> {
  type Error = Error;

  fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where K: DeserializeSeed<'de>,
  {
    match self.iter.next() {
      Some((label, value)) => {
        self.value = Some(value);
        let key: LabelDeserializer<Error> = label.into_deserializer();
        seed.deserialize(key).map(Some)
      },
      None => Ok(None),
    }
  }

  fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where V: DeserializeSeed<'de>,
  {
    match self.value.take() {
      Some(value) => seed.deserialize(ValueDeserializer::new(self.tree, value)),
      None => Err(de::Error::custom("value requested before key")),
    }
  }

  #[inline]
  fn size_hint(&self) -> Option<usize> { Some(self.iter.len()) }
}

/// Доступ к элементам списка для посетителя последовательности
struct ListAccess<'de> {
  /// Дерево, содержащее структуры списка
  tree: &'de Tree,
  /// Итератор по номерам структур списка
  iter: slice::Iter<'de, StructId>,
}

impl<'de> de::SeqAccess<'de> for ListAccess<'de> {
  type Error = Error;

  fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where T: DeserializeSeed<'de>,
  {
    match self.iter.next() {
      Some(&id) => seed.deserialize(StructDeserializer::new(self.tree, id)).map(Some),
      None => Ok(None),
    }
  }

  #[inline]
  fn size_hint(&self) -> Option<usize> { Some(self.iter.len()) }
}

///////////////////////////////////////////////////////////////////////////////////////////////////

/// Десериализатор значения поля структуры
#[derive(Debug, Clone, Copy)]
pub struct ValueDeserializer<'de> {
  /// Дерево, содержащее структуры, на которые может ссылаться значение
  tree: &'de Tree,
  /// Читаемое значение
  value: &'de Value,
}

impl<'de> ValueDeserializer<'de> {
  /// Создает десериализатор для значения поля одной из структур дерева
  #[inline]
  pub fn new(tree: &'de Tree, value: &'de Value) -> Self {
    ValueDeserializer { tree, value }
  }
}

impl<'de> de::Deserializer<'de> for ValueDeserializer<'de> {
  type Error = Error;

  #[inline]
  fn is_human_readable(&self) -> bool { false }

  fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where V: Visitor<'de>,
  {
    use self::Value::*;

    match *self.value {
      UInt8(val)  => visitor.visit_u8(val),
      Int8(val)   => visitor.visit_i8(val),
      UInt16(val) => visitor.visit_u16(val),
      Int16(val)  => visitor.visit_i16(val),
      UInt32(val) => visitor.visit_u32(val),
      Int32(val)  => visitor.visit_i32(val),
      UInt64(val) => visitor.visit_u64(val),
      Int64(val)  => visitor.visit_i64(val),
      Single(val) => visitor.visit_f32(val),
      Double(val) => visitor.visit_f64(val),
      String(ref val) => visitor.visit_borrowed_str(val),
      ResRef(ref val) => match val.as_str() {
        Ok(str) => visitor.visit_borrowed_str(str),
        Err(_) => visitor.visit_borrowed_bytes(val.as_ref()),
      },
      LocString(ref val) => LocStringDeserializer::new(val).deserialize_any(visitor),
      Binary(ref val) => visitor.visit_borrowed_bytes(val),
      Struct(id) => StructDeserializer::new(self.tree, id).deserialize_any(visitor),
      List(ref val) => visitor.visit_seq(ListAccess { tree: self.tree, iter: val.iter() }),
      Vector4(ref val) => SeqDeserializer::new(val.iter().cloned()).deserialize_any(visitor),
      Vector3(ref val) => SeqDeserializer::new(val.iter().cloned()).deserialize_any(visitor),
    }
  }
  /// Логические значения хранятся в полях типа `UInt8`
  fn deserialize_bool<V>(self, visitor: V) -> Result<V::Value>
    where V: Visitor<'de>,
  {
    match *self.value {
      Value::UInt8(val) => visitor.visit_bool(val != 0),
      _ => self.deserialize_any(visitor),
    }
  }
  /// Структура может быть прочитана как `unit`, независимо от ее содержимого
  fn deserialize_unit<V>(self, visitor: V) -> Result<V::Value>
    where V: Visitor<'de>,
  {
    match *self.value {
      Value::Struct(id) => StructDeserializer::new(self.tree, id).deserialize_unit(visitor),
      _ => self.deserialize_any(visitor),
    }
  }
  #[inline]
  fn deserialize_unit_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where V: Visitor<'de>,
  {
    self.deserialize_unit(visitor)
  }
  /// Всегда разбирает любое значение, как `Some(...)`, формат не умеет хранить признак
  /// отсутствия значения. `None` в опциональные поля будет записываться только потому,
  /// что при десериализации данное поле не будет найдено
  #[inline]
  fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where V: Visitor<'de>,
  {
    visitor.visit_some(self)
  }
  /// Разбирает в newtype структуру нижележащее значение
  #[inline]
  fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where V: Visitor<'de>,
  {
    visitor.visit_newtype_struct(self)
  }
  #[inline]
  fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value>
    where V: Visitor<'de>,
  {
    visitor.visit_unit()
  }

  forward_to_deserialize_any!(
    i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str
    string bytes byte_buf seq tuple tuple_struct map struct enum identifier
  );
}

/// Читает значение любого типа, реализующего `serde::Deserialize`, из корневой структуры дерева
///
/// # Пример
/// ```rust
/// use serde::Deserialize;
/// use gff_tree::{from_tree, ResRef, Signature, Tree};
///
/// #[derive(Deserialize)]
/// struct Trigger {
///   #[serde(rename = "TrapFlag")]
///   trap: bool,
///   #[serde(rename = "TemplateResRef")]
///   template: ResRef,
/// }
///
/// let mut tree = Tree::new(Signature::UTT);
/// tree.root_mut().insert("TrapFlag".parse().unwrap(), 1u8);
/// tree.root_mut().insert("TemplateResRef".parse().unwrap(), "trig01".parse::<ResRef>().unwrap());
///
/// let trigger: Trigger = from_tree(&tree).unwrap();
/// assert!(trigger.trap);
/// assert_eq!(trigger.template, "trig01");
/// ```
#[inline]
pub fn from_tree<'de, T>(tree: &'de Tree) -> Result<T>
  where T: de::Deserialize<'de>,
{
  from_struct(tree, StructId::ROOT)
}

/// Читает значение любого типа, реализующего `serde::Deserialize`, из указанной структуры дерева
#[inline]
pub fn from_struct<'de, T>(tree: &'de Tree, id: StructId) -> Result<T>
  where T: de::Deserialize<'de>,
{
  T::deserialize(StructDeserializer::new(tree, id))
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;
  use serde::Deserialize;
  use serde_bytes::ByteBuf;

  use super::*;
  use crate::{LocString, ResRef, StrRef};
  use crate::header::Signature;
  use crate::string::{Gender, Language};
  use crate::value::Struct;

  fn label(name: &str) -> Label { name.parse().unwrap() }

  #[derive(Debug, Deserialize, PartialEq)]
  struct Item {
    #[serde(rename = "Tag")]
    tag: String,
    #[serde(rename = "Stack")]
    stack: u16,
  }

  #[derive(Debug, Deserialize)]
  #[allow(non_snake_case)]
  struct Store {
    LocName: BTreeMap<u32, String>,
    Description: i32,
    Markup: Option<i32>,
    Missing: Option<i32>,
    Items: Vec<Item>,
    Owner: Item,
    Data: ByteBuf,
    Position: [f32; 3],
    Empty: (),
  }

  fn store() -> Tree {
    let mut tree = Tree::new(Signature::UTM);

    let mut items = Vec::new();
    for (tag, stack) in &[("torch", 1u16), ("arrow", 99)] {
      let mut item = Struct::new(0);
      item.insert(label("Tag"), *tag);
      item.insert(label("Stack"), *stack);
      items.push(tree.add_struct(item));
    }
    let mut owner = Struct::new(1);
    owner.insert(label("Tag"), "merchant");
    owner.insert(label("Stack"), 0u16);
    let owner = tree.add_struct(owner);
    let empty = tree.add_struct(Struct::new(2));

    let mut name = LocString::default();
    name.set((Language::English, Gender::Male), "Store");
    name.set((Language::German, Gender::Male), "Laden");

    let root = tree.root_mut();
    root.insert(label("LocName"), name);
    root.insert(label("Description"), LocString::external(StrRef(1234)));
    root.insert(label("Markup"), 10i32);
    root.insert(label("Items"), items);
    root.insert(label("Owner"), owner);
    root.insert(label("Data"), vec![1u8, 2, 3]);
    root.insert(label("Position"), [1.0f32, 0.5, -2.0]);
    root.insert(label("Empty"), empty);
    root.insert(label("Ignored"), 5u64);
    tree
  }

  #[test]
  fn reads_struct_tree() {
    let tree = store();
    let store: Store = from_tree(&tree).unwrap();

    assert_eq!(store.LocName.get(&0).map(String::as_str), Some("Store"));
    assert_eq!(store.LocName.get(&4).map(String::as_str), Some("Laden"));
    assert_eq!(store.Description, 1234);
    assert_eq!(store.Markup, Some(10));
    assert_eq!(store.Missing, None);
    assert_eq!(store.Items, vec![
      Item { tag: "torch".into(), stack: 1 },
      Item { tag: "arrow".into(), stack: 99 },
    ]);
    assert_eq!(store.Owner.tag, "merchant");
    assert_eq!(store.Data.as_ref(), &[1, 2, 3]);
    assert_eq!(store.Position, [1.0, 0.5, -2.0]);
  }

  #[test]
  fn reads_nested_struct_directly() {
    let tree = store();
    let owner = tree.root().get_struct("Owner").unwrap();
    let item: Item = from_struct(&tree, owner).unwrap();
    assert_eq!(item.tag, "merchant");
  }

  #[test]
  fn bool_from_byte() {
    #[derive(Deserialize)]
    struct Flags {
      #[serde(rename = "TrapFlag")]
      trap: bool,
      #[serde(rename = "Plot")]
      plot: bool,
    }

    let mut tree = Tree::new(Signature::UTT);
    tree.root_mut().insert(label("TrapFlag"), 1u8);
    tree.root_mut().insert(label("Plot"), 0u8);

    let flags: Flags = from_tree(&tree).unwrap();
    assert!(flags.trap);
    assert!(!flags.plot);
  }

  #[test]
  fn resref_and_labels_as_values() {
    #[derive(Deserialize)]
    struct Door {
      #[serde(rename = "TemplateResRef")]
      template: ResRef,
      #[serde(rename = "LinkedTo")]
      linked: Label,
    }

    let mut tree = Tree::new(Signature::UTD);
    tree.root_mut().insert(label("TemplateResRef"), "nw_door".parse::<ResRef>().unwrap());
    tree.root_mut().insert(label("LinkedTo"), "wp_exit");

    let door: Door = from_tree(&tree).unwrap();
    assert_eq!(door.template, "nw_door");
    assert_eq!(door.linked, label("wp_exit"));
  }

  #[test]
  fn missing_required_field() {
    #[derive(Debug, Deserialize)]
    struct Required {
      #[serde(rename = "Value")]
      _value: i32,
    }

    let tree = Tree::new(Signature::IFO);
    match from_tree::<Required>(&tree) {
      Err(Error::Deserialize(msg)) => assert!(msg.contains("Value")),
      res => panic!("unexpected result: {:?}", res),
    }
  }
}
