//! Реализация чтения и записи файлов формата Bioware GFF (Generic File Format), используемых
//! в играх на движке Aurora (Neverwinter Nights) и Odyssey (Star Wars: Knights of the Old Republic I и II).
//!
//! Файл читается в дерево структур [`Tree`], хранящее все структуры в одном массиве. Структуры
//! ссылаются друг на друга по номерам [`StructId`], корневая структура всегда имеет номер `0`.
//! Дерево можно изменять и записывать обратно в двоичный формат:
//!
//! ```rust
//! use gff_tree::{decode, encode, Game, Signature, Tree};
//!
//! let mut tree = Tree::new(Signature::UTT);
//! tree.root_mut().insert("TrapFlag".parse().unwrap(), 1u8);
//!
//! let bytes = encode(&tree, Game::Nwn, Signature::UTT).unwrap();
//! let decoded = decode(&bytes).unwrap();
//!
//! assert_eq!(decoded.root().get_u8("TrapFlag"), Some(1));
//! assert_eq!(decoded, tree);
//! ```
//!
//! Кроме того, из дерева можно прочитать любой тип, реализующий `serde::Deserialize`,
//! см. [`from_tree`].
//!
//! [`Tree`]: value/struct.Tree.html
//! [`StructId`]: value/struct.StructId.html
//! [`from_tree`]: fn.from_tree.html
#![warn(missing_docs)]

// Модули описания заголовка
mod sig;
mod ver;
pub mod header;

mod game;
mod config;

pub mod raw;
pub mod index;
pub mod value;
pub mod parser;
pub mod ser;
pub mod de;
pub mod error;

// Модули, чье содержимое реэкспортируется, разделено для удобства сопровождения
mod label;
mod resref;
mod string;

pub use crate::label::*;
pub use crate::resref::*;
pub use crate::string::*;

pub use crate::config::Config;
pub use crate::game::{Game, Profile};
pub use crate::header::{Signature, Version};
pub use crate::error::{Error, Result};
pub use crate::value::{Struct, StructId, Tree, Value};

pub use crate::parser::{decode, decode_with, from_reader};
pub use crate::ser::{encode, encode_with, to_writer};
pub use crate::de::{from_struct, from_tree};
