//! Содержит реализации структур, описывающих строки, хранящиеся в GFF файле
use std::fmt;

/// Индекс в файле `dialog.tlk`, содержащий локализованный текст. Отрицательное значение
/// (обычно `-1`) означает, что строка не ссылается на таблицу строк
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct StrRef(pub i32);

impl StrRef {
  /// Значение, означающее отсутствие ссылки на таблицу строк
  pub const NONE: StrRef = StrRef(-1);

  /// Определяет, ссылается ли строка на таблицу строк
  #[inline]
  pub fn is_none(&self) -> bool { self.0 < 0 }

  /// Определяет индекс строки в TLK файле, если строка на него ссылается
  #[inline]
  pub fn index(&self) -> Option<u32> {
    if self.is_none() { None } else { Some(self.0 as u32) }
  }
}

impl Default for StrRef {
  #[inline]
  fn default() -> Self { StrRef::NONE }
}

impl fmt::Debug for StrRef {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self.index() {
      Some(index) => write!(f, "StrRef({})", index),
      None => write!(f, "StrRef(none)"),
    }
  }
}

/// Виды языков, на которых могут храниться локализованные строки в объекте `LocString`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Language {
  /// Английский язык
  English = 0,
  /// Французский язык
  French  = 1,
  /// Немецкий язык
  German  = 2,
  /// Итальянский язык
  Italian = 3,
  /// Испанский язык
  Spanish = 4,
  /// Польский язык
  Polish  = 5,
  /// Корейский язык
  Korean  = 128,
  /// Традиционный китайский
  ChineseTraditional = 129,
  /// Упрощенный китайский
  ChineseSimplified  = 130,
  /// Японский
  Japanese= 131,
}

impl Language {
  /// Получает язык по его идентификатору, если он известен
  pub fn from_id(id: u32) -> Option<Self> {
    use self::Language::*;

    Some(match id {
      0 => English,
      1 => French,
      2 => German,
      3 => Italian,
      4 => Spanish,
      5 => Polish,
      128 => Korean,
      129 => ChineseTraditional,
      130 => ChineseSimplified,
      131 => Japanese,
      _ => return None,
    })
  }
}

/// Виды пола персонажа, на которых могут храниться локализованные строки в объекте `LocString`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Gender {
  /// Строка предназначена для персонажа мужского или неопределенного пола
  Male = 0,
  /// Строка предназначена для персонажа женского пола
  Female = 1,
}

/// Ключ, по которому хранится одна из частей локализованной строки. Содержит язык и пол,
/// упакованные в одно число по формуле `language * 2 + gender`. Именно в таком виде
/// ключ хранится в файле. Неизвестные языки сохраняются без изменений
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StringKey(pub(crate) u32);

impl StringKey {
  /// Создает ключ для указанного языка и пола
  #[inline]
  pub fn new(language: Language, gender: Gender) -> Self {
    StringKey(((language as u32) << 1) | gender as u32)
  }
  /// Идентификатор языка, закодированный в ключе
  #[inline]
  pub fn language_id(&self) -> u32 { self.0 >> 1 }
  /// Язык, закодированный в ключе, если он известен
  #[inline]
  pub fn language(&self) -> Option<Language> { Language::from_id(self.language_id()) }
  /// Пол, закодированный в ключе
  #[inline]
  pub fn gender(&self) -> Gender {
    if self.0 & 1 == 0 { Gender::Male } else { Gender::Female }
  }
}

impl From<u32> for StringKey {
  #[inline]
  fn from(value: u32) -> Self { StringKey(value) }
}
impl From<StringKey> for u32 {
  #[inline]
  fn from(value: StringKey) -> u32 { value.0 }
}
impl From<(Language, Gender)> for StringKey {
  #[inline]
  fn from(value: (Language, Gender)) -> Self { StringKey::new(value.0, value.1) }
}

impl fmt::Debug for StringKey {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self.language() {
      Some(lang) => write!(f, "{:?}/{:?}", lang, self.gender()),
      None => write!(f, "{}/{:?}", self.language_id(), self.gender()),
    }
  }
}

/// Часть локализованной строки, хранящая информацию для одного языка и пола
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubString {
  /// Язык и пол персонажа, для которых записан текст этой части многоязыковой строки
  pub key: StringKey,
  /// Текст многоязыковой строки для указанного поля и языка
  pub string: String,
}

/// Локализуемая строка
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LocString {
  /// Индекс в TLK файле, содержащий локализованный текст
  pub str_ref: StrRef,
  /// Список локализованных строк для каждого языка и пола, в порядке их хранения в файле
  pub strings: Vec<SubString>,
}

impl LocString {
  /// Создает строку, текст которой берется только из таблицы строк
  #[inline]
  pub fn external(str_ref: StrRef) -> Self {
    LocString { str_ref, strings: Vec::new() }
  }
  /// Возвращает текст для указанного языка и пола, если он хранится в строке
  pub fn get<K: Into<StringKey>>(&self, key: K) -> Option<&str> {
    let key = key.into();
    self.strings.iter().find(|s| s.key == key).map(|s| s.string.as_str())
  }
  /// Устанавливает текст для указанного языка и пола, заменяя существующий
  pub fn set<K: Into<StringKey>, S: Into<String>>(&mut self, key: K, string: S) {
    let key = key.into();
    let string = string.into();
    match self.strings.iter_mut().find(|s| s.key == key) {
      Some(sub) => sub.string = string,
      None => self.strings.push(SubString { key, string }),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn key_packs_language_and_gender() {
    let key = StringKey::new(Language::German, Gender::Female);
    assert_eq!(u32::from(key), 5);
    assert_eq!(key.language(), Some(Language::German));
    assert_eq!(key.gender(), Gender::Female);

    let unknown = StringKey::from(2 * 42u32);
    assert_eq!(unknown.language(), None);
    assert_eq!(unknown.language_id(), 42);
  }

  #[test]
  fn set_replaces_existing_text() {
    let mut s = LocString::default();
    s.set((Language::English, Gender::Male), "Hello");
    s.set((Language::English, Gender::Male), "Hi");
    s.set((Language::French, Gender::Male), "Salut");

    assert_eq!(s.strings.len(), 2);
    assert_eq!(s.get((Language::English, Gender::Male)), Some("Hi"));
    assert_eq!(s.get((Language::French, Gender::Female)), None);
    assert!(s.str_ref.is_none());
  }
}
