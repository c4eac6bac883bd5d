//! Таблица различий между играми, использующими GFF формат. Игры отличаются только набором
//! допустимых версий файла и набором допустимых типов полей, сам формат у них общий

use std::fmt;

use crate::raw::FieldType;
use crate::ver::Version;

/// Игра (вариант формата), для которой читается или записывается файл
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Game {
  /// Neverwinter Nights и остальные игры на движке Aurora
  Nwn,
  /// Star Wars: Knights of the Old Republic
  K1,
  /// Star Wars: Knights of the Old Republic II -- The Sith Lords
  K2,
}

/// Описание возможностей формата в конкретной игре
#[derive(Debug, PartialEq, Eq)]
pub struct Profile {
  /// Допустимые версии файла
  pub versions: &'static [Version],
  /// Допустимые типы полей
  pub types: &'static [FieldType],
}

/// Типы полей, существовавшие в формате изначально
const AURORA_TYPES: [FieldType; 16] = {
  use crate::raw::FieldType::*;
  [
    UInt8, Int8, UInt16, Int16, UInt32, Int32, UInt64, Int64,
    Single, Double, String, ResRef, LocString, Binary, Struct, List,
  ]
};
/// Типы полей Aurora, дополненные векторами ориентации и позиции
const ODYSSEY_TYPES: [FieldType; 18] = {
  use crate::raw::FieldType::*;
  [
    UInt8, Int8, UInt16, Int16, UInt32, Int32, UInt64, Int64,
    Single, Double, String, ResRef, LocString, Binary, Struct, List,
    Vector4, Vector3,
  ]
};

static NWN: Profile = Profile {
  versions: &[Version::V3_2],
  types: &AURORA_TYPES,
};
static K1: Profile = Profile {
  versions: &[Version::V3_2, Version::V3_3],
  types: &ODYSSEY_TYPES,
};
static K2: Profile = Profile {
  versions: &[Version::V3_2, Version::V3_3, Version::V4_0, Version::V4_1],
  types: &ODYSSEY_TYPES,
};

/// Профиль, принимающий все версии и все типы полей, известные библиотеке
pub static ANY: Profile = Profile {
  versions: &[Version::V3_2, Version::V3_3, Version::V4_0, Version::V4_1],
  types: &ODYSSEY_TYPES,
};

impl Game {
  /// Возвращает описание возможностей формата в данной игре
  #[inline]
  pub fn profile(self) -> &'static Profile {
    match self {
      Game::Nwn => &NWN,
      Game::K1  => &K1,
      Game::K2  => &K2,
    }
  }
}

impl fmt::Display for Game {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    f.write_str(match self {
      Game::Nwn => "NWN",
      Game::K1  => "K1",
      Game::K2  => "K2",
    })
  }
}

impl Profile {
  /// Проверяет, допускает ли профиль указанную версию файла
  #[inline]
  pub fn supports_version(&self, version: Version) -> bool {
    self.versions.contains(&version)
  }
  /// Проверяет, допускает ли профиль поля указанного типа
  #[inline]
  pub fn supports_type(&self, ty: FieldType) -> bool {
    self.types.contains(&ty)
  }
}
