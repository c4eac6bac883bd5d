//! Настройки чтения и записи GFF файлов

use std::fmt;
use encoding::{DecoderTrap, EncoderTrap, EncodingRef};
use encoding::all::UTF_8;
use indexmap::IndexSet;

use crate::game::{self, Game, Profile};
use crate::sig::Signature;

/// Настройки, определяющие, какие файлы считаются корректными при чтении и как
/// кодируются строки при чтении и записи.
///
/// Настройки по умолчанию принимают все известные библиотеке сигнатуры, версии и типы
/// полей, и используют кодировку `UTF-8` с генерацией ошибки при невозможности
/// декодировать или закодировать строку.
///
/// # Пример
/// ```rust
/// use encoding::{DecoderTrap, EncoderTrap};
/// use encoding::all::WINDOWS_1252;
/// use gff_tree::{Config, Game, Signature};
///
/// let config = Config::for_game(Game::K1)
///   .register(Signature::Other(*b"XYZ "))
///   .with_encoding(WINDOWS_1252, DecoderTrap::Replace, EncoderTrap::Replace);
/// assert!(config.accepts_signature(Signature::Other(*b"XYZ ")));
/// ```
#[derive(Clone)]
pub struct Config {
  /// Набор допустимых версий и типов полей
  profile: &'static Profile,
  /// Игра, для которой созданы настройки, если она указана
  game: Option<Game>,
  /// Сигнатуры файлов, которые разрешено читать и записывать
  signatures: IndexSet<Signature>,
  /// Кодировка, используемая для декодирования и кодирования строк
  encoding: EncodingRef,
  /// Способ обработки ошибок декодирования строк
  decoder_trap: DecoderTrap,
  /// Способ обработки ошибок кодирования строк
  encoder_trap: EncoderTrap,
}

impl Config {
  /// Создает настройки, ограничивающие версии файлов и типы полей набором, допустимым
  /// в указанной игре
  pub fn for_game(game: Game) -> Self {
    Config { profile: game.profile(), game: Some(game), ..Self::default() }
  }
  /// Добавляет сигнатуру в список допустимых. Нужно для чтения и записи файлов, вид которых
  /// библиотеке неизвестен
  pub fn register(mut self, signature: Signature) -> Self {
    self.signatures.insert(signature);
    self
  }
  /// Устанавливает кодировку строк и способы обработки ошибок их декодирования и кодирования
  ///
  /// # Параметры
  /// - `encoding`: Кодировка для декодирования и кодирования символов в строках
  /// - `decoder_trap`: Способ обработки символов в строках, которые не удалось декодировать с
  ///   использованием выбранной кодировки
  /// - `encoder_trap`: Способ обработки символов в строках, которые не удалось закодировать с
  ///   использованием выбранной кодировки
  pub fn with_encoding(mut self, encoding: EncodingRef, decoder_trap: DecoderTrap, encoder_trap: EncoderTrap) -> Self {
    self.encoding = encoding;
    self.decoder_trap = decoder_trap;
    self.encoder_trap = encoder_trap;
    self
  }

  /// Проверяет, разрешено ли читать и записывать файлы с указанной сигнатурой
  #[inline]
  pub fn accepts_signature(&self, signature: Signature) -> bool {
    self.signatures.contains(&signature)
  }
  /// Возвращает набор допустимых версий и типов полей
  #[inline]
  pub fn profile(&self) -> &'static Profile { self.profile }
  /// Возвращает игру, для которой созданы настройки
  #[inline]
  pub fn game(&self) -> Option<Game> { self.game }

  /// Декодирует байты строки в соответствии с выбранной кодировкой
  #[inline]
  pub(crate) fn decode_str(&self, bytes: &[u8]) -> crate::error::Result<String> {
    Ok(self.encoding.decode(bytes, self.decoder_trap)?)
  }
  /// Кодирует строку в байты в соответствии с выбранной кодировкой
  #[inline]
  pub(crate) fn encode_str(&self, string: &str) -> crate::error::Result<Vec<u8>> {
    Ok(self.encoding.encode(string, self.encoder_trap)?)
  }
}

impl Default for Config {
  fn default() -> Self {
    Config {
      profile: &game::ANY,
      game: None,
      signatures: Signature::KNOWN.iter().cloned().collect(),
      encoding: UTF_8,
      decoder_trap: DecoderTrap::Strict,
      encoder_trap: EncoderTrap::Strict,
    }
  }
}

impl fmt::Debug for Config {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    f.debug_struct("Config")
      .field("profile",    self.profile)
      .field("game",       &self.game)
      .field("signatures", &self.signatures)
      .field("encoding",   &self.encoding.name())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::Config;
  use crate::game::Game;
  use crate::raw::FieldType;
  use crate::sig::Signature;
  use crate::ver::Version;

  #[test]
  fn default_accepts_only_known_signatures() {
    let config = Config::default();
    assert!(config.accepts_signature(Signature::UTT));
    assert!(!config.accepts_signature(Signature::Other(*b"ZZZ ")));
    assert!(config.register(Signature::Other(*b"ZZZ ")).accepts_signature(Signature::Other(*b"ZZZ ")));
  }

  #[test]
  fn game_restricts_profile() {
    let config = Config::for_game(Game::Nwn);
    assert_eq!(config.game(), Some(Game::Nwn));
    assert!(!config.profile().supports_type(FieldType::Vector4));
    assert!(!config.profile().supports_version(Version::V4_0));
    assert!(config.accepts_signature(Signature::ARE));
  }

  #[test]
  fn strings_use_selected_encoding() {
    let config = Config::default();
    assert_eq!(config.encode_str("héllo").unwrap(), "héllo".as_bytes());
    assert!(config.decode_str(&[0xFF, 0xFE]).is_err());
  }
}
