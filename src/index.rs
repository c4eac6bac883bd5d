//! Содержит описание структур-индексов различных данных в GFF файле

use crate::error::{Error, Result};

/// Типаж, реализуемый специальными структурами, хранящими индексы на записи в GFF-файле,
/// позволяющий проверить, что индекс указывает внутрь таблицы, к которой он относится.
pub trait Index: Copy {
  /// Название таблицы, на записи которой ссылается индекс. Используется в сообщениях об ошибках
  const TABLE: &'static str;

  /// Возвращает номер записи (или смещение в байтах, для таблиц с записями переменной длины)
  fn value(&self) -> u32;

  /// Проверяет, что запись, начинающаяся по индексу и занимающая `size` элементов таблицы,
  /// не выходит за ее границы, и возвращает номер первого элемента.
  ///
  /// # Параметры
  /// - `size`: количество элементов, которое займет читаемая запись
  /// - `len`: количество элементов в таблице
  #[inline]
  fn check(&self, size: usize, len: usize) -> Result<usize> {
    let start = self.value() as usize;
    match start.checked_add(size) {
      Some(end) if end <= len => Ok(start),
      _ => Err(Error::CorruptTable { table: Self::TABLE, index: start as u64, len: len as u64 }),
    }
  }
}

/// Макрос для объявления типизированной обертки над числом, представляющем индекс одной из
/// структур данных в файле.
///
/// # Параметры
/// - `$name`: Имя генерируемой структуры. Структура реализует типаж `From` для
///   конструирования из `u32`
/// - `$table`: Название таблицы, на записи которой ссылается индекс
macro_rules! index {
  ($(#[$attrs:meta])* $name:ident, $table:expr) => (
    $(#[$attrs])*
    #[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
    pub struct $name(pub(crate) u32);

    impl Index for $name {
      const TABLE: &'static str = $table;

      #[inline]
      fn value(&self) -> u32 { self.0 }
    }
    impl From<u32> for $name {
      fn from(value: u32) -> Self { $name(value) }
    }
  );
}

index!(
  /// Номер структуры в файле
  StructIndex, "structs"
);
index!(
  /// Номер поля в массиве полей GFF файла. Каждая структура в файле состоит из набора полей,
  /// на которые ссылается по этим индексам.
  FieldIndex, "fields"
);
index!(
  /// Номер метки для поля в общем массиве меток, хранящихся в GFF файле
  LabelIndex, "labels"
);
index!(
  /// Смещение в байтах в таблице индексов полей. Используется для указания на поля структуры,
  /// когда структура содержит несколько полей.
  FieldIndicesIndex, "field indices"
);
index!(
  /// Смещение в байтах в таблице индексов списков. По смещению хранится количество элементов
  /// списка, за которым следуют номера структур-элементов.
  ListIndicesIndex, "list indices"
);
index!(
  /// Смещение в байтах в области данных полей, по которому расположены данные комплексного поля
  DataIndex, "field data"
);
