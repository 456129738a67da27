use std::sync::Arc;

use crate::common::{Result, StrataError};
use crate::tuple::{Entry, Row};

use super::Table;

/// Walks a table's primary keys in ascending order, one lookup per step.
///
/// Keys inserted or removed while walking are seen or skipped according to
/// their position relative to the last key returned.
pub struct KeyCursor {
    table: Arc<Table>,
    last: Option<Entry>,
    done: bool,
}

impl KeyCursor {
    pub fn new(table: Arc<Table>) -> Self {
        Self {
            table,
            last: None,
            done: false,
        }
    }

    pub fn next_key(&mut self) -> Result<Option<Entry>> {
        if self.done {
            return Ok(None);
        }
        match self.table.next_key(self.last.as_ref())? {
            Some(key) => {
                self.last = Some(key.clone());
                Ok(Some(key))
            }
            None => {
                self.done = true;
                Ok(None)
            }
        }
    }

    pub fn table(&self) -> &Arc<Table> {
        &self.table
    }
}

/// Lazily yields a table's rows in primary key order.
pub struct TableIter {
    keys: KeyCursor,
}

impl TableIter {
    pub fn new(table: Arc<Table>) -> Self {
        Self {
            keys: KeyCursor::new(table),
        }
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        while let Some(key) = self.keys.next_key()? {
            match self.keys.table().get(&key) {
                Ok(row) => return Ok(Some(row)),
                // deleted between the key step and the lookup
                Err(StrataError::KeyNotExist(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }
}

impl Iterator for TableIter {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::StorageConfig;
    use crate::storage::disk::{DiskManager, DiskScheduler};
    use crate::tuple::{ColumnType, SchemaBuilder};
    use tempfile::TempDir;

    fn table(dir: &TempDir) -> Arc<Table> {
        let dm = Arc::new(DiskManager::new(dir.path()).unwrap());
        let scheduler = Arc::new(DiskScheduler::new(dm));
        let schema = SchemaBuilder::new()
            .primary("id", ColumnType::Int)
            .build()
            .unwrap();
        // one row per page, two resident pages
        let config = StorageConfig::new(dir.path())
            .with_page_byte_budget(1)
            .with_max_resident_pages(2);
        Arc::new(Table::new("db", "t", schema, &config, scheduler))
    }

    #[test]
    fn test_table_iter_orders_by_key() {
        let dir = TempDir::new().unwrap();
        let table = table(&dir);
        for id in [5, 1, 4, 2, 3] {
            table.insert(vec![Entry::Int(id)], false).unwrap();
        }

        let ids: Vec<Entry> = table
            .iter()
            .map(|row| row.unwrap().entries()[0].clone())
            .collect();
        assert_eq!(ids, (1..=5).map(Entry::Int).collect::<Vec<_>>());
        assert!(table.stats().resurrections > 0);
    }

    #[test]
    fn test_table_iter_sees_concurrent_changes() {
        let dir = TempDir::new().unwrap();
        let table = table(&dir);
        for id in [1, 2, 3] {
            table.insert(vec![Entry::Int(id)], false).unwrap();
        }

        let mut iter = table.iter();
        assert_eq!(iter.next().unwrap().unwrap().entries()[0], Entry::Int(1));

        table.delete(&Entry::Int(2), false).unwrap();
        table.insert(vec![Entry::Int(9)], false).unwrap();
        table.insert(vec![Entry::Int(0)], false).unwrap();

        let rest: Vec<Entry> = iter.map(|row| row.unwrap().entries()[0].clone()).collect();
        assert_eq!(rest, vec![Entry::Int(3), Entry::Int(9)]);
    }

    #[test]
    fn test_key_cursor_exhausts() {
        let dir = TempDir::new().unwrap();
        let table = table(&dir);
        let mut cursor = table.key_cursor();
        assert_eq!(cursor.next_key().unwrap(), None);

        table.insert(vec![Entry::Int(1)], false).unwrap();
        assert_eq!(cursor.next_key().unwrap(), None);
    }
}
