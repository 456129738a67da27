use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard, RwLock};
use tracing::{info, warn};

use crate::common::{PageId, Result, StorageConfig, StrataError};
use crate::concurrency::{LockTarget, TableLock};
use crate::execution::{passes, Comparer, JointRow, Logic, MetaInfo};
use crate::storage::disk::{codec, DiskManager, DiskScheduler};
use crate::storage::PageStore;
use crate::tuple::{Entry, Row, Schema};

use super::{KeyCursor, TableIter};

/// Storage counters of one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageStats {
    /// Pages allocated so far
    pub pages: u32,
    pub resident_pages: usize,
    /// Row bytes held by resident pages
    pub resident_bytes: usize,
    pub pinned_pages: usize,
    pub resurrections: u64,
    pub rows: usize,
}

/// A table: schema, paged row storage and transactional lock state.
///
/// The `RwLock` around the page store guards its structure for the duration
/// of a single call. The `TableLock` is the transactional S/X lock and is
/// only changed through the `LockManager`.
pub struct Table {
    database: String,
    name: String,
    schema: Arc<Schema>,
    store: RwLock<PageStore>,
    lock: Mutex<TableLock>,
    disk_scheduler: Arc<DiskScheduler>,
}

impl Table {
    /// Creates an empty table.
    pub fn new(
        database: &str,
        name: &str,
        schema: Schema,
        config: &StorageConfig,
        disk_scheduler: Arc<DiskScheduler>,
    ) -> Self {
        let store = PageStore::new(database, name, config, Arc::clone(&disk_scheduler));
        Self {
            database: database.to_string(),
            name: name.to_string(),
            schema: Arc::new(schema),
            store: RwLock::new(store),
            lock: Mutex::new(TableLock::new()),
            disk_scheduler,
        }
    }

    /// Creates a table and loads its persisted page files.
    pub fn open(
        database: &str,
        name: &str,
        schema: Schema,
        config: &StorageConfig,
        disk_scheduler: Arc<DiskScheduler>,
    ) -> Result<Self> {
        let table = Self::new(database, name, schema, config, disk_scheduler);
        table.recover()?;
        Ok(table)
    }

    /// Bulk-loads page files in page id order. Missing ids become empty
    /// pages so that ids keep matching file names.
    fn recover(&self) -> Result<()> {
        let primary_index = self.primary_index();
        let page_ids = self
            .disk_scheduler
            .disk_manager()
            .list_table_pages(&self.database, &self.name)?;

        let mut store = self.store.write();
        let mut expected = PageId::new(1);
        for page_id in page_ids {
            while expected < page_id {
                warn!(table = %self.name, page = expected.as_u32(), "page file missing");
                store.insert_page(Vec::new(), primary_index)?;
                expected = expected.next();
            }

            let file_name = DiskManager::page_file_name(&self.database, &self.name, page_id);
            let data = self.disk_scheduler.schedule_read_sync(&file_name)?;
            store.insert_page(codec::decode_rows(&data)?, primary_index)?;
            expected = expected.next();
        }

        info!(
            table = %self.name,
            pages = store.page_count(),
            rows = store.len(),
            "recovered table"
        );
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Returns `database.table`.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.database, self.name)
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn primary_index(&self) -> usize {
        self.schema.primary_index()
    }

    pub fn primary_name(&self) -> &str {
        self.schema.primary_column().name()
    }

    /// Query metadata for this table.
    pub fn meta(&self) -> MetaInfo {
        MetaInfo::new(self.name.clone(), Arc::clone(&self.schema))
    }

    /// Inserts a row given in schema order. Entries are converted to the
    /// column types and checked against column constraints.
    pub fn insert(&self, entries: Vec<Entry>, transactional: bool) -> Result<()> {
        let columns = self.schema.columns();
        if entries.len() != columns.len() {
            return Err(StrataError::LengthNotMatch {
                expected: columns.len(),
                actual: entries.len(),
            });
        }

        let validated = columns
            .iter()
            .zip(&entries)
            .map(|(column, entry)| column.validate(entry))
            .collect::<Result<Vec<_>>>()?;
        self.store
            .write()
            .insert_row(validated, self.primary_index(), transactional)
    }

    /// Inserts a row from literals, optionally naming the target columns.
    /// Unnamed columns are null.
    pub fn insert_values(
        &self,
        column_names: Option<&[&str]>,
        values: &[&str],
        transactional: bool,
    ) -> Result<()> {
        let columns = self.schema.columns();
        let entries = match column_names {
            None => {
                if values.len() != columns.len() {
                    return Err(StrataError::LengthNotMatch {
                        expected: columns.len(),
                        actual: values.len(),
                    });
                }
                columns
                    .iter()
                    .zip(values)
                    .map(|(column, value)| Entry::parse(value, column.column_type()))
                    .collect::<Result<Vec<_>>>()?
            }
            Some(names) => {
                if names.len() != values.len() {
                    return Err(StrataError::LengthNotMatch {
                        expected: names.len(),
                        actual: values.len(),
                    });
                }
                let mut entries = vec![Entry::Null; columns.len()];
                let mut seen = HashSet::new();
                for (name, value) in names.iter().zip(values) {
                    if !seen.insert(*name) {
                        return Err(StrataError::DuplicateColumn(name.to_string()));
                    }
                    let index = self.schema.column_index(name).ok_or_else(|| {
                        StrataError::SchemaNotMatch(format!(
                            "table {} has no column {}",
                            self.name, name
                        ))
                    })?;
                    entries[index] = Entry::parse(value, columns[index].column_type())?;
                }
                entries
            }
        };
        self.insert(entries, transactional)
    }

    /// Returns the row with primary key `key`.
    pub fn get(&self, key: &Entry) -> Result<Row> {
        self.store.write().get_row(key, self.primary_index())
    }

    pub fn contains(&self, key: &Entry) -> Result<bool> {
        match self.get(key) {
            Ok(_) => Ok(true),
            Err(StrataError::KeyNotExist(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Deletes the row with primary key `key`.
    pub fn delete(&self, key: &Entry, transactional: bool) -> Result<()> {
        self.store
            .write()
            .delete_row(key, self.primary_index(), transactional)
    }

    /// Updates named columns of the row with primary key `key`.
    pub fn update(
        &self,
        key: &Entry,
        assignments: &[(&str, Entry)],
        transactional: bool,
    ) -> Result<()> {
        let mut targets = Vec::with_capacity(assignments.len());
        let mut values = Vec::with_capacity(assignments.len());
        for (name, value) in assignments {
            let index = self
                .schema
                .column_index(name)
                .ok_or_else(|| StrataError::AttributeNotFound(name.to_string()))?;
            targets.push(index);
            values.push(self.schema.columns()[index].validate(value)?);
        }
        self.store.write().update_row(
            key,
            self.primary_index(),
            &targets,
            &values,
            transactional,
        )
    }

    /// Deletes every row for which `logic` is true (all rows when absent).
    /// Returns the number of rows deleted.
    pub fn delete_where(self: &Arc<Self>, logic: Option<&Logic>, transactional: bool) -> Result<usize> {
        let keys = self.matching_keys(logic)?;
        for key in &keys {
            self.delete(key, transactional)?;
        }
        Ok(keys.len())
    }

    /// Sets `column` to `value` in every row for which `logic` is true.
    /// Returns the number of rows updated.
    pub fn update_where(
        self: &Arc<Self>,
        column: &str,
        value: &Comparer,
        logic: Option<&Logic>,
        transactional: bool,
    ) -> Result<usize> {
        let index = self
            .schema
            .column_index(column)
            .ok_or_else(|| StrataError::AttributeNotFound(column.to_string()))?;
        let target = &self.schema.columns()[index];
        let entry = target.validate(&value.to_entry(target.column_type())?)?;

        let keys = self.matching_keys(logic)?;
        let mut store = self.store.write();
        for key in &keys {
            store.update_row(
                key,
                self.primary_index(),
                &[index],
                std::slice::from_ref(&entry),
                transactional,
            )?;
        }
        Ok(keys.len())
    }

    /// Primary keys of the rows `logic` selects, collected before any
    /// change is made.
    fn matching_keys(self: &Arc<Self>, logic: Option<&Logic>) -> Result<Vec<Entry>> {
        let Some(logic) = logic else {
            return self.keys();
        };

        let metas: Arc<[MetaInfo]> = vec![self.meta()].into();
        let mut keys = Vec::new();
        for row in self.iter() {
            let row = row?;
            let key = row.entries()[self.primary_index()].clone();
            if passes(Some(logic), &JointRow::single(row, Arc::clone(&metas)))? {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    /// Lazily iterates rows in primary key order.
    pub fn iter(self: &Arc<Self>) -> TableIter {
        TableIter::new(Arc::clone(self))
    }

    /// Lazily iterates primary keys in ascending order.
    pub fn key_cursor(self: &Arc<Self>) -> KeyCursor {
        KeyCursor::new(Arc::clone(self))
    }

    /// Returns the smallest key greater than `after` (or the first key).
    pub fn next_key(&self, after: Option<&Entry>) -> Result<Option<Entry>> {
        self.store.read().next_key(after)
    }

    /// Snapshot of all primary keys in ascending order.
    pub fn keys(&self) -> Result<Vec<Entry>> {
        self.store.read().keys()
    }

    /// Writes every resident page to disk.
    pub fn persist(&self) -> Result<usize> {
        self.store.write().persist()
    }

    /// Clears the pins set by transactional writes.
    pub fn unpin(&self) {
        self.store.write().unpin();
    }

    /// Releases the table's memory and deletes its page files.
    pub fn drop_self(&self) -> Result<()> {
        self.store.write().drop_self();

        let page_ids = self
            .disk_scheduler
            .disk_manager()
            .list_table_pages(&self.database, &self.name)?;
        for page_id in &page_ids {
            let file_name = DiskManager::page_file_name(&self.database, &self.name, *page_id);
            self.disk_scheduler.schedule_remove_sync(&file_name)?;
        }
        info!(table = %self.name, files = page_ids.len(), "dropped table");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.store.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> StorageStats {
        let store = self.store.read();
        StorageStats {
            pages: store.page_count(),
            resident_pages: store.resident_page_count(),
            resident_bytes: store.resident_bytes(),
            pinned_pages: store.pinned_page_count(),
            resurrections: store.resurrection_count(),
            rows: store.len(),
        }
    }
}

impl LockTarget for Table {
    fn lock_name(&self) -> String {
        self.qualified_name()
    }

    fn lock_state(&self) -> MutexGuard<'_, TableLock> {
        self.lock.lock()
    }

    fn on_release(&self) {
        self.unpin();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::{CompareOp, Condition};
    use crate::tuple::{ColumnType, SchemaBuilder};
    use tempfile::TempDir;

    fn table(dir: &TempDir) -> Arc<Table> {
        let dm = Arc::new(DiskManager::new(dir.path()).unwrap());
        let scheduler = Arc::new(DiskScheduler::new(dm));
        let schema = SchemaBuilder::new()
            .primary("id", ColumnType::Int)
            .string("name", 8)
            .build()
            .unwrap();
        let config = StorageConfig::new(dir.path());
        Arc::new(Table::new("db", "person", schema, &config, scheduler))
    }

    fn id_gt(value: i32) -> Logic {
        Logic::condition(Condition::new(
            Comparer::column("id"),
            CompareOp::Gt,
            value.into(),
        ))
    }

    #[test]
    fn test_table_insert_values_and_delete_where() {
        let dir = TempDir::new().unwrap();
        let table = table(&dir);
        table.insert_values(None, &["0", "'hi'"], false).unwrap();
        table.insert_values(None, &["1", "'hello'"], false).unwrap();
        table.insert_values(None, &["2", "'hello'"], false).unwrap();

        assert_eq!(table.delete_where(Some(&id_gt(1)), false).unwrap(), 1);

        let rows: Vec<Row> = table.iter().collect::<Result<_>>().unwrap();
        assert_eq!(
            rows,
            vec![
                Row::new(vec![Entry::Int(0), Entry::from("hi")]),
                Row::new(vec![Entry::Int(1), Entry::from("hello")]),
            ]
        );
    }

    #[test]
    fn test_table_insert_validation() {
        let dir = TempDir::new().unwrap();
        let table = table(&dir);

        assert!(matches!(
            table.insert(vec![Entry::Int(1)], false),
            Err(StrataError::LengthNotMatch { expected: 2, actual: 1 })
        ));
        assert!(matches!(
            table.insert_values(Some(&["id", "id"][..]), &["1", "2"], false),
            Err(StrataError::DuplicateColumn(_))
        ));
        assert!(matches!(
            table.insert_values(Some(&["id", "age"][..]), &["1", "2"], false),
            Err(StrataError::SchemaNotMatch(_))
        ));
        assert!(matches!(
            table.insert_values(Some(&["name"][..]), &["'x'"], false),
            Err(StrataError::NullValue(_))
        ));
        assert!(matches!(
            table.insert_values(None, &["1", "'much too long'"], false),
            Err(StrataError::ValueLengthExceed(_))
        ));
        assert!(table.is_empty());

        table.insert_values(Some(&["id"][..]), &["7"], false).unwrap();
        assert!(table.get(&Entry::Int(7)).unwrap().entries()[1].is_null());
    }

    #[test]
    fn test_table_update_where() {
        let dir = TempDir::new().unwrap();
        let table = table(&dir);
        for id in 0..4 {
            table.insert(vec![Entry::Int(id), Entry::from("a")], false).unwrap();
        }

        let updated = table
            .update_where("name", &Comparer::from("b"), Some(&id_gt(1)), false)
            .unwrap();
        assert_eq!(updated, 2);
        assert_eq!(table.get(&Entry::Int(3)).unwrap().entries()[1], Entry::from("b"));
        assert_eq!(table.get(&Entry::Int(1)).unwrap().entries()[1], Entry::from("a"));

        assert!(matches!(
            table.update_where("name", &Comparer::from(5), None, false),
            Err(StrataError::TypeMismatch { .. })
        ));
        assert!(matches!(
            table.update_where("age", &Comparer::from(5), None, false),
            Err(StrataError::AttributeNotFound(_))
        ));
    }

    #[test]
    fn test_table_update_primary_key() {
        let dir = TempDir::new().unwrap();
        let table = table(&dir);
        table.insert(vec![Entry::Int(1), Entry::from("a")], false).unwrap();

        table.update(&Entry::Int(1), &[("id", Entry::Int(9))], false).unwrap();
        assert!(!table.contains(&Entry::Int(1)).unwrap());
        assert!(table.contains(&Entry::Int(9)).unwrap());
    }

    #[test]
    fn test_table_persist_open_and_drop() {
        let dir = TempDir::new().unwrap();
        let dm = Arc::new(DiskManager::new(dir.path()).unwrap());
        let scheduler = Arc::new(DiskScheduler::new(Arc::clone(&dm)));
        let schema = || {
            SchemaBuilder::new()
                .primary("id", ColumnType::Long)
                .column("score", ColumnType::Double)
                .build()
                .unwrap()
        };
        let config = StorageConfig::new(dir.path()).with_page_byte_budget(16);

        let table = Table::new("db", "scores", schema(), &config, Arc::clone(&scheduler));
        for id in 0..5i64 {
            table.insert(vec![Entry::Long(id), Entry::Double(0.5)], false).unwrap();
        }
        assert!(table.persist().unwrap() > 1);

        let reopened = Table::open("db", "scores", schema(), &config, Arc::clone(&scheduler)).unwrap();
        assert_eq!(reopened.len(), 5);
        assert_eq!(reopened.stats().pages, table.stats().pages);
        assert_eq!(
            reopened.get(&Entry::Long(4)).unwrap().entries(),
            &[Entry::Long(4), Entry::Double(0.5)]
        );

        reopened.drop_self().unwrap();
        assert!(dm.list_table_pages("db", "scores").unwrap().is_empty());
        assert!(matches!(
            reopened.get(&Entry::Long(4)),
            Err(StrataError::TableDropped(_))
        ));
    }
}
