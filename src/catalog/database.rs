use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::common::{Result, StorageConfig, StrataError};
use crate::execution::{ColumnSelector, JointTable, Logic, QueryResult, QueryTable, SingleTable};
use crate::storage::disk::DiskScheduler;
use crate::tuple::Schema;

use super::Table;

/// A named set of tables sharing one data directory.
pub struct Database {
    name: String,
    config: StorageConfig,
    disk_scheduler: Arc<DiskScheduler>,
    tables: RwLock<HashMap<String, Arc<Table>>>,
}

impl Database {
    pub fn new(name: &str, config: StorageConfig, disk_scheduler: Arc<DiskScheduler>) -> Self {
        Self {
            name: name.to_string(),
            config,
            disk_scheduler,
            tables: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creates an empty table.
    pub fn create_table(&self, name: &str, schema: Schema) -> Result<Arc<Table>> {
        let mut tables = self.tables.write();
        if tables.contains_key(name) {
            return Err(StrataError::DuplicateTable(name.to_string()));
        }
        let table = Arc::new(Table::new(
            &self.name,
            name,
            schema,
            &self.config,
            Arc::clone(&self.disk_scheduler),
        ));
        tables.insert(name.to_string(), Arc::clone(&table));
        info!(database = %self.name, table = name, "created table");
        Ok(table)
    }

    /// Registers a table and loads its page files from the data directory.
    pub fn open_table(&self, name: &str, schema: Schema) -> Result<Arc<Table>> {
        let mut tables = self.tables.write();
        if tables.contains_key(name) {
            return Err(StrataError::DuplicateTable(name.to_string()));
        }
        let table = Arc::new(Table::open(
            &self.name,
            name,
            schema,
            &self.config,
            Arc::clone(&self.disk_scheduler),
        )?);
        tables.insert(name.to_string(), Arc::clone(&table));
        Ok(table)
    }

    pub fn get(&self, name: &str) -> Result<Arc<Table>> {
        self.tables
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| StrataError::TableNotExist(name.to_string()))
    }

    /// Removes a table and deletes its page files.
    pub fn drop_table(&self, name: &str) -> Result<()> {
        let table = self
            .tables
            .write()
            .remove(name)
            .ok_or_else(|| StrataError::TableNotExist(name.to_string()))?;
        table.drop_self()
    }

    /// Table names in ascending order.
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn build_single_query(&self, table: &str) -> Result<SingleTable> {
        Ok(SingleTable::new(self.get(table)?))
    }

    /// Joins `tables` in the given order under an optional join predicate.
    pub fn build_joint_query(&self, tables: &[&str], join: Option<Logic>) -> Result<JointTable> {
        let tables = tables
            .iter()
            .map(|name| self.get(name))
            .collect::<Result<Vec<_>>>()?;
        Ok(JointTable::new(tables, join))
    }

    /// Attaches `selection` to `query` and projects it onto `selectors`.
    pub fn select(
        &self,
        selectors: &[ColumnSelector],
        mut query: Box<dyn QueryTable>,
        selection: Option<Logic>,
    ) -> Result<QueryResult> {
        query.set_selection(selection);
        QueryResult::new(query, selectors)
    }

    /// Writes every table's resident pages to disk.
    pub fn persist(&self) -> Result<()> {
        for table in self.tables.read().values() {
            table.persist()?;
        }
        Ok(())
    }

    /// Drops every table.
    pub fn drop_self(&self) -> Result<()> {
        let tables: Vec<Arc<Table>> = self.tables.write().drain().map(|(_, t)| t).collect();
        for table in tables {
            table.drop_self()?;
        }
        Ok(())
    }
}
