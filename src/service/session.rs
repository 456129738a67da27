use std::sync::Arc;

use tracing::debug;

use crate::catalog::{Context, Database, Table};
use crate::common::{Result, SessionId};
use crate::execution::{ColumnSelector, Comparer, Logic, QueryTable};
use crate::tuple::{Row, Schema};

/// Projected rows of a `select`, fully materialized.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

/// A client connection bound to one database.
///
/// Outside a transaction every statement locks and unlocks on its own.
/// After `begin`, exclusive locks taken by writes are held until `commit`
/// and the pages those writes touch stay pinned. Reads release their shared
/// locks as soon as the statement's rows are collected.
pub struct Session {
    context: Arc<Context>,
    id: SessionId,
    database: Arc<Database>,
    in_transaction: bool,
}

impl Session {
    /// Opens a session on an existing database.
    pub fn connect(context: Arc<Context>, database: &str) -> Result<Self> {
        let database = context.database(database)?;
        let id = context.next_session_id();
        debug!(session = id.as_u64(), database = %database.name(), "connected");
        Ok(Self {
            context,
            id,
            database,
            in_transaction: false,
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.database
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    pub fn begin(&mut self) {
        self.in_transaction = true;
    }

    /// Ends the transaction, releasing every lock the session holds.
    pub fn commit(&mut self) {
        self.context.lock_manager().release_all(self.id);
        self.in_transaction = false;
    }

    pub fn create_table(&self, name: &str, schema: Schema) -> Result<Arc<Table>> {
        self.database.create_table(name, schema)
    }

    pub fn drop_table(&self, name: &str) -> Result<()> {
        let table = self.database.get(name)?;
        let locks = self.context.lock_manager();
        locks.acquire_exclusive(self.id, &table);
        let result = self.database.drop_table(name);
        locks.release_exclusive(self.id, &table);
        result
    }

    /// Inserts rows of literals. `columns` names the target columns, or all
    /// columns in schema order when absent. Returns the number of rows.
    pub fn insert(&self, table: &str, columns: Option<&[&str]>, rows: &[&[&str]]) -> Result<usize> {
        self.write(table, |table, transactional| {
            for values in rows {
                table.insert_values(columns, values, transactional)?;
            }
            Ok(rows.len())
        })
    }

    /// Deletes the rows matching `filter`. Returns the number deleted.
    pub fn delete(&self, table: &str, filter: Option<&Logic>) -> Result<usize> {
        self.write(table, |table, transactional| {
            table.delete_where(filter, transactional)
        })
    }

    /// Sets `column` to `value` in the rows matching `filter`.
    pub fn update(
        &self,
        table: &str,
        column: &str,
        value: &Comparer,
        filter: Option<&Logic>,
    ) -> Result<usize> {
        self.write(table, |table, transactional| {
            table.update_where(column, value, filter, transactional)
        })
    }

    /// Runs a query over one table, or a join of several, and collects the
    /// projected rows.
    pub fn select(
        &self,
        tables: &[&str],
        join: Option<Logic>,
        selectors: &[ColumnSelector],
        filter: Option<Logic>,
    ) -> Result<QueryOutput> {
        let locked = tables
            .iter()
            .map(|name| self.database.get(name))
            .collect::<Result<Vec<_>>>()?;

        let locks = self.context.lock_manager();
        for table in &locked {
            locks.acquire_shared(self.id, table);
        }
        let output = self.collect(tables, join, selectors, filter);
        for table in &locked {
            locks.release_shared(self.id, table);
        }
        output
    }

    /// Ends the session, releasing any locks still held.
    pub fn disconnect(self) {}

    fn collect(
        &self,
        tables: &[&str],
        join: Option<Logic>,
        selectors: &[ColumnSelector],
        filter: Option<Logic>,
    ) -> Result<QueryOutput> {
        let query: Box<dyn QueryTable> = match tables {
            [] => {
                return Ok(QueryOutput {
                    columns: Vec::new(),
                    rows: Vec::new(),
                })
            }
            [table] => Box::new(self.database.build_single_query(table)?),
            _ => Box::new(self.database.build_joint_query(tables, join)?),
        };
        let result = self.database.select(selectors, query, filter)?;
        let columns = result.column_names().to_vec();
        let rows = result.collect::<Result<Vec<_>>>()?;
        Ok(QueryOutput { columns, rows })
    }

    fn write<R>(&self, table: &str, op: impl FnOnce(&Arc<Table>, bool) -> Result<R>) -> Result<R> {
        let table = self.database.get(table)?;
        let locks = self.context.lock_manager();
        locks.acquire_exclusive(self.id, &table);
        let result = op(&table, self.in_transaction);
        if !self.in_transaction {
            locks.release_exclusive(self.id, &table);
        }
        result
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.context.lock_manager().release_all(self.id);
        debug!(session = self.id.as_u64(), "disconnected");
    }
}
