use std::sync::Arc;

use crate::common::Result;
use crate::tuple::{ColumnType, Entry, Row};

use super::{resolve_column, MetaInfo};

/// Rows of one or more tables concatenated in table order, carrying the
/// tables' schemas for column name resolution.
#[derive(Debug, Clone)]
pub struct JointRow {
    entries: Vec<Entry>,
    metas: Arc<[MetaInfo]>,
}

impl JointRow {
    /// Wraps a single table's row.
    pub fn single(row: Row, metas: Arc<[MetaInfo]>) -> Self {
        Self {
            entries: row.into_entries(),
            metas,
        }
    }

    /// Concatenates one row per table.
    pub fn from_rows(rows: &[Row], metas: Arc<[MetaInfo]>) -> Self {
        let entries = rows
            .iter()
            .flat_map(|row| row.entries().iter().cloned())
            .collect();
        Self { entries, metas }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }

    pub fn metas(&self) -> &[MetaInfo] {
        &self.metas
    }

    /// Looks up a column by bare or qualified name.
    pub fn resolve(&self, name: &str) -> Result<(&Entry, ColumnType)> {
        let column = resolve_column(&self.metas, name)?;
        Ok((&self.entries[column.offset], column.column_type))
    }
}
