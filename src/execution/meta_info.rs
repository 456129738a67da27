use std::sync::Arc;

use crate::common::{Result, StrataError};
use crate::tuple::{ColumnType, Schema};

/// Name and schema of one table taking part in a query.
#[derive(Debug, Clone)]
pub struct MetaInfo {
    table_name: String,
    schema: Arc<Schema>,
}

impl MetaInfo {
    pub fn new(table_name: impl Into<String>, schema: Arc<Schema>) -> Self {
        Self {
            table_name: table_name.into(),
            schema,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn column_count(&self) -> usize {
        self.schema.column_count()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.schema.column_index(name)
    }

    pub fn column_name(&self, index: usize) -> Option<&str> {
        self.schema.column(index).map(|c| c.name())
    }

    /// Returns `table.column` for the column at `index`.
    pub fn full_name(&self, index: usize) -> Option<String> {
        self.column_name(index)
            .map(|column| format!("{}.{}", self.table_name, column))
    }
}

/// A column resolved against a list of tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRef {
    /// Position of the table in the list
    pub table: usize,
    /// Column index within that table
    pub column: usize,
    /// Column index within the concatenated row
    pub offset: usize,
    pub column_type: ColumnType,
}

/// Resolves a bare (`col`) or qualified (`table.col`) column name.
///
/// Bare names must be unique across all tables. Names with more than one
/// dot are rejected with `AttributeInvalid`.
pub fn resolve_column(metas: &[MetaInfo], name: &str) -> Result<ColumnRef> {
    let parts: Vec<&str> = name.split('.').collect();
    match parts.as_slice() {
        [column] => {
            let mut found = None;
            let mut offset = 0;
            for (table, meta) in metas.iter().enumerate() {
                if let Some(index) = meta.column_index(column) {
                    if found.is_some() {
                        return Err(StrataError::AttributeCollision(name.to_string()));
                    }
                    found = Some(column_ref(meta, table, index, offset));
                }
                offset += meta.column_count();
            }
            found.ok_or_else(|| StrataError::AttributeNotFound(name.to_string()))
        }
        [table_name, column] => {
            let mut offset = 0;
            for (table, meta) in metas.iter().enumerate() {
                if meta.table_name() == *table_name {
                    let index = meta
                        .column_index(column)
                        .ok_or_else(|| StrataError::AttributeNotFound(name.to_string()))?;
                    return Ok(column_ref(meta, table, index, offset));
                }
                offset += meta.column_count();
            }
            Err(StrataError::AttributeNotFound(name.to_string()))
        }
        _ => Err(StrataError::AttributeInvalid(name.to_string())),
    }
}

fn column_ref(meta: &MetaInfo, table: usize, column: usize, offset: usize) -> ColumnRef {
    ColumnRef {
        table,
        column,
        offset: offset + column,
        column_type: meta.schema.columns()[column].column_type(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::SchemaBuilder;

    fn metas() -> Vec<MetaInfo> {
        let person = SchemaBuilder::new()
            .primary("id", ColumnType::Int)
            .column("name", ColumnType::String)
            .build_arc()
            .unwrap();
        let pet = SchemaBuilder::new()
            .primary("id", ColumnType::Int)
            .column("owner", ColumnType::Int)
            .build_arc()
            .unwrap();
        vec![MetaInfo::new("person", person), MetaInfo::new("pet", pet)]
    }

    #[test]
    fn test_resolve_column_offsets() {
        let metas = metas();
        let owner = resolve_column(&metas, "owner").unwrap();
        assert_eq!((owner.table, owner.column, owner.offset), (1, 1, 3));

        let name = resolve_column(&metas, "person.name").unwrap();
        assert_eq!(name.offset, 1);
        assert_eq!(name.column_type, ColumnType::String);
    }

    #[test]
    fn test_resolve_column_errors() {
        let metas = metas();
        assert!(matches!(
            resolve_column(&metas, "id"),
            Err(StrataError::AttributeCollision(_))
        ));
        assert!(matches!(
            resolve_column(&metas, "age"),
            Err(StrataError::AttributeNotFound(_))
        ));
        assert!(matches!(
            resolve_column(&metas, "toy.id"),
            Err(StrataError::AttributeNotFound(_))
        ));
        assert!(matches!(
            resolve_column(&metas, "db.pet.id"),
            Err(StrataError::AttributeInvalid(_))
        ));
        assert_eq!(metas[1].full_name(1).unwrap(), "pet.owner");
    }
}
