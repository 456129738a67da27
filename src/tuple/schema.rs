use std::collections::HashMap;
use std::sync::Arc;

use crate::common::{Result, StrataError};

use super::{ColumnType, Entry};

/// Represents a single column in a table schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name
    name: String,

    /// Declared scalar type
    column_type: ColumnType,

    /// Whether this column is the table's primary key
    primary: bool,

    /// Whether NULL is rejected
    not_null: bool,

    /// Maximum string length, if bounded
    max_length: Option<usize>,
}

impl Column {
    /// Creates a nullable, non-primary column.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            primary: false,
            not_null: false,
            max_length: None,
        }
    }

    /// Marks the column as the primary key. Primary keys are never null.
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self.not_null = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Returns the column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the column type.
    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    pub fn is_not_null(&self) -> bool {
        self.not_null
    }

    pub fn get_max_length(&self) -> Option<usize> {
        self.max_length
    }

    /// Converts `entry` to this column's type and checks null and length
    /// constraints.
    pub fn validate(&self, entry: &Entry) -> Result<Entry> {
        if entry.is_null() {
            if self.not_null {
                return Err(StrataError::NullValue(self.name.clone()));
            }
            return Ok(Entry::Null);
        }

        let value = entry.coerce_to(self.column_type)?;
        if let (Some(max), Entry::String(s)) = (self.max_length, &value) {
            if s.chars().count() > max {
                return Err(StrataError::ValueLengthExceed(self.name.clone()));
            }
        }
        Ok(value)
    }
}

/// Ordered columns of a table with exactly one primary key.
#[derive(Debug, Clone)]
pub struct Schema {
    /// Ordered list of columns
    columns: Vec<Column>,

    /// Map from column name to column index for fast lookup
    name_to_index: HashMap<String, usize>,

    /// Index of the primary key column
    primary_index: usize,
}

impl Schema {
    /// Creates a schema from columns.
    ///
    /// Fails with `DuplicateColumn` on repeated names and with
    /// `PrimaryNotExist` unless exactly one column is primary.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let mut name_to_index = HashMap::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            if name_to_index.insert(column.name.clone(), i).is_some() {
                return Err(StrataError::DuplicateColumn(column.name.clone()));
            }
        }

        let primaries: Vec<usize> = columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.primary)
            .map(|(i, _)| i)
            .collect();
        let primary_index = match primaries.as_slice() {
            [index] => *index,
            [] => return Err(StrataError::PrimaryNotExist("no primary column".to_string())),
            many => {
                return Err(StrataError::PrimaryNotExist(format!(
                    "{} primary columns, expected one",
                    many.len()
                )))
            }
        };

        Ok(Self {
            columns,
            name_to_index,
            primary_index,
        })
    }

    /// Returns the columns in order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns the column at the given index.
    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Returns the number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns the index of the named column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    pub fn primary_index(&self) -> usize {
        self.primary_index
    }

    pub fn primary_column(&self) -> &Column {
        &self.columns[self.primary_index]
    }

    /// Returns the column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name()).collect()
    }
}

/// Builder for constructing schemas fluently.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    columns: Vec<Column>,
}

impl SchemaBuilder {
    /// Creates a new schema builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the primary key column.
    pub fn primary(mut self, name: impl Into<String>, column_type: ColumnType) -> Self {
        self.columns.push(Column::new(name, column_type).primary());
        self
    }

    /// Adds a nullable column.
    pub fn column(mut self, name: impl Into<String>, column_type: ColumnType) -> Self {
        self.columns.push(Column::new(name, column_type));
        self
    }

    /// Adds a NOT NULL column.
    pub fn not_null_column(mut self, name: impl Into<String>, column_type: ColumnType) -> Self {
        self.columns.push(Column::new(name, column_type).not_null());
        self
    }

    /// Adds a nullable string column bounded to `max_length` characters.
    pub fn string(mut self, name: impl Into<String>, max_length: usize) -> Self {
        self.columns
            .push(Column::new(name, ColumnType::String).max_length(max_length));
        self
    }

    /// Adds a pre-built column.
    pub fn add(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Builds the schema.
    pub fn build(self) -> Result<Schema> {
        Schema::new(self.columns)
    }

    /// Builds the schema wrapped in an Arc.
    pub fn build_arc(self) -> Result<Arc<Schema>> {
        self.build().map(Arc::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_lookup() {
        let schema = SchemaBuilder::new()
            .primary("id", ColumnType::Int)
            .string("name", 16)
            .column("score", ColumnType::Double)
            .build()
            .unwrap();

        assert_eq!(schema.column_count(), 3);
        assert_eq!(schema.primary_index(), 0);
        assert_eq!(schema.primary_column().name(), "id");
        assert_eq!(schema.column_index("score"), Some(2));
        assert_eq!(schema.column_index("missing"), None);
        assert_eq!(schema.column_names(), vec!["id", "name", "score"]);
    }

    #[test]
    fn test_schema_requires_one_primary() {
        let none = SchemaBuilder::new().column("a", ColumnType::Int).build();
        assert!(matches!(none, Err(StrataError::PrimaryNotExist(_))));

        let two = SchemaBuilder::new()
            .primary("a", ColumnType::Int)
            .primary("b", ColumnType::Int)
            .build();
        assert!(matches!(two, Err(StrataError::PrimaryNotExist(_))));
    }

    #[test]
    fn test_schema_duplicate_column() {
        let result = SchemaBuilder::new()
            .primary("a", ColumnType::Int)
            .column("a", ColumnType::Long)
            .build();
        assert!(matches!(result, Err(StrataError::DuplicateColumn(name)) if name == "a"));
    }

    #[test]
    fn test_column_validate() {
        let name = Column::new("name", ColumnType::String).max_length(3).not_null();
        assert!(name.is_not_null());
        assert_eq!(name.get_max_length(), Some(3));
        assert!(Column::new("id", ColumnType::Int).primary().is_not_null());
        assert!(matches!(name.validate(&Entry::Null), Err(StrataError::NullValue(_))));
        assert!(matches!(
            name.validate(&Entry::from("long")),
            Err(StrataError::ValueLengthExceed(_))
        ));
        assert_eq!(name.validate(&Entry::from("abc")).unwrap(), Entry::from("abc"));

        let score = Column::new("score", ColumnType::Double);
        assert!(!score.is_not_null());
        assert_eq!(score.get_max_length(), None);
        assert!(matches!(score.validate(&Entry::Int(2)).unwrap(), Entry::Double(_)));
        assert!(score.validate(&Entry::Null).unwrap().is_null());
    }
}
