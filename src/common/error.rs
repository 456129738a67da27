use thiserror::Error;

use super::types::PageId;

/// Engine error types
#[derive(Error, Debug)]
pub enum StrataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Key does not exist: {0}")]
    KeyNotExist(String),

    #[error("Attribute not found: {0}")]
    AttributeNotFound(String),

    #[error("Attribute is ambiguous: {0}")]
    AttributeCollision(String),

    #[error("Invalid attribute name: {0}")]
    AttributeInvalid(String),

    #[error("Type mismatch: cannot compare {left} with {right}")]
    TypeMismatch { left: String, right: String },

    #[error("Schema does not match: {0}")]
    SchemaNotMatch(String),

    #[error("Length does not match: expected {expected}, got {actual}")]
    LengthNotMatch { expected: usize, actual: usize },

    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("Column {0} may not be null")]
    NullValue(String),

    #[error("Value exceeds the maximum length of column {0}")]
    ValueLengthExceed(String),

    #[error("Primary key not defined: {0}")]
    PrimaryNotExist(String),

    #[error("Table {0} does not exist")]
    TableNotExist(String),

    #[error("Table {0} already exists")]
    DuplicateTable(String),

    #[error("Database {0} does not exist")]
    DatabaseNotExist(String),

    #[error("Page {0} not resident")]
    PageNotFound(PageId),

    #[error("Corrupt page file: {0}")]
    CorruptPage(String),

    #[error("Disk scheduler error: {0}")]
    DiskScheduler(String),

    #[error("Table {0} has been dropped")]
    TableDropped(String),
}

pub type Result<T> = std::result::Result<T, StrataError>;
