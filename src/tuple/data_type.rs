use std::fmt;

/// Declared scalar type of a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// 32-bit signed integer
    Int,

    /// 64-bit signed integer
    Long,

    /// 32-bit floating point
    Float,

    /// 64-bit floating point
    Double,

    /// UTF-8 string, optionally bounded by the column's max length
    String,
}

impl ColumnType {
    /// Returns true for the four numeric types.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, ColumnType::String)
    }

    /// Parses a type name such as `int` or `STRING`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "INT" => Some(ColumnType::Int),
            "LONG" => Some(ColumnType::Long),
            "FLOAT" => Some(ColumnType::Float),
            "DOUBLE" => Some(ColumnType::Double),
            "STRING" => Some(ColumnType::String),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Int => "INT",
            ColumnType::Long => "LONG",
            ColumnType::Float => "FLOAT",
            ColumnType::Double => "DOUBLE",
            ColumnType::String => "STRING",
        };
        f.write_str(name)
    }
}
