use std::cmp::Ordering;
use std::fmt;

use crate::common::{Result, StrataError};

use super::ColumnType;

/// An ordered scalar used both as a row field and as a primary-key token.
///
/// Entries form a total order: `Null` sorts first, numbers of any width
/// compare numerically with each other, and every number sorts before every
/// string. Equality follows the same order, so `Int(1) == Long(1)`.
#[derive(Debug, Clone)]
pub enum Entry {
    Null,
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
}

impl Entry {
    /// Returns true if this entry is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Entry::Null)
    }

    /// Returns the column type this entry naturally belongs to.
    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            Entry::Null => None,
            Entry::Int(_) => Some(ColumnType::Int),
            Entry::Long(_) => Some(ColumnType::Long),
            Entry::Float(_) => Some(ColumnType::Float),
            Entry::Double(_) => Some(ColumnType::Double),
            Entry::String(_) => Some(ColumnType::String),
        }
    }

    /// Returns the numeric value widened to f64, or None for strings and null.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Entry::Int(v) => Some(*v as f64),
            Entry::Long(v) => Some(*v as f64),
            Entry::Float(v) => Some(*v as f64),
            Entry::Double(v) => Some(*v),
            Entry::Null | Entry::String(_) => None,
        }
    }

    /// Returns the string payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Entry::String(s) => Some(s),
            _ => None,
        }
    }

    /// Builds an entry of the given column type from an f64.
    /// Integer targets truncate toward zero.
    pub fn from_f64(value: f64, column_type: ColumnType) -> Result<Self> {
        match column_type {
            ColumnType::Int => Ok(Entry::Int(value as i32)),
            ColumnType::Long => Ok(Entry::Long(value as i64)),
            ColumnType::Float => Ok(Entry::Float(value as f32)),
            ColumnType::Double => Ok(Entry::Double(value)),
            ColumnType::String => Err(StrataError::TypeMismatch {
                left: column_type.to_string(),
                right: "NUMBER".to_string(),
            }),
        }
    }

    /// Converts this entry to the given column type.
    ///
    /// Numbers convert between widths, strings only to strings, and null
    /// stays null.
    pub fn coerce_to(&self, column_type: ColumnType) -> Result<Self> {
        match (self, column_type) {
            (Entry::Null, _) => Ok(Entry::Null),
            (Entry::String(s), ColumnType::String) => Ok(Entry::String(s.clone())),
            (Entry::Int(v), ColumnType::Int) => Ok(Entry::Int(*v)),
            (Entry::Int(v), ColumnType::Long) => Ok(Entry::Long(*v as i64)),
            (Entry::Long(v), ColumnType::Long) => Ok(Entry::Long(*v)),
            (Entry::Long(v), ColumnType::Int) => {
                i32::try_from(*v).map(Entry::Int).map_err(|_| StrataError::TypeMismatch {
                    left: column_type.to_string(),
                    right: format!("LONG {}", v),
                })
            }
            (entry, ty) => match entry.as_f64() {
                Some(value) => Entry::from_f64(value, ty),
                None => Err(StrataError::TypeMismatch {
                    left: ty.to_string(),
                    right: entry.type_name().to_string(),
                }),
            },
        }
    }

    /// Parses a literal as a value of the given column type.
    ///
    /// `null` (any case) yields `Entry::Null`; string literals may be wrapped
    /// in single quotes.
    pub fn parse(text: &str, column_type: ColumnType) -> Result<Self> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("null") {
            return Ok(Entry::Null);
        }

        let mismatch = || StrataError::TypeMismatch {
            left: column_type.to_string(),
            right: format!("'{}'", text),
        };

        match column_type {
            ColumnType::Int => text.parse().map(Entry::Int).map_err(|_| mismatch()),
            ColumnType::Long => text.parse().map(Entry::Long).map_err(|_| mismatch()),
            ColumnType::Float => text.parse().map(Entry::Float).map_err(|_| mismatch()),
            ColumnType::Double => text.parse().map(Entry::Double).map_err(|_| mismatch()),
            ColumnType::String => {
                let unquoted = text
                    .strip_prefix('\'')
                    .and_then(|s| s.strip_suffix('\''))
                    .unwrap_or(text);
                Ok(Entry::String(unquoted.to_string()))
            }
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Entry::Null => "NULL",
            Entry::Int(_) => "INT",
            Entry::Long(_) => "LONG",
            Entry::Float(_) => "FLOAT",
            Entry::Double(_) => "DOUBLE",
            Entry::String(_) => "STRING",
        }
    }

    /// Sort class: null, then numbers, then strings
    fn rank(&self) -> u8 {
        match self {
            Entry::Null => 0,
            Entry::Int(_) | Entry::Long(_) | Entry::Float(_) | Entry::Double(_) => 1,
            Entry::String(_) => 2,
        }
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Entry::String(a), Entry::String(b)) => a.cmp(b),
            (Entry::Int(a), Entry::Int(b)) => a.cmp(b),
            (Entry::Int(a), Entry::Long(b)) => (*a as i64).cmp(b),
            (Entry::Long(a), Entry::Int(b)) => a.cmp(&(*b as i64)),
            (Entry::Long(a), Entry::Long(b)) => a.cmp(b),
            (a, b) if a.rank() == 1 && b.rank() == 1 => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => Ordering::Equal,
            },
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Null => f.write_str("null"),
            Entry::Int(v) => write!(f, "{}", v),
            Entry::Long(v) => write!(f, "{}", v),
            Entry::Float(v) => write!(f, "{}", v),
            Entry::Double(v) => write!(f, "{}", v),
            Entry::String(s) => f.write_str(s),
        }
    }
}

impl From<i32> for Entry {
    fn from(v: i32) -> Self {
        Entry::Int(v)
    }
}

impl From<i64> for Entry {
    fn from(v: i64) -> Self {
        Entry::Long(v)
    }
}

impl From<f32> for Entry {
    fn from(v: f32) -> Self {
        Entry::Float(v)
    }
}

impl From<f64> for Entry {
    fn from(v: f64) -> Self {
        Entry::Double(v)
    }
}

impl From<&str> for Entry {
    fn from(v: &str) -> Self {
        Entry::String(v.to_string())
    }
}

impl From<String> for Entry {
    fn from(v: String) -> Self {
        Entry::String(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_total_order() {
        let mut entries = vec![
            Entry::from("b"),
            Entry::Double(2.5),
            Entry::Null,
            Entry::Int(3),
            Entry::from("a"),
            Entry::Long(-1),
        ];
        entries.sort();
        assert_eq!(
            entries,
            vec![
                Entry::Null,
                Entry::Long(-1),
                Entry::Double(2.5),
                Entry::Int(3),
                Entry::from("a"),
                Entry::from("b"),
            ]
        );
    }

    #[test]
    fn test_entry_cross_width_equality() {
        assert_eq!(Entry::Int(7), Entry::Long(7));
        assert_eq!(Entry::Float(1.5), Entry::Double(1.5));
        assert_ne!(Entry::Int(7), Entry::from("7"));
        assert!(Entry::Long(i64::MAX) > Entry::Int(i32::MAX));
    }

    #[test]
    fn test_entry_parse() {
        assert_eq!(Entry::parse("42", ColumnType::Int).unwrap(), Entry::Int(42));
        assert_eq!(Entry::parse(" 9 ", ColumnType::Long).unwrap(), Entry::Long(9));
        assert_eq!(Entry::parse("'hi'", ColumnType::String).unwrap(), Entry::from("hi"));
        assert_eq!(Entry::parse("NULL", ColumnType::Double).unwrap(), Entry::Null);
        assert!(matches!(
            Entry::parse("abc", ColumnType::Int),
            Err(StrataError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_entry_coerce() {
        assert!(matches!(
            Entry::Double(3.9).coerce_to(ColumnType::Int).unwrap(),
            Entry::Int(3)
        ));
        assert!(matches!(
            Entry::Int(3).coerce_to(ColumnType::Long).unwrap(),
            Entry::Long(3)
        ));
        assert!(Entry::from("x").coerce_to(ColumnType::Int).is_err());
        assert!(Entry::Int(1).coerce_to(ColumnType::String).is_err());
        assert!(Entry::Null.coerce_to(ColumnType::String).unwrap().is_null());
    }

    #[test]
    fn test_entry_display() {
        assert_eq!(Entry::Int(5).to_string(), "5");
        assert_eq!(Entry::from("hello").to_string(), "hello");
        assert_eq!(Entry::Null.to_string(), "null");
    }
}
