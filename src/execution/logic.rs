use std::cmp::Ordering;
use std::fmt;

use crate::common::{Result, StrataError};
use crate::tuple::{ColumnType, Entry};

use super::JointRow;

/// Three-valued truth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ternary {
    True,
    False,
    Unknown,
}

impl Ternary {
    pub fn and(self, other: Ternary) -> Ternary {
        match (self, other) {
            (Ternary::False, _) | (_, Ternary::False) => Ternary::False,
            (Ternary::True, Ternary::True) => Ternary::True,
            _ => Ternary::Unknown,
        }
    }

    pub fn or(self, other: Ternary) -> Ternary {
        match (self, other) {
            (Ternary::True, _) | (_, Ternary::True) => Ternary::True,
            (Ternary::False, Ternary::False) => Ternary::False,
            _ => Ternary::Unknown,
        }
    }

    pub fn is_true(self) -> bool {
        self == Ternary::True
    }
}

impl From<bool> for Ternary {
    fn from(value: bool) -> Self {
        if value {
            Ternary::True
        } else {
            Ternary::False
        }
    }
}

/// Comparison operator of a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl CompareOp {
    fn test(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Ge => ordering != Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
        }
    }
}

/// Connective of a logic node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

/// One side of a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Comparer {
    /// Column reference, bare (`col`) or qualified (`table.col`)
    Column(String),
    Number(f64),
    String(String),
    Null,
}

impl Comparer {
    pub fn column(name: impl Into<String>) -> Self {
        Comparer::Column(name.into())
    }

    pub fn string(value: impl Into<String>) -> Self {
        Comparer::String(value.into())
    }

    pub fn is_column(&self) -> bool {
        matches!(self, Comparer::Column(_))
    }

    pub fn column_name(&self) -> Option<&str> {
        match self {
            Comparer::Column(name) => Some(name),
            _ => None,
        }
    }

    /// Converts a constant to a value of `column_type`.
    ///
    /// Numbers convert to any numeric type, strings only to strings. Column
    /// references are not constants and fail with `TypeMismatch`.
    pub fn to_entry(&self, column_type: ColumnType) -> Result<Entry> {
        match self {
            Comparer::Null => Ok(Entry::Null),
            Comparer::Number(value) => Entry::from_f64(*value, column_type),
            Comparer::String(value) if column_type == ColumnType::String => {
                Ok(Entry::String(value.clone()))
            }
            other => Err(StrataError::TypeMismatch {
                left: column_type.to_string(),
                right: other.kind().to_string(),
            }),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Comparer::Column(_) => "COLUMN",
            Comparer::Number(_) => "NUMBER",
            Comparer::String(_) => "STRING",
            Comparer::Null => "NULL",
        }
    }

    fn operand<'a>(&'a self, row: Option<&'a JointRow>) -> Result<Operand<'a>> {
        match self {
            Comparer::Null => Ok(Operand::Unknown),
            Comparer::Number(value) => Ok(Operand::Number(*value)),
            Comparer::String(value) => Ok(Operand::Str(value)),
            Comparer::Column(name) => {
                let row = row.ok_or_else(|| StrataError::AttributeNotFound(name.clone()))?;
                let (entry, column_type) = row.resolve(name)?;
                Ok(Operand::from_entry(entry, column_type))
            }
        }
    }
}

impl From<i32> for Comparer {
    fn from(value: i32) -> Self {
        Comparer::Number(value as f64)
    }
}

impl From<f64> for Comparer {
    fn from(value: f64) -> Self {
        Comparer::Number(value)
    }
}

impl From<&str> for Comparer {
    fn from(value: &str) -> Self {
        Comparer::String(value.to_string())
    }
}

impl fmt::Display for Comparer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparer::Column(name) => f.write_str(name),
            Comparer::Number(value) => write!(f, "{}", value),
            Comparer::String(value) => write!(f, "'{}'", value),
            Comparer::Null => f.write_str("null"),
        }
    }
}

/// A comparer resolved against a row
enum Operand<'a> {
    Number(f64),
    Str(&'a str),
    Unknown,
}

impl<'a> Operand<'a> {
    fn from_entry(entry: &'a Entry, column_type: ColumnType) -> Self {
        match entry {
            Entry::Null => Operand::Unknown,
            Entry::String(s) => Operand::Str(s),
            numeric if column_type.is_numeric() => match numeric.as_f64() {
                Some(value) => Operand::Number(value),
                None => Operand::Unknown,
            },
            _ => Operand::Unknown,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Operand::Number(_) => "NUMBER",
            Operand::Str(_) => "STRING",
            Operand::Unknown => "NULL",
        }
    }
}

/// `left op right`
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub left: Comparer,
    pub op: CompareOp,
    pub right: Comparer,
}

impl Condition {
    pub fn new(left: Comparer, op: CompareOp, right: Comparer) -> Self {
        Self { left, op, right }
    }

    /// Shorthand for `left = right`.
    pub fn eq(left: Comparer, right: Comparer) -> Self {
        Self::new(left, CompareOp::Eq, right)
    }

    /// Returns true if either side references a column.
    pub fn has_column(&self) -> bool {
        self.left.is_column() || self.right.is_column()
    }

    /// Evaluates against a row. Null operands give `Unknown`; operands of
    /// different categories fail with `TypeMismatch`.
    pub fn evaluate(&self, row: &JointRow) -> Result<Ternary> {
        self.eval(Some(row))
    }

    /// Evaluates a condition with no column operands.
    pub fn evaluate_constant(&self) -> Result<Ternary> {
        self.eval(None)
    }

    fn eval(&self, row: Option<&JointRow>) -> Result<Ternary> {
        let left = self.left.operand(row)?;
        let right = self.right.operand(row)?;
        let ordering = match (&left, &right) {
            (Operand::Unknown, _) | (_, Operand::Unknown) => return Ok(Ternary::Unknown),
            (Operand::Number(a), Operand::Number(b)) => a.total_cmp(b),
            (Operand::Str(a), Operand::Str(b)) => a.cmp(b),
            (l, r) => {
                return Err(StrataError::TypeMismatch {
                    left: l.kind().to_string(),
                    right: r.kind().to_string(),
                })
            }
        };
        Ok(self.op.test(ordering).into())
    }
}

/// Boolean tree of conditions.
#[derive(Debug, Clone, PartialEq)]
pub enum Logic {
    /// A single condition; `None` is always true
    Terminal(Option<Condition>),
    /// Absent children count as true
    Node {
        left: Option<Box<Logic>>,
        right: Option<Box<Logic>>,
        op: LogicOp,
    },
}

impl Logic {
    /// A terminal that is always true.
    pub fn always() -> Self {
        Logic::Terminal(None)
    }

    pub fn condition(condition: Condition) -> Self {
        Logic::Terminal(Some(condition))
    }

    pub fn and(left: Logic, right: Logic) -> Self {
        Logic::Node {
            left: Some(Box::new(left)),
            right: Some(Box::new(right)),
            op: LogicOp::And,
        }
    }

    pub fn or(left: Logic, right: Logic) -> Self {
        Logic::Node {
            left: Some(Box::new(left)),
            right: Some(Box::new(right)),
            op: LogicOp::Or,
        }
    }

    /// Returns the condition of a terminal, if it has one.
    pub fn as_condition(&self) -> Option<&Condition> {
        match self {
            Logic::Terminal(condition) => condition.as_ref(),
            Logic::Node { .. } => None,
        }
    }

    pub fn evaluate(&self, row: &JointRow) -> Result<Ternary> {
        self.eval(Some(row))
    }

    /// Evaluates a tree without column references.
    pub fn evaluate_constant(&self) -> Result<Ternary> {
        self.eval(None)
    }

    fn eval(&self, row: Option<&JointRow>) -> Result<Ternary> {
        match self {
            Logic::Terminal(None) => Ok(Ternary::True),
            Logic::Terminal(Some(condition)) => condition.eval(row),
            Logic::Node { left, right, op } => {
                let left = match left {
                    Some(logic) => logic.eval(row)?,
                    None => Ternary::True,
                };
                let right = match right {
                    Some(logic) => logic.eval(row)?,
                    None => Ternary::True,
                };
                Ok(match op {
                    LogicOp::And => left.and(right),
                    LogicOp::Or => left.or(right),
                })
            }
        }
    }
}

/// Returns true when `logic` is absent or evaluates to `True` for `row`.
pub fn passes(logic: Option<&Logic>, row: &JointRow) -> Result<bool> {
    match logic {
        None => Ok(true),
        Some(logic) => Ok(logic.evaluate(row)?.is_true()),
    }
}
