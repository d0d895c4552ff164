//! Row filters.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::table::Table;
use crate::value::Value;

/// A predicate over rows of `T`.
pub trait Filter<T: Table + ?Sized>: Send + Sync + fmt::Debug {
    /// Whether `row` passes. Reads columns through `table`, one lock per read.
    fn matches(&self, table: &T, row: &T::Row) -> bool;

    /// Every column this filter reads, for validation.
    fn columns(&self) -> Vec<&str>;
}

/// Comparison operator of a [`ColumnFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    /// Regular expression search.
    Match,
    /// Case-insensitive regular expression search.
    MatchIgnoreCase,
}

impl CompareOp {
    /// Operator symbol as written in a query.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::Match => "~",
            Self::MatchIgnoreCase => "~~",
        }
    }

    const fn is_regex(self) -> bool {
        matches!(self, Self::Match | Self::MatchIgnoreCase)
    }

    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Equal => ordering == Ordering::Equal,
            Self::NotEqual => ordering != Ordering::Equal,
            Self::Less => ordering == Ordering::Less,
            Self::LessOrEqual => ordering != Ordering::Greater,
            Self::Greater => ordering == Ordering::Greater,
            Self::GreaterOrEqual => ordering != Ordering::Less,
            Self::Match | Self::MatchIgnoreCase => false,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for CompareOp {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "=" => Self::Equal,
            "!=" => Self::NotEqual,
            "<" => Self::Less,
            "<=" => Self::LessOrEqual,
            ">" => Self::Greater,
            ">=" => Self::GreaterOrEqual,
            "~" => Self::Match,
            "~~" => Self::MatchIgnoreCase,
            other => {
                return Err(ValidationError::UnknownOperator {
                    operator: other.to_string(),
                })
            }
        })
    }
}

/// Compares one column against a constant operand.
///
/// Both sides are compared as numbers when both read as numbers, and as
/// their display strings otherwise.
#[derive(Debug, Clone)]
pub struct ColumnFilter {
    column: String,
    op: CompareOp,
    operand: Value,
    numeric: Option<f64>,
    regex: Option<Regex>,
}

impl ColumnFilter {
    /// Builds a filter; regular expressions are compiled here.
    ///
    /// # Errors
    /// `InvalidRegex` if a `~` or `~~` operand does not compile.
    pub fn new(column: impl Into<String>, op: CompareOp, operand: impl Into<Value>) -> Result<Self, ValidationError> {
        let operand = operand.into();
        let regex = if op.is_regex() {
            let pattern = operand.to_string();
            let compiled = RegexBuilder::new(&pattern)
                .case_insensitive(op == CompareOp::MatchIgnoreCase)
                .build()
                .map_err(|err| ValidationError::InvalidRegex {
                    pattern,
                    reason: err.to_string(),
                })?;
            Some(compiled)
        } else {
            None
        };

        Ok(Self {
            column: column.into(),
            op,
            numeric: operand.as_number(),
            operand,
            regex,
        })
    }

    /// Column the filter reads.
    #[must_use]
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Comparison operator.
    #[must_use]
    pub const fn op(&self) -> CompareOp {
        self.op
    }

    /// Right-hand operand.
    #[must_use]
    pub const fn operand(&self) -> &Value {
        &self.operand
    }

    fn test(&self, value: &Value) -> bool {
        if let Some(regex) = &self.regex {
            return match value {
                Value::String(s) => regex.is_match(s),
                other => regex.is_match(&other.to_string()),
            };
        }

        if let (Some(lhs), Some(rhs)) = (value.as_number(), self.numeric) {
            return lhs.partial_cmp(&rhs).is_some_and(|ord| self.op.accepts(ord));
        }

        let ordering = match (value, &self.operand) {
            (Value::String(lhs), Value::String(rhs)) => lhs.as_str().cmp(rhs.as_str()),
            (lhs, rhs) => lhs.to_string().cmp(&rhs.to_string()),
        };
        self.op.accepts(ordering)
    }
}

impl<T: Table + ?Sized> Filter<T> for ColumnFilter {
    fn matches(&self, table: &T, row: &T::Row) -> bool {
        self.test(&table.get_value(row, &self.column))
    }

    fn columns(&self) -> Vec<&str> {
        vec![self.column.as_str()]
    }
}

/// Passes when every inner filter passes; an empty conjunction passes.
pub struct AndFilter<T: Table + ?Sized> {
    filters: Vec<Box<dyn Filter<T>>>,
}

/// Passes when any inner filter passes; an empty disjunction fails.
pub struct OrFilter<T: Table + ?Sized> {
    filters: Vec<Box<dyn Filter<T>>>,
}

/// Inverts the inner filter.
pub struct NotFilter<T: Table + ?Sized> {
    inner: Box<dyn Filter<T>>,
}

impl<T: Table + ?Sized> AndFilter<T> {
    /// Matches rows accepted by every filter; an empty list matches all rows.
    #[must_use]
    pub fn new(filters: Vec<Box<dyn Filter<T>>>) -> Self {
        Self { filters }
    }
}

impl<T: Table + ?Sized> OrFilter<T> {
    /// Matches rows accepted by any filter; an empty list matches no row.
    #[must_use]
    pub fn new(filters: Vec<Box<dyn Filter<T>>>) -> Self {
        Self { filters }
    }
}

impl<T: Table + ?Sized> NotFilter<T> {
    /// Matches rows `inner` rejects.
    #[must_use]
    pub fn new(inner: Box<dyn Filter<T>>) -> Self {
        Self { inner }
    }
}

impl<T: Table + ?Sized> Filter<T> for AndFilter<T> {
    fn matches(&self, table: &T, row: &T::Row) -> bool {
        self.filters.iter().all(|f| f.matches(table, row))
    }

    fn columns(&self) -> Vec<&str> {
        self.filters.iter().flat_map(|f| f.columns()).collect()
    }
}

impl<T: Table + ?Sized> Filter<T> for OrFilter<T> {
    fn matches(&self, table: &T, row: &T::Row) -> bool {
        self.filters.iter().any(|f| f.matches(table, row))
    }

    fn columns(&self) -> Vec<&str> {
        self.filters.iter().flat_map(|f| f.columns()).collect()
    }
}

impl<T: Table + ?Sized> Filter<T> for NotFilter<T> {
    fn matches(&self, table: &T, row: &T::Row) -> bool {
        !self.inner.matches(table, row)
    }

    fn columns(&self) -> Vec<&str> {
        self.inner.columns()
    }
}

impl<T: Table + ?Sized> fmt::Debug for AndFilter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AndFilter").field(&self.filters).finish()
    }
}

impl<T: Table + ?Sized> fmt::Debug for OrFilter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OrFilter").field(&self.filters).finish()
    }
}

impl<T: Table + ?Sized> fmt::Debug for NotFilter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NotFilter").field(&self.inner).finish()
    }
}
