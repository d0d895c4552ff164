//! Queries over live tables.
//!
//! A [`Query`] names the columns to read, an optional [`Filter`] and the
//! statistics to compute. Without statistics it returns the requested columns
//! of every matching row; with statistics the columns become the grouping key
//! and each group reports one value per aggregator.
//!
//! Queries are validated against the table schema before any row is read.

mod executor;
mod filter;
mod runtime;

pub use executor::execute;
pub use filter::{AndFilter, ColumnFilter, CompareOp, Filter, NotFilter, OrFilter};
pub use runtime::{QueryHandle, QueryRuntime, QueryRuntimeConfig};

use std::fmt;

use serde::Serialize;

use crate::aggregator::{Aggregator, GroupStats, StatKind};
use crate::error::ValidationError;
use crate::table::{Schema, Table};
use crate::value::Value;

/// A validated-on-execution request against one table.
pub struct Query<T: Table + ?Sized> {
    columns: Vec<String>,
    filter: Option<Box<dyn Filter<T>>>,
    stats: Vec<Box<dyn Aggregator<T>>>,
}

impl<T: Table + ?Sized> Query<T> {
    /// Starts building a query.
    #[must_use]
    pub fn builder() -> QueryBuilder<T> {
        QueryBuilder::new()
    }

    /// Output columns, or grouping columns when the query has statistics.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Row filter, if any.
    #[must_use]
    pub fn filter(&self) -> Option<&dyn Filter<T>> {
        self.filter.as_deref()
    }

    /// Aggregators, in output order.
    #[must_use]
    pub fn stats(&self) -> &[Box<dyn Aggregator<T>>] {
        &self.stats
    }

    /// Returns true if the query computes statistics.
    #[must_use]
    pub fn is_stats(&self) -> bool {
        !self.stats.is_empty()
    }

    /// Whether `row` passes the filter. A query without filter takes every row.
    pub fn matches(&self, table: &T, row: &T::Row) -> bool {
        self.filter.as_ref().map_or(true, |f| f.matches(table, row))
    }

    /// Checks every referenced column against `schema`.
    ///
    /// # Errors
    /// `UnknownColumn` for the first column the table does not have, and
    /// `MissingField` for a statistic other than count without a column.
    pub fn validate(&self, schema: &Schema<T::Row>) -> Result<(), ValidationError> {
        for column in &self.columns {
            schema.resolve(column)?;
        }
        if let Some(filter) = &self.filter {
            for column in filter.columns() {
                schema.resolve(column)?;
            }
        }
        for aggregator in &self.stats {
            match aggregator.attribute() {
                Some(column) => {
                    schema.resolve(column)?;
                }
                None if aggregator.kind() != StatKind::Count => {
                    return Err(ValidationError::MissingField {
                        field: format!("{} attribute", aggregator.kind()),
                    });
                }
                None => {}
            }
        }
        Ok(())
    }

    /// Header of each statistic, such as `sum latency` or `count`.
    #[must_use]
    pub fn stat_labels(&self) -> Vec<String> {
        self.stats
            .iter()
            .map(|a| match a.attribute() {
                Some(column) => format!("{} {column}", a.kind()),
                None => a.kind().to_string(),
            })
            .collect()
    }
}

impl<T: Table + ?Sized> fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("columns", &self.columns)
            .field("filter", &self.filter)
            .field("stats", &self.stat_labels())
            .finish()
    }
}

/// Builder for [`Query`].
///
/// # Example
/// ```rust,ignore
/// let query = Query::<ServicesTable>::builder()
///     .column("host_name")
///     .filter(ColumnFilter::new("state", CompareOp::NotEqual, 0)?)
///     .stat(StatsAggregator::average("latency"))
///     .build()?;
/// ```
pub struct QueryBuilder<T: Table + ?Sized> {
    columns: Vec<String>,
    filter: Option<Box<dyn Filter<T>>>,
    stats: Vec<Box<dyn Aggregator<T>>>,
}

impl<T: Table + ?Sized> Default for QueryBuilder<T> {
    fn default() -> Self {
        Self {
            columns: Vec::new(),
            filter: None,
            stats: Vec::new(),
        }
    }
}

impl<T: Table + ?Sized> QueryBuilder<T> {
    /// Empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an output (or grouping) column.
    #[must_use]
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.columns.push(name.into());
        self
    }

    /// Appends several columns.
    #[must_use]
    pub fn columns<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.extend(names.into_iter().map(Into::into));
        self
    }

    /// Sets the row filter, replacing any previous one.
    #[must_use]
    pub fn filter(mut self, filter: impl Filter<T> + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Sets an already boxed row filter.
    #[must_use]
    pub fn boxed_filter(mut self, filter: Box<dyn Filter<T>>) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Appends an aggregator.
    #[must_use]
    pub fn stat(mut self, aggregator: impl Aggregator<T> + 'static) -> Self {
        self.stats.push(Box::new(aggregator));
        self
    }

    /// Builds the query.
    ///
    /// # Errors
    /// `EmptyQuery` if neither columns nor statistics were requested.
    pub fn build(self) -> Result<Query<T>, ValidationError> {
        if self.columns.is_empty() && self.stats.is_empty() {
            return Err(ValidationError::EmptyQuery);
        }
        Ok(Query {
            columns: self.columns,
            filter: self.filter,
            stats: self.stats,
        })
    }
}

/// Result of executing a [`Query`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryOutput {
    /// Requested columns of every matching row.
    Rows {
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    },
    /// One entry per group, in ascending key order.
    Stats {
        columns: Vec<String>,
        stats: Vec<String>,
        groups: Vec<GroupStats>,
    },
}

impl QueryOutput {
    /// Output rows, for a row query.
    #[must_use]
    pub fn rows(&self) -> Option<&[Vec<Value>]> {
        match self {
            Self::Rows { rows, .. } => Some(rows),
            Self::Stats { .. } => None,
        }
    }

    /// Groups, for a statistics query.
    #[must_use]
    pub fn groups(&self) -> Option<&[GroupStats]> {
        match self {
            Self::Stats { groups, .. } => Some(groups),
            Self::Rows { .. } => None,
        }
    }

    /// Statistics of an ungrouped query.
    #[must_use]
    pub fn totals(&self) -> Option<&[f64]> {
        match self.groups()? {
            [only] if only.key.is_implicit() => Some(&only.values),
            _ => None,
        }
    }

    /// Number of rows or groups.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Rows { rows, .. } => rows.len(),
            Self::Stats { groups, .. } => groups.len(),
        }
    }

    /// Returns true if there are no rows or groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
