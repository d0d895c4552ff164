//! Named columns and table schemas.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::object::LiveObject;
use crate::value::Value;

/// Declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Int,
    Float,
    String,
    Bool,
    Time,
}

impl ColumnType {
    /// Whether statistics over this column are meaningful without coercion.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Float | Self::Bool | Self::Time)
    }
}

/// Reads one value out of a row.
pub type Accessor<R> = Arc<dyn Fn(&R) -> Value + Send + Sync>;

/// A named, typed column over rows of type `R`.
pub struct Column<R> {
    name: String,
    column_type: ColumnType,
    accessor: Accessor<R>,
}

impl<R> Clone for Column<R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            column_type: self.column_type,
            accessor: Arc::clone(&self.accessor),
        }
    }
}

impl<R: 'static> Column<R> {
    /// A column computed by an arbitrary accessor.
    ///
    /// The accessor is responsible for its own locking; prefer
    /// [`Column::locked`] for fields behind an object lock.
    pub fn new(
        name: impl Into<String>,
        column_type: ColumnType,
        accessor: impl Fn(&R) -> Value + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            column_type,
            accessor: Arc::new(accessor),
        }
    }

    /// A column reading one field of the object backing the row.
    ///
    /// Each read locks that object, runs `read` and releases the lock before
    /// returning.
    pub fn locked<T: 'static>(
        name: impl Into<String>,
        column_type: ColumnType,
        object: fn(&R) -> &LiveObject<T>,
        read: fn(&T) -> Value,
    ) -> Self {
        Self::new(name, column_type, move |row: &R| object(row).read(read))
    }

    /// Column name as used in queries.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value type of the column.
    #[must_use]
    pub const fn column_type(&self) -> ColumnType {
        self.column_type
    }

    /// Reads this column's value for `row`.
    pub fn extract(&self, row: &R) -> Value {
        (self.accessor)(row)
    }
}

impl<R> fmt::Debug for Column<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("name", &self.name)
            .field("column_type", &self.column_type)
            .finish_non_exhaustive()
    }
}

/// The named columns of one table.
pub struct Schema<R> {
    table: &'static str,
    columns: Vec<Column<R>>,
    index: HashMap<String, usize>,
}

impl<R: 'static> Schema<R> {
    /// Empty schema for table `table`.
    #[must_use]
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            columns: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Adds a column, replacing any existing column of the same name.
    #[must_use]
    pub fn with(mut self, column: Column<R>) -> Self {
        self.push(column);
        self
    }

    /// Adds a column, replacing any existing column of the same name.
    pub fn push(&mut self, column: Column<R>) {
        if let Some(&idx) = self.index.get(column.name()) {
            self.columns[idx] = column;
        } else {
            self.index.insert(column.name().to_string(), self.columns.len());
            self.columns.push(column);
        }
    }

    /// Exposes every column of `other` under `prefix`, reached through
    /// `project`.
    ///
    /// Used for joined rows: a service row exposes its host's columns as
    /// `host_*`. Each joined column still locks only the object it reads.
    #[must_use]
    pub fn join<S: 'static>(mut self, prefix: &str, other: &Schema<S>, project: fn(&R) -> &S) -> Self {
        for column in &other.columns {
            let inner = Arc::clone(&column.accessor);
            self.push(Column::new(
                format!("{prefix}{}", column.name()),
                column.column_type(),
                move |row: &R| inner(project(row)),
            ));
        }
        self
    }

    /// Name of the table.
    #[must_use]
    pub const fn table(&self) -> &'static str {
        self.table
    }

    /// Column definition for `name`.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column<R>> {
        self.index.get(name).map(|&idx| &self.columns[idx])
    }

    /// Looks up a column, failing with `UnknownColumn`.
    ///
    /// # Errors
    /// `UnknownColumn` if the table has no such column.
    pub fn resolve(&self, name: &str) -> Result<&Column<R>, ValidationError> {
        self.column(name).ok_or_else(|| ValidationError::UnknownColumn {
            table: self.table.to_string(),
            column: name.to_string(),
        })
    }

    /// Returns true if `name` is a column of this table.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Columns in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = &Column<R>> {
        self.columns.iter()
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the schema has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<R> fmt::Debug for Schema<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("table", &self.table)
            .field("columns", &self.columns)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectType;

    struct Pair {
        left: LiveObject<i64>,
        right: LiveObject<i64>,
    }

    fn left(p: &Pair) -> &LiveObject<i64> {
        &p.left
    }

    fn right(p: &Pair) -> &LiveObject<i64> {
        &p.right
    }

    fn read_value(v: &i64) -> Value {
        Value::Int(*v)
    }

    fn pair(l: i64, r: i64) -> Pair {
        Pair {
            left: LiveObject::new("l", ObjectType::Check, l),
            right: LiveObject::new("r", ObjectType::Check, r),
        }
    }

    #[test]
    fn test_locked_column_reads_and_releases() {
        let col = Column::locked("left", ColumnType::Int, left, read_value);
        let row = pair(3, 4);
        assert_eq!(col.extract(&row), Value::Int(3));
        assert!(!row.left.is_locked());
        assert_eq!(col.name(), "left");
        assert_eq!(col.column_type(), ColumnType::Int);
    }

    #[test]
    fn test_resolve_unknown_column() {
        let schema = Schema::<Pair>::new("pairs").with(Column::locked("left", ColumnType::Int, left, read_value));
        assert!(schema.resolve("left").is_ok());
        let err = schema.resolve("middle").unwrap_err();
        assert!(matches!(
            err,
            ValidationError::UnknownColumn { ref table, ref column } if table == "pairs" && column == "middle"
        ));
    }

    #[test]
    fn test_push_replaces_same_name() {
        let schema = Schema::<Pair>::new("pairs")
            .with(Column::locked("v", ColumnType::Int, left, read_value))
            .with(Column::locked("v", ColumnType::Int, right, read_value));
        assert_eq!(schema.len(), 1);
        assert_eq!(schema.column("v").unwrap().extract(&pair(1, 2)), Value::Int(2));
    }

    #[test]
    fn test_join_prefixes_columns() {
        struct Outer {
            inner: Pair,
        }
        fn project(o: &Outer) -> &Pair {
            &o.inner
        }

        let inner = Schema::<Pair>::new("pairs")
            .with(Column::locked("left", ColumnType::Int, left, read_value))
            .with(Column::locked("right", ColumnType::Int, right, read_value));
        let outer = Schema::<Outer>::new("outer").join("pair_", &inner, project);

        let row = Outer { inner: pair(5, 6) };
        assert!(outer.contains("pair_left"));
        assert_eq!(outer.column("pair_right").unwrap().extract(&row), Value::Int(6));
        let names: Vec<_> = outer.columns().map(Column::name).collect();
        assert_eq!(names, ["pair_left", "pair_right"]);
    }

    #[test]
    fn test_column_type_numeric() {
        assert!(ColumnType::Time.is_numeric());
        assert!(!ColumnType::String.is_numeric());
    }
}
