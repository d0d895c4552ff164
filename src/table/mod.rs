//! Row sources over the live object graph.
//!
//! A [`Table`] produces a lazy, forward-only sequence of rows and reads named
//! columns from them. Rows are handles to live objects, never copies of their
//! state; every column read locks the one object it needs and releases it
//! before returning, so no row ever holds a lock between reads.

mod column;
mod hosts;
mod services;

pub use column::{Accessor, Column, ColumnType, Schema};
pub use hosts::{HostRow, HostsTable};
pub use services::{ServiceRow, ServicesTable};

use crate::value::Value;

/// Boxed row iterator returned by [`Table::rows`].
pub type RowIter<'a, R> = Box<dyn Iterator<Item = R> + 'a>;

/// A source of rows with named columns.
pub trait Table: Send + Sync {
    /// One row. Cheap to produce, and only valid for reads at the moment of
    /// access: the backing objects keep changing underneath it.
    type Row: 'static;

    /// Column definitions.
    fn schema(&self) -> &Schema<Self::Row>;

    /// Rows over the population as it is when iteration starts. The
    /// sequence is consumed once per query.
    fn rows(&self) -> RowIter<'_, Self::Row>;

    /// Table name, used in error messages.
    fn name(&self) -> &'static str {
        self.schema().table()
    }

    /// Reads `column` for `row`.
    ///
    /// Columns are validated before a query runs; an unknown name reads as
    /// `Null` here.
    fn get_value(&self, row: &Self::Row, column: &str) -> Value {
        self.schema()
            .column(column)
            .map_or(Value::Null, |c| c.extract(row))
    }
}

/// Columns shared by hosts and services, read from their [`Checkable`].
///
/// [`Checkable`]: crate::model::Checkable
pub(crate) mod checkable {
    use chrono::{DateTime, Utc};

    use super::{Column, ColumnType, Schema};
    use crate::model::Checkable;
    use crate::object::LiveObject;
    use crate::value::Value;

    fn time(t: Option<DateTime<Utc>>) -> Value {
        t.map_or(Value::Null, Value::Time)
    }

    pub(crate) fn columns<R: 'static, T: 'static>(
        schema: Schema<R>,
        object: fn(&R) -> &LiveObject<T>,
        checkable: fn(&T) -> &Checkable,
    ) -> Schema<R> {
        let field = move |name: &str, column_type: ColumnType, read: fn(&Checkable) -> Value| {
            Column::new(name, column_type, move |row: &R| {
                object(row).read(|state| read(checkable(state)))
            })
        };

        schema
            .with(field("state_type", ColumnType::Int, |c| c.state_type.code().into()))
            .with(field("current_attempt", ColumnType::Int, |c| c.check_attempt.into()))
            .with(field("max_check_attempts", ColumnType::Int, |c| c.max_check_attempts.into()))
            .with(field("has_been_checked", ColumnType::Bool, |c| c.has_been_checked().into()))
            .with(field("last_check", ColumnType::Time, |c| time(c.last_check)))
            .with(field("last_state_change", ColumnType::Time, |c| time(c.last_state_change)))
            .with(field("latency", ColumnType::Float, |c| c.latency.into()))
            .with(field("execution_time", ColumnType::Float, |c| c.execution_time.into()))
            .with(field("plugin_output", ColumnType::String, |c| c.plugin_output.clone().into()))
            .with(field("acknowledged", ColumnType::Bool, |c| c.acknowledged.into()))
            .with(field("check_interval", ColumnType::Float, |c| c.check_interval.into()))
            .with(field("active_checks_enabled", ColumnType::Bool, |c| c.active_checks_enabled.into()))
    }
}
