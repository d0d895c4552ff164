//! Small in-memory table for unit tests.

use std::sync::Arc;

use crate::object::{LiveObject, ObjectType};
use crate::table::{Column, ColumnType, RowIter, Schema, Table};
use crate::value::Value;

#[derive(Debug, Clone)]
pub(crate) struct Sample {
    pub(crate) value: Value,
    pub(crate) group: String,
}

fn sample(row: &Arc<LiveObject<Sample>>) -> &LiveObject<Sample> {
    row
}

/// Rows with a value column `a` and a string column `group`.
#[derive(Debug)]
pub(crate) struct ValueTable {
    rows: Vec<Arc<LiveObject<Sample>>>,
    schema: Schema<Arc<LiveObject<Sample>>>,
}

impl ValueTable {
    pub(crate) fn new(values: &[Value]) -> Self {
        Self::from_samples(values.iter().map(|value| Sample {
            value: value.clone(),
            group: String::new(),
        }))
    }

    pub(crate) fn grouped(values: &[(&str, f64)]) -> Self {
        Self::from_samples(values.iter().map(|(group, value)| Sample {
            value: Value::Float(*value),
            group: (*group).to_string(),
        }))
    }

    fn from_samples(samples: impl Iterator<Item = Sample>) -> Self {
        let rows = samples
            .enumerate()
            .map(|(idx, s)| Arc::new(LiveObject::new(format!("row-{idx}"), ObjectType::Check, s)))
            .collect();
        let schema = Schema::new("values")
            .with(Column::locked("a", ColumnType::Float, sample, |s: &Sample| s.value.clone()))
            .with(Column::locked("group", ColumnType::String, sample, |s: &Sample| {
                s.group.clone().into()
            }));
        Self { rows, schema }
    }
}

impl Table for ValueTable {
    type Row = Arc<LiveObject<Sample>>;

    fn schema(&self) -> &Schema<Self::Row> {
        &self.schema
    }

    fn rows(&self) -> RowIter<'_, Self::Row> {
        Box::new(self.rows.iter().cloned())
    }
}
