use std::sync::Arc;

use super::{checkable, Column, ColumnType, RowIter, Schema, Table};
use crate::model::{Checkable, Host};
use crate::object::LiveObject;
use crate::registry::ObjectRegistry;
use crate::value::Value;

/// A row of the `hosts` table.
pub type HostRow = Arc<LiveObject<Host>>;

fn host_object(row: &HostRow) -> &LiveObject<Host> {
    row
}

fn host_checkable(host: &Host) -> &Checkable {
    &host.checkable
}

/// The `hosts` table: one row per registered host.
#[derive(Debug)]
pub struct HostsTable {
    hosts: Arc<ObjectRegistry<Host>>,
    schema: Schema<HostRow>,
}

impl HostsTable {
    /// Hosts table over `hosts`.
    #[must_use]
    pub fn new(hosts: Arc<ObjectRegistry<Host>>) -> Self {
        Self {
            hosts,
            schema: Self::host_schema(),
        }
    }

    /// Column set of a host row, reused by joined tables.
    #[must_use]
    pub fn host_schema() -> Schema<HostRow> {
        let schema = Schema::new("hosts")
            .with(Column::new("name", ColumnType::String, |row: &HostRow| {
                Value::from(row.name())
            }))
            .with(Column::locked("address", ColumnType::String, host_object, |h: &Host| {
                h.address.clone().into()
            }))
            .with(Column::locked("state", ColumnType::Int, host_object, |h: &Host| {
                h.state().code().into()
            }));
        checkable::columns(schema, host_object, host_checkable)
    }
}

impl Table for HostsTable {
    type Row = HostRow;

    fn schema(&self) -> &Schema<HostRow> {
        &self.schema
    }

    fn rows(&self) -> RowIter<'_, HostRow> {
        Box::new(self.hosts.snapshot().into_iter())
    }
}
