use std::sync::Arc;

use super::{checkable, Column, ColumnType, HostRow, HostsTable, RowIter, Schema, Table};
use crate::model::{Checkable, Service};
use crate::object::LiveObject;
use crate::registry::ObjectRegistry;
use crate::value::Value;

/// A row of the `services` table: a service joined with its host.
#[derive(Debug, Clone)]
pub struct ServiceRow {
    pub service: Arc<LiveObject<Service>>,
    pub host: HostRow,
}

fn service_object(row: &ServiceRow) -> &LiveObject<Service> {
    &row.service
}

fn service_checkable(service: &Service) -> &Checkable {
    &service.checkable
}

fn joined_host(row: &ServiceRow) -> &HostRow {
    &row.host
}

/// Short service name: the part after `host!` in the full object name.
fn description(full_name: &str) -> &str {
    full_name
        .split_once('!')
        .map_or(full_name, |(_, short)| short)
}

/// The `services` table.
///
/// Host columns are available with a `host_` prefix. A row never locks the
/// service and its host at the same time.
#[derive(Debug)]
pub struct ServicesTable {
    services: Arc<ObjectRegistry<Service>>,
    schema: Schema<ServiceRow>,
}

impl ServicesTable {
    /// Services table over `services`.
    #[must_use]
    pub fn new(services: Arc<ObjectRegistry<Service>>) -> Self {
        let schema = Schema::new("services")
            .with(Column::new("description", ColumnType::String, |row: &ServiceRow| {
                Value::from(description(row.service.name()))
            }))
            .with(Column::locked("state", ColumnType::Int, service_object, |s: &Service| {
                s.checkable.state.code().into()
            }));
        let schema = checkable::columns(schema, service_object, service_checkable).join(
            "host_",
            &HostsTable::host_schema(),
            joined_host,
        );

        Self { services, schema }
    }
}

impl Table for ServicesTable {
    type Row = ServiceRow;

    fn schema(&self) -> &Schema<ServiceRow> {
        &self.schema
    }

    fn rows(&self) -> RowIter<'_, ServiceRow> {
        Box::new(self.services.snapshot().into_iter().map(|service| {
            let host = service.read(|s| Arc::clone(&s.host));
            ServiceRow { service, host }
        }))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::model::{CheckResult, Host, ServiceState};
    use crate::object::ObjectType;

    fn fixture() -> (Arc<LiveObject<Host>>, ServicesTable) {
        let hosts = ObjectRegistry::new();
        let services = Arc::new(ObjectRegistry::new());
        let host = hosts
            .register(LiveObject::new("web-01", ObjectType::Host, Host::new("10.0.0.1")))
            .unwrap();
        for name in ["http", "ssh"] {
            services
                .register(LiveObject::new(
                    format!("web-01!{name}"),
                    ObjectType::Service,
                    Service::new(Arc::clone(&host)),
                ))
                .unwrap();
        }
        (host, ServicesTable::new(services))
    }

    #[test]
    fn test_description_strips_host_prefix() {
        assert_eq!(description("web-01!http"), "http");
        assert_eq!(description("standalone"), "standalone");
    }

    #[test]
    fn test_joined_columns() {
        let (host, table) = fixture();
        assert_eq!(table.name(), "services");

        let rows: Vec<_> = table.rows().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(table.get_value(&rows[0], "description"), Value::from("http"));
        assert_eq!(table.get_value(&rows[0], "host_name"), Value::from("web-01"));
        assert_eq!(table.get_value(&rows[1], "host_address"), Value::from("10.0.0.1"));

        host.update(|h| {
            h.checkable
                .process_check_result(&CheckResult::at(ServiceState::Critical, "unreachable", Utc::now()));
        });
        assert_eq!(table.get_value(&rows[0], "host_state"), Value::Int(1));
        assert_eq!(table.get_value(&rows[0], "state"), Value::Int(0));
    }

    #[test]
    fn test_joined_read_locks_one_object_at_a_time() {
        let (host, table) = fixture();
        let row = table.rows().next().unwrap();

        // Holding the service lock must not prevent reading host columns.
        let service_guard = row.service.lock();
        assert_eq!(table.get_value(&row, "host_latency"), Value::Float(0.0));
        drop(service_guard);

        let host_guard = host.lock();
        assert_eq!(table.get_value(&row, "description"), Value::from("http"));
        assert_eq!(table.get_value(&row, "current_attempt"), Value::Int(1));
        drop(host_guard);
    }

    #[test]
    fn test_schema_contains_both_sides() {
        let (_, table) = fixture();
        let schema = table.schema();
        for column in ["description", "state", "latency", "host_name", "host_state", "host_latency"] {
            assert!(schema.contains(column), "missing {column}");
        }
    }
}
