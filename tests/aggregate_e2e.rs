use std::sync::Arc;

use chrono::{Duration, Utc};

use livestate::query::{AndFilter, ColumnFilter, CompareOp, Filter, NotFilter};
use livestate::{
    execute, CheckResult, Host, HostsTable, LiveConfig, LiveObject, NonNumericPolicy, ObjectRegistry,
    ObjectType, Query, QueryRuntime, Service, ServiceState, ServicesTable, StatKind, StatsAggregator, Value,
};

struct Fixture {
    hosts: Arc<ObjectRegistry<Host>>,
    services: Arc<ObjectRegistry<Service>>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            hosts: Arc::new(ObjectRegistry::new()),
            services: Arc::new(ObjectRegistry::new()),
        }
    }

    fn host(&self, name: &str, latency: f64) -> Arc<LiveObject<Host>> {
        let host = self
            .hosts
            .register(LiveObject::new(name, ObjectType::Host, Host::new(format!("{name}.example"))))
            .unwrap();
        host.update(|h| h.checkable.latency = latency);
        host
    }

    fn service(&self, host: &Arc<LiveObject<Host>>, name: &str, state: ServiceState) {
        let service = self
            .services
            .register(LiveObject::new(
                format!("{}!{name}", host.name()),
                ObjectType::Service,
                Service::new(Arc::clone(host)),
            ))
            .unwrap();
        let now = Utc::now();
        let cr = CheckResult {
            schedule_start: now - Duration::milliseconds(1500),
            execution_start: now - Duration::milliseconds(500),
            ..CheckResult::at(state, format!("{name} {state:?}"), now)
        };
        service.update(|s| s.checkable.process_check_result(&cr));
    }

    fn hosts_table(&self) -> HostsTable {
        HostsTable::new(Arc::clone(&self.hosts))
    }

    fn services_table(&self) -> ServicesTable {
        ServicesTable::new(Arc::clone(&self.services))
    }
}

fn all_stats(column: &str) -> Query<HostsTable> {
    Query::builder()
        .stat(StatsAggregator::sum(column))
        .stat(StatsAggregator::average(column))
        .stat(StatsAggregator::min(column))
        .stat(StatsAggregator::max(column))
        .stat(StatsAggregator::count())
        .build()
        .unwrap()
}

#[test]
fn statistics_over_host_latency() {
    let fx = Fixture::new();
    fx.host("a", 10.0);
    fx.host("b", 0.0);
    fx.host("c", -5.0);

    let output = execute(&fx.hosts_table(), &all_stats("latency")).unwrap();
    let totals = output.totals().unwrap();
    assert_eq!(totals[0], 5.0);
    assert!((totals[1] - 5.0 / 3.0).abs() < 1e-12);
    assert_eq!(totals[2], -5.0);
    assert_eq!(totals[3], 10.0);
    assert_eq!(totals[4], 3.0);
}

#[test]
fn empty_population_reports_seed_results() {
    let fx = Fixture::new();
    let output = execute(&fx.hosts_table(), &all_stats("latency")).unwrap();
    assert_eq!(
        output.totals().unwrap(),
        [0.0, 0.0, f64::INFINITY, f64::NEG_INFINITY, 0.0]
    );
}

#[test]
fn filtered_statistics_follow_live_state() {
    let fx = Fixture::new();
    let web = fx.host("web-01", 1.0);
    fx.host("db-01", 2.0);

    let query = || -> Query<HostsTable> {
        Query::builder()
            .filter(ColumnFilter::new("state", CompareOp::Equal, 1).unwrap())
            .stat(StatsAggregator::count())
            .build()
            .unwrap()
    };
    let table = fx.hosts_table();
    assert_eq!(execute(&table, &query()).unwrap().totals(), Some(&[0.0][..]));

    web.update(|h| {
        h.checkable
            .process_check_result(&CheckResult::at(ServiceState::Critical, "down", Utc::now()));
    });
    assert_eq!(execute(&table, &query()).unwrap().totals(), Some(&[1.0][..]));
}

#[test]
fn services_grouped_by_joined_host_column() {
    let fx = Fixture::new();
    let web = fx.host("web-01", 0.0);
    let db = fx.host("db-01", 0.0);
    fx.service(&web, "http", ServiceState::Ok);
    fx.service(&web, "https", ServiceState::Critical);
    fx.service(&db, "pgsql", ServiceState::Warning);

    let query = Query::builder()
        .column("host_name")
        .stat(StatsAggregator::count())
        .stat(StatsAggregator::max("state"))
        .stat(StatsAggregator::average("latency"))
        .build()
        .unwrap();
    let output = execute(&fx.services_table(), &query).unwrap();

    let groups = output.groups().unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].key.parts(), ["db-01"]);
    assert_eq!(groups[0].values, [1.0, 1.0, 1.0]);
    assert_eq!(groups[1].key.parts(), ["web-01"]);
    assert_eq!(groups[1].values, [2.0, 2.0, 1.0]);
}

#[test]
fn combined_filters_over_services() {
    let fx = Fixture::new();
    let web = fx.host("web-01", 0.0);
    let db = fx.host("db-01", 0.0);
    fx.service(&web, "http", ServiceState::Ok);
    fx.service(&web, "https", ServiceState::Critical);
    fx.service(&db, "pgsql", ServiceState::Critical);

    let problems_on_web: Vec<Box<dyn Filter<ServicesTable>>> = vec![
        Box::new(ColumnFilter::new("host_name", CompareOp::Match, "^web").unwrap()),
        Box::new(NotFilter::new(Box::new(
            ColumnFilter::new("state", CompareOp::Equal, 0).unwrap(),
        ))),
    ];
    let query = Query::builder()
        .columns(["description", "host_address", "plugin_output"])
        .filter(AndFilter::new(problems_on_web))
        .build()
        .unwrap();

    let output = execute(&fx.services_table(), &query).unwrap();
    assert_eq!(
        output.rows().unwrap(),
        [vec![
            Value::from("https"),
            Value::from("web-01.example"),
            Value::from("https Critical"),
        ]]
    );
}

#[test]
fn non_numeric_policy_controls_string_columns() {
    let fx = Fixture::new();
    let a = fx.host("a", 0.0);
    fx.host("b", 0.0);
    a.update(|h| h.checkable.plugin_output = "42".to_string());

    let zero = LiveConfig::default();
    let skip = LiveConfig {
        non_numeric: NonNumericPolicy::Skip,
        ..LiveConfig::default()
    };

    for (config, expected_avg, expected_min) in [(zero, 21.0, 0.0), (skip, 42.0, 42.0)] {
        let query = Query::builder()
            .stat(config.aggregator(StatKind::Average, Some("plugin_output")))
            .stat(config.aggregator(StatKind::Min, Some("plugin_output")))
            .stat(config.aggregator(StatKind::Count, None))
            .build()
            .unwrap();
        let output = execute(&fx.hosts_table(), &query).unwrap();
        assert_eq!(output.totals().unwrap(), [expected_avg, expected_min, 2.0]);
    }
}

#[test]
fn unknown_columns_are_rejected_up_front() {
    let fx = Fixture::new();
    fx.host("a", 1.0);
    let query = Query::builder()
        .column("name")
        .filter(ColumnFilter::new("no_such_column", CompareOp::Equal, 1).unwrap())
        .build()
        .unwrap();
    let err = execute(&fx.hosts_table(), &query).unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("no_such_column"));
}

#[test]
fn runtime_executes_against_shared_table() {
    let fx = Fixture::new();
    fx.host("a", 2.0);
    fx.host("b", 4.0);

    let config = LiveConfig::from_json_str(r#"{"runtime": {"workers": 2, "queue_capacity": 4}}"#).unwrap();
    let runtime = QueryRuntime::new(&config.runtime).unwrap();
    let table = Arc::new(fx.hosts_table());

    let handles: Vec<_> = (0..4)
        .map(|_| runtime.execute_async(Arc::clone(&table), all_stats("latency")).unwrap())
        .collect();
    for handle in handles {
        let output = handle.join().unwrap();
        assert_eq!(output.totals().unwrap(), [6.0, 3.0, 2.0, 4.0, 2.0]);
    }
}
