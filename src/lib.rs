//! # livestate - live object locking and streaming statistics
//!
//! livestate is the runtime core behind a monitoring status interface. A graph
//! of live objects (hosts, services, checks) is mutated by worker threads
//! while query threads read consistent per-object values and compute
//! statistics over filtered sets of rows.
//!
//! ## Core Concepts
//!
//! - **LiveObject**: identity plus mutable state behind the object's own lock
//! - **ObjectGuard / ObjectLock**: scoped acquisition, released on every exit path
//! - **Table**: lazy rows over live objects with named, typed columns
//! - **Aggregator**: Sum, Count, Min, Max and Average folded row by row
//! - **Query**: columns, filter and statistics, executed in one pass
//!
//! ## Usage
//!
//! ```rust,ignore
//! use livestate::aggregator::StatsAggregator;
//! use livestate::query::{execute, ColumnFilter, CompareOp, Query};
//! use livestate::table::ServicesTable;
//!
//! let table = ServicesTable::new(services);
//! let query = Query::builder()
//!     .column("host_name")
//!     .filter(ColumnFilter::new("state", CompareOp::NotEqual, 0)?)
//!     .stat(StatsAggregator::average("latency"))
//!     .stat(StatsAggregator::count())
//!     .build()?;
//! let output = execute(&table, &query)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Objects and locking
pub mod error;
pub mod lock;
pub mod model;
pub mod object;
pub mod registry;
pub mod value;

// Rows and statistics
pub mod aggregator;
pub mod config;
pub mod query;
pub mod table;

#[cfg(test)]
mod testing;

pub use aggregator::{Accumulator, Aggregator, NonNumericPolicy, StatKind, StatsAggregator};
pub use config::LiveConfig;
pub use error::{ConfigError, ExecutionError, LiveError, LiveResult, RegistryError, ValidationError};
pub use lock::{ObjectGuard, ObjectLock};
pub use model::{CheckResult, Checkable, Host, HostState, Service, ServiceState, StateType};
pub use object::{LiveObject, ObjectId, ObjectType};
pub use query::{execute, Query, QueryBuilder, QueryOutput, QueryRuntime, QueryRuntimeConfig};
pub use registry::ObjectRegistry;
pub use table::{HostsTable, ServicesTable, Table};
pub use value::Value;
