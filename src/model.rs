//! Monitoring domain objects.
//!
//! Hosts and services share the check bookkeeping in [`Checkable`]. Worker
//! threads feed [`CheckResult`]s into it under the object's lock; query
//! threads read individual fields through table columns.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::object::LiveObject;

/// Raw check state as reported by a check plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    #[default]
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl ServiceState {
    /// Numeric state code (0 = OK .. 3 = UNKNOWN).
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Ok => 0,
            Self::Warning => 1,
            Self::Critical => 2,
            Self::Unknown => 3,
        }
    }

    /// Maps a plugin exit status; anything outside 0..=2 is UNKNOWN.
    #[must_use]
    pub const fn from_exit_status(status: i32) -> Self {
        match status {
            0 => Self::Ok,
            1 => Self::Warning,
            2 => Self::Critical,
            _ => Self::Unknown,
        }
    }
}

/// Host reachability derived from the raw check state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostState {
    #[default]
    Up,
    Down,
}

impl HostState {
    /// Numeric state code as reported by status queries.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Up => 0,
            Self::Down => 1,
        }
    }
}

impl From<ServiceState> for HostState {
    fn from(state: ServiceState) -> Self {
        match state {
            ServiceState::Ok | ServiceState::Warning => Self::Up,
            ServiceState::Critical | ServiceState::Unknown => Self::Down,
        }
    }
}

/// Whether the current state is confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateType {
    Soft,
    #[default]
    Hard,
}

impl StateType {
    /// Numeric state code as reported by status queries.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Soft => 0,
            Self::Hard => 1,
        }
    }
}

/// Outcome of one check execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub state: ServiceState,
    pub output: String,
    /// When the scheduler wanted the check to run.
    pub schedule_start: DateTime<Utc>,
    pub execution_start: DateTime<Utc>,
    pub execution_end: DateTime<Utc>,
}

impl CheckResult {
    /// A result whose schedule and execution all happened at `at`.
    #[must_use]
    pub fn at(state: ServiceState, output: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            state,
            output: output.into(),
            schedule_start: at,
            execution_start: at,
            execution_end: at,
        }
    }

    /// Seconds between scheduling and the start of execution.
    #[must_use]
    pub fn latency(&self) -> f64 {
        seconds_between(self.schedule_start, self.execution_start)
    }

    /// Seconds spent executing the check.
    #[must_use]
    pub fn execution_time(&self) -> f64 {
        seconds_between(self.execution_start, self.execution_end)
    }
}

#[allow(clippy::cast_precision_loss)]
fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    ((to - from).num_milliseconds() as f64 / 1000.0).max(0.0)
}

/// Check bookkeeping shared by hosts and services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkable {
    pub state: ServiceState,
    pub state_type: StateType,
    pub check_attempt: u32,
    pub max_check_attempts: u32,
    pub last_check: Option<DateTime<Utc>>,
    pub last_state_change: Option<DateTime<Utc>>,
    pub latency: f64,
    pub execution_time: f64,
    pub plugin_output: String,
    pub acknowledged: bool,
    /// Seconds between regular checks.
    pub check_interval: f64,
    pub active_checks_enabled: bool,
}

impl Default for Checkable {
    fn default() -> Self {
        Self {
            state: ServiceState::Ok,
            state_type: StateType::Hard,
            check_attempt: 1,
            max_check_attempts: 3,
            last_check: None,
            last_state_change: None,
            latency: 0.0,
            execution_time: 0.0,
            plugin_output: String::new(),
            acknowledged: false,
            check_interval: 300.0,
            active_checks_enabled: true,
        }
    }
}

impl Checkable {
    /// Returns true once a check result has been processed.
    #[must_use]
    pub fn has_been_checked(&self) -> bool {
        self.last_check.is_some()
    }

    /// Folds a check result into the state machine.
    ///
    /// An OK result is always hard and resets the attempt counter. A problem
    /// result counts attempts up to `max_check_attempts`; the state turns hard
    /// once the limit is reached. Recovering to OK clears acknowledgements.
    pub fn process_check_result(&mut self, cr: &CheckResult) {
        let old_state = self.state;
        let was_ok = old_state == ServiceState::Ok;
        let now_ok = cr.state == ServiceState::Ok;

        if now_ok {
            self.check_attempt = 1;
            self.state_type = StateType::Hard;
            self.acknowledged = false;
        } else if was_ok {
            self.check_attempt = 1;
            self.state_type = if self.max_check_attempts <= 1 {
                StateType::Hard
            } else {
                StateType::Soft
            };
        } else if self.state_type == StateType::Soft {
            self.check_attempt = (self.check_attempt + 1).min(self.max_check_attempts);
            if self.check_attempt >= self.max_check_attempts {
                self.state_type = StateType::Hard;
            }
        }

        if old_state != cr.state || self.last_state_change.is_none() {
            self.last_state_change = Some(cr.execution_end);
        }

        self.state = cr.state;
        self.last_check = Some(cr.execution_end);
        self.latency = cr.latency();
        self.execution_time = cr.execution_time();
        self.plugin_output.clone_from(&cr.output);
    }
}

/// A monitored host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Host {
    pub address: String,
    pub checkable: Checkable,
}

impl Host {
    /// Host reachable at `address`, not yet checked.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            checkable: Checkable::default(),
        }
    }

    /// Host state derived from the last check result.
    #[must_use]
    pub fn state(&self) -> HostState {
        self.checkable.state.into()
    }
}

/// A monitored service running on a host.
///
/// The host pointer is the edge used for joined service rows.
#[derive(Debug)]
pub struct Service {
    pub host: Arc<LiveObject<Host>>,
    pub checkable: Checkable,
}

impl Service {
    /// Service running on `host`, not yet checked.
    #[must_use]
    pub fn new(host: Arc<LiveObject<Host>>) -> Self {
        Self {
            host,
            checkable: Checkable::default(),
        }
    }
}
