//! Streaming statistics over table rows.
//!
//! An [`Aggregator`] folds one column of every row it is shown into a
//! per-group [`Accumulator`]. Accumulators are created lazily on the first row
//! of their group, never shared between groups, and finalized exactly once.
//! Aggregators carry no synchronization of their own: each query runs on one
//! thread and owns its accumulators.

mod group;
mod statistic;

pub use group::{GroupKey, GroupMap, GroupStats};
pub use statistic::{Accumulator, Average, Count, Max, Mean, Min, StatKind, Statistic, Sum};

use serde::{Deserialize, Serialize};

use crate::table::Table;
use crate::value::Value;

/// What a numeric statistic does with a value that is absent or does not
/// read as a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonNumericPolicy {
    /// The value contributes 0.
    #[default]
    Zero,
    /// The row is left out of Sum, Min, Max and Average.
    Skip,
}

impl NonNumericPolicy {
    /// The number `value` contributes, or `None` if the row is skipped.
    #[must_use]
    pub fn coerce(self, value: &Value) -> Option<f64> {
        match (value.as_number(), self) {
            (Some(n), _) => Some(n),
            (None, Self::Zero) => Some(0.0),
            (None, Self::Skip) => None,
        }
    }
}

/// One statistic over rows of `T`.
///
/// The query executor owns one state slot per (aggregator, group) and hands
/// it to [`apply`](Self::apply) for every matching row of that group.
pub trait Aggregator<T: Table + ?Sized>: Send + Sync {
    /// The statistic this aggregator computes.
    fn kind(&self) -> StatKind;

    /// The column read per row; `None` for a plain row count.
    fn attribute(&self) -> Option<&str>;

    /// Folds `row` into `state`, seeding it on first use.
    fn apply(&self, table: &T, row: &T::Row, state: &mut Option<Accumulator>);

    /// Consumes the group's state and returns the final value.
    fn result_and_free_state(&self, state: Accumulator) -> f64 {
        state.finalize()
    }

    /// Result for a group this aggregator never saw a row of.
    fn empty_result(&self) -> f64 {
        Accumulator::seed(self.kind()).finalize()
    }
}

/// The standard aggregator: one [`StatKind`] over one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsAggregator {
    kind: StatKind,
    attribute: Option<String>,
    policy: NonNumericPolicy,
}

impl StatsAggregator {
    /// Aggregator for `kind`, reading `attribute` per row.
    #[must_use]
    pub fn new(kind: StatKind, attribute: Option<String>) -> Self {
        Self {
            kind,
            attribute,
            policy: NonNumericPolicy::default(),
        }
    }

    /// Sum of `attribute`.
    #[must_use]
    pub fn sum(attribute: impl Into<String>) -> Self {
        Self::new(StatKind::Sum, Some(attribute.into()))
    }

    /// Counts matching rows.
    #[must_use]
    pub fn count() -> Self {
        Self::new(StatKind::Count, None)
    }

    /// Minimum of `attribute`.
    #[must_use]
    pub fn min(attribute: impl Into<String>) -> Self {
        Self::new(StatKind::Min, Some(attribute.into()))
    }

    /// Maximum of `attribute`.
    #[must_use]
    pub fn max(attribute: impl Into<String>) -> Self {
        Self::new(StatKind::Max, Some(attribute.into()))
    }

    /// Mean of `attribute`.
    #[must_use]
    pub fn average(attribute: impl Into<String>) -> Self {
        Self::new(StatKind::Average, Some(attribute.into()))
    }

    /// Replaces the handling of values that do not read as numbers.
    #[must_use]
    pub fn with_policy(mut self, policy: NonNumericPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Handling of values that do not read as numbers.
    #[must_use]
    pub const fn policy(&self) -> NonNumericPolicy {
        self.policy
    }
}

impl<T: Table + ?Sized> Aggregator<T> for StatsAggregator {
    fn kind(&self) -> StatKind {
        self.kind
    }

    fn attribute(&self) -> Option<&str> {
        self.attribute.as_deref()
    }

    fn apply(&self, table: &T, row: &T::Row, state: &mut Option<Accumulator>) {
        let acc = state.get_or_insert_with(|| Accumulator::seed(self.kind));

        if self.kind == StatKind::Count {
            acc.combine(1.0);
            return;
        }

        let value = self
            .attribute
            .as_deref()
            .map_or(Value::Null, |column| table.get_value(row, column));
        if let Some(n) = self.policy.coerce(&value) {
            acc.combine(n);
        }
    }
}
