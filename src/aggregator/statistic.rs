//! Statistic kinds and their accumulators.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The statistic computed by an aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    Sum,
    Count,
    Min,
    Max,
    Average,
}

impl fmt::Display for StatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Sum => "sum",
            Self::Count => "count",
            Self::Min => "min",
            Self::Max => "max",
            Self::Average => "avg",
        };
        f.write_str(name)
    }
}

/// Seed, combine and finalize rules of one statistic.
///
/// Combining is order independent up to floating point rounding.
pub trait Statistic {
    /// Running state of one group.
    type Acc: Copy + fmt::Debug + PartialEq;

    /// Kind reported for this statistic.
    const KIND: StatKind;

    /// Accumulator of a group that has not seen a row yet.
    fn seed() -> Self::Acc;

    /// Folds one row value into the accumulator.
    fn combine(acc: Self::Acc, value: f64) -> Self::Acc;

    /// Final result of the accumulator.
    fn finalize(acc: Self::Acc) -> f64;
}

/// Sum of all values; 0 when empty.
#[derive(Debug, Clone, Copy)]
pub struct Sum;

impl Statistic for Sum {
    type Acc = f64;
    const KIND: StatKind = StatKind::Sum;

    fn seed() -> f64 {
        0.0
    }

    fn combine(acc: f64, value: f64) -> f64 {
        acc + value
    }

    fn finalize(acc: f64) -> f64 {
        acc
    }
}

/// Counts rows; the value is ignored.
#[derive(Debug, Clone, Copy)]
pub struct Count;

impl Statistic for Count {
    type Acc = u64;
    const KIND: StatKind = StatKind::Count;

    fn seed() -> u64 {
        0
    }

    fn combine(acc: u64, _value: f64) -> u64 {
        acc + 1
    }

    #[allow(clippy::cast_precision_loss)]
    fn finalize(acc: u64) -> f64 {
        acc as f64
    }
}

/// Smallest value; `+inf` for an empty group.
#[derive(Debug, Clone, Copy)]
pub struct Min;

impl Statistic for Min {
    type Acc = f64;
    const KIND: StatKind = StatKind::Min;

    fn seed() -> f64 {
        f64::INFINITY
    }

    fn combine(acc: f64, value: f64) -> f64 {
        acc.min(value)
    }

    fn finalize(acc: f64) -> f64 {
        acc
    }
}

/// Largest value; `-inf` for an empty group.
#[derive(Debug, Clone, Copy)]
pub struct Max;

impl Statistic for Max {
    type Acc = f64;
    const KIND: StatKind = StatKind::Max;

    fn seed() -> f64 {
        f64::NEG_INFINITY
    }

    fn combine(acc: f64, value: f64) -> f64 {
        acc.max(value)
    }

    fn finalize(acc: f64) -> f64 {
        acc
    }
}

/// Running sum and count of an average.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Mean {
    pub sum: f64,
    pub count: u64,
}

/// Arithmetic mean; 0 for an empty group.
#[derive(Debug, Clone, Copy)]
pub struct Average;

impl Statistic for Average {
    type Acc = Mean;
    const KIND: StatKind = StatKind::Average;

    fn seed() -> Mean {
        Mean::default()
    }

    fn combine(acc: Mean, value: f64) -> Mean {
        Mean {
            sum: acc.sum + value,
            count: acc.count + 1,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn finalize(acc: Mean) -> f64 {
        if acc.count == 0 {
            0.0
        } else {
            acc.sum / acc.count as f64
        }
    }
}

/// Per-group accumulator of one aggregator.
///
/// Created on the first row of its group and consumed by
/// [`finalize`](Self::finalize), so a finalized accumulator cannot be read
/// again:
///
/// ```compile_fail
/// use livestate::aggregator::{Accumulator, StatKind};
///
/// let mut acc = Accumulator::seed(StatKind::Sum);
/// acc.combine(1.0);
/// let first = acc.finalize();
/// let second = acc.finalize();
/// ```
#[derive(Debug, PartialEq)]
pub enum Accumulator {
    Sum(f64),
    Count(u64),
    Min(f64),
    Max(f64),
    Average(Mean),
}

impl Accumulator {
    /// A fresh accumulator for `kind`.
    #[must_use]
    pub fn seed(kind: StatKind) -> Self {
        match kind {
            StatKind::Sum => Self::Sum(Sum::seed()),
            StatKind::Count => Self::Count(Count::seed()),
            StatKind::Min => Self::Min(Min::seed()),
            StatKind::Max => Self::Max(Max::seed()),
            StatKind::Average => Self::Average(Average::seed()),
        }
    }

    /// The statistic this accumulator computes.
    #[must_use]
    pub const fn kind(&self) -> StatKind {
        match self {
            Self::Sum(_) => StatKind::Sum,
            Self::Count(_) => StatKind::Count,
            Self::Min(_) => StatKind::Min,
            Self::Max(_) => StatKind::Max,
            Self::Average(_) => StatKind::Average,
        }
    }

    /// Folds one value in.
    pub fn combine(&mut self, value: f64) {
        match self {
            Self::Sum(acc) => *acc = Sum::combine(*acc, value),
            Self::Count(acc) => *acc = Count::combine(*acc, value),
            Self::Min(acc) => *acc = Min::combine(*acc, value),
            Self::Max(acc) => *acc = Max::combine(*acc, value),
            Self::Average(acc) => *acc = Average::combine(*acc, value),
        }
    }

    /// Reads the result and releases the accumulator.
    #[must_use]
    pub fn finalize(self) -> f64 {
        match self {
            Self::Sum(acc) => Sum::finalize(acc),
            Self::Count(acc) => Count::finalize(acc),
            Self::Min(acc) => Min::finalize(acc),
            Self::Max(acc) => Max::finalize(acc),
            Self::Average(acc) => Average::finalize(acc),
        }
    }
}
