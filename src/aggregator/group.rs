//! Group key to accumulator map.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Accumulator, Aggregator};
use crate::table::Table;

/// Values of the grouping columns for one group.
///
/// Each part is the text form of the column value (see [`Value`]'s
/// `Display`), following the livestatus convention of grouping by output
/// text. Values with the same text share a group: `Null` and `""`, `1`,
/// `1.0` and `"1"`, and timestamps within the same second.
///
/// The empty key is the single implicit group of an ungrouped query.
///
/// [`Value`]: crate::value::Value
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupKey(Vec<String>);

impl GroupKey {
    /// The implicit group of an ungrouped query.
    #[must_use]
    pub const fn implicit() -> Self {
        Self(Vec::new())
    }

    /// Key with the given grouping column values.
    #[must_use]
    pub fn new(parts: Vec<String>) -> Self {
        Self(parts)
    }

    /// Reads the grouping `columns` of `row`.
    pub fn from_row<T: Table + ?Sized>(table: &T, row: &T::Row, columns: &[String]) -> Self {
        Self(
            columns
                .iter()
                .map(|column| table.get_value(row, column).to_string())
                .collect(),
        )
    }

    /// Column values of the key, in grouping column order.
    #[must_use]
    pub fn parts(&self) -> &[String] {
        &self.0
    }

    /// Returns true for the single group of an ungrouped query.
    #[must_use]
    pub fn is_implicit(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(";"))
    }
}

/// Finalized statistics of one group, in aggregator order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub key: GroupKey,
    pub values: Vec<f64>,
}

/// Accumulator slots per group, one slot per aggregator of the query.
///
/// A slot stays `None` until the group's first row reaches that aggregator.
#[derive(Debug)]
pub struct GroupMap {
    width: usize,
    groups: BTreeMap<GroupKey, Vec<Option<Accumulator>>>,
}

impl GroupMap {
    /// A map for queries with `width` aggregators.
    #[must_use]
    pub fn new(width: usize) -> Self {
        Self {
            width,
            groups: BTreeMap::new(),
        }
    }

    /// The slots of `key`, creating the group on first use.
    pub fn slots(&mut self, key: GroupKey) -> &mut [Option<Accumulator>] {
        let width = self.width;
        self.groups
            .entry(key)
            .or_insert_with(|| std::iter::repeat_with(|| None).take(width).collect())
    }

    /// Number of groups seen so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns true if no row has been grouped yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Finalizes every accumulator exactly once, in ascending key order.
    ///
    /// Slots never reached report the aggregator's empty-group result.
    pub fn finish<T: Table + ?Sized>(self, aggregators: &[Box<dyn Aggregator<T>>]) -> Vec<GroupStats> {
        debug_assert_eq!(aggregators.len(), self.width);
        self.groups
            .into_iter()
            .map(|(key, slots)| GroupStats {
                key,
                values: aggregators
                    .iter()
                    .zip(slots)
                    .map(|(aggregator, slot)| match slot {
                        Some(state) => aggregator.result_and_free_state(state),
                        None => aggregator.empty_result(),
                    })
                    .collect(),
            })
            .collect()
    }
}
