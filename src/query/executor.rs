//! Single-pass query execution.

use std::time::Instant;

use tracing::debug;

use super::{Query, QueryOutput};
use crate::aggregator::{GroupKey, GroupMap};
use crate::error::LiveResult;
use crate::table::Table;

/// Runs `query` against `table` on the calling thread.
///
/// Rows are streamed once. Each column read locks the one object it touches
/// and releases it before the next read, so the executor never holds an
/// object lock between rows or while taking another one.
///
/// An ungrouped statistics query always reports its single group, with
/// empty-group results when no row matched.
///
/// # Errors
/// Validation errors for unknown columns; no row is read in that case.
pub fn execute<T: Table + ?Sized>(table: &T, query: &Query<T>) -> LiveResult<QueryOutput> {
    query.validate(table.schema())?;

    let started = Instant::now();
    let mut scanned = 0usize;
    let mut matched = 0usize;

    let output = if query.is_stats() {
        let stats = query.stats();
        let mut groups = GroupMap::new(stats.len());
        if query.columns().is_empty() {
            groups.slots(GroupKey::implicit());
        }

        for row in table.rows() {
            scanned += 1;
            if !query.matches(table, &row) {
                continue;
            }
            matched += 1;

            let slots = groups.slots(GroupKey::from_row(table, &row, query.columns()));
            for (aggregator, slot) in stats.iter().zip(slots.iter_mut()) {
                aggregator.apply(table, &row, slot);
            }
        }

        QueryOutput::Stats {
            columns: query.columns().to_vec(),
            stats: query.stat_labels(),
            groups: groups.finish(stats),
        }
    } else {
        let mut rows = Vec::new();
        for row in table.rows() {
            scanned += 1;
            if !query.matches(table, &row) {
                continue;
            }
            matched += 1;
            rows.push(
                query
                    .columns()
                    .iter()
                    .map(|column| table.get_value(&row, column))
                    .collect(),
            );
        }

        QueryOutput::Rows {
            columns: query.columns().to_vec(),
            rows,
        }
    };

    debug!(
        table = table.name(),
        scanned,
        matched,
        results = output.len(),
        elapsed_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX),
        "query executed"
    );

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::StatsAggregator;
    use crate::query::{ColumnFilter, CompareOp};
    use crate::testing::ValueTable;
    use crate::value::Value;

    #[test]
    fn test_ungrouped_stats() {
        let table = ValueTable::new(&[10.into(), 0.into(), (-5).into()]);
        let query = Query::builder()
            .stat(StatsAggregator::sum("a"))
            .stat(StatsAggregator::average("a"))
            .stat(StatsAggregator::min("a"))
            .stat(StatsAggregator::max("a"))
            .stat(StatsAggregator::count())
            .build()
            .unwrap();

        let output = execute(&table, &query).unwrap();
        let totals = output.totals().unwrap();
        assert_eq!(totals[0], 5.0);
        assert!((totals[1] - 5.0 / 3.0).abs() < 1e-12);
        assert_eq!(&totals[2..], &[-5.0, 10.0, 3.0]);
    }

    #[test]
    fn test_empty_table_reports_implicit_group() {
        let table = ValueTable::new(&[]);
        let query = Query::builder()
            .stat(StatsAggregator::sum("a"))
            .stat(StatsAggregator::min("a"))
            .stat(StatsAggregator::average("a"))
            .build()
            .unwrap();

        let output = execute(&table, &query).unwrap();
        assert_eq!(output.totals(), Some(&[0.0, f64::INFINITY, 0.0][..]));
    }

    #[test]
    fn test_grouped_stats_in_key_order() {
        let table = ValueTable::grouped(&[("web", 2.0), ("db", 7.0), ("web", 4.0)]);
        let query = Query::builder()
            .column("group")
            .stat(StatsAggregator::sum("a"))
            .stat(StatsAggregator::count())
            .build()
            .unwrap();

        let output = execute(&table, &query).unwrap();
        let groups = output.groups().unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key.parts(), ["db"]);
        assert_eq!(groups[0].values, [7.0, 1.0]);
        assert_eq!(groups[1].key.parts(), ["web"]);
        assert_eq!(groups[1].values, [6.0, 2.0]);
        assert!(output.totals().is_none());
    }

    #[test]
    fn test_grouped_query_without_matches_has_no_groups() {
        let table = ValueTable::grouped(&[("web", 2.0)]);
        let query = Query::builder()
            .column("group")
            .filter(ColumnFilter::new("a", CompareOp::Greater, 100).unwrap())
            .stat(StatsAggregator::count())
            .build()
            .unwrap();

        assert!(execute(&table, &query).unwrap().is_empty());
    }

    #[test]
    fn test_row_query_returns_requested_columns() {
        let table = ValueTable::grouped(&[("web", 2.0), ("db", 7.0)]);
        let query = Query::builder()
            .columns(["group", "a"])
            .filter(ColumnFilter::new("a", CompareOp::Less, 5).unwrap())
            .build()
            .unwrap();

        let output = execute(&table, &query).unwrap();
        assert_eq!(output.rows().unwrap(), [vec![Value::from("web"), Value::Float(2.0)]]);
    }

    #[test]
    fn test_unknown_column_fails_before_reading() {
        let table = ValueTable::new(&[1.into()]);
        let query = Query::builder().column("nope").build().unwrap();
        let err = execute(&table, &query).unwrap_err();
        assert!(err.is_validation());
    }
}
