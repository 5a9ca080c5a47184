//! Per-table rollup of a profiling report.

use indexmap::IndexMap;
use serde::Serialize;

use crate::types::{KeyFlag, ProfilingRecord};

/// Marker prefix the profiler writes into `Sample_Values` for skip-listed types.
pub const SKIPPED_MARKER_PREFIX: &str = "(Skipped:";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSummary {
    pub table: String,
    pub total_rows: u64,
    pub table_size_mb: f64,
    pub columns: usize,
    /// Columns with rows where every value is null.
    pub fully_null_columns: usize,
    pub skipped_columns: usize,
    pub error_columns: usize,
    /// Mean percentage of values that are not null, empty or `"0"`, over
    /// columns that have rows; `None` for an
    /// empty table.
    pub avg_completeness_pct: Option<f64>,
}

/// Summarize records per table, in report order.
pub fn summarize(records: &[ProfilingRecord]) -> Vec<TableSummary> {
    let mut by_table: IndexMap<&str, Vec<&ProfilingRecord>> = IndexMap::new();
    for record in records {
        by_table.entry(record.table.as_str()).or_default().push(record);
    }

    by_table
        .into_iter()
        .map(|(table, rows)| {
            let mut completeness = Vec::new();
            let mut summary = TableSummary {
                table: table.to_string(),
                total_rows: 0,
                table_size_mb: 0.0,
                columns: rows.len(),
                fully_null_columns: 0,
                skipped_columns: 0,
                error_columns: 0,
                avg_completeness_pct: None,
            };
            for r in rows {
                summary.total_rows = summary.total_rows.max(r.total_rows);
                summary.table_size_mb = summary.table_size_mb.max(r.table_size_mb);
                if r.pk == KeyFlag::Error {
                    summary.error_columns += 1;
                    continue;
                }
                if r.sample_values.starts_with(SKIPPED_MARKER_PREFIX) {
                    summary.skipped_columns += 1;
                    continue;
                }
                if r.total_rows > 0 {
                    if r.null_count >= r.total_rows {
                        summary.fully_null_columns += 1;
                    }
                    let bad = r
                        .null_count
                        .saturating_add(r.empty_count)
                        .saturating_add(r.zero_count);
                    let valid = r.total_rows.saturating_sub(bad) as f64;
                    completeness.push(valid / r.total_rows as f64 * 100.0);
                }
            }
            if !completeness.is_empty() {
                let avg = completeness.iter().sum::<f64>() / completeness.len() as f64;
                summary.avg_completeness_pct = Some((avg * 10.0).round() / 10.0);
            }
            summary
        })
        .collect()
}
