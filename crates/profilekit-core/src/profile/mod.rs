//! # Table Iterator
//!
//! Drives the column profiler over every table of the run, strictly one table
//! and one column at a time, and hands each record to the report writer as
//! soon as it exists.

pub mod column;

use std::io::Write;
use std::time::{Duration, Instant};

use crate::config::ProfileConfig;
use crate::dialect::DialectAdapter;
use crate::error::Result;
use crate::report::ReportWriter;

pub use column::{profile_column, ColumnProfile, ProfileSettings};

/// Progress callbacks. Every method has a no-op default.
pub trait ProgressObserver {
    fn on_tables_listed(&mut self, _total: usize) {}

    fn on_table_start(&mut self, _index: usize, _total: usize, _table: &str) {}

    fn on_table_skipped(&mut self, _index: usize, _total: usize, _table: &str, _reason: &str) {}

    fn on_table_done(
        &mut self,
        _index: usize,
        _total: usize,
        _table: &str,
        _columns: usize,
        _elapsed: Duration,
    ) {
    }

    fn on_finish(&mut self, _summary: &RunSummary) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {}

/// Observer that reports progress through `tracing`.
#[derive(Debug, Default)]
pub struct LogObserver;

impl ProgressObserver for LogObserver {
    fn on_tables_listed(&mut self, total: usize) {
        tracing::info!("Profiling {} table(s)", total);
    }

    fn on_table_skipped(&mut self, index: usize, total: usize, table: &str, reason: &str) {
        tracing::info!("[{}/{}] {} skipped: {}", index, total, table, reason);
    }

    fn on_table_done(
        &mut self,
        index: usize,
        total: usize,
        table: &str,
        columns: usize,
        elapsed: Duration,
    ) {
        tracing::info!(
            "[{}/{}] {} done ({} columns, {:.1}s elapsed)",
            index,
            total,
            table,
            columns,
            elapsed.as_secs_f64()
        );
    }
}

/// Counters for a finished run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub tables_total: usize,
    pub tables_profiled: usize,
    pub tables_skipped: usize,
    pub columns_profiled: usize,
    pub columns_skipped: usize,
    /// Columns where at least one statistic query failed.
    pub column_errors: usize,
    pub elapsed: Duration,
}

/// Profile every table in scope and stream the records into `report`.
///
/// Listing the tables is the only adapter failure that aborts the run. A
/// table that vanished or cannot be described is skipped; column failures
/// are recorded inline. Write failures on the report propagate.
pub async fn run_profile<A, W, O>(
    adapter: &mut A,
    config: &ProfileConfig,
    report: &mut ReportWriter<W>,
    observer: &mut O,
) -> Result<RunSummary>
where
    A: DialectAdapter,
    W: Write,
    O: ProgressObserver + ?Sized,
{
    let started = Instant::now();
    let settings = ProfileSettings::from_config(&config.sampling);
    let tables = adapter.list_tables(&config.tables).await?;
    let total = tables.len();
    observer.on_tables_listed(total);

    let mut summary = RunSummary {
        tables_total: total,
        ..Default::default()
    };

    for (i, table) in tables.iter().enumerate() {
        let index = i + 1;
        observer.on_table_start(index, total, table);

        match adapter.table_exists(table).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!("Table {} no longer exists, skipping", table);
                summary.tables_skipped += 1;
                observer.on_table_skipped(index, total, table, "table does not exist");
                continue;
            }
            Err(e) => {
                tracing::warn!("Could not check table {}: {}", table, e);
                summary.tables_skipped += 1;
                observer.on_table_skipped(index, total, table, &e.to_string());
                continue;
            }
        }

        let size_mb = adapter.table_size_mb(table).await;
        let columns = match adapter.describe_columns(table).await {
            Ok(columns) => columns,
            Err(e) => {
                tracing::warn!("Could not describe table {}: {}", table, e);
                summary.tables_skipped += 1;
                observer.on_table_skipped(index, total, table, &e.to_string());
                continue;
            }
        };

        for column in &columns {
            let profile = profile_column(adapter, table, column, size_mb, &settings).await;
            if profile.skipped {
                summary.columns_skipped += 1;
            } else {
                summary.columns_profiled += 1;
            }
            if profile.has_errors() {
                summary.column_errors += 1;
            }
            report.write_record(&profile.record)?;
        }

        summary.tables_profiled += 1;
        observer.on_table_done(index, total, table, columns.len(), started.elapsed());
    }

    summary.elapsed = started.elapsed();
    observer.on_finish(&summary);
    Ok(summary)
}
