use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use profilekit_core::dialect;
use profilekit_core::profile::{run_profile, LogObserver, ProgressObserver, RunSummary};
use profilekit_core::report::ReportWriter;
use profilekit_core::run::{export_ddl, Run};

use crate::args::ProfileArgs;
use crate::logging;

/// Progress bar over tables. Every event also goes to the run log.
struct BarObserver {
    bar: ProgressBar,
    log: LogObserver,
}

impl BarObserver {
    fn new() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            log: LogObserver,
        }
    }
}

impl ProgressObserver for BarObserver {
    fn on_tables_listed(&mut self, total: usize) {
        self.log.on_tables_listed(total);
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} Profiling {bar:40.cyan/dim} {pos}/{len} {msg} ({elapsed})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        self.bar = bar;
    }

    fn on_table_start(&mut self, _index: usize, _total: usize, table: &str) {
        self.bar.set_message(table.to_string());
    }

    fn on_table_skipped(&mut self, index: usize, total: usize, table: &str, reason: &str) {
        self.log.on_table_skipped(index, total, table, reason);
        self.bar.println(format!("  skipped {}: {}", table, reason));
        self.bar.inc(1);
    }

    fn on_table_done(
        &mut self,
        index: usize,
        total: usize,
        table: &str,
        columns: usize,
        elapsed: Duration,
    ) {
        self.log.on_table_done(index, total, table, columns, elapsed);
        self.bar.inc(1);
    }

    fn on_finish(&mut self, summary: &RunSummary) {
        self.log.on_finish(summary);
        self.bar.finish_and_clear();
    }
}

pub async fn run(args: &ProfileArgs, verbose: bool) -> Result<()> {
    let config = super::load_config(&args.source, &args.overrides())?;

    let run = Run::create(&config.output.dir).context("Failed to create the run directory")?;
    logging::init(verbose, Some(&run.log_path))?;
    tracing::info!(
        "Run {} against {} ({})",
        run.id,
        config.connection.connection_hint(),
        config.connection.engine
    );
    tracing::debug!("Sampling: {:?}", config.sampling);

    let mut adapter = dialect::connect(&config.connection).await?;

    let ddl_exported = if config.output.export_ddl {
        export_ddl(&mut adapter, &config.tables, &run).await?
    } else {
        tracing::info!("DDL export disabled");
        false
    };

    let mut report = ReportWriter::create(&run.report_path)?;
    let mut observer = BarObserver::new();
    let summary = run_profile(&mut adapter, &config, &mut report, &mut observer).await?;

    println!(
        "Profiled {}/{} tables, {} columns ({} skipped, {} with errors) in {:.1}s",
        summary.tables_profiled,
        summary.tables_total,
        summary.columns_profiled + summary.columns_skipped,
        summary.columns_skipped,
        summary.column_errors,
        summary.elapsed.as_secs_f64()
    );
    if summary.tables_skipped > 0 {
        println!("  {} table(s) skipped, see the log", summary.tables_skipped);
    }
    println!("  Report: {}", run.report_path.display());
    if ddl_exported {
        println!("  DDL:    {}", run.ddl_path.display());
    } else if config.output.export_ddl {
        println!("  DDL:    {} (export failed, see the log)", run.ddl_path.display());
    }
    println!("  Log:    {}", run.log_path.display());

    Ok(())
}
