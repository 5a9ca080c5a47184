use anyhow::{Context, Result};
use comfy_table::{Cell, CellAlignment, Table as ComfyTable};

use profilekit_core::report::read_report_file;
use profilekit_core::report::summary::{summarize, TableSummary};

use crate::args::{SummaryArgs, SummaryFormat};

pub fn run(args: &SummaryArgs) -> Result<()> {
    let records = read_report_file(&args.report)
        .with_context(|| format!("Failed to read report {}", args.report.display()))?;
    let summaries = summarize(&records);

    match args.format {
        SummaryFormat::Json => {
            let json = serde_json::to_string_pretty(&summaries)?;
            println!("{}", json);
        }
        SummaryFormat::Table => {
            println!(
                "Report: {}  Tables: {}  Columns: {}",
                args.report.display(),
                summaries.len(),
                records.len()
            );
            println!();
            println!("{}", render_table(&summaries));
        }
    }

    Ok(())
}

fn render_table(summaries: &[TableSummary]) -> ComfyTable {
    let mut t = ComfyTable::new();
    t.set_header(vec![
        "Table",
        "Rows",
        "Size (MB)",
        "Columns",
        "All NULL",
        "Skipped",
        "Errors",
        "Completeness",
    ]);
    for s in summaries {
        let completeness = s
            .avg_completeness_pct
            .map(|pct| format!("{:.1}%", pct))
            .unwrap_or_else(|| "-".to_string());
        t.add_row(vec![
            Cell::new(&s.table),
            Cell::new(s.total_rows).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.2}", s.table_size_mb)).set_alignment(CellAlignment::Right),
            Cell::new(s.columns).set_alignment(CellAlignment::Right),
            Cell::new(s.fully_null_columns).set_alignment(CellAlignment::Right),
            Cell::new(s.skipped_columns).set_alignment(CellAlignment::Right),
            Cell::new(s.error_columns).set_alignment(CellAlignment::Right),
            Cell::new(completeness).set_alignment(CellAlignment::Right),
        ]);
    }
    t
}
