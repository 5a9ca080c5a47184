use anyhow::{Context, Result};
use comfy_table::{Cell, Table as ComfyTable};

use profilekit_core::dialect::{self, DialectAdapter};

use crate::args::TablesArgs;

pub async fn run(args: &TablesArgs) -> Result<()> {
    let config = super::load_config(&args.source, &args.source.overrides())?;

    let mut adapter = dialect::connect(&config.connection).await?;
    let tables = adapter
        .list_tables(&config.tables)
        .await
        .context("Failed to list tables")?;

    println!(
        "Database: {} ({})  Schema: {}",
        config.connection.database, config.connection.engine, config.connection.schema
    );
    println!("Tables in scope: {}", tables.len());
    println!();

    let mut t = ComfyTable::new();
    t.set_header(vec!["#", "Table", "Exists", "Size (MB)"]);
    for (i, table) in tables.iter().enumerate() {
        let exists = adapter.table_exists(table).await.unwrap_or(false);
        let size = if exists {
            format!("{:.2}", adapter.table_size_mb(table).await)
        } else {
            String::new()
        };
        t.add_row(vec![
            Cell::new(i + 1),
            Cell::new(table),
            Cell::new(if exists { "yes" } else { "no" }),
            Cell::new(size),
        ]);
    }
    println!("{}", t);

    Ok(())
}
