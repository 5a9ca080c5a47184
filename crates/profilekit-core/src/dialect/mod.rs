//! # Dialect Adapters
//!
//! One adapter per engine, all behind [`DialectAdapter`]. Adapters own their
//! connection, run every statement read-only, and never build SQL by pasting
//! values: identifiers are quoted through [`ident`], values are bound.
//!
//! [`Adapter`] is the closed set of live engines; the profiler and the table
//! iterator stay generic over the trait so tests can substitute an in-memory
//! implementation.

pub mod dump;
pub mod ident;
pub mod mssql;
pub mod mysql;
pub mod postgres;
pub mod queries;

use std::future::Future;

use crate::config::{ConnectionSettings, EngineKind};
use crate::error::Result;
use crate::types::{BasicStats, ColumnDescriptor, ValueCount};

pub use mssql::MssqlAdapter;
pub use mysql::MySqlAdapter;
pub use postgres::PostgresAdapter;

/// Types MySQL columns are never profiled for.
pub const MYSQL_SKIPPED_TYPES: &[&str] = &[
    "tinyblob",
    "blob",
    "mediumblob",
    "longblob",
    "binary",
    "varbinary",
    "geometry",
    "point",
    "linestring",
    "polygon",
    "multipoint",
    "multilinestring",
    "multipolygon",
    "geometrycollection",
];

pub const POSTGRES_SKIPPED_TYPES: &[&str] = &["bytea", "geometry", "geography"];

pub const MSSQL_SKIPPED_TYPES: &[&str] = &[
    "image",
    "text",
    "ntext",
    "binary",
    "geography",
    "geometry",
    "varbinary",
];

/// Skip list for an engine.
pub fn skipped_types_for(engine: EngineKind) -> &'static [&'static str] {
    match engine {
        EngineKind::MySql => MYSQL_SKIPPED_TYPES,
        EngineKind::Postgres => POSTGRES_SKIPPED_TYPES,
        EngineKind::Mssql => MSSQL_SKIPPED_TYPES,
    }
}

/// Engine-specific catalog and statistics access.
///
/// Methods take `&mut self` because the SQL Server client is a single
/// mutable connection; the sqlx adapters are pinned to one pooled connection
/// to match.
pub trait DialectAdapter: Send {
    fn engine(&self) -> EngineKind;

    /// Types whose columns get a skipped record instead of statistics.
    fn skipped_types(&self) -> &'static [&'static str] {
        skipped_types_for(self.engine())
    }

    /// Base tables of the target schema, ordered by name.
    fn catalog_tables(&mut self) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Tables to profile: `scope` verbatim when non-empty, else the catalog.
    fn list_tables(
        &mut self,
        scope: &[String],
    ) -> impl Future<Output = Result<Vec<String>>> + Send {
        let scope = scope.to_vec();
        async move {
            if !scope.is_empty() {
                return Ok(scope);
            }
            self.catalog_tables().await
        }
    }

    /// Schema-only DDL text for the scoped tables, or the whole schema when
    /// `scope` is empty.
    fn export_ddl(&mut self, scope: &[String]) -> impl Future<Output = Result<String>> + Send;

    fn table_exists(&mut self, table: &str) -> impl Future<Output = Result<bool>> + Send;

    /// On-disk size (data plus indexes) in MiB, rounded to two decimals.
    /// Any failure reads as `0.0`.
    fn table_size_mb(&mut self, table: &str) -> impl Future<Output = f64> + Send;

    /// Columns in ordinal order with key, default and comment metadata.
    fn describe_columns(
        &mut self,
        table: &str,
    ) -> impl Future<Output = Result<Vec<ColumnDescriptor>>> + Send;

    fn basic_stats(
        &mut self,
        table: &str,
        column: &str,
    ) -> impl Future<Output = Result<BasicStats>> + Send;

    /// Min and max as text; empty strings for an all-null column.
    fn min_max(
        &mut self,
        table: &str,
        column: &str,
    ) -> impl Future<Output = Result<(String, String)>> + Send;

    fn top_values(
        &mut self,
        table: &str,
        column: &str,
        n: usize,
    ) -> impl Future<Output = Result<Vec<ValueCount>>> + Send;

    /// Up to `limit` non-null values, each truncated to `max_length`
    /// characters. Duplicates are possible; callers dedupe.
    fn sample_values(
        &mut self,
        table: &str,
        column: &str,
        limit: u64,
        max_length: usize,
    ) -> impl Future<Output = Result<Vec<String>>> + Send;
}

/// Convert a byte count to MiB with two decimals.
pub fn bytes_to_mb(bytes: u64) -> f64 {
    let mb = bytes as f64 / (1024.0 * 1024.0);
    (mb * 100.0).round() / 100.0
}

/// A connected adapter for whichever engine the settings name.
pub enum Adapter {
    MySql(MySqlAdapter),
    Postgres(PostgresAdapter),
    Mssql(MssqlAdapter),
}

/// Open a read-only session against the configured engine.
pub async fn connect(settings: &ConnectionSettings) -> Result<Adapter> {
    tracing::info!(
        "Connecting to {} at {}",
        settings.engine,
        settings.connection_hint()
    );
    Ok(match settings.engine {
        EngineKind::MySql => Adapter::MySql(MySqlAdapter::connect(settings).await?),
        EngineKind::Postgres => Adapter::Postgres(PostgresAdapter::connect(settings).await?),
        EngineKind::Mssql => Adapter::Mssql(MssqlAdapter::connect(settings).await?),
    })
}

macro_rules! delegate {
    ($self:ident, $a:ident => $body:expr) => {
        match $self {
            Adapter::MySql($a) => $body,
            Adapter::Postgres($a) => $body,
            Adapter::Mssql($a) => $body,
        }
    };
}

impl DialectAdapter for Adapter {
    fn engine(&self) -> EngineKind {
        delegate!(self, a => a.engine())
    }

    async fn catalog_tables(&mut self) -> Result<Vec<String>> {
        delegate!(self, a => a.catalog_tables().await)
    }

    async fn export_ddl(&mut self, scope: &[String]) -> Result<String> {
        delegate!(self, a => a.export_ddl(scope).await)
    }

    async fn table_exists(&mut self, table: &str) -> Result<bool> {
        delegate!(self, a => a.table_exists(table).await)
    }

    async fn table_size_mb(&mut self, table: &str) -> f64 {
        delegate!(self, a => a.table_size_mb(table).await)
    }

    async fn describe_columns(&mut self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        delegate!(self, a => a.describe_columns(table).await)
    }

    async fn basic_stats(&mut self, table: &str, column: &str) -> Result<BasicStats> {
        delegate!(self, a => a.basic_stats(table, column).await)
    }

    async fn min_max(&mut self, table: &str, column: &str) -> Result<(String, String)> {
        delegate!(self, a => a.min_max(table, column).await)
    }

    async fn top_values(&mut self, table: &str, column: &str, n: usize) -> Result<Vec<ValueCount>> {
        delegate!(self, a => a.top_values(table, column, n).await)
    }

    async fn sample_values(
        &mut self,
        table: &str,
        column: &str,
        limit: u64,
        max_length: usize,
    ) -> Result<Vec<String>> {
        delegate!(self, a => a.sample_values(table, column, limit, max_length).await)
    }
}

/// First foreign key per column wins when a column sits in several. A
/// reference reported as empty or the literal `NULL` is dropped.
pub(crate) fn attach_foreign_keys(
    columns: &mut [ColumnDescriptor],
    fks: Vec<(String, String, String)>,
) {
    for (column, ref_table, ref_column) in fks {
        if ref_table.is_empty() || ref_table.eq_ignore_ascii_case("NULL") {
            continue;
        }
        if let Some(col) = columns.iter_mut().find(|c| c.name == column) {
            if col.foreign_key.is_none() {
                col.foreign_key = Some(crate::types::ForeignKeyRef {
                    table: ref_table,
                    column: ref_column,
                });
            }
        }
    }
}

pub(crate) fn attach_primary_keys(columns: &mut [ColumnDescriptor], pks: &[String]) {
    for col in columns.iter_mut() {
        if pks.iter().any(|pk| pk == &col.name) {
            col.is_primary_key = true;
        }
    }
}
