use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::{Executor, Row};

use crate::config::{ConnectionSettings, EngineKind};
use crate::dialect::dump::{mysqldump_command, run_dump};
use crate::dialect::{attach_foreign_keys, bytes_to_mb, queries, DialectAdapter};
use crate::error::{ProfileError, Result};
use crate::types::{BasicStats, ColumnDescriptor, ValueCount};

pub struct MySqlAdapter {
    pool: MySqlPool,
    settings: ConnectionSettings,
}

impl MySqlAdapter {
    pub async fn connect(settings: &ConnectionSettings) -> Result<Self> {
        let options = MySqlConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .username(&settings.user)
            .password(&settings.password)
            .database(&settings.database);

        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    conn.execute("SET SESSION TRANSACTION READ ONLY").await?;
                    Ok(())
                })
            })
            .connect_with(options)
            .await
            .map_err(|e| ProfileError::Connection {
                message: "could not open a MySQL session".to_string(),
                connection_hint: settings.connection_hint(),
                source: e,
            })?;

        Ok(Self::new(pool, settings.clone()))
    }

    pub fn new(pool: MySqlPool, settings: ConnectionSettings) -> Self {
        Self { pool, settings }
    }

    fn schema(&self) -> &str {
        &self.settings.schema
    }
}

fn query_err(query: &str) -> impl FnOnce(sqlx::Error) -> ProfileError + '_ {
    move |e| ProfileError::Query {
        query: query.to_string(),
        source: e,
    }
}

fn to_u64(v: Option<i64>) -> u64 {
    v.unwrap_or(0).max(0) as u64
}

impl DialectAdapter for MySqlAdapter {
    fn engine(&self) -> EngineKind {
        EngineKind::MySql
    }

    async fn catalog_tables(&mut self) -> Result<Vec<String>> {
        let query = "SELECT CAST(table_name AS CHAR) FROM information_schema.tables \
                     WHERE table_schema = ? AND table_type = 'BASE TABLE' ORDER BY table_name";
        let rows = sqlx::query(query)
            .bind(self.schema())
            .fetch_all(&self.pool)
            .await
            .map_err(query_err("fetch tables"))?;

        rows.iter()
            .map(|row| row.try_get::<String, _>(0).map_err(query_err("fetch tables")))
            .collect()
    }

    async fn export_ddl(&mut self, scope: &[String]) -> Result<String> {
        let command = mysqldump_command(&self.settings, scope);
        run_dump(EngineKind::MySql, &command, &self.settings.password).await
    }

    async fn table_exists(&mut self, table: &str) -> Result<bool> {
        let query = "SELECT COUNT(*) FROM information_schema.tables \
                     WHERE table_schema = ? AND table_name = ? AND table_type = 'BASE TABLE'";
        let count: i64 = sqlx::query_scalar(query)
            .bind(self.schema())
            .bind(table)
            .fetch_one(&self.pool)
            .await
            .map_err(query_err("check table exists"))?;
        Ok(count > 0)
    }

    async fn table_size_mb(&mut self, table: &str) -> f64 {
        let query = "SELECT CAST(COALESCE(data_length, 0) + COALESCE(index_length, 0) AS UNSIGNED) \
                     FROM information_schema.tables WHERE table_schema = ? AND table_name = ?";
        let bytes: std::result::Result<Option<u64>, sqlx::Error> = sqlx::query_scalar(query)
            .bind(self.schema())
            .bind(table)
            .fetch_optional(&self.pool)
            .await;
        match bytes {
            Ok(bytes) => bytes_to_mb(bytes.unwrap_or(0)),
            Err(e) => {
                tracing::debug!("Size lookup for {} failed: {}", table, e);
                0.0
            }
        }
    }

    async fn describe_columns(&mut self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        let query = r#"
            SELECT
                CAST(column_name AS CHAR),
                CAST(data_type AS CHAR),
                CAST(column_key AS CHAR),
                CAST(COALESCE(column_default, '') AS CHAR),
                CAST(COALESCE(column_comment, '') AS CHAR)
            FROM information_schema.columns
            WHERE table_schema = ? AND table_name = ?
            ORDER BY ordinal_position
        "#;
        let rows = sqlx::query(query)
            .bind(self.schema())
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(query_err("fetch columns"))?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let get = |i: usize| {
                row.try_get::<Option<String>, _>(i)
                    .map(Option::unwrap_or_default)
                    .map_err(query_err("fetch columns"))
            };
            let mut column = ColumnDescriptor::new(get(0)?, get(1)?);
            column.is_primary_key = get(2)? == "PRI";
            column.default_value = get(3)?;
            column.comment = get(4)?;
            columns.push(column);
        }

        let query = r#"
            SELECT
                CAST(column_name AS CHAR),
                CAST(referenced_table_name AS CHAR),
                CAST(referenced_column_name AS CHAR)
            FROM information_schema.key_column_usage
            WHERE table_schema = ? AND table_name = ?
                AND referenced_table_name IS NOT NULL
            ORDER BY constraint_name, ordinal_position
        "#;
        let rows = sqlx::query(query)
            .bind(self.schema())
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(query_err("fetch foreign keys"))?;

        let mut fks = Vec::with_capacity(rows.len());
        for row in &rows {
            fks.push((
                row.try_get::<String, _>(0).map_err(query_err("fetch foreign keys"))?,
                row.try_get::<String, _>(1).map_err(query_err("fetch foreign keys"))?,
                row.try_get::<String, _>(2).map_err(query_err("fetch foreign keys"))?,
            ));
        }
        attach_foreign_keys(&mut columns, fks);

        Ok(columns)
    }

    async fn basic_stats(&mut self, table: &str, column: &str) -> Result<BasicStats> {
        let query = queries::basic_stats_query(EngineKind::MySql, self.schema(), table, column)?;
        let row = sqlx::query(&query)
            .fetch_one(&self.pool)
            .await
            .map_err(query_err(&query))?;

        let get = |i: usize| {
            row.try_get::<Option<i64>, _>(i)
                .map_err(query_err(&query))
        };
        Ok(BasicStats {
            total: to_u64(get(0)?),
            nulls: to_u64(get(1)?),
            empties: to_u64(get(2)?),
            zeros: to_u64(get(3)?),
            max_length: to_u64(get(4)?),
            distinct: get(5)?.map(|d| d.max(0) as u64),
        })
    }

    async fn min_max(&mut self, table: &str, column: &str) -> Result<(String, String)> {
        let query = queries::min_max_query(EngineKind::MySql, self.schema(), table, column)?;
        let row = sqlx::query(&query)
            .fetch_one(&self.pool)
            .await
            .map_err(query_err(&query))?;
        let min: Option<String> = row.try_get(0).map_err(query_err(&query))?;
        let max: Option<String> = row.try_get(1).map_err(query_err(&query))?;
        Ok((min.unwrap_or_default(), max.unwrap_or_default()))
    }

    async fn top_values(&mut self, table: &str, column: &str, n: usize) -> Result<Vec<ValueCount>> {
        let query = queries::top_values_query(EngineKind::MySql, self.schema(), table, column)?;
        let rows = sqlx::query(&query)
            .bind(n as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(query_err(&query))?;

        let mut values = Vec::with_capacity(rows.len());
        for row in &rows {
            let value: Option<String> = row.try_get(0).map_err(query_err(&query))?;
            let count: i64 = row.try_get(1).map_err(query_err(&query))?;
            values.push(ValueCount {
                value: value.unwrap_or_default(),
                count: count.max(0) as u64,
            });
        }
        Ok(values)
    }

    async fn sample_values(
        &mut self,
        table: &str,
        column: &str,
        limit: u64,
        max_length: usize,
    ) -> Result<Vec<String>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let query = queries::sample_values_query(EngineKind::MySql, self.schema(), table, column)?;
        let rows = sqlx::query(&query)
            .bind(max_length as i64)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(query_err(&query))?;

        rows.iter()
            .map(|row| {
                row.try_get::<Option<String>, _>(0)
                    .map(Option::unwrap_or_default)
                    .map_err(query_err(&query))
            })
            .collect()
    }
}
