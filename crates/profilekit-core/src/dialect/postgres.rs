use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::{Executor, Row};

use crate::config::{ConnectionSettings, EngineKind};
use crate::dialect::dump::{pg_dump_command, run_dump};
use crate::dialect::ident::qualify;
use crate::dialect::{attach_foreign_keys, attach_primary_keys, bytes_to_mb, queries, DialectAdapter};
use crate::error::{ProfileError, Result};
use crate::types::{BasicStats, ColumnDescriptor, ValueCount};

pub struct PostgresAdapter {
    pool: PgPool,
    settings: ConnectionSettings,
}

impl PostgresAdapter {
    pub async fn connect(settings: &ConnectionSettings) -> Result<Self> {
        let options = PgConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .username(&settings.user)
            .password(&settings.password)
            .database(&settings.database)
            .application_name("profilekit");

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    conn.execute("SET SESSION CHARACTERISTICS AS TRANSACTION READ ONLY")
                        .await?;
                    Ok(())
                })
            })
            .connect_with(options)
            .await
            .map_err(|e| ProfileError::Connection {
                message: "could not open a PostgreSQL session".to_string(),
                connection_hint: settings.connection_hint(),
                source: e,
            })?;

        Ok(Self::new(pool, settings.clone()))
    }

    pub fn new(pool: PgPool, settings: ConnectionSettings) -> Self {
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

impl DialectAdapter for PostgresAdapter {
    fn engine(&self) -> EngineKind {
        EngineKind::Postgres
    }

    async fn catalog_tables(&mut self) -> Result<Vec<String>> {
        let query = "SELECT table_name::text FROM information_schema.tables \
                     WHERE table_schema = $1 AND table_type = 'BASE TABLE' ORDER BY table_name";
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
        let command = pg_dump_command(&self.settings, scope);
        run_dump(EngineKind::Postgres, &command, &self.settings.password).await
    }

    async fn table_exists(&mut self, table: &str) -> Result<bool> {
        let query = "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
                     WHERE table_schema = $1 AND table_name = $2 AND table_type = 'BASE TABLE')";
        sqlx::query_scalar(query)
            .bind(self.schema())
            .bind(table)
            .fetch_one(&self.pool)
            .await
            .map_err(query_err("check table exists"))
    }

    async fn table_size_mb(&mut self, table: &str) -> f64 {
        let Ok(qualified) = qualify(EngineKind::Postgres, self.schema(), table) else {
            return 0.0;
        };
        let bytes: std::result::Result<Option<i64>, sqlx::Error> =
            sqlx::query_scalar("SELECT pg_total_relation_size(to_regclass($1))")
                .bind(&qualified)
                .fetch_one(&self.pool)
                .await;
        match bytes {
            Ok(bytes) => bytes_to_mb(to_u64(bytes)),
            Err(e) => {
                tracing::debug!("Size lookup for {} failed: {}", table, e);
                0.0
            }
        }
    }

    async fn describe_columns(&mut self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        let query = r#"
            SELECT
                c.column_name::text,
                CASE WHEN c.data_type = 'USER-DEFINED' THEN c.udt_name::text
                     ELSE c.data_type::text END,
                COALESCE(c.column_default::text, ''),
                COALESCE(col_description(
                    format('%I.%I', c.table_schema, c.table_name)::regclass,
                    c.ordinal_position::int
                ), '')
            FROM information_schema.columns c
            WHERE c.table_schema = $1 AND c.table_name = $2
            ORDER BY c.ordinal_position
        "#;
        let rows = sqlx::query(query)
            .bind(self.schema())
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(query_err("fetch columns"))?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let get = |i: usize| row.try_get::<String, _>(i).map_err(query_err("fetch columns"));
            let mut column = ColumnDescriptor::new(get(0)?, get(1)?);
            column.default_value = get(2)?;
            column.comment = get(3)?;
            columns.push(column);
        }

        let query = r#"
            SELECT kcu.column_name::text
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
                AND tc.table_name = kcu.table_name
            WHERE tc.table_schema = $1 AND tc.table_name = $2
                AND tc.constraint_type = 'PRIMARY KEY'
            ORDER BY kcu.ordinal_position
        "#;
        let pks: Vec<String> = sqlx::query_scalar(query)
            .bind(self.schema())
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(query_err("fetch primary keys"))?;
        attach_primary_keys(&mut columns, &pks);

        let query = r#"
            SELECT
                kcu.column_name::text,
                ref.table_name::text,
                ref.column_name::text
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
                AND tc.table_name = kcu.table_name
            JOIN information_schema.referential_constraints rc
                ON tc.constraint_name = rc.constraint_name
                AND tc.constraint_schema = rc.constraint_schema
            JOIN information_schema.key_column_usage ref
                ON rc.unique_constraint_name = ref.constraint_name
                AND rc.unique_constraint_schema = ref.constraint_schema
                AND kcu.position_in_unique_constraint = ref.ordinal_position
            WHERE tc.table_schema = $1 AND tc.table_name = $2
                AND tc.constraint_type = 'FOREIGN KEY'
            ORDER BY tc.constraint_name, kcu.ordinal_position
        "#;
        let fks: Vec<(String, String, String)> = sqlx::query_as(query)
            .bind(self.schema())
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(query_err("fetch foreign keys"))?;
        attach_foreign_keys(&mut columns, fks);

        Ok(columns)
    }

    async fn basic_stats(&mut self, table: &str, column: &str) -> Result<BasicStats> {
        let query = queries::basic_stats_query(EngineKind::Postgres, self.schema(), table, column)?;
        let row: (i64, i64, i64, i64, i64, Option<i64>) = sqlx::query_as(&query)
            .fetch_one(&self.pool)
            .await
            .map_err(query_err(&query))?;

        Ok(BasicStats {
            total: to_u64(Some(row.0)),
            nulls: to_u64(Some(row.1)),
            empties: to_u64(Some(row.2)),
            zeros: to_u64(Some(row.3)),
            max_length: to_u64(Some(row.4)),
            distinct: row.5.map(|d| d.max(0) as u64),
        })
    }

    async fn min_max(&mut self, table: &str, column: &str) -> Result<(String, String)> {
        let query = queries::min_max_query(EngineKind::Postgres, self.schema(), table, column)?;
        let (min, max): (Option<String>, Option<String>) = sqlx::query_as(&query)
            .fetch_one(&self.pool)
            .await
            .map_err(query_err(&query))?;
        Ok((min.unwrap_or_default(), max.unwrap_or_default()))
    }

    async fn top_values(&mut self, table: &str, column: &str, n: usize) -> Result<Vec<ValueCount>> {
        let query = queries::top_values_query(EngineKind::Postgres, self.schema(), table, column)?;
        let rows: Vec<(Option<String>, i64)> = sqlx::query_as(&query)
            .bind(n as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(query_err(&query))?;

        Ok(rows
            .into_iter()
            .map(|(value, count)| ValueCount {
                value: value.unwrap_or_default(),
                count: count.max(0) as u64,
            })
            .collect())
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
        let query = queries::sample_values_query(EngineKind::Postgres, self.schema(), table, column)?;
        let values: Vec<Option<String>> = sqlx::query_scalar(&query)
            .bind(i32::try_from(max_length).unwrap_or(i32::MAX))
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(query_err(&query))?;
        Ok(values.into_iter().map(Option::unwrap_or_default).collect())
    }
}
