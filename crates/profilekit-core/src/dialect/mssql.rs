use indexmap::IndexMap;
use tiberius::{AuthMethod, Client, Config, Query, Row};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use crate::config::{ConnectionSettings, EngineKind};
use crate::dialect::ident::{qualify, quote};
use crate::dialect::{
    attach_foreign_keys, attach_primary_keys, bytes_to_mb, queries, DialectAdapter,
};
use crate::error::{ProfileError, Result};
use crate::types::{BasicStats, ColumnDescriptor, ValueCount};

type MssqlClient = Client<Compat<TcpStream>>;

/// SQL Server adapter over a single tiberius connection.
pub struct MssqlAdapter {
    client: MssqlClient,
    schema: String,
}

impl MssqlAdapter {
    pub async fn connect(settings: &ConnectionSettings) -> Result<Self> {
        let mut config = Config::new();
        config.host(&settings.host);
        config.port(settings.port);
        config.database(&settings.database);
        config.authentication(AuthMethod::sql_server(&settings.user, &settings.password));
        config.application_name("profilekit");
        config.readonly(true);
        if settings.trust_server_cert {
            config.trust_cert();
        }

        let conn_err = |source: tiberius::error::Error| ProfileError::MssqlConnection {
            message: "could not open a SQL Server session".to_string(),
            connection_hint: settings.connection_hint(),
            source,
        };

        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| {
                conn_err(tiberius::error::Error::Io {
                    kind: e.kind(),
                    message: e.to_string(),
                })
            })?;
        tcp.set_nodelay(true).ok();

        let client = Client::connect(config, tcp.compat_write())
            .await
            .map_err(conn_err)?;

        Ok(Self {
            client,
            schema: settings.schema.clone(),
        })
    }

    /// Run a parameterized statement and collect its first result set.
    async fn fetch<'a>(
        &mut self,
        label: &str,
        sql: &'a str,
        params: Vec<Param<'a>>,
    ) -> Result<Vec<Row>> {
        let mut query = Query::new(sql);
        for param in params {
            match param {
                Param::Text(s) => query.bind(s),
                Param::Int(i) => query.bind(i),
            }
        }
        let err = |source| ProfileError::MssqlQuery {
            query: label.to_string(),
            source,
        };
        let stream = query.query(&mut self.client).await.map_err(err)?;
        stream.into_first_result().await.map_err(err)
    }
}

enum Param<'a> {
    Text(&'a str),
    Int(i64),
}

fn text(row: &Row, idx: usize, label: &str) -> Result<String> {
    row.try_get::<&str, _>(idx)
        .map(|v| v.unwrap_or_default().to_string())
        .map_err(|source| ProfileError::MssqlQuery {
            query: label.to_string(),
            source,
        })
}

fn int(row: &Row, idx: usize, label: &str) -> Result<Option<i64>> {
    row.try_get::<i64, _>(idx)
        .map_err(|source| ProfileError::MssqlQuery {
            query: label.to_string(),
            source,
        })
}

fn to_u64(v: Option<i64>) -> u64 {
    v.unwrap_or(0).max(0) as u64
}

impl DialectAdapter for MssqlAdapter {
    fn engine(&self) -> EngineKind {
        EngineKind::Mssql
    }

    async fn catalog_tables(&mut self) -> Result<Vec<String>> {
        let sql = "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES \
                   WHERE TABLE_SCHEMA = @P1 AND TABLE_TYPE = 'BASE TABLE' ORDER BY TABLE_NAME";
        let schema = self.schema.clone();
        let rows = self
            .fetch("fetch tables", sql, vec![Param::Text(&schema)])
            .await?;
        rows.iter().map(|r| text(r, 0, "fetch tables")).collect()
    }

    async fn export_ddl(&mut self, scope: &[String]) -> Result<String> {
        let schema = self.schema.clone();
        let sql = r#"
            SELECT
                c.TABLE_NAME,
                c.COLUMN_NAME,
                c.DATA_TYPE,
                CAST(ISNULL(c.CHARACTER_MAXIMUM_LENGTH, 0) AS BIGINT),
                CAST(ISNULL(c.NUMERIC_PRECISION, 0) AS BIGINT),
                CAST(ISNULL(c.NUMERIC_SCALE, 0) AS BIGINT),
                c.IS_NULLABLE,
                ISNULL(c.COLUMN_DEFAULT, '')
            FROM INFORMATION_SCHEMA.COLUMNS c
            JOIN INFORMATION_SCHEMA.TABLES t
                ON t.TABLE_SCHEMA = c.TABLE_SCHEMA AND t.TABLE_NAME = c.TABLE_NAME
            WHERE c.TABLE_SCHEMA = @P1 AND t.TABLE_TYPE = 'BASE TABLE'
            ORDER BY c.TABLE_NAME, c.ORDINAL_POSITION
        "#;
        let label = "fetch ddl columns";
        let rows = self.fetch(label, sql, vec![Param::Text(&schema)]).await?;

        let mut tables: IndexMap<String, DdlTable> = IndexMap::new();
        for row in &rows {
            let table = text(row, 0, label)?;
            if !scope.is_empty() && !scope.contains(&table) {
                continue;
            }
            let column = DdlColumn {
                name: text(row, 1, label)?,
                data_type: text(row, 2, label)?,
                max_length: int(row, 3, label)?.unwrap_or(0),
                precision: int(row, 4, label)?.unwrap_or(0),
                scale: int(row, 5, label)?.unwrap_or(0),
                nullable: text(row, 6, label)? == "YES",
                default: text(row, 7, label)?,
            };
            tables.entry(table).or_default().columns.push(column);
        }

        let sql = r#"
            SELECT tc.TABLE_NAME, tc.CONSTRAINT_NAME, kcu.COLUMN_NAME
            FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
            JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu
                ON kcu.CONSTRAINT_NAME = tc.CONSTRAINT_NAME
                AND kcu.TABLE_SCHEMA = tc.TABLE_SCHEMA
                AND kcu.TABLE_NAME = tc.TABLE_NAME
            WHERE tc.CONSTRAINT_TYPE = 'PRIMARY KEY' AND tc.TABLE_SCHEMA = @P1
            ORDER BY tc.TABLE_NAME, kcu.ORDINAL_POSITION
        "#;
        let label = "fetch ddl primary keys";
        let rows = self.fetch(label, sql, vec![Param::Text(&schema)]).await?;
        for row in &rows {
            let table = text(row, 0, label)?;
            if let Some(entry) = tables.get_mut(&table) {
                entry.pk_name = Some(text(row, 1, label)?);
                entry.pk_columns.push(text(row, 2, label)?);
            }
        }

        let mut ddl = String::new();
        for (name, table) in &tables {
            ddl.push_str(&render_create_table(&schema, name, table)?);
            ddl.push('\n');
        }
        Ok(ddl)
    }

    async fn table_exists(&mut self, table: &str) -> Result<bool> {
        let sql = "SELECT COUNT_BIG(*) FROM INFORMATION_SCHEMA.TABLES \
                   WHERE TABLE_SCHEMA = @P1 AND TABLE_NAME = @P2 AND TABLE_TYPE = 'BASE TABLE'";
        let schema = self.schema.clone();
        let rows = self
            .fetch(
                "check table exists",
                sql,
                vec![Param::Text(&schema), Param::Text(table)],
            )
            .await?;
        let count = match rows.first() {
            Some(row) => to_u64(int(row, 0, "check table exists")?),
            None => 0,
        };
        Ok(count > 0)
    }

    async fn table_size_mb(&mut self, table: &str) -> f64 {
        let sql = r#"
            SELECT CAST(ISNULL(SUM(a.total_pages), 0) AS BIGINT) * 8192
            FROM sys.tables t
            JOIN sys.schemas s ON t.schema_id = s.schema_id
            JOIN sys.indexes i ON t.object_id = i.object_id
            JOIN sys.partitions p ON i.object_id = p.object_id AND i.index_id = p.index_id
            JOIN sys.allocation_units a ON p.partition_id = a.container_id
            WHERE s.name = @P1 AND t.name = @P2
        "#;
        let schema = self.schema.clone();
        let rows = self
            .fetch(
                "table size",
                sql,
                vec![Param::Text(&schema), Param::Text(table)],
            )
            .await;
        let bytes = rows.and_then(|rows| match rows.first() {
            Some(row) => int(row, 0, "table size").map(to_u64),
            None => Ok(0),
        });
        match bytes {
            Ok(bytes) => bytes_to_mb(bytes),
            Err(e) => {
                tracing::debug!("Size lookup for {} failed: {}", table, e);
                0.0
            }
        }
    }

    async fn describe_columns(&mut self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        let schema = self.schema.clone();
        let sql = r#"
            SELECT
                c.COLUMN_NAME,
                c.DATA_TYPE,
                ISNULL(c.COLUMN_DEFAULT, ''),
                ISNULL(CAST(ep.value AS NVARCHAR(4000)), '')
            FROM INFORMATION_SCHEMA.COLUMNS c
            LEFT JOIN sys.extended_properties ep
                ON ep.class = 1
                AND ep.name = 'MS_Description'
                AND ep.major_id = OBJECT_ID(QUOTENAME(c.TABLE_SCHEMA) + '.' + QUOTENAME(c.TABLE_NAME))
                AND ep.minor_id = COLUMNPROPERTY(
                    OBJECT_ID(QUOTENAME(c.TABLE_SCHEMA) + '.' + QUOTENAME(c.TABLE_NAME)),
                    c.COLUMN_NAME, 'ColumnId')
            WHERE c.TABLE_SCHEMA = @P1 AND c.TABLE_NAME = @P2
            ORDER BY c.ORDINAL_POSITION
        "#;
        let label = "fetch columns";
        let rows = self
            .fetch(label, sql, vec![Param::Text(&schema), Param::Text(table)])
            .await?;
        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut column = ColumnDescriptor::new(text(row, 0, label)?, text(row, 1, label)?);
            column.default_value = text(row, 2, label)?;
            column.comment = text(row, 3, label)?;
            columns.push(column);
        }

        let sql = r#"
            SELECT kcu.COLUMN_NAME
            FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
            JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu
                ON kcu.CONSTRAINT_NAME = tc.CONSTRAINT_NAME
                AND kcu.TABLE_SCHEMA = tc.TABLE_SCHEMA
                AND kcu.TABLE_NAME = tc.TABLE_NAME
            WHERE tc.CONSTRAINT_TYPE = 'PRIMARY KEY'
                AND tc.TABLE_SCHEMA = @P1 AND tc.TABLE_NAME = @P2
            ORDER BY kcu.ORDINAL_POSITION
        "#;
        let label = "fetch primary keys";
        let rows = self
            .fetch(label, sql, vec![Param::Text(&schema), Param::Text(table)])
            .await?;
        let pks = rows
            .iter()
            .map(|r| text(r, 0, label))
            .collect::<Result<Vec<_>>>()?;
        attach_primary_keys(&mut columns, &pks);

        let sql = r#"
            SELECT pc.name, rt.name, rc.name
            FROM sys.foreign_key_columns fkc
            JOIN sys.tables pt ON fkc.parent_object_id = pt.object_id
            JOIN sys.schemas s ON pt.schema_id = s.schema_id
            JOIN sys.columns pc
                ON fkc.parent_object_id = pc.object_id AND fkc.parent_column_id = pc.column_id
            JOIN sys.tables rt ON fkc.referenced_object_id = rt.object_id
            JOIN sys.columns rc
                ON fkc.referenced_object_id = rc.object_id
                AND fkc.referenced_column_id = rc.column_id
            WHERE s.name = @P1 AND pt.name = @P2
            ORDER BY fkc.constraint_object_id, fkc.constraint_column_id
        "#;
        let label = "fetch foreign keys";
        let rows = self
            .fetch(label, sql, vec![Param::Text(&schema), Param::Text(table)])
            .await?;
        let mut fks = Vec::with_capacity(rows.len());
        for row in &rows {
            fks.push((text(row, 0, label)?, text(row, 1, label)?, text(row, 2, label)?));
        }
        attach_foreign_keys(&mut columns, fks);

        Ok(columns)
    }

    async fn basic_stats(&mut self, table: &str, column: &str) -> Result<BasicStats> {
        let sql = queries::basic_stats_query(EngineKind::Mssql, &self.schema, table, column)?;
        let rows = self.fetch(&sql, &sql, vec![]).await?;
        let Some(row) = rows.first() else {
            return Ok(BasicStats::default());
        };
        Ok(BasicStats {
            total: to_u64(int(row, 0, &sql)?),
            nulls: to_u64(int(row, 1, &sql)?),
            empties: to_u64(int(row, 2, &sql)?),
            zeros: to_u64(int(row, 3, &sql)?),
            max_length: to_u64(int(row, 4, &sql)?),
            distinct: int(row, 5, &sql)?.map(|d| d.max(0) as u64),
        })
    }

    async fn min_max(&mut self, table: &str, column: &str) -> Result<(String, String)> {
        let sql = queries::min_max_query(EngineKind::Mssql, &self.schema, table, column)?;
        let rows = self.fetch(&sql, &sql, vec![]).await?;
        match rows.first() {
            Some(row) => Ok((text(row, 0, &sql)?, text(row, 1, &sql)?)),
            None => Ok((String::new(), String::new())),
        }
    }

    async fn top_values(&mut self, table: &str, column: &str, n: usize) -> Result<Vec<ValueCount>> {
        let sql = queries::top_values_query(EngineKind::Mssql, &self.schema, table, column)?;
        let rows = self.fetch(&sql, &sql, vec![Param::Int(n as i64)]).await?;
        rows.iter()
            .map(|row| {
                Ok(ValueCount {
                    value: text(row, 0, &sql)?,
                    count: to_u64(int(row, 1, &sql)?),
                })
            })
            .collect()
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
        let sql = queries::sample_values_query(EngineKind::Mssql, &self.schema, table, column)?;
        let params = vec![
            Param::Int(i64::try_from(max_length).unwrap_or(i64::MAX)),
            Param::Int(i64::try_from(limit).unwrap_or(i64::MAX)),
        ];
        let rows = self.fetch(&sql, &sql, params).await?;
        rows.iter().map(|row| text(row, 0, &sql)).collect()
    }
}

/// Catalog shape of one column, as needed to re-create it.
#[derive(Debug, Clone, Default)]
pub struct DdlColumn {
    pub name: String,
    pub data_type: String,
    /// Character length; `-1` means `MAX`.
    pub max_length: i64,
    pub precision: i64,
    pub scale: i64,
    pub nullable: bool,
    pub default: String,
}

#[derive(Debug, Clone, Default)]
pub struct DdlTable {
    pub columns: Vec<DdlColumn>,
    pub pk_name: Option<String>,
    pub pk_columns: Vec<String>,
}

fn render_type(col: &DdlColumn) -> String {
    let base = col.data_type.to_lowercase();
    match base.as_str() {
        "char" | "varchar" | "nchar" | "nvarchar" | "binary" | "varbinary" => {
            if col.max_length == -1 {
                format!("{}(MAX)", base)
            } else if col.max_length > 0 {
                format!("{}({})", base, col.max_length)
            } else {
                base
            }
        }
        "decimal" | "numeric" => format!("{}({},{})", base, col.precision, col.scale),
        _ => base,
    }
}

/// `CREATE TABLE` statement for one table with its primary key constraint.
pub fn render_create_table(schema: &str, name: &str, table: &DdlTable) -> Result<String> {
    let mut lines = Vec::with_capacity(table.columns.len() + 1);
    for col in &table.columns {
        let mut line = format!(
            "    {} {} {}",
            quote(EngineKind::Mssql, &col.name)?,
            render_type(col),
            if col.nullable { "NULL" } else { "NOT NULL" }
        );
        if !col.default.is_empty() {
            line.push_str(" DEFAULT ");
            line.push_str(&col.default);
        }
        lines.push(line);
    }
    if !table.pk_columns.is_empty() {
        let cols = table
            .pk_columns
            .iter()
            .map(|c| quote(EngineKind::Mssql, c))
            .collect::<Result<Vec<_>>>()?;
        let constraint = match &table.pk_name {
            Some(pk) => format!("CONSTRAINT {} ", quote(EngineKind::Mssql, pk)?),
            None => String::new(),
        };
        lines.push(format!("    {}PRIMARY KEY ({})", constraint, cols.join(", ")));
    }
    Ok(format!(
        "CREATE TABLE {} (\n{}\n);\n",
        qualify(EngineKind::Mssql, schema, name)?,
        lines.join(",\n")
    ))
}
