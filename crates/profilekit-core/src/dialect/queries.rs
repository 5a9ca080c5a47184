//! Per-engine statement templates for the column statistics.
//!
//! Identifiers are quoted through [`ident`](super::ident); every value
//! (limits, truncation length) is a bind parameter. Placeholder order is the
//! same on all engines so callers bind identically:
//!
//! - [`top_values_query`]: `n`
//! - [`sample_values_query`]: `max_length`, then `limit`

use crate::config::EngineKind;
use crate::dialect::ident::{qualify, quote};
use crate::error::Result;

/// Expression casting a column to the engine's unbounded text type.
fn text_cast(engine: EngineKind, col: &str) -> String {
    match engine {
        EngineKind::MySql => format!("CAST({} AS CHAR)", col),
        EngineKind::Postgres => format!("CAST({} AS TEXT)", col),
        EngineKind::Mssql => format!("CAST({} AS NVARCHAR(MAX))", col),
    }
}

/// One aggregate pass returning, in order: total, nulls, empties, zeros,
/// max text length, distinct count. All six are 64-bit integers.
pub fn basic_stats_query(
    engine: EngineKind,
    schema: &str,
    table: &str,
    column: &str,
) -> Result<String> {
    let tbl = qualify(engine, schema, table)?;
    let col = quote(engine, column)?;
    let txt = text_cast(engine, &col);
    Ok(match engine {
        EngineKind::MySql => format!(
            "SELECT COUNT(*), \
             CAST(COALESCE(SUM(CASE WHEN {col} IS NULL THEN 1 ELSE 0 END), 0) AS SIGNED), \
             CAST(COALESCE(SUM(CASE WHEN {txt} = '' THEN 1 ELSE 0 END), 0) AS SIGNED), \
             CAST(COALESCE(SUM(CASE WHEN {txt} = '0' THEN 1 ELSE 0 END), 0) AS SIGNED), \
             CAST(COALESCE(MAX(CHAR_LENGTH({txt})), 0) AS SIGNED), \
             COUNT(DISTINCT {col}) \
             FROM {tbl}",
        ),
        EngineKind::Postgres => format!(
            "SELECT COUNT(*)::int8, \
             COUNT(*) FILTER (WHERE {col} IS NULL)::int8, \
             COUNT(*) FILTER (WHERE {txt} = '')::int8, \
             COUNT(*) FILTER (WHERE {txt} = '0')::int8, \
             COALESCE(MAX(LENGTH({txt})), 0)::int8, \
             COUNT(DISTINCT {col})::int8 \
             FROM {tbl}",
        ),
        EngineKind::Mssql => format!(
            "SELECT COUNT_BIG(*), \
             CAST(ISNULL(SUM(CASE WHEN {col} IS NULL THEN 1 ELSE 0 END), 0) AS BIGINT), \
             CAST(ISNULL(SUM(CASE WHEN {txt} = N'' THEN 1 ELSE 0 END), 0) AS BIGINT), \
             CAST(ISNULL(SUM(CASE WHEN {txt} = N'0' THEN 1 ELSE 0 END), 0) AS BIGINT), \
             CAST(ISNULL(MAX(LEN({txt})), 0) AS BIGINT), \
             COUNT_BIG(DISTINCT {col}) \
             FROM {tbl}",
        ),
    })
}

/// Minimum and maximum, both cast to text after aggregation so ordering
/// follows the column's native type.
pub fn min_max_query(engine: EngineKind, schema: &str, table: &str, column: &str) -> Result<String> {
    let tbl = qualify(engine, schema, table)?;
    let col = quote(engine, column)?;
    let min = text_cast(engine, &format!("MIN({})", col));
    let max = text_cast(engine, &format!("MAX({})", col));
    Ok(format!("SELECT {min}, {max} FROM {tbl}"))
}

/// Most frequent non-null values with their counts, highest first. Ties come
/// back in whatever order the engine produces.
pub fn top_values_query(
    engine: EngineKind,
    schema: &str,
    table: &str,
    column: &str,
) -> Result<String> {
    let tbl = qualify(engine, schema, table)?;
    let col = quote(engine, column)?;
    let txt = text_cast(engine, &col);
    Ok(match engine {
        EngineKind::MySql => format!(
            "SELECT {txt} AS val, COUNT(*) AS cnt FROM {tbl} \
             WHERE {col} IS NOT NULL GROUP BY {col} ORDER BY cnt DESC LIMIT ?",
        ),
        EngineKind::Postgres => format!(
            "SELECT {txt} AS val, COUNT(*)::int8 AS cnt FROM {tbl} \
             WHERE {col} IS NOT NULL GROUP BY {col} ORDER BY cnt DESC LIMIT $1",
        ),
        EngineKind::Mssql => format!(
            "SELECT TOP (@P1) {txt} AS val, COUNT_BIG(*) AS cnt FROM {tbl} \
             WHERE {col} IS NOT NULL GROUP BY {col} ORDER BY cnt DESC",
        ),
    })
}

/// Up to `limit` non-null values in scan order, each cut to `max_length`
/// characters by the engine.
pub fn sample_values_query(
    engine: EngineKind,
    schema: &str,
    table: &str,
    column: &str,
) -> Result<String> {
    let tbl = qualify(engine, schema, table)?;
    let col = quote(engine, column)?;
    let txt = text_cast(engine, &col);
    Ok(match engine {
        EngineKind::MySql => format!(
            "SELECT LEFT({txt}, ?) AS val FROM {tbl} WHERE {col} IS NOT NULL LIMIT ?",
        ),
        EngineKind::Postgres => format!(
            "SELECT LEFT({txt}, $1) AS val FROM {tbl} WHERE {col} IS NOT NULL LIMIT $2",
        ),
        EngineKind::Mssql => format!(
            "SELECT TOP (@P2) LEFT({txt}, @P1) AS val FROM {tbl} WHERE {col} IS NOT NULL",
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_stats_mysql() {
        let sql = basic_stats_query(EngineKind::MySql, "his", "patients", "status").unwrap();
        assert!(sql.starts_with("SELECT COUNT(*)"));
        assert!(sql.contains("CAST(`status` AS CHAR) = '0'"));
        assert!(sql.contains("COUNT(DISTINCT `status`)"));
        assert!(sql.ends_with("FROM `his`.`patients`"));
    }

    #[test]
    fn test_basic_stats_postgres_uses_filter() {
        let sql = basic_stats_query(EngineKind::Postgres, "public", "patients", "status").unwrap();
        assert!(sql.contains("FILTER (WHERE \"status\" IS NULL)"));
        assert!(sql.contains("CAST(\"status\" AS TEXT) = ''"));
        assert!(sql.contains("FROM \"public\".\"patients\""));
    }

    #[test]
    fn test_basic_stats_mssql() {
        let sql = basic_stats_query(EngineKind::Mssql, "dbo", "patients", "status").unwrap();
        assert!(sql.contains("COUNT_BIG(*)"));
        assert!(sql.contains("CAST([status] AS NVARCHAR(MAX)) = N'0'"));
        assert!(sql.contains("COUNT_BIG(DISTINCT [status])"));
        assert!(sql.contains("FROM [dbo].[patients]"));
    }

    #[test]
    fn test_min_max_casts_after_aggregate() {
        let sql = min_max_query(EngineKind::Postgres, "public", "visits", "visit_date").unwrap();
        assert_eq!(
            sql,
            "SELECT CAST(MIN(\"visit_date\") AS TEXT), CAST(MAX(\"visit_date\") AS TEXT) FROM \"public\".\"visits\""
        );
    }

    #[test]
    fn test_top_values_placeholders() {
        let mysql = top_values_query(EngineKind::MySql, "his", "t", "c").unwrap();
        assert!(mysql.ends_with("ORDER BY cnt DESC LIMIT ?"));
        let pg = top_values_query(EngineKind::Postgres, "public", "t", "c").unwrap();
        assert!(pg.ends_with("LIMIT $1"));
        let ms = top_values_query(EngineKind::Mssql, "dbo", "t", "c").unwrap();
        assert!(ms.starts_with("SELECT TOP (@P1)"));
        assert!(ms.contains("GROUP BY [c]"));
    }

    #[test]
    fn test_sample_values_bind_order() {
        let pg = sample_values_query(EngineKind::Postgres, "public", "t", "c").unwrap();
        assert!(pg.contains("LEFT(CAST(\"c\" AS TEXT), $1)"));
        assert!(pg.ends_with("LIMIT $2"));
        let ms = sample_values_query(EngineKind::Mssql, "dbo", "t", "c").unwrap();
        assert!(ms.contains("TOP (@P2)"));
        assert!(ms.contains("LEFT(CAST([c] AS NVARCHAR(MAX)), @P1)"));
    }

    #[test]
    fn test_hostile_column_name_is_quoted() {
        let sql = sample_values_query(EngineKind::MySql, "his", "t", "x` FROM mysql.user; --")
            .unwrap();
        assert!(sql.contains("`x`` FROM mysql.user; --`"));
    }

    #[test]
    fn test_empty_identifier_rejected() {
        assert!(basic_stats_query(EngineKind::MySql, "his", "", "c").is_err());
        assert!(min_max_query(EngineKind::Mssql, "dbo", "t", "").is_err());
    }
}
