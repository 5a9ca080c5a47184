//! # Error Types
//!
//! Defines `ProfileError`, the unified error enum for every failure mode in a
//! profiling run. Variants carry the query, table or path involved so a failure
//! can be diagnosed from the message alone.
//!
//! Only configuration and connectivity errors are meant to reach the top level.
//! Everything else is contained by the table iterator or the column profiler
//! and recorded inline in the report.

use thiserror::Error;

use crate::config::EngineKind;

/// All errors that can occur in ProfileKit operations.
#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("Database connection failed: {message}\n  Target: {connection_hint}\n  Cause: {source}")]
    Connection {
        message: String,
        connection_hint: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("SQL Server connection failed: {message}\n  Target: {connection_hint}\n  Cause: {source}")]
    MssqlConnection {
        message: String,
        connection_hint: String,
        #[source]
        source: tiberius::error::Error,
    },

    #[error("Query failed ({query}): {source}")]
    Query {
        query: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Query failed ({query}): {source}")]
    MssqlQuery {
        query: String,
        #[source]
        source: tiberius::error::Error,
    },

    #[error("Invalid identifier {name:?}: {reason}")]
    InvalidIdentifier { name: String, reason: String },

    #[error("Unsupported database engine '{engine}'. Supported: mysql, postgres, mssql")]
    UnsupportedEngine { engine: String },

    #[error("No database configured. ProfileKit looks for a connection in this order:\n  1. --db flag\n  2. DATABASE_URL environment variable\n  3. profilekit.toml [database] section\n\nExample: profilekit profile --db mysql://root@localhost/his")]
    NoDatabase,

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("DDL export failed for {engine}: {message}")]
    Ddl { engine: EngineKind, message: String },

    #[error("Output error: {message}: {source}")]
    Output {
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed report at line {line}: {message}")]
    Report { line: usize, message: String },
}

impl ProfileError {
    /// Whether this error must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ProfileError::Connection { .. }
                | ProfileError::MssqlConnection { .. }
                | ProfileError::UnsupportedEngine { .. }
                | ProfileError::NoDatabase
                | ProfileError::Config { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ProfileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_are_fatal() {
        let err = ProfileError::Config {
            message: "default_limit must be positive".to_string(),
        };
        assert!(err.is_fatal());
        assert!(ProfileError::NoDatabase.is_fatal());
    }

    #[test]
    fn test_ddl_and_identifier_errors_are_contained() {
        let ddl = ProfileError::Ddl {
            engine: EngineKind::Postgres,
            message: "pg_dump not found".to_string(),
        };
        assert!(!ddl.is_fatal());
        assert!(ddl.to_string().contains("PostgreSQL"));

        let ident = ProfileError::InvalidIdentifier {
            name: String::new(),
            reason: "empty".to_string(),
        };
        assert!(!ident.is_fatal());
    }
}
