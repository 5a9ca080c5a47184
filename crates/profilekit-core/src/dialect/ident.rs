//! Identifier validation and quoting.
//!
//! Table and column names cannot be bound as parameters, so every statement
//! that names one goes through [`quote`]. Data values (schema names in catalog
//! filters, limits) are always bound instead.

use crate::config::EngineKind;
use crate::error::{ProfileError, Result};

/// SQL Server's limit; MySQL (64) and PostgreSQL (63) are stricter but will
/// reject overlong names themselves.
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Reject identifiers that are empty, overlong or contain a NUL byte.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ProfileError::InvalidIdentifier {
            name: name.to_string(),
            reason: "identifier is empty".to_string(),
        });
    }
    if name.contains('\0') {
        return Err(ProfileError::InvalidIdentifier {
            name: name.to_string(),
            reason: "identifier contains a NUL byte".to_string(),
        });
    }
    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ProfileError::InvalidIdentifier {
            name: name.to_string(),
            reason: format!(
                "identifier is {} bytes, limit is {}",
                name.len(),
                MAX_IDENTIFIER_LENGTH
            ),
        });
    }
    Ok(())
}

/// Quote an identifier with the engine's convention, doubling any embedded
/// closing quote character.
pub fn quote(engine: EngineKind, name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(match engine {
        EngineKind::MySql => format!("`{}`", name.replace('`', "``")),
        EngineKind::Postgres => format!("\"{}\"", name.replace('"', "\"\"")),
        EngineKind::Mssql => format!("[{}]", name.replace(']', "]]")),
    })
}

/// `schema.table` with both parts quoted.
pub fn qualify(engine: EngineKind, schema: &str, table: &str) -> Result<String> {
    Ok(format!(
        "{}.{}",
        quote(engine, schema)?,
        quote(engine, table)?
    ))
}
