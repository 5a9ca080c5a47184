//! Schema-only dumps through the engines' own client tools.
//!
//! The password travels through the tool's environment variable, never the
//! argument list.

use tokio::process::Command;

use crate::config::{ConnectionSettings, EngineKind};
use crate::error::{ProfileError, Result};

/// Program, arguments and password variable for a schema-only dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpCommand {
    pub program: &'static str,
    pub args: Vec<String>,
    pub password_env: &'static str,
}

pub fn mysqldump_command(settings: &ConnectionSettings, tables: &[String]) -> DumpCommand {
    let mut args = vec![
        format!("--host={}", settings.host),
        format!("--port={}", settings.port),
        format!("--user={}", settings.user),
        "--no-data".to_string(),
        "--skip-comments".to_string(),
        "--single-transaction".to_string(),
        settings.database.clone(),
    ];
    args.extend(tables.iter().cloned());
    DumpCommand {
        program: "mysqldump",
        args,
        password_env: "MYSQL_PWD",
    }
}

pub fn pg_dump_command(settings: &ConnectionSettings, tables: &[String]) -> DumpCommand {
    let mut args = vec![
        format!("--host={}", settings.host),
        format!("--port={}", settings.port),
        format!("--username={}", settings.user),
        format!("--dbname={}", settings.database),
        "--schema-only".to_string(),
        "--no-owner".to_string(),
        "--no-privileges".to_string(),
    ];
    if tables.is_empty() {
        args.push(format!("--schema={}", settings.schema));
    } else {
        for table in tables {
            // pg_dump patterns fold case unless double-quoted
            args.push(format!(
                "--table=\"{}\".\"{}\"",
                settings.schema.replace('"', "\"\""),
                table.replace('"', "\"\"")
            ));
        }
    }
    DumpCommand {
        program: "pg_dump",
        args,
        password_env: "PGPASSWORD",
    }
}

/// Run a dump command and return its stdout.
///
/// A non-zero exit with some output still yields that output, so a dump that
/// failed on one object keeps the rest; a failure with no output is an error.
pub async fn run_dump(
    engine: EngineKind,
    command: &DumpCommand,
    password: &str,
) -> Result<String> {
    tracing::debug!("Running {} {}", command.program, command.args.join(" "));
    let output = Command::new(command.program)
        .args(&command.args)
        .env(command.password_env, password)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| ProfileError::Ddl {
            engine,
            message: format!("could not start {}: {}", command.program, e),
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if output.status.success() {
        return Ok(stdout);
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stdout.trim().is_empty() {
        return Err(ProfileError::Ddl {
            engine,
            message: format!("{} exited with {}: {}", command.program, output.status, stderr),
        });
    }
    tracing::warn!(
        "{} exited with {}, keeping partial output: {}",
        command.program,
        output.status,
        stderr
    );
    Ok(stdout)
}
