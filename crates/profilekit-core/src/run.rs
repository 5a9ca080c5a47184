//! # Run Layout
//!
//! Every invocation writes into its own timestamped directory:
//!
//! ```text
//! <output dir>/<YYYYMMDD_HHMMSS>/
//!     data_profile/data_profile.csv
//!     ddl_schema/schema.sql
//!     process.log
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::dialect::DialectAdapter;
use crate::error::{ProfileError, Result};

pub const REPORT_FILE: &str = "data_profile/data_profile.csv";
pub const DDL_FILE: &str = "ddl_schema/schema.sql";
pub const LOG_FILE: &str = "process.log";

/// Identifier of a run derived from its start time.
pub fn run_id(at: DateTime<Local>) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}

/// Paths owned by one run.
#[derive(Debug, Clone)]
pub struct Run {
    pub id: String,
    pub root: PathBuf,
    pub report_path: PathBuf,
    pub ddl_path: PathBuf,
    pub log_path: PathBuf,
}

impl Run {
    /// Create the directory tree for a run started now.
    pub fn create(output_dir: &Path) -> Result<Self> {
        Self::create_with_id(output_dir, &run_id(Local::now()))
    }

    pub fn create_with_id(output_dir: &Path, id: &str) -> Result<Self> {
        let root = output_dir.join(id);
        let run = Self {
            id: id.to_string(),
            report_path: root.join(REPORT_FILE),
            ddl_path: root.join(DDL_FILE),
            log_path: root.join(LOG_FILE),
            root,
        };
        for path in [&run.report_path, &run.ddl_path] {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| ProfileError::Output {
                    message: format!("creating {}", parent.display()),
                    source: e,
                })?;
            }
        }
        Ok(run)
    }

    /// Write the DDL snapshot, replacing any previous content.
    pub fn write_ddl(&self, ddl: &str) -> Result<()> {
        fs::write(&self.ddl_path, ddl).map_err(|e| ProfileError::Output {
            message: format!("writing {}", self.ddl_path.display()),
            source: e,
        })
    }
}

/// Export the schema and store it in the run. An export failure is logged
/// and leaves an empty DDL file; only a local write failure is returned.
/// Returns whether the export itself succeeded.
pub async fn export_ddl<A: DialectAdapter>(
    adapter: &mut A,
    scope: &[String],
    run: &Run,
) -> Result<bool> {
    tracing::info!("Exporting {} schema DDL", adapter.engine());
    match adapter.export_ddl(scope).await {
        Ok(ddl) => {
            run.write_ddl(&ddl)?;
            tracing::info!("DDL written to {}", run.ddl_path.display());
            Ok(true)
        }
        Err(e) => {
            tracing::warn!("DDL export failed, continuing without it: {}", e);
            run.write_ddl("")?;
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_run_id_format() {
        let at = Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 1).unwrap();
        assert_eq!(run_id(at), "20240307_090501");
    }

    #[test]
    fn test_create_lays_out_directories() {
        let dir = tempfile::tempdir().unwrap();
        let run = Run::create_with_id(dir.path(), "20240101_000000").unwrap();
        assert!(run.report_path.parent().unwrap().is_dir());
        assert!(run.ddl_path.parent().unwrap().is_dir());
        assert_eq!(run.log_path, dir.path().join("20240101_000000/process.log"));
        assert!(run
            .report_path
            .ends_with("20240101_000000/data_profile/data_profile.csv"));
    }

    #[test]
    fn test_write_ddl() {
        let dir = tempfile::tempdir().unwrap();
        let run = Run::create_with_id(dir.path(), "r1").unwrap();
        run.write_ddl("CREATE TABLE t (id int);\n").unwrap();
        let text = fs::read_to_string(&run.ddl_path).unwrap();
        assert!(text.starts_with("CREATE TABLE"));
    }
}
