pub mod classify;
pub mod config;
pub mod dialect;
pub mod error;
pub mod profile;
pub mod report;
pub mod run;
pub mod sampling;
pub mod types;

// Re-export key types for convenience
pub use config::{EngineKind, ProfileConfig};
pub use dialect::{Adapter, DialectAdapter};
pub use error::{ProfileError, Result};
pub use profile::{run_profile, ProgressObserver, RunSummary};
pub use report::ReportWriter;
pub use types::{ColumnDescriptor, ProfilingRecord};
