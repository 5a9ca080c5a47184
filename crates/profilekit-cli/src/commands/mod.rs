pub mod profile;
pub mod summary;
pub mod tables;

use anyhow::{Context, Result};

use profilekit_core::config::{read_config, ConfigOverrides, ProfileConfig, PASSWORD_ENV};

use crate::args::SourceArgs;

/// Resolve the run configuration from the config file, the command line and
/// the environment. Fails before any connection is opened.
pub fn load_config(source: &SourceArgs, overrides: &ConfigOverrides) -> Result<ProfileConfig> {
    let file = read_config(&source.config)?;
    let password = std::env::var(PASSWORD_ENV).ok();
    ProfileConfig::resolve(file, overrides, password.as_deref())
        .context("Invalid profiling configuration")
}
