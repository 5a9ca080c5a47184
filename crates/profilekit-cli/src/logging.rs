use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

fn directives(verbose: bool) -> &'static str {
    if verbose {
        "profilekit=debug,profilekit_core=debug,warn"
    } else {
        "profilekit=info,profilekit_core=info,warn"
    }
}

/// Install the global subscriber: warnings (or `RUST_LOG`) on stderr, and the
/// full run log in `log_file` when one is given.
pub fn init(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let stderr_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { directives(true) } else { "warn" })
    });
    let stderr = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(stderr_filter);

    let file = match log_file {
        Some(path) => {
            let handle = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(handle))
                    .with_ansi(false)
                    .with_target(false)
                    .with_filter(EnvFilter::new(directives(verbose))),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr)
        .with(file)
        .try_init()
        .context("Failed to install the log subscriber")?;
    Ok(())
}
