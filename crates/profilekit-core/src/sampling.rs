//! # Sampling Policy
//!
//! Resolves how many sample values to pull for a column. Precedence:
//!
//! 1. a column with exactly one distinct value is sampled once, always;
//! 2. a `(table, column)` exception supplies its own limit;
//! 3. otherwise the configured default applies.

use indexmap::IndexMap;

use crate::config::{SamplingConfig, SamplingException};

/// Exception lookup keyed by exact `(table, column)`.
#[derive(Debug, Clone)]
pub struct SamplingPolicy {
    default_limit: u64,
    exceptions: IndexMap<(String, String), u64>,
}

impl SamplingPolicy {
    /// Build from an ordered exception list. A repeated pair keeps its first
    /// limit.
    pub fn new(default_limit: u64, exceptions: &[SamplingException]) -> Self {
        let mut map = IndexMap::with_capacity(exceptions.len());
        for exc in exceptions {
            let key = (exc.table.clone(), exc.column.clone());
            if map.contains_key(&key) {
                tracing::debug!(
                    "Ignoring duplicate sampling exception for {}.{} (limit {})",
                    exc.table,
                    exc.column,
                    exc.limit
                );
                continue;
            }
            map.insert(key, exc.limit);
        }
        Self {
            default_limit,
            exceptions: map,
        }
    }

    pub fn from_config(config: &SamplingConfig) -> Self {
        Self::new(config.default_limit, &config.exceptions)
    }

    /// Exception limit for a pair, if one is configured. Case-sensitive.
    pub fn exception(&self, table: &str, column: &str) -> Option<u64> {
        self.exceptions
            .get(&(table.to_string(), column.to_string()))
            .copied()
    }

    /// Resolve the sample limit. `distinct_count` is `None` when the engine
    /// did not report one, which disables the single-value shortcut.
    pub fn resolve(&self, table: &str, column: &str, distinct_count: Option<u64>) -> u64 {
        if distinct_count == Some(1) {
            return 1;
        }
        self.exception(table, column).unwrap_or(self.default_limit)
    }
}

/// Free-function form of [`SamplingPolicy::resolve`] over a plain exception
/// list: first matching entry wins.
pub fn resolve_limit(
    table: &str,
    column: &str,
    distinct_count: Option<u64>,
    exceptions: &[SamplingException],
    default_limit: u64,
) -> u64 {
    if distinct_count == Some(1) {
        return 1;
    }
    exceptions
        .iter()
        .find(|e| e.table == table && e.column == column)
        .map(|e| e.limit)
        .unwrap_or(default_limit)
}
