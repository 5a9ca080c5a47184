//! # Column Profiler
//!
//! Runs the statistic queries for one column in a fixed order and folds the
//! results into a [`ProfilingRecord`]:
//!
//! 1. `basic_stats` (failure turns the whole record into an error record)
//! 2. sample limit from the [`SamplingPolicy`]
//! 3. `min_max` and `top_values` when deep analysis is on
//! 4. `sample_values`
//!
//! Failures after step 1 only mark the affected field.

use indexmap::IndexSet;

use crate::classify::{classify, TypeCategory};
use crate::config::SamplingConfig;
use crate::dialect::DialectAdapter;
use crate::sampling::SamplingPolicy;
use crate::types::{
    ColumnDescriptor, KeyFlag, ProfilingRecord, ValueCount, TEMPORAL_TOP5_PLACEHOLDER,
    VALUE_SEPARATOR,
};

/// Size of the frequency ranking.
pub const TOP_N: usize = 5;

/// Sampling knobs shared by every column of a run.
#[derive(Debug, Clone)]
pub struct ProfileSettings {
    pub policy: SamplingPolicy,
    pub deep_analysis: bool,
    pub max_text_length: usize,
}

impl ProfileSettings {
    pub fn from_config(config: &SamplingConfig) -> Self {
        Self {
            policy: SamplingPolicy::from_config(config),
            deep_analysis: config.deep_analysis,
            max_text_length: config.max_text_length,
        }
    }
}

/// Strip CR and LF so every value stays on one report line.
pub fn sanitize(value: &str) -> String {
    value.chars().filter(|c| *c != '\n' && *c != '\r').collect()
}

pub fn skipped_marker(data_type: &str) -> String {
    format!("(Skipped: {})", data_type)
}

pub fn error_marker(message: &str) -> String {
    format!("(Error: {})", sanitize(message))
}

/// `"value (count) | ..."` in ranking order.
pub fn format_top_values(values: &[ValueCount]) -> String {
    values
        .iter()
        .map(|v| format!("{} ({})", sanitize(&v.value), v.count))
        .collect::<Vec<_>>()
        .join(VALUE_SEPARATOR)
}

/// Sanitize, drop repeats keeping first occurrence, join with `" | "`.
pub fn format_samples(values: &[String]) -> String {
    let seen: IndexSet<String> = values.iter().map(|v| sanitize(v)).collect();
    seen.into_iter().collect::<Vec<_>>().join(VALUE_SEPARATOR)
}

/// Descriptor fields copied into a record, sanitized.
fn base_record(table: &str, column: &ColumnDescriptor) -> ProfilingRecord {
    let mut record = ProfilingRecord::empty(table, column);
    record.data_type = sanitize(&record.data_type);
    record.default_value = sanitize(&record.default_value);
    record.comment = sanitize(&record.comment);
    record.fk = sanitize(&record.fk);
    record
}

/// Record for a column whose profiling failed outright.
pub fn error_record(table: &str, column: &ColumnDescriptor, message: &str) -> ProfilingRecord {
    let mut record = base_record(table, column);
    record.pk = KeyFlag::Error;
    record.sample_values = error_marker(message);
    record
}

/// Record for a skip-listed type: descriptor and table size only.
pub fn skipped_record(table: &str, column: &ColumnDescriptor, table_size_mb: f64) -> ProfilingRecord {
    let mut record = base_record(table, column);
    record.table_size_mb = table_size_mb;
    record.sample_values = skipped_marker(&column.data_type);
    record
}

/// A profiled column and how its queries went.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnProfile {
    pub record: ProfilingRecord,
    /// The type is skip-listed; no query was issued.
    pub skipped: bool,
    /// Statistic queries that failed and left an error marker.
    pub failed_queries: usize,
}

impl ColumnProfile {
    fn new(record: ProfilingRecord) -> Self {
        Self {
            record,
            skipped: false,
            failed_queries: 0,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.failed_queries > 0
    }
}

/// Profile one column. Never fails: every error ends up inside the record.
pub async fn profile_column<A: DialectAdapter>(
    adapter: &mut A,
    table: &str,
    column: &ColumnDescriptor,
    table_size_mb: f64,
    settings: &ProfileSettings,
) -> ColumnProfile {
    let category = classify(&column.data_type, adapter.skipped_types());
    if category == TypeCategory::LargeObject {
        tracing::debug!(
            "Skipping {}.{} ({}): type is not profiled",
            table,
            column.name,
            column.data_type
        );
        let mut profile = ColumnProfile::new(skipped_record(table, column, table_size_mb));
        profile.skipped = true;
        return profile;
    }

    let stats = match adapter.basic_stats(table, &column.name).await {
        Ok(stats) => stats,
        Err(e) => {
            tracing::warn!("Could not profile {}.{}: {}", table, column.name, e);
            let mut profile = ColumnProfile::new(error_record(table, column, &e.to_string()));
            profile.failed_queries = 1;
            return profile;
        }
    };

    let mut failed_queries = 0;
    let mut record = base_record(table, column);
    record.table_size_mb = table_size_mb;
    record.total_rows = stats.total;
    record.null_count = stats.nulls;
    record.empty_count = stats.empties;
    record.zero_count = stats.zeros;
    record.max_length = stats.max_length;
    record.distinct_values = stats.distinct.unwrap_or(0);

    let limit = settings.policy.resolve(table, &column.name, stats.distinct);

    if settings.deep_analysis {
        match adapter.min_max(table, &column.name).await {
            Ok((min, max)) => {
                record.min_val = sanitize(&min);
                record.max_val = sanitize(&max);
            }
            Err(e) => {
                tracing::warn!("min/max failed for {}.{}: {}", table, column.name, e);
                failed_queries += 1;
                record.min_val = error_marker(&e.to_string());
                record.max_val = error_marker(&e.to_string());
            }
        }

        record.top_values = if category == TypeCategory::Temporal {
            TEMPORAL_TOP5_PLACEHOLDER.to_string()
        } else {
            match adapter.top_values(table, &column.name, TOP_N).await {
                Ok(values) => format_top_values(&values),
                Err(e) => {
                    tracing::warn!("Top values failed for {}.{}: {}", table, column.name, e);
                    failed_queries += 1;
                    error_marker(&e.to_string())
                }
            }
        };
    }

    if limit > 0 {
        record.sample_values = match adapter
            .sample_values(table, &column.name, limit, settings.max_text_length)
            .await
        {
            Ok(values) => format_samples(&values),
            Err(e) => {
                tracing::warn!("Sampling failed for {}.{}: {}", table, column.name, e);
                failed_queries += 1;
                error_marker(&e.to_string())
            }
        };
    }

    ColumnProfile {
        record,
        skipped: false,
        failed_queries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ForeignKeyRef;

    #[test]
    fn test_sanitize_strips_line_breaks() {
        assert_eq!(sanitize("a\r\nb\nc"), "abc");
        assert_eq!(sanitize("plain"), "plain");
    }

    #[test]
    fn test_format_top_values() {
        let values = vec![
            ValueCount {
                value: "A".to_string(),
                count: 7,
            },
            ValueCount {
                value: "multi\nline".to_string(),
                count: 2,
            },
        ];
        assert_eq!(format_top_values(&values), "A (7) | multiline (2)");
        assert_eq!(format_top_values(&[]), "");
    }

    #[test]
    fn test_format_samples_dedupes_in_order() {
        let values: Vec<String> = ["A", "I", "A", "D", "I"].iter().map(|s| s.to_string()).collect();
        assert_eq!(format_samples(&values), "A | I | D");
    }

    #[test]
    fn test_format_samples_large_limit() {
        let values: Vec<String> = (0..10_000).map(|i| format!("v{}", i % 100)).collect();
        let joined = format_samples(&values);
        let parts: Vec<&str> = joined.split(" | ").collect();
        assert_eq!(parts.len(), 100);
        assert_eq!(parts[0], "v0");
        assert_eq!(parts[99], "v99");
    }

    #[test]
    fn test_format_samples_dedupes_after_sanitizing() {
        let values = vec!["x\n".to_string(), "x".to_string()];
        assert_eq!(format_samples(&values), "x");
    }

    #[test]
    fn test_quotes_are_left_for_the_emitter() {
        let values = vec!["O\"Brien".to_string()];
        assert_eq!(format_samples(&values), "O\"Brien");
    }

    #[test]
    fn test_fk_rendering() {
        let record = error_record("t", &ColumnDescriptor::new("ref", "int"), "boom");
        assert_eq!(record.fk, "");

        let mut col = ColumnDescriptor::new("ref", "int");
        col.foreign_key = Some(ForeignKeyRef {
            table: "a".to_string(),
            column: "b".to_string(),
        });
        let record = skipped_record("t", &col, 1.5);
        assert_eq!(record.fk, "-> a.b");
    }

    #[test]
    fn test_error_record_shape() {
        let col = ColumnDescriptor::new("payload", "json");
        let record = error_record("audit", &col, "cast failed\nat line 1");
        assert_eq!(record.pk, KeyFlag::Error);
        assert_eq!(record.total_rows, 0);
        assert_eq!(record.table_size_mb, 0.0);
        assert_eq!(record.sample_values, "(Error: cast failedat line 1)");
    }

    #[test]
    fn test_skipped_record_keeps_table_size() {
        let col = ColumnDescriptor::new("photo", "varbinary");
        let record = skipped_record("patients", &col, 2.25);
        assert_eq!(record.sample_values, "(Skipped: varbinary)");
        assert_eq!(record.table_size_mb, 2.25);
        assert_eq!(record.distinct_values, 0);
        assert_eq!(record.pk, KeyFlag::No);
    }
}
