//! # Type Classification
//!
//! Decides which statistics are worth computing for a column from nothing but
//! its declared type string. The checks are loose substring /
//! base-name matches on the engine-native type, not a parsed type system.

use serde::{Deserialize, Serialize};

/// Substrings that mark a declared type as temporal.
const TEMPORAL_MARKERS: &[&str] = &["date", "time", "year"];

/// Semantic category of a declared column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeCategory {
    /// Date, time, timestamp, interval-of-year style types. Top-5 frequency
    /// analysis is skipped for these.
    Temporal,
    /// Binary, spatial and legacy large-object types listed in the engine's
    /// skip list. No statistics query is issued.
    LargeObject,
    Other,
}

/// Case-insensitive test for `date`, `time` or `year` anywhere in the type.
///
/// Over-inclusive: `timestamptz`, `datetime2` and `year` all match,
/// and so would a user-defined type that merely contains one of the words.
pub fn is_temporal(declared_type: &str) -> bool {
    let lowered = declared_type.to_lowercase();
    TEMPORAL_MARKERS.iter().any(|m| lowered.contains(m))
}

/// Lower-cased type name with any length/precision suffix removed, so that
/// `VARBINARY(MAX)` and `varbinary` compare equal.
pub fn base_type_name(declared_type: &str) -> String {
    let head = declared_type.split('(').next().unwrap_or(declared_type);
    head.trim().to_lowercase()
}

/// Whether the declared type appears in an engine skip list.
pub fn is_large_object(declared_type: &str, skipped_types: &[&str]) -> bool {
    let base = base_type_name(declared_type);
    skipped_types.iter().any(|t| t.eq_ignore_ascii_case(&base))
}

/// Classify a declared type. Skip-listed types win over the temporal check.
pub fn classify(declared_type: &str, skipped_types: &[&str]) -> TypeCategory {
    if is_large_object(declared_type, skipped_types) {
        TypeCategory::LargeObject
    } else if is_temporal(declared_type) {
        TypeCategory::Temporal
    } else {
        TypeCategory::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MSSQL_SKIP: &[&str] = &[
        "image",
        "text",
        "ntext",
        "binary",
        "geography",
        "geometry",
        "varbinary",
    ];

    #[test]
    fn test_temporal_types() {
        for t in [
            "date",
            "DATETIME",
            "datetime2",
            "timestamp with time zone",
            "time",
            "year",
            "smalldatetime",
            "datetimeoffset",
        ] {
            assert!(is_temporal(t), "{} should be temporal", t);
        }
    }

    #[test]
    fn test_non_temporal_types() {
        for t in ["int", "varchar", "numeric(10,2)", "bit", "uuid", "jsonb", ""] {
            assert!(!is_temporal(t), "{} should not be temporal", t);
        }
    }

    #[test]
    fn test_heuristic_is_over_inclusive() {
        // A user-defined type that happens to contain a marker still matches.
        assert!(is_temporal("runtime_config"));
    }

    #[test]
    fn test_base_type_name_strips_size() {
        assert_eq!(base_type_name("VARBINARY(MAX)"), "varbinary");
        assert_eq!(base_type_name("  nvarchar(50) "), "nvarchar");
        assert_eq!(base_type_name("geography"), "geography");
    }

    #[test]
    fn test_large_object_matches_base_name_only() {
        assert!(is_large_object("varbinary(max)", MSSQL_SKIP));
        assert!(is_large_object("NTEXT", MSSQL_SKIP));
        // "text" must not swallow "nvarchar" or "tinytext" via substring match
        assert!(!is_large_object("nvarchar", MSSQL_SKIP));
        assert!(!is_large_object("tinytext", MSSQL_SKIP));
    }

    #[test]
    fn test_classify_precedence() {
        assert_eq!(classify("image", MSSQL_SKIP), TypeCategory::LargeObject);
        assert_eq!(classify("datetime", MSSQL_SKIP), TypeCategory::Temporal);
        assert_eq!(classify("int", MSSQL_SKIP), TypeCategory::Other);
        // With no skip list, nothing is a large object
        assert_eq!(classify("image", &[]), TypeCategory::Other);
    }
}
