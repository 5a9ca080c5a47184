use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder written to `Top_5_Values` for temporal columns under deep
/// analysis.
pub const TEMPORAL_TOP5_PLACEHOLDER: &str = "(Skipped for Date/Time)";

/// Separator between values in `Top_5_Values` and `Sample_Values`.
pub const VALUE_SEPARATOR: &str = " | ";

/// Metadata of one column, in ordinal position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Engine-native declared type, not normalized.
    pub data_type: String,
    pub is_primary_key: bool,
    pub foreign_key: Option<ForeignKeyRef>,
    pub default_value: String,
    pub comment: String,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_primary_key: false,
            foreign_key: None,
            default_value: String::new(),
            comment: String::new(),
        }
    }
}

/// Target of a foreign key. Renders as `-> table.column`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    pub table: String,
    pub column: String,
}

impl fmt::Display for ForeignKeyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-> {}.{}", self.table, self.column)
    }
}

/// Result of the single aggregate query run for every profiled column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasicStats {
    pub total: u64,
    pub nulls: u64,
    pub empties: u64,
    /// Rows whose text cast is exactly `"0"`.
    pub zeros: u64,
    pub max_length: u64,
    /// `None` when the engine returned no usable distinct count.
    pub distinct: Option<u64>,
}

/// One entry of a frequency ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueCount {
    pub value: String,
    pub count: u64,
}

/// Value of the `PK` report column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyFlag {
    Yes,
    No,
    /// The column could not be profiled; the sample field carries the cause.
    Error,
}

impl KeyFlag {
    pub fn as_str(self) -> &'static str {
        match self {
            KeyFlag::Yes => "YES",
            KeyFlag::No => "NO",
            KeyFlag::Error => "ERROR",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "YES" => Some(KeyFlag::Yes),
            "NO" | "" => Some(KeyFlag::No),
            "ERROR" => Some(KeyFlag::Error),
            _ => None,
        }
    }
}

impl From<bool> for KeyFlag {
    fn from(is_pk: bool) -> Self {
        if is_pk {
            KeyFlag::Yes
        } else {
            KeyFlag::No
        }
    }
}

/// One row of the profiling report: descriptor, statistics and owning table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfilingRecord {
    pub table: String,
    pub column: String,
    pub data_type: String,
    pub pk: KeyFlag,
    pub fk: String,
    pub default_value: String,
    pub comment: String,
    pub total_rows: u64,
    pub table_size_mb: f64,
    pub null_count: u64,
    pub empty_count: u64,
    pub zero_count: u64,
    pub max_length: u64,
    pub distinct_values: u64,
    pub min_val: String,
    pub max_val: String,
    pub top_values: String,
    pub sample_values: String,
}

impl ProfilingRecord {
    /// Record with descriptor fields filled and every statistic zeroed.
    pub fn empty(table: &str, column: &ColumnDescriptor) -> Self {
        Self {
            table: table.to_string(),
            column: column.name.clone(),
            data_type: column.data_type.clone(),
            pk: KeyFlag::from(column.is_primary_key),
            fk: column
                .foreign_key
                .as_ref()
                .map(|fk| fk.to_string())
                .unwrap_or_default(),
            default_value: column.default_value.clone(),
            comment: column.comment.clone(),
            total_rows: 0,
            table_size_mb: 0.0,
            null_count: 0,
            empty_count: 0,
            zero_count: 0,
            max_length: 0,
            distinct_values: 0,
            min_val: String::new(),
            max_val: String::new(),
            top_values: String::new(),
            sample_values: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreign_key_display() {
        let fk = ForeignKeyRef {
            table: "patients".to_string(),
            column: "id".to_string(),
        };
        assert_eq!(fk.to_string(), "-> patients.id");
    }

    #[test]
    fn test_key_flag_parse() {
        assert_eq!(KeyFlag::parse("YES"), Some(KeyFlag::Yes));
        assert_eq!(KeyFlag::parse(""), Some(KeyFlag::No));
        assert_eq!(KeyFlag::parse("ERROR"), Some(KeyFlag::Error));
        assert_eq!(KeyFlag::parse("maybe"), None);
    }

    #[test]
    fn test_empty_record_copies_descriptor() {
        let mut col = ColumnDescriptor::new("patient_id", "int");
        col.foreign_key = Some(ForeignKeyRef {
            table: "patients".to_string(),
            column: "id".to_string(),
        });
        col.comment = "owner".to_string();

        let record = ProfilingRecord::empty("visits", &col);
        assert_eq!(record.table, "visits");
        assert_eq!(record.pk, KeyFlag::No);
        assert_eq!(record.fk, "-> patients.id");
        assert_eq!(record.comment, "owner");
        assert_eq!(record.total_rows, 0);
        assert!(record.sample_values.is_empty());
    }
}
