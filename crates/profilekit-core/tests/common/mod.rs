//! Checks shared by the live-database tests. Every engine is loaded with the
//! same hospital fixture from `tests/fixtures/`.

use profilekit_core::config::{ConnectionSettings, EngineKind, OutputConfig, ProfileConfig, SamplingConfig};
use profilekit_core::dialect::DialectAdapter;
use profilekit_core::profile::{run_profile, NoopObserver};
use profilekit_core::report::{read_report, ReportWriter};
use profilekit_core::types::{KeyFlag, ProfilingRecord, TEMPORAL_TOP5_PLACEHOLDER};

/// Split a fixture script into statements, dropping comment lines.
pub fn statements(fixture_sql: &str) -> Vec<String> {
    let cleaned: String = fixture_sql
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");
    cleaned
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn find<'a>(records: &'a [ProfilingRecord], table: &str, column: &str) -> &'a ProfilingRecord {
    records
        .iter()
        .find(|r| r.table == table && r.column == column)
        .unwrap_or_else(|| panic!("no record for {}.{}", table, column))
}

pub async fn check_catalog<A: DialectAdapter>(adapter: &mut A) {
    let tables = adapter.catalog_tables().await.expect("list tables failed");
    assert_eq!(tables, vec!["patients".to_string(), "visits".to_string()]);

    assert!(adapter.table_exists("patients").await.unwrap());
    assert!(!adapter.table_exists("ghost").await.unwrap());
    assert!(adapter.table_size_mb("patients").await >= 0.0);
    assert_eq!(adapter.table_size_mb("ghost").await, 0.0);

    let patients = adapter.describe_columns("patients").await.unwrap();
    let names: Vec<&str> = patients.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id", "name", "status", "birth_date", "photo"]);
    assert!(patients[0].is_primary_key);
    assert!(!patients[1].is_primary_key);
    assert!(patients[2].default_value.contains('A'));
    if adapter.engine() != EngineKind::Mssql {
        assert_eq!(patients[2].comment, "A=active, I=inactive, D=deceased");
    }

    let visits = adapter.describe_columns("visits").await.unwrap();
    let fk = visits[1].foreign_key.as_ref().expect("patient_id has a foreign key");
    assert_eq!(fk.to_string(), "-> patients.id");
    assert!(visits[0].foreign_key.is_none());
}

pub async fn check_profile<A: DialectAdapter>(adapter: &mut A, connection: ConnectionSettings) {
    let config = ProfileConfig {
        connection,
        tables: vec![],
        sampling: SamplingConfig {
            default_limit: 10,
            max_text_length: 4,
            deep_analysis: true,
            exceptions: vec![],
        },
        output: OutputConfig {
            dir: "unused".into(),
            export_ddl: false,
        },
    };

    let mut report = ReportWriter::new(Vec::new()).unwrap();
    let summary = run_profile(adapter, &config, &mut report, &mut NoopObserver)
        .await
        .expect("profile run failed");
    let records = read_report(report.into_inner().as_slice()).unwrap();

    assert_eq!(summary.tables_profiled, 2);
    assert_eq!(records.len(), 10);
    assert_eq!(summary.columns_skipped, 1);
    assert_eq!(summary.column_errors, 0, "{:#?}", records);

    let id = find(&records, "patients", "id");
    assert_eq!(id.pk, KeyFlag::Yes);
    assert_eq!(id.total_rows, 6);
    assert_eq!(id.distinct_values, 6);
    assert_eq!(id.min_val, "1");
    assert_eq!(id.max_val, "6");

    let name = find(&records, "patients", "name");
    assert_eq!(name.null_count, 1);
    assert_eq!(name.empty_count, 1);
    assert_eq!(name.max_length, 11);
    // truncated to max_text_length characters
    assert!(name.sample_values.split(" | ").all(|v| v.chars().count() <= 4));

    let status = find(&records, "patients", "status");
    assert_eq!(status.distinct_values, 3);
    assert!(status.top_values.starts_with("A (3) | I (2)"));
    assert_eq!(status.sample_values.split(" | ").count(), 3);

    let birth = find(&records, "patients", "birth_date");
    assert_eq!(birth.top_values, TEMPORAL_TOP5_PLACEHOLDER);
    assert!(birth.min_val.starts_with("1962-08-01"));

    let photo = find(&records, "patients", "photo");
    assert!(photo.sample_values.starts_with("(Skipped: "));
    assert_eq!(photo.total_rows, 0);

    let created = find(&records, "visits", "created_at");
    assert_eq!(created.top_values, TEMPORAL_TOP5_PLACEHOLDER);

    let notes = find(&records, "visits", "notes");
    assert_eq!(notes.null_count, 1);
    assert_eq!(notes.distinct_values, 3);
}
