use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;
use profilekit_core::config::EngineKind;
use profilekit_core::dialect::DialectAdapter;
use profilekit_core::error::{ProfileError, Result};
use profilekit_core::types::{BasicStats, ColumnDescriptor, ForeignKeyRef, ValueCount};

/// Statistic that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stat {
    Basic,
    MinMax,
    TopValues,
    Sample,
}

/// One adapter call, recorded in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CatalogTables,
    ExportDdl,
    TableExists(String),
    TableSize(String),
    Describe(String),
    BasicStats(String, String),
    MinMax(String, String),
    TopValues(String, String),
    Sample(String, String, u64),
}

/// In-memory table: descriptors plus column-major text values.
#[derive(Debug, Clone, Default)]
pub struct FixtureTable {
    pub size_mb: f64,
    pub columns: Vec<ColumnDescriptor>,
    pub values: IndexMap<String, Vec<Option<String>>>,
}

impl FixtureTable {
    pub fn new(size_mb: f64) -> Self {
        Self {
            size_mb,
            ..Default::default()
        }
    }

    pub fn column(mut self, descriptor: ColumnDescriptor, values: Vec<Option<&str>>) -> Self {
        self.values.insert(
            descriptor.name.clone(),
            values.into_iter().map(|v| v.map(str::to_string)).collect(),
        );
        self.columns.push(descriptor);
        self
    }

    pub fn owned_column(mut self, descriptor: ColumnDescriptor, values: Vec<Option<String>>) -> Self {
        self.values.insert(descriptor.name.clone(), values);
        self.columns.push(descriptor);
        self
    }
}

/// [`DialectAdapter`] over in-memory tables, with failure injection and a
/// call log.
pub struct FixtureAdapter {
    engine: EngineKind,
    tables: IndexMap<String, FixtureTable>,
    dropped: BTreeSet<String>,
    failures: HashMap<(String, String), Vec<Stat>>,
    describe_failures: BTreeSet<String>,
    ddl: Option<String>,
    calls: Vec<Call>,
}

impl FixtureAdapter {
    pub fn new(engine: EngineKind) -> Self {
        Self {
            engine,
            tables: IndexMap::new(),
            dropped: BTreeSet::new(),
            failures: HashMap::new(),
            describe_failures: BTreeSet::new(),
            ddl: Some(String::new()),
            calls: Vec::new(),
        }
    }

    pub fn with_table(mut self, name: &str, table: FixtureTable) -> Self {
        self.tables.insert(name.to_string(), table);
        self
    }

    /// Keep the table in the catalog listing but report it as gone when
    /// checked, as if dropped between listing and profiling.
    pub fn drop_table(mut self, name: &str) -> Self {
        self.dropped.insert(name.to_string());
        self
    }

    pub fn fail(mut self, table: &str, column: &str, stat: Stat) -> Self {
        self.failures
            .entry((table.to_string(), column.to_string()))
            .or_default()
            .push(stat);
        self
    }

    pub fn fail_describe(mut self, table: &str) -> Self {
        self.describe_failures.insert(table.to_string());
        self
    }

    /// DDL returned by `export_ddl`; `None` makes the export fail.
    pub fn with_ddl(mut self, ddl: Option<&str>) -> Self {
        self.ddl = ddl.map(str::to_string);
        self
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// Whether any statistic query touched the column.
    pub fn was_queried(&self, table: &str, column: &str) -> bool {
        self.calls.iter().any(|c| match c {
            Call::BasicStats(t, col)
            | Call::MinMax(t, col)
            | Call::TopValues(t, col)
            | Call::Sample(t, col, _) => t == table && col == column,
            _ => false,
        })
    }

    fn check(&self, table: &str, column: &str, stat: Stat) -> Result<()> {
        let injected = self
            .failures
            .get(&(table.to_string(), column.to_string()))
            .is_some_and(|stats| stats.contains(&stat));
        if injected {
            return Err(injected_error(&format!("{:?} on {}.{}", stat, table, column)));
        }
        Ok(())
    }

    fn values(&self, table: &str, column: &str) -> Result<&[Option<String>]> {
        self.tables
            .get(table)
            .and_then(|t| t.values.get(column))
            .map(Vec::as_slice)
            .ok_or_else(|| injected_error(&format!("no such column {}.{}", table, column)))
    }
}

fn injected_error(what: &str) -> ProfileError {
    ProfileError::Query {
        query: what.to_string(),
        source: sqlx::Error::Protocol(format!("fixture failure: {}", what)),
    }
}

/// Order values numerically when every one parses as a number.
fn compare(a: &str, b: &str) -> std::cmp::Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal),
        _ => a.cmp(b),
    }
}

impl DialectAdapter for FixtureAdapter {
    fn engine(&self) -> EngineKind {
        self.engine
    }

    async fn catalog_tables(&mut self) -> Result<Vec<String>> {
        self.calls.push(Call::CatalogTables);
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn export_ddl(&mut self, _scope: &[String]) -> Result<String> {
        self.calls.push(Call::ExportDdl);
        self.ddl.clone().ok_or_else(|| ProfileError::Ddl {
            engine: self.engine,
            message: "dump tool unavailable".to_string(),
        })
    }

    async fn table_exists(&mut self, table: &str) -> Result<bool> {
        self.calls.push(Call::TableExists(table.to_string()));
        Ok(self.tables.contains_key(table) && !self.dropped.contains(table))
    }

    async fn table_size_mb(&mut self, table: &str) -> f64 {
        self.calls.push(Call::TableSize(table.to_string()));
        self.tables.get(table).map(|t| t.size_mb).unwrap_or(0.0)
    }

    async fn describe_columns(&mut self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        self.calls.push(Call::Describe(table.to_string()));
        if self.describe_failures.contains(table) {
            return Err(injected_error(&format!("describe {}", table)));
        }
        Ok(self
            .tables
            .get(table)
            .map(|t| t.columns.clone())
            .unwrap_or_default())
    }

    async fn basic_stats(&mut self, table: &str, column: &str) -> Result<BasicStats> {
        self.calls
            .push(Call::BasicStats(table.to_string(), column.to_string()));
        self.check(table, column, Stat::Basic)?;
        let values = self.values(table, column)?;

        let non_null: Vec<&str> = values.iter().flatten().map(String::as_str).collect();
        let distinct: BTreeSet<&str> = non_null.iter().copied().collect();
        Ok(BasicStats {
            total: values.len() as u64,
            nulls: (values.len() - non_null.len()) as u64,
            empties: non_null.iter().filter(|v| v.is_empty()).count() as u64,
            zeros: non_null.iter().filter(|v| **v == "0").count() as u64,
            max_length: non_null
                .iter()
                .map(|v| v.chars().count() as u64)
                .max()
                .unwrap_or(0),
            distinct: Some(distinct.len() as u64),
        })
    }

    async fn min_max(&mut self, table: &str, column: &str) -> Result<(String, String)> {
        self.calls
            .push(Call::MinMax(table.to_string(), column.to_string()));
        self.check(table, column, Stat::MinMax)?;
        let values = self.values(table, column)?;
        let non_null = values.iter().flatten().map(String::as_str);
        let min = non_null.clone().min_by(|a, b| compare(a, b)).unwrap_or("");
        let max = non_null.max_by(|a, b| compare(a, b)).unwrap_or("");
        Ok((min.to_string(), max.to_string()))
    }

    async fn top_values(&mut self, table: &str, column: &str, n: usize) -> Result<Vec<ValueCount>> {
        self.calls
            .push(Call::TopValues(table.to_string(), column.to_string()));
        self.check(table, column, Stat::TopValues)?;
        let values = self.values(table, column)?;

        let mut counts: IndexMap<&str, u64> = IndexMap::new();
        for v in values.iter().flatten() {
            *counts.entry(v.as_str()).or_default() += 1;
        }
        let mut ranked: Vec<ValueCount> = counts
            .into_iter()
            .map(|(value, count)| ValueCount {
                value: value.to_string(),
                count,
            })
            .collect();
        // stable: ties keep first-seen order
        ranked.sort_by(|a, b| b.count.cmp(&a.count));
        ranked.truncate(n);
        Ok(ranked)
    }

    async fn sample_values(
        &mut self,
        table: &str,
        column: &str,
        limit: u64,
        max_length: usize,
    ) -> Result<Vec<String>> {
        self.calls
            .push(Call::Sample(table.to_string(), column.to_string(), limit));
        self.check(table, column, Stat::Sample)?;
        let values = self.values(table, column)?;
        Ok(values
            .iter()
            .flatten()
            .take(limit as usize)
            .map(|v| v.chars().take(max_length).collect())
            .collect())
    }
}

fn col(name: &str, data_type: &str) -> ColumnDescriptor {
    ColumnDescriptor::new(name, data_type)
}

fn pk(name: &str, data_type: &str) -> ColumnDescriptor {
    let mut c = col(name, data_type);
    c.is_primary_key = true;
    c
}

fn fk(name: &str, data_type: &str, table: &str, column: &str) -> ColumnDescriptor {
    let mut c = col(name, data_type);
    c.foreign_key = Some(ForeignKeyRef {
        table: table.to_string(),
        column: column.to_string(),
    });
    c
}

/// A small hospital schema on MySQL.
///
/// - `patients`: 6 rows; `status` holds `A`, `I`, `D`; `photo` is a blob.
/// - `visits`: 500 rows; `notes` has 500 distinct values; `created_at` is a
///   datetime; `amount` has zeros and nulls; `memo` holds quotes, commas and
///   line breaks.
pub fn hospital_fixture() -> FixtureAdapter {
    let mut status = col("status", "char");
    status.default_value = "'A'".to_string();
    status.comment = "A=active, I=inactive, D=deceased".to_string();

    let patients = FixtureTable::new(0.05)
        .column(
            pk("id", "int"),
            vec![Some("1"), Some("2"), Some("3"), Some("4"), Some("5"), Some("6")],
        )
        .column(
            col("name", "varchar"),
            vec![
                Some("Ada"),
                Some("Grace"),
                Some("Linus"),
                Some("O\"Neil, Pat"),
                Some(""),
                None,
            ],
        )
        .column(
            status,
            vec![Some("A"), Some("I"), Some("A"), Some("D"), Some("A"), Some("I")],
        )
        .column(
            col("birth_date", "date"),
            vec![
                Some("1980-01-02"),
                Some("1975-06-30"),
                None,
                Some("2001-12-24"),
                Some("1990-03-15"),
                Some("1962-08-01"),
            ],
        )
        .column(col("photo", "blob"), vec![None; 6])
        .column(
            col("country", "varchar"),
            vec![Some("NO"); 6],
        );

    let rows = 500;
    let ids: Vec<Option<String>> = (1..=rows).map(|i| Some(i.to_string())).collect();
    let patient_ids: Vec<Option<String>> =
        (0..rows).map(|i| Some((i % 6 + 1).to_string())).collect();
    let created: Vec<Option<String>> = (0..rows)
        .map(|i| Some(format!("2024-01-{:02} 10:00:00", i % 28 + 1)))
        .collect();
    let notes: Vec<Option<String>> = (1..=rows).map(|i| Some(format!("note {}", i))).collect();
    let amount: Vec<Option<String>> = (0..rows)
        .map(|i| match i % 5 {
            0 => Some("0".to_string()),
            1 => None,
            n => Some(format!("{}.50", n * 10)),
        })
        .collect();
    let memo: Vec<Option<String>> = (0..rows)
        .map(|i| match i % 3 {
            0 => Some("said \"ok\", left".to_string()),
            1 => Some("two\nlines".to_string()),
            _ => None,
        })
        .collect();

    let visits = FixtureTable::new(1.25)
        .owned_column(pk("id", "int"), ids)
        .owned_column(fk("patient_id", "int", "patients", "id"), patient_ids)
        .owned_column(col("created_at", "datetime"), created)
        .owned_column(col("notes", "text"), notes)
        .owned_column(col("amount", "decimal"), amount)
        .owned_column(col("memo", "varchar"), memo);

    FixtureAdapter::new(EngineKind::MySql)
        .with_table("patients", patients)
        .with_table("visits", visits)
        .with_ddl(Some(
            "CREATE TABLE `patients` (`id` int NOT NULL);\nCREATE TABLE `visits` (`id` int NOT NULL);\n",
        ))
}
