//! # Report Emitter
//!
//! The profiling report is a UTF-8 CSV with a fixed header and one row per
//! [`ProfilingRecord`]. Rows are flushed as they are written so a run that
//! dies halfway still leaves a valid, truncated report.
//!
//! The same module reads reports back for the `summary` command and for any
//! downstream tool that keys rows by `(Table, Column)`.

pub mod summary;

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use indexmap::IndexMap;

use crate::error::{ProfileError, Result};
use crate::types::{KeyFlag, ProfilingRecord};

/// Column order of the report. Never reorder: downstream readers index by
/// position as well as by name.
pub const HEADER: [&str; 18] = [
    "Table",
    "Column",
    "DataType",
    "PK",
    "FK",
    "Default",
    "Comment",
    "Total_Rows",
    "Table_Size_MB",
    "Null_Count",
    "Empty_Count",
    "Zero_Count",
    "Max_Length",
    "Distinct_Values",
    "Min_Val",
    "Max_Val",
    "Top_5_Values",
    "Sample_Values",
];

/// Quote a field if it contains a comma, quote or line break; embedded quotes
/// are doubled.
pub fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Unescaped field values of a record, in [`HEADER`] order.
pub fn record_fields(record: &ProfilingRecord) -> [String; 18] {
    [
        record.table.clone(),
        record.column.clone(),
        record.data_type.clone(),
        record.pk.as_str().to_string(),
        record.fk.clone(),
        record.default_value.clone(),
        record.comment.clone(),
        record.total_rows.to_string(),
        format!("{:.2}", record.table_size_mb),
        record.null_count.to_string(),
        record.empty_count.to_string(),
        record.zero_count.to_string(),
        record.max_length.to_string(),
        record.distinct_values.to_string(),
        record.min_val.clone(),
        record.max_val.clone(),
        record.top_values.clone(),
        record.sample_values.clone(),
    ]
}

/// Append-only CSV writer for profiling records.
pub struct ReportWriter<W: Write> {
    out: W,
    rows: usize,
}

impl ReportWriter<BufWriter<File>> {
    /// Create (truncating) the report file and write the header.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|e| ProfileError::Output {
            message: format!("creating report {}", path.display()),
            source: e,
        })?;
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write> ReportWriter<W> {
    /// Wrap a writer and emit the header row.
    pub fn new(out: W) -> Result<Self> {
        let mut writer = Self { out, rows: 0 };
        let header = HEADER.join(",");
        writer.write_line(&header, "writing report header")?;
        Ok(writer)
    }

    /// Write one record as one row and flush it.
    pub fn write_record(&mut self, record: &ProfilingRecord) -> Result<()> {
        let line = record_fields(record)
            .iter()
            .map(|f| csv_escape(f))
            .collect::<Vec<_>>()
            .join(",");
        self.write_line(&line, "writing report row")?;
        self.rows += 1;
        Ok(())
    }

    /// Data rows written so far, header excluded.
    pub fn rows_written(&self) -> usize {
        self.rows
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, line: &str, what: &str) -> Result<()> {
        writeln!(self.out, "{}", line)
            .and_then(|_| self.out.flush())
            .map_err(|e| ProfileError::Output {
                message: what.to_string(),
                source: e,
            })
    }
}

/// Split CSV text into rows of unescaped fields. Each row carries the 1-based
/// line it starts on.
pub fn parse_csv(text: &str) -> Result<Vec<(usize, Vec<String>)>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut row_line = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => row.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                row.push(std::mem::take(&mut field));
                rows.push((row_line, std::mem::take(&mut row)));
                line += 1;
                row_line = line;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(ProfileError::Report {
            line: row_line,
            message: "unterminated quoted field".to_string(),
        });
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push((row_line, row));
    }
    Ok(rows)
}

fn parse_count(value: &str, column: &str, line: usize) -> Result<u64> {
    if value.is_empty() {
        return Ok(0);
    }
    value.parse().map_err(|_| ProfileError::Report {
        line,
        message: format!("{} is not a count: {:?}", column, value),
    })
}

/// Parse a full report. The header must match [`HEADER`] exactly and every
/// row must carry all eighteen fields.
pub fn read_report<R: Read>(mut reader: R) -> Result<Vec<ProfilingRecord>> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .map_err(|e| ProfileError::Output {
            message: "reading report".to_string(),
            source: e,
        })?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);

    let mut rows = parse_csv(text)?.into_iter();
    let Some((_, header)) = rows.next() else {
        return Err(ProfileError::Report {
            line: 1,
            message: "report is empty".to_string(),
        });
    };
    if header.iter().map(String::as_str).ne(HEADER.iter().copied()) {
        return Err(ProfileError::Report {
            line: 1,
            message: format!("unexpected header: {}", header.join(",")),
        });
    }

    let mut records = Vec::new();
    for (line, fields) in rows {
        if fields.len() == 1 && fields[0].is_empty() {
            continue;
        }
        if fields.len() != HEADER.len() {
            return Err(ProfileError::Report {
                line,
                message: format!("expected {} fields, found {}", HEADER.len(), fields.len()),
            });
        }
        let pk = KeyFlag::parse(&fields[3]).ok_or_else(|| ProfileError::Report {
            line,
            message: format!("PK must be YES, NO or ERROR, found {:?}", fields[3]),
        })?;
        let table_size_mb = if fields[8].is_empty() {
            0.0
        } else {
            fields[8].parse().map_err(|_| ProfileError::Report {
                line,
                message: format!("Table_Size_MB is not a number: {:?}", fields[8]),
            })?
        };

        let mut f = fields.into_iter();
        let mut next = || f.next().unwrap_or_default();
        let table = next();
        let column = next();
        let data_type = next();
        next();
        let fk = next();
        let default_value = next();
        let comment = next();
        let total_rows = parse_count(&next(), "Total_Rows", line)?;
        next();
        let null_count = parse_count(&next(), "Null_Count", line)?;
        let empty_count = parse_count(&next(), "Empty_Count", line)?;
        let zero_count = parse_count(&next(), "Zero_Count", line)?;
        let max_length = parse_count(&next(), "Max_Length", line)?;
        let distinct_values = parse_count(&next(), "Distinct_Values", line)?;

        records.push(ProfilingRecord {
            table,
            column,
            data_type,
            pk,
            fk,
            default_value,
            comment,
            total_rows,
            table_size_mb,
            null_count,
            empty_count,
            zero_count,
            max_length,
            distinct_values,
            min_val: next(),
            max_val: next(),
            top_values: next(),
            sample_values: next(),
        });
    }
    Ok(records)
}

/// Read a report file from disk.
pub fn read_report_file(path: &Path) -> Result<Vec<ProfilingRecord>> {
    let file = File::open(path).map_err(|e| ProfileError::Output {
        message: format!("opening report {}", path.display()),
        source: e,
    })?;
    read_report(std::io::BufReader::new(file))
}

/// Key records by `(Table, Column)`, keeping report order. A repeated key
/// keeps its first record.
pub fn index_report(records: &[ProfilingRecord]) -> IndexMap<(String, String), &ProfilingRecord> {
    let mut index = IndexMap::with_capacity(records.len());
    for record in records {
        index
            .entry((record.table.clone(), record.column.clone()))
            .or_insert(record);
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColumnDescriptor;

    fn record(table: &str, column: &str) -> ProfilingRecord {
        let mut r = ProfilingRecord::empty(table, &ColumnDescriptor::new(column, "varchar"));
        r.total_rows = 3;
        r.table_size_mb = 0.02;
        r.distinct_values = 3;
        r
    }

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("hello"), "hello");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_escape("line\nbreak"), "\"line\nbreak\"");
        assert_eq!(csv_escape(""), "");
    }

    #[test]
    fn test_header_written_once() {
        let writer = ReportWriter::new(Vec::new()).unwrap();
        let out = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(out.lines().count(), 1);
        assert!(out.starts_with("Table,Column,DataType,PK,FK,"));
        assert!(out.trim_end().ends_with("Top_5_Values,Sample_Values"));
    }

    #[test]
    fn test_row_field_count_matches_header() {
        let mut r = record("patients", "name");
        r.sample_values = "Smith, John | O\"Brien".to_string();
        r.top_values = "a (2) | b,c (1)".to_string();

        let mut writer = ReportWriter::new(Vec::new()).unwrap();
        writer.write_record(&r).unwrap();
        assert_eq!(writer.rows_written(), 1);
        let out = String::from_utf8(writer.into_inner()).unwrap();

        let rows = parse_csv(&out).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].1.len(), HEADER.len());
        assert_eq!(rows[1].1[17], "Smith, John | O\"Brien");
    }

    #[test]
    fn test_parse_csv_handles_crlf_and_embedded_newline() {
        let rows = parse_csv("a,b\r\n\"x\ny\",z\r\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].1, vec!["x\ny".to_string(), "z".to_string()]);
        assert_eq!(rows[1].0, 2);
    }

    #[test]
    fn test_parse_csv_unterminated_quote() {
        let err = parse_csv("a,\"b\n").unwrap_err();
        assert!(matches!(err, ProfileError::Report { line: 1, .. }));
    }

    #[test]
    fn test_read_report_round_trip() {
        let mut a = record("patients", "status");
        a.pk = KeyFlag::Yes;
        a.comment = "state, \"A\"ctive".to_string();
        let mut b = record("visits", "notes");
        b.fk = "-> patients.id".to_string();
        b.sample_values = "(Error: permission denied)".to_string();

        let mut writer = ReportWriter::new(Vec::new()).unwrap();
        writer.write_record(&a).unwrap();
        writer.write_record(&b).unwrap();
        let bytes = writer.into_inner();

        let parsed = read_report(bytes.as_slice()).unwrap();
        assert_eq!(parsed, vec![a, b]);
    }

    #[test]
    fn test_read_report_rejects_wrong_header() {
        let err = read_report("Table,Column\npatients,id\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ProfileError::Report { line: 1, .. }));
    }

    #[test]
    fn test_read_report_rejects_short_row() {
        let text = format!("{}\npatients,id,int\n", HEADER.join(","));
        let err = read_report(text.as_bytes()).unwrap_err();
        assert!(matches!(err, ProfileError::Report { line: 2, .. }));
    }

    #[test]
    fn test_index_report_keeps_first() {
        let mut dup = record("patients", "status");
        dup.total_rows = 99;
        let records = vec![record("patients", "status"), dup, record("visits", "id")];
        let index = index_report(&records);
        assert_eq!(index.len(), 2);
        let key = ("patients".to_string(), "status".to_string());
        assert_eq!(index[&key].total_rows, 3);
    }
}
