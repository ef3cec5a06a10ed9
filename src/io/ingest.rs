//! CSV ingest for training examples and test tables.
//!
//! Turning a user CSV into a clean `ExampleSet` is strict about schema
//! (clear errors, exit code 2) but forgiving about rows: a bad row is
//! skipped and reported, not fatal.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{ExamplePair, ExampleSet};
use crate::error::{AppError, ErrorKind};

/// A row-level problem encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: the usable pairs plus what was skipped.
#[derive(Debug)]
pub struct IngestedExamples {
    pub examples: ExampleSet,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// A test table kept column-for-column so predictions can be appended.
#[derive(Debug, Clone)]
pub struct TestTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub source_idx: usize,
}

impl TestTable {
    pub fn source_values(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| row.get(self.source_idx).cloned().unwrap_or_default())
            .collect()
    }
}

/// Load `(source, target)` training pairs from a CSV.
pub fn read_example_set(path: &Path) -> Result<IngestedExamples, AppError> {
    let mut reader = open_reader(path)?;

    let header_map = build_header_map(&read_headers(&mut reader)?);
    let source_idx = *header_map
        .get("source")
        .ok_or_else(|| AppError::validation("Missing required column: `source`"))?;
    let target_idx = *header_map
        .get("target")
        .ok_or_else(|| AppError::validation("Missing required column: `target`"))?;

    let mut pairs = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: records() starts after the header line, CSV lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_pair(&record, source_idx, target_idx) {
            Ok(pair) => pairs.push(pair),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    for err in &row_errors {
        log::warn!("skipped line {}: {}", err.line, err.message);
    }

    let examples = ExampleSet::new(pairs)?;
    Ok(IngestedExamples {
        examples,
        row_errors,
        rows_read,
    })
}

/// Load a test CSV, preserving every column so the output can mirror it.
pub fn read_test_table(path: &Path) -> Result<TestTable, AppError> {
    let mut reader = open_reader(path)?;

    let headers: Vec<String> = read_headers(&mut reader)?
        .iter()
        .map(str::to_string)
        .collect();
    let header_map = build_header_map(&StringRecord::from(headers.clone()));
    let source_idx = *header_map
        .get("source")
        .ok_or_else(|| AppError::validation("Missing required column: `source`"))?;

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| {
            AppError::validation(format!("CSV parse error on line {}: {e}", idx + 2))
        })?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    if rows.is_empty() {
        return Err(AppError::new(
            ErrorKind::Validation,
            "Test CSV contains no rows.",
        ));
    }

    Ok(TestTable {
        headers,
        rows,
        source_idx,
    })
}

fn open_reader(path: &Path) -> Result<csv::Reader<File>, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::validation(format!("Failed to open CSV '{}': {e}", path.display()))
    })?;
    Ok(csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file))
}

fn read_headers(reader: &mut csv::Reader<File>) -> Result<StringRecord, AppError> {
    Ok(reader
        .headers()
        .map_err(|e| AppError::validation(format!("Failed to read CSV headers: {e}")))?
        .clone())
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a BOM;
    // without stripping it the schema check reports a missing column.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn parse_pair(
    record: &StringRecord,
    source_idx: usize,
    target_idx: usize,
) -> Result<ExamplePair, String> {
    let source = record
        .get(source_idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| "Missing `source` value.".to_string())?;
    let target = record
        .get(target_idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| "Missing `target` value.".to_string())?;
    Ok(ExamplePair {
        source: source.to_string(),
        target: target.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn reads_source_target_pairs() {
        let file = write_csv("source,target\n1,2\n3,6\n");
        let ingested = read_example_set(file.path()).unwrap();
        assert_eq!(ingested.examples.len(), 2);
        assert_eq!(ingested.rows_read, 2);
        assert!(ingested.row_errors.is_empty());
    }

    #[test]
    fn header_lookup_is_case_insensitive_and_bom_tolerant() {
        let file = write_csv("\u{feff}Source,TARGET\na,b\n");
        let ingested = read_example_set(file.path()).unwrap();
        assert_eq!(ingested.examples.pairs()[0].source, "a");
    }

    #[test]
    fn bad_rows_are_skipped_and_reported() {
        let file = write_csv("source,target\na,b\n,missing\nc,d\n");
        let ingested = read_example_set(file.path()).unwrap();
        assert_eq!(ingested.examples.len(), 2);
        assert_eq!(ingested.row_errors.len(), 1);
        assert_eq!(ingested.row_errors[0].line, 3);
    }

    #[test]
    fn missing_source_column_is_a_validation_error() {
        let file = write_csv("input,target\na,b\n");
        let err = read_example_set(file.path()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("source"));
    }

    #[test]
    fn all_rows_bad_yields_an_empty_set_error() {
        let file = write_csv("source,target\n,\n,\n");
        assert!(read_example_set(file.path()).is_err());
    }

    #[test]
    fn test_table_preserves_all_columns() {
        let file = write_csv("id,source,note\n1,abc,x\n2,def,y\n");
        let table = read_test_table(file.path()).unwrap();
        assert_eq!(table.headers, vec!["id", "source", "note"]);
        assert_eq!(table.source_values(), vec!["abc", "def"]);
    }
}
