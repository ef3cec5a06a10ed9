//! CSV export of predictions.

use std::fs::File;
use std::path::Path;

use crate::error::AppError;
use crate::io::ingest::TestTable;

/// Write the test table back out with a trailing `predicted` column.
pub fn write_predictions(
    path: &Path,
    table: &TestTable,
    predictions: &[String],
) -> Result<(), AppError> {
    if predictions.len() != table.rows.len() {
        return Err(AppError::io(format!(
            "Prediction count ({}) does not match row count ({}).",
            predictions.len(),
            table.rows.len()
        )));
    }

    let file = File::create(path).map_err(|e| {
        AppError::io(format!("Failed to create '{}': {e}", path.display()))
    })?;
    let mut writer = csv::Writer::from_writer(file);

    let mut headers = table.headers.clone();
    headers.push("predicted".to_string());
    writer
        .write_record(&headers)
        .map_err(|e| AppError::io(format!("Failed to write CSV header: {e}")))?;

    for (row, prediction) in table.rows.iter().zip(predictions) {
        let mut record = row.clone();
        record.push(prediction.clone());
        writer
            .write_record(&record)
            .map_err(|e| AppError::io(format!("Failed to write CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to flush CSV output: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_predicted_column() {
        let table = TestTable {
            headers: vec!["id".to_string(), "source".to_string()],
            rows: vec![
                vec!["1".to_string(), "abc".to_string()],
                vec!["2".to_string(), "def".to_string()],
            ],
            source_idx: 1,
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_predictions(&path, &table, &["ABC".to_string(), "DEF".to_string()]).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("id,source,predicted\n"));
        assert!(written.contains("1,abc,ABC"));
        assert!(written.contains("2,def,DEF"));
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let table = TestTable {
            headers: vec!["source".to_string()],
            rows: vec![vec!["a".to_string()]],
            source_idx: 0,
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        assert!(write_predictions(&path, &table, &[]).is_err());
    }
}
