//! End-to-end pipelines shared by the CLI commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! CSV ingest -> rule inference -> application -> export/preview.
//!
//! The CLI can then focus on presentation.

use std::path::Path;

use crate::domain::InferenceResult;
use crate::error::AppError;
use crate::infer::{apply_batch, infer_rule};
use crate::io::ingest::IngestedExamples;
use crate::io::{read_example_set, read_test_table, TestTable};
use crate::llm::GenerativeBackend;

pub struct InferOutput {
    pub result: InferenceResult,
    pub ingest: IngestedExamples,
}

pub struct ApplyOutput {
    pub result: InferenceResult,
    pub table: TestTable,
    pub predictions: Vec<String>,
}

/// Load training pairs and infer a transformation rule.
pub fn run_infer(train: &Path, backend: &GenerativeBackend) -> Result<InferOutput, AppError> {
    let ingest = read_example_set(train)?;
    log::info!(
        "loaded {} training pairs ({} rows skipped)",
        ingest.examples.len(),
        ingest.row_errors.len()
    );
    let result = infer_rule(&ingest.examples, backend)?;
    Ok(InferOutput { result, ingest })
}

/// Infer a rule from training pairs and apply it to every test row.
pub fn run_apply(
    train: &Path,
    test: &Path,
    backend: &GenerativeBackend,
) -> Result<ApplyOutput, AppError> {
    let inferred = run_infer(train, backend)?;
    let table = read_test_table(test)?;
    let predictions = apply_batch(&inferred.result.rule, &table.source_values())?;
    Ok(ApplyOutput {
        result: inferred.result,
        table,
        predictions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SynthesizedRule, TransformationType};
    use crate::llm::RemoteState;
    use std::io::Write;
    use std::time::Duration;

    fn offline_backend() -> GenerativeBackend {
        GenerativeBackend::new(
            None,
            RemoteState::Unavailable {
                reason: "no key".to_string(),
            },
            Duration::from_secs(1),
        )
    }

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn numeric_pipeline_never_touches_the_backend() {
        let train = write_csv("source,target\n1,2\n2,4\n3,6\n");
        let output = run_infer(train.path(), &offline_backend()).unwrap();
        assert_eq!(
            output.result.transformation_type,
            TransformationType::Numeric
        );
        assert!(matches!(
            output.result.rule,
            SynthesizedRule::Numeric { .. }
        ));
    }

    #[test]
    fn apply_produces_one_prediction_per_row() {
        let train = write_csv("source,target\n1,3\n2,6\n3,9\n");
        let test = write_csv("id,source\na,10\nb,20\n");
        let output = run_apply(train.path(), test.path(), &offline_backend()).unwrap();
        assert_eq!(output.predictions.len(), 2);
        assert_eq!(output.predictions[0], "30.0000");
        assert_eq!(output.predictions[1], "60.0000");
    }
}
