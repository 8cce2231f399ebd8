//! JSON-backed test data loading for evaluations.

use std::fs;
use std::marker::PhantomData;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::context::RunContext;
use crate::ports::TestDataLoader;
use crate::types::{EvaluationExample, ExtractionResult, ExtractionSchema, PathIdentifier};

#[derive(Debug, Deserialize)]
struct TestDataEntry {
    #[serde(default)]
    inputs: TestDataInputs,
    expectations: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
struct TestDataInputs {
    #[serde(alias = "input_pdf_path")]
    input_path: Option<String>,
}

/// Loads evaluation examples from a JSON array of
/// `{"inputs": {"input_path": ...}, "expectations": {...}}` entries.
/// Example ids are derived from the input file stem.
pub struct JsonTestDataLoader<S> {
    _schema: PhantomData<fn() -> S>,
}

impl<S> JsonTestDataLoader<S> {
    pub fn new() -> Self {
        Self {
            _schema: PhantomData,
        }
    }
}

impl<S> Default for JsonTestDataLoader<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ExtractionSchema> TestDataLoader<S> for JsonTestDataLoader<S> {
    fn load_test_data(
        &self,
        source: &PathIdentifier,
        _ctx: &RunContext,
    ) -> Result<Vec<EvaluationExample<S>>> {
        let raw = fs::read_to_string(&source.path)
            .with_context(|| format!("test data not found: {}", source.path))?;
        let entries: Vec<TestDataEntry> = serde_json::from_str(&raw)
            .context("test data must be a JSON array of objects")?;

        let mut examples = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            let input_path = entry
                .inputs
                .input_path
                .with_context(|| format!("missing inputs.input_path in test data entry {index}"))?;
            let truth: S = serde_json::from_value(entry.expectations)
                .with_context(|| format!("invalid expectations in test data entry {index}"))?;

            let id = Path::new(&input_path)
                .file_stem()
                .and_then(|stem| stem.to_str())
                .map(str::to_string)
                .unwrap_or_else(|| input_path.clone());

            examples.push(EvaluationExample::new(
                id,
                PathIdentifier::new(input_path),
                ExtractionResult::new(truth),
            ));
        }
        Ok(examples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
    struct LeaseDetails {
        tenant: String,
        monthly_rent: u32,
    }

    fn write_test_data(contents: &str) -> (tempfile::TempDir, PathIdentifier) {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("test_data.json");
        fs::write(&path, contents).unwrap();
        let identifier = PathIdentifier::new(path.to_string_lossy());
        (tmp, identifier)
    }

    #[test]
    fn test_loads_examples_with_ids_from_stems() {
        let (_tmp, source) = write_test_data(
            r#"[
                {
                    "inputs": {"input_path": "docs/lease_a.txt"},
                    "expectations": {"tenant": "Alice", "monthly_rent": 1200}
                },
                {
                    "inputs": {"input_path": "docs/lease_b.txt"},
                    "expectations": {"tenant": "Bob", "monthly_rent": 950}
                }
            ]"#,
        );

        let loader = JsonTestDataLoader::<LeaseDetails>::new();
        let examples = loader.load_test_data(&source, &RunContext::new()).unwrap();

        assert_eq!(examples.len(), 2);
        assert_eq!(examples[0].id, "lease_a");
        assert_eq!(examples[0].path_identifier.key(), "docs/lease_a.txt");
        assert_eq!(examples[0].truth.data.tenant, "Alice");
        assert_eq!(examples[1].truth.data.monthly_rent, 950);
    }

    #[test]
    fn test_accepts_legacy_input_pdf_path_key() {
        let (_tmp, source) = write_test_data(
            r#"[{
                "inputs": {"input_pdf_path": "scans/lease.pdf"},
                "expectations": {"tenant": "Carol", "monthly_rent": 800}
            }]"#,
        );

        let loader = JsonTestDataLoader::<LeaseDetails>::new();
        let examples = loader.load_test_data(&source, &RunContext::new()).unwrap();
        assert_eq!(examples[0].id, "lease");
    }

    #[test]
    fn test_missing_input_path_is_error() {
        let (_tmp, source) = write_test_data(
            r#"[{"inputs": {}, "expectations": {"tenant": "D", "monthly_rent": 1}}]"#,
        );

        let loader = JsonTestDataLoader::<LeaseDetails>::new();
        let err = loader
            .load_test_data(&source, &RunContext::new())
            .unwrap_err();
        assert!(err.to_string().contains("input_path"));
    }

    #[test]
    fn test_invalid_expectations_is_error() {
        let (_tmp, source) = write_test_data(
            r#"[{"inputs": {"input_path": "a.txt"}, "expectations": {"tenant": "E"}}]"#,
        );

        let loader = JsonTestDataLoader::<LeaseDetails>::new();
        assert!(loader.load_test_data(&source, &RunContext::new()).is_err());
    }

    #[test]
    fn test_non_array_payload_is_error() {
        let (_tmp, source) = write_test_data(r#"{"not": "an array"}"#);

        let loader = JsonTestDataLoader::<LeaseDetails>::new();
        assert!(loader.load_test_data(&source, &RunContext::new()).is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        let loader = JsonTestDataLoader::<LeaseDetails>::new();
        let result =
            loader.load_test_data(&PathIdentifier::new("/nonexistent/data.json"), &RunContext::new());
        assert!(result.is_err());
    }
}
