//! Stage ports consumed by the orchestrators.
//!
//! Synchronous ports (`Reader`, `Converter`, `Evaluator`) run on the bounded
//! worker pool; asynchronous ports (`Extractor`, exporters) run under the
//! concurrency gate. `FileLister` and `TestDataLoader` run once, before
//! orchestration starts.

use anyhow::Result;
use async_trait::async_trait;

use crate::context::RunContext;
use crate::types::{
    Document, DocumentBytes, EvaluationExample, EvaluationResult, ExtractionResult,
    ExtractionSchema, PathIdentifier,
};

/// Enumerates the documents an extraction run should process.
pub trait FileLister: Send + Sync {
    fn list_files(&self, ctx: &RunContext) -> Result<Vec<PathIdentifier>>;
}

/// Loads ground-truth examples for an evaluation run.
pub trait TestDataLoader<S: ExtractionSchema>: Send + Sync {
    fn load_test_data(
        &self,
        source: &PathIdentifier,
        ctx: &RunContext,
    ) -> Result<Vec<EvaluationExample<S>>>;
}

/// Reads raw document bytes. Blocking; executed on the worker pool.
pub trait Reader: Send + Sync {
    fn read(&self, path_identifier: &PathIdentifier, ctx: &RunContext) -> Result<DocumentBytes>;
}

/// Parses raw bytes into a [`Document`]. Blocking; executed on the worker pool.
pub trait Converter: Send + Sync {
    fn convert(&self, document_bytes: DocumentBytes, ctx: &RunContext) -> Result<Document>;
}

/// Produces structured data from a document. I/O-bound; gated.
#[async_trait]
pub trait Extractor<S: ExtractionSchema>: Send + Sync {
    async fn extract(&self, document: &Document, ctx: &RunContext) -> Result<ExtractionResult<S>>;
}

/// Persists one document's extraction result. I/O-bound; gated.
#[async_trait]
pub trait ExtractionExporter<S: ExtractionSchema>: Send + Sync {
    async fn export(
        &self,
        document: &Document,
        result: &ExtractionResult<S>,
        ctx: &RunContext,
    ) -> Result<()>;
}

/// Scores a prediction against ground truth. Blocking; executed on the
/// worker pool.
pub trait Evaluator<S: ExtractionSchema>: Send + Sync {
    fn evaluate(
        &self,
        truth: &ExtractionResult<S>,
        pred: &ExtractionResult<S>,
        ctx: &RunContext,
    ) -> Result<EvaluationResult>;
}

/// Persists the aggregated result set of a whole evaluation run.
/// Called exactly once per run, after every example reached a terminal state.
#[async_trait]
pub trait EvaluationExporter: Send + Sync {
    async fn export(
        &self,
        results: &[(Document, Vec<EvaluationResult>)],
        ctx: &RunContext,
    ) -> Result<()>;
}
