//! Pipeline orchestration: per-unit scheduling across the worker pool and
//! the concurrency gate.

pub mod evaluation;
pub mod extraction;
pub mod progress;
pub mod report;

pub use evaluation::EvaluationOrchestrator;
pub use extraction::ExtractionOrchestrator;
pub use progress::{StageTransition, UnitProgress, UnitStage};
pub use report::{EvaluationRunReport, RunReport, UnitOutcome};

use std::sync::Arc;

use crate::context::RunContext;
use crate::error::{PipelineError, StageKind};
use crate::metrics::RunMetrics;
use crate::ports::{Converter, Reader};
use crate::runtime::WorkerPool;
use crate::types::{Document, PathIdentifier};

/// CPU-bound ingest phase shared by both orchestrators: read then convert,
/// sequentially, on one pooled worker. A Reader failure means the Converter
/// is never invoked for this unit.
pub(crate) async fn ingest_unit(
    unit: &str,
    path_identifier: &PathIdentifier,
    reader: &Arc<dyn Reader>,
    converter: &Arc<dyn Converter>,
    pool: &WorkerPool,
    ctx: &RunContext,
    metrics: &Arc<RunMetrics>,
) -> Result<Document, PipelineError> {
    let unit = unit.to_string();
    let path_identifier = path_identifier.clone();
    let reader = Arc::clone(reader);
    let converter = Arc::clone(converter);
    let ctx = ctx.clone();
    let metrics = Arc::clone(metrics);

    pool.submit(move || {
        let bytes = reader
            .read(&path_identifier, &ctx)
            .map_err(|e| PipelineError::stage(StageKind::Read, unit.as_str(), e))?;
        metrics.record_read();
        let document = converter
            .convert(bytes, &ctx)
            .map_err(|e| PipelineError::stage(StageKind::Convert, unit.as_str(), e))?;
        metrics.record_conversion();
        Ok(document)
    })
    .await?
}
