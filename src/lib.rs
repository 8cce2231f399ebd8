//! Concurrent document extraction and evaluation pipeline orchestration.
//!
//! Two workflows share one orchestration core: an extraction run carries each
//! document through ingest -> extract -> export, and an evaluation run adds
//! ground-truth scoring and finishes with a single aggregated export.
//! CPU-bound stages (read, convert, evaluate) execute on a bounded worker
//! pool; I/O-bound stages (extract, export) run under a bounded concurrency
//! gate. Concrete stage implementations plug in through the traits in
//! [`ports`].

pub mod components;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod ports;
pub mod runtime;
pub mod types;

pub use config::{
    load_evaluation_config, load_extraction_config, Component, ConfigDir, EvaluationPipelineConfig,
    EvaluatorConfigMap, ExtractionPipelineConfig, OrchestratorConfig,
};
pub use context::RunContext;
pub use error::{DocumentError, PipelineError, StageKind};
pub use metrics::{MetricsSnapshot, RunMetrics};
pub use pipeline::{
    EvaluationOrchestrator, EvaluationRunReport, ExtractionOrchestrator, RunReport,
    StageTransition, UnitOutcome, UnitStage,
};
pub use ports::{
    Converter, EvaluationExporter, Evaluator, ExtractionExporter, Extractor, FileLister, Reader,
    TestDataLoader,
};
pub use runtime::{ConcurrencyGate, WorkerPool};
pub use types::{
    ContentType, Document, DocumentBytes, EvaluationExample, EvaluationResult, ExtractionResult,
    ExtractionSchema, Page, PageData, PathIdentifier,
};
