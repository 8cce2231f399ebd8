//! Built-in local-filesystem strategies.
//!
//! These cover the file-backed ends of both pipelines; the LLM-facing
//! `Extractor` stays a port with no built-in implementation.

pub mod convert;
pub mod evaluators;
pub mod export;
pub mod fs;
pub mod test_data;

pub use convert::PlainTextConverter;
pub use evaluators::{AccuracyEvaluator, F1Evaluator};
pub use export::{
    LocalFileEvaluationExporter, LocalFileEvaluationExporterConfig, LocalFileExtractionExporter,
    LocalFileExtractionExporterConfig,
};
pub use fs::{LocalFileLister, LocalFileListerConfig, LocalFileReader, LocalFileReaderConfig};
pub use test_data::JsonTestDataLoader;
