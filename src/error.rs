use std::fmt;

use thiserror::Error;

use crate::types::ContentType;

/// Pipeline stage a failure originated from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageKind {
    List,
    LoadTestData,
    Read,
    Convert,
    Extract,
    Evaluate,
    Export,
}

impl StageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::List => "list",
            StageKind::LoadTestData => "load_test_data",
            StageKind::Read => "read",
            StageKind::Convert => "convert",
            StageKind::Extract => "extract",
            StageKind::Evaluate => "evaluate",
            StageKind::Export => "export",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by the orchestration core.
///
/// A `Stage` error is scoped to one unit of work and never aborts the other
/// units in a run; `Config` errors are rejected at construction time.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{stage} stage failed for unit {unit}: {source}")]
    Stage {
        stage: StageKind,
        unit: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("pipeline runtime error: {0}")]
    Runtime(String),
}

impl PipelineError {
    pub fn stage(stage: StageKind, unit: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Stage {
            stage,
            unit: unit.into(),
            source,
        }
    }

    pub fn stage_kind(&self) -> Option<StageKind> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    pub fn unit(&self) -> Option<&str> {
        match self {
            Self::Stage { unit, .. } => Some(unit),
            _ => None,
        }
    }
}

/// Construction-time contract violations for [`crate::types::Document`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error(
        "page {page_number} of document {document_id} holds {found} data \
         but the document is declared {declared}"
    )]
    ContentTypeMismatch {
        document_id: String,
        page_number: u32,
        declared: ContentType,
        found: ContentType,
    },

    #[error("page numbers are 1-based but document {document_id} has a page numbered 0")]
    ZeroPageNumber { document_id: String },
}
