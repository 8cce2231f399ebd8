use uuid::Uuid;

use crate::error::PipelineError;
use crate::pipeline::progress::StageTransition;
use crate::types::PathIdentifier;

/// Terminal outcome of one unit of work, attributable to its originating
/// path (extraction) or example id (evaluation).
#[derive(Debug)]
pub struct UnitOutcome {
    pub unit: String,
    pub path_identifier: PathIdentifier,
    pub result: Result<(), PipelineError>,
    pub transitions: Vec<StageTransition>,
}

impl UnitOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error(&self) -> Option<&PipelineError> {
        self.result.as_ref().err()
    }
}

/// Complete per-unit outcome report of an extraction run.
///
/// `run()` never raises on a stage failure: every input path yields exactly
/// one outcome here, in input order, and the caller distinguishes
/// "all succeeded" from partial or total failure through these accessors.
#[derive(Debug)]
pub struct RunReport {
    pub run_id: Uuid,
    pub outcomes: Vec<UnitOutcome>,
}

impl RunReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_success()).count()
    }

    pub fn is_complete_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &UnitOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn outcome_for(&self, unit: &str) -> Option<&UnitOutcome> {
        self.outcomes.iter().find(|o| o.unit == unit)
    }
}

/// Outcome report of an evaluation run, including the terminal export.
#[derive(Debug)]
pub struct EvaluationRunReport {
    pub run_id: Uuid,
    pub outcomes: Vec<UnitOutcome>,
    /// Number of (document, results) pairs handed to the terminal export.
    pub exported: usize,
    /// Outcome of the single aggregated export call.
    pub export_result: Result<(), PipelineError>,
}

impl EvaluationRunReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_success()).count()
    }

    pub fn is_complete_success(&self) -> bool {
        self.export_result.is_ok() && self.outcomes.iter().all(|o| o.is_success())
    }

    pub fn outcome_for(&self, unit: &str) -> Option<&UnitOutcome> {
        self.outcomes.iter().find(|o| o.unit == unit)
    }
}
