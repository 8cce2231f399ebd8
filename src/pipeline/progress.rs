use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Per-unit pipeline state. `Done` and `Failed` are terminal; there is no
/// retry transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStage {
    Pending,
    Ingesting,
    Extracting,
    Evaluating,
    Exporting,
    Done,
    Failed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StageTransition {
    pub from: UnitStage,
    pub to: UnitStage,
    pub elapsed_ms: u64,
}

/// Tracks one unit of work through the pipeline state machine.
pub struct UnitProgress {
    unit: String,
    stage: UnitStage,
    started_at: Instant,
    last_transition: Instant,
    transitions: Vec<StageTransition>,
}

impl UnitProgress {
    pub fn new(unit: impl Into<String>) -> Self {
        let now = Instant::now();
        Self {
            unit: unit.into(),
            stage: UnitStage::Pending,
            started_at: now,
            last_transition: now,
            transitions: Vec::new(),
        }
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn stage(&self) -> UnitStage {
        self.stage
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }

    pub fn transitions(&self) -> &[StageTransition] {
        &self.transitions
    }

    pub fn transition_to(&mut self, next: UnitStage) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_transition).as_millis() as u64;

        debug!(
            unit = %self.unit,
            from = ?self.stage,
            to = ?next,
            elapsed_ms = %elapsed,
            "Stage transition"
        );

        self.transitions.push(StageTransition {
            from: self.stage,
            to: next,
            elapsed_ms: elapsed,
        });
        self.stage = next;
        self.last_transition = now;
    }

    pub fn complete(&mut self) {
        self.transition_to(UnitStage::Done);
        debug!(
            unit = %self.unit,
            elapsed_ms = %self.elapsed_ms(),
            "Unit completed"
        );
    }

    pub fn fail(&mut self) {
        self.transition_to(UnitStage::Failed);
        warn!(
            unit = %self.unit,
            elapsed_ms = %self.elapsed_ms(),
            "Unit failed"
        );
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.stage, UnitStage::Done | UnitStage::Failed)
    }

    pub fn into_transitions(self) -> Vec<StageTransition> {
        self.transitions
    }
}
