//! Session state for the execution pipeline.

use std::fmt;

use serde::Serialize;
use tokio::time::Instant;
use uuid::Uuid;

use super::record::StepRecord;
use crate::catalog::Step;
use crate::error::AnalysisResult;

/// Where a session currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelinePhase {
    /// Waiting to run the step at this index
    Pending(usize),

    /// Running a sub-stage of a step
    Running { step: usize, sub_stage: usize },

    /// Step finished and its record is stored
    StepComplete(usize),

    /// Step failed; running again resumes here
    Failed { step: usize, message: String },

    /// Every step has a record
    AllComplete,
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending(step) => write!(f, "pending step {}", step + 1),
            Self::Running { step, sub_stage } => {
                write!(f, "running step {} stage {}", step + 1, sub_stage + 1)
            }
            Self::StepComplete(step) => write!(f, "step {} complete", step + 1),
            Self::Failed { step, message } => write!(f, "step {} failed: {message}", step + 1),
            Self::AllComplete => write!(f, "all steps complete"),
        }
    }
}

/// Accumulated digest of completed steps, rebuilt before each step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunContext {
    text: String,
}

impl RunContext {
    /// Build the digest from records in execution order.
    pub fn from_records<'a>(
        records: impl IntoIterator<Item = &'a StepRecord>,
        chars_per_step: usize,
    ) -> Self {
        let text = records
            .into_iter()
            .enumerate()
            .map(|(i, record)| record.digest(i + 1, chars_per_step))
            .collect::<Vec<_>>()
            .join("\n");
        Self { text }
    }

    /// The digest text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Whether no step has completed yet.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Everything one analysis session accumulates.
///
/// Belongs to exactly one pipeline at a time; every pipeline operation takes
/// it by mutable reference.
#[derive(Debug, Clone)]
pub struct PipelineState {
    session_id: Uuid,
    steps: Vec<Step>,
    records: Vec<StepRecord>,
    phase: PipelinePhase,
    pub(super) last_call: Option<Instant>,
}

#[derive(Serialize)]
struct RecordsDocument<'a> {
    session_id: Uuid,
    records: &'a [StepRecord],
}

impl PipelineState {
    /// Start a session over steps in final order.
    pub fn new(steps: Vec<Step>) -> Self {
        let phase = if steps.is_empty() { PipelinePhase::AllComplete } else { PipelinePhase::Pending(0) };
        Self { session_id: Uuid::new_v4(), steps, records: Vec::new(), phase, last_call: None }
    }

    /// Session identifier.
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Steps in execution order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Records in execution order.
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Current phase.
    pub fn phase(&self) -> &PipelinePhase {
        &self.phase
    }

    /// Record for a step id.
    pub fn record(&self, step_id: &str) -> Option<&StepRecord> {
        self.records.iter().find(|r| r.step_id == step_id)
    }

    /// Completed and total step counts.
    pub fn progress(&self) -> (usize, usize) {
        (self.records.len(), self.steps.len())
    }

    /// Whether the session reached its terminal phase.
    pub fn is_complete(&self) -> bool {
        self.phase == PipelinePhase::AllComplete
    }

    /// Index of the step that runs next, if any.
    pub fn next_index(&self) -> Option<usize> {
        match &self.phase {
            PipelinePhase::Pending(step)
            | PipelinePhase::Running { step, .. }
            | PipelinePhase::Failed { step, .. } => Some(*step),
            PipelinePhase::StepComplete(step) => {
                let next = step + 1;
                (next < self.steps.len()).then_some(next)
            }
            PipelinePhase::AllComplete => None,
        }
    }

    /// Context for the step at `index`: records of every earlier step only.
    pub fn context_for(&self, index: usize, chars_per_step: usize) -> RunContext {
        let earlier = self.steps.iter().take(index).filter_map(|step| self.record(&step.id));
        RunContext::from_records(earlier, chars_per_step)
    }

    /// Records as a JSON document for renderers.
    pub fn records_json(&self) -> AnalysisResult<String> {
        let document = RecordsDocument { session_id: self.session_id, records: &self.records };
        Ok(serde_json::to_string_pretty(&document)?)
    }

    pub(super) fn set_phase(&mut self, phase: PipelinePhase) {
        tracing::debug!(session = %self.session_id, %phase, "Pipeline phase");
        self.phase = phase;
    }

    /// Append a first record, or replace the record of the same step.
    pub(super) fn store(&mut self, record: StepRecord) {
        match self.records.iter_mut().find(|r| r.step_id == record.step_id) {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
    }

    /// Move past a completed step.
    pub(super) fn advance(&mut self) {
        let next = match self.next_index() {
            Some(next) => PipelinePhase::Pending(next),
            None => PipelinePhase::AllComplete,
        };
        self.set_phase(next);
    }
}
