//! Typed per-step outcomes collected during a run.
//!
//! Recoverable failures (missing targets, a failed click, a broken overlay)
//! never abort a run. They are recorded here so callers and tests can see
//! exactly what degraded without scraping logs.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{save_json, ModelError};

/// Result of one best-effort step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Ok,
    /// The step was not attempted (e.g. target absent).
    Skipped { reason: String },
    /// The step was attempted and failed.
    Failed { reason: String },
}

impl StepOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, StepOutcome::Ok)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            StepOutcome::Ok => None,
            StepOutcome::Skipped { reason } | StepOutcome::Failed { reason } => Some(reason),
        }
    }
}

/// Which part of a step produced an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPhase {
    /// Highlight effect drawn before the action.
    Overlay,
    /// The scripted interaction itself.
    Action,
    /// Loading the script's start page.
    Navigation,
    /// Drawing-surface lifecycle (re-attach, destroy).
    Surface,
}

/// One recorded outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub section_id: String,
    /// Index into the section's actions; `None` for session-level steps.
    pub action_index: Option<usize>,
    pub phase: StepPhase,
    pub outcome: StepOutcome,
}

/// All outcomes of a run, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunDiagnostics {
    pub records: Vec<StepRecord>,
}

impl RunDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        section_id: &str,
        action_index: Option<usize>,
        phase: StepPhase,
        outcome: StepOutcome,
    ) {
        self.records.push(StepRecord {
            section_id: section_id.to_string(),
            action_index,
            phase,
            outcome,
        });
    }

    /// Records that did not complete normally.
    pub fn degraded(&self) -> impl Iterator<Item = &StepRecord> {
        self.records.iter().filter(|r| !r.outcome.is_ok())
    }

    pub fn skipped_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, StepOutcome::Skipped { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, StepOutcome::Failed { .. }))
            .count()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        save_json(self, path)
    }
}
