//! Plan and step-state types used inside the pipeline

use sdk::types::{PlanStep, ToolOutcome};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which planner produced a plan
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlanSource {
    Remote,
    Rules,
}

impl fmt::Display for PlanSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanSource::Remote => write!(f, "remote"),
            PlanSource::Rules => write!(f, "rules"),
        }
    }
}

/// An ordered list of tool invocations; empty is valid and runs nothing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    pub steps: Vec<PlanStep>,
    pub source: PlanSource,
    /// Caveats collected while building the plan (e.g. dropped steps)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl Plan {
    pub fn new(steps: Vec<PlanStep>, source: PlanSource) -> Self {
        Self {
            steps,
            source,
            notes: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn tools(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.tool.as_str()).collect()
    }
}

/// Lifecycle of one plan step
///
/// `Pending -> Running -> {Success, Degraded, Failed}`; the last three are
/// terminal and ignore further transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Pending,
    Running,
    Success,
    Degraded,
    Failed,
}

impl StepState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepState::Success | StepState::Degraded | StepState::Failed
        )
    }

    pub fn start(self) -> Self {
        match self {
            StepState::Pending => StepState::Running,
            other => other,
        }
    }

    pub fn finish(self, outcome: ToolOutcome) -> Self {
        match self {
            StepState::Running => outcome.into(),
            other => other,
        }
    }
}

impl From<ToolOutcome> for StepState {
    fn from(outcome: ToolOutcome) -> Self {
        match outcome {
            ToolOutcome::Success => StepState::Success,
            ToolOutcome::Degraded => StepState::Degraded,
            ToolOutcome::Failed => StepState::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_lifecycle() {
        let s = StepState::Pending;
        assert!(!s.is_terminal());
        let s = s.start();
        assert_eq!(s, StepState::Running);
        let s = s.finish(ToolOutcome::Degraded);
        assert_eq!(s, StepState::Degraded);
        assert!(s.is_terminal());
    }

    #[test]
    fn test_terminal_states_stay_put() {
        assert_eq!(StepState::Failed.start(), StepState::Failed);
        assert_eq!(
            StepState::Success.finish(ToolOutcome::Failed),
            StepState::Success
        );
        // Cannot finish without starting
        assert_eq!(
            StepState::Pending.finish(ToolOutcome::Success),
            StepState::Pending
        );
    }
}
