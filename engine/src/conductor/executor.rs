//! Conductor Executor
//!
//! Runs a plan's steps in order against the tool registry. Values learned by
//! one step (the bus position, the weather) are handed to later steps
//! through an [`ExecutionState`] that lives only as long as one execution.

use sdk::types::{ContextItem, ToolResult};
use std::time::Instant;
use tracing::{debug, info};

use super::types::{Plan, StepState};
use crate::tools::{ExecutionState, ToolRegistry};

pub struct PlanExecutor {
    tools: ToolRegistry,
}

impl PlanExecutor {
    pub fn new(tools: ToolRegistry) -> Self {
        Self { tools }
    }

    /// Execute every step; never aborts early
    ///
    /// One result per executed step, in plan order. `none` steps are
    /// skipped and produce nothing.
    pub async fn execute(
        &self,
        plan: &Plan,
        query: &str,
        context: &[ContextItem],
    ) -> Vec<ToolResult> {
        let start = Instant::now();
        let mut state = ExecutionState::default();
        let mut results = Vec::with_capacity(plan.steps.len());

        for (index, step) in plan.steps.iter().enumerate() {
            let step_state = StepState::Pending.start();
            debug!(index, tool = %step.tool, state = ?step_state, "step started");

            let Some(result) = self.tools.run(step, query, context, &mut state).await else {
                debug!(index, "skipping empty step");
                continue;
            };

            let step_state = step_state.finish(result.outcome);
            debug!(index, tool = %result.tool, state = ?step_state, note = ?result.note, "step finished");
            results.push(result);
        }

        info!(
            steps = results.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "plan executed"
        );
        results
    }
}
