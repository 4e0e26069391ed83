//! Bus location lookup

use sdk::types::{PlanStep, ToolKind, ToolPayload, ToolResult};

use super::{ExecutionState, ToolRegistry};
use crate::conductor::query::{canonical_id, extract_bus_id};

pub(crate) async fn run(
    registry: &ToolRegistry,
    step: &PlanStep,
    query: &str,
    state: &mut ExecutionState,
) -> ToolResult {
    let Some(bus_id) = step
        .param("bus_id")
        .map(canonical_id)
        .or_else(|| extract_bus_id(query))
    else {
        return ToolResult::failed(ToolKind::Gps, "no bus id given in the plan or the question");
    };

    match registry.locate_bus(&bus_id).await {
        Ok(Some(location)) => {
            state.last_bus_location = Some(location.clone());
            ToolResult::success(ToolKind::Gps, ToolPayload::Gps(location))
        }
        Ok(None) => ToolResult::failed(ToolKind::Gps, format!("bus {} not found", bus_id)),
        Err(e) => {
            tracing::warn!(bus_id = %bus_id, error = %e, "bus location lookup failed");
            ToolResult::failed(
                ToolKind::Gps,
                format!("location of bus {} unavailable: {}", bus_id, e),
            )
        }
    }
}
