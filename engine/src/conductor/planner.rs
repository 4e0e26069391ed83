//! Plan generation
//!
//! Two strategies sit behind the [`Planner`] trait: [`RemotePlanner`] asks
//! the reasoning service for a JSON plan, [`RulePlanner`] matches keywords.
//! [`PlanGenerator`] checks the reasoning service when each plan is needed
//! and falls back to the rules on any failure.

use async_trait::async_trait;
use sdk::collaborators::ReasoningService;
use sdk::errors::EngineError;
use sdk::types::{ContextItem, PlanStep, ToolKind};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::query::{extract_bus_id, extract_stop_id, mentions_any};
use super::types::{Plan, PlanSource};
use crate::bounded::bounded;
use crate::llm::extract_json_payload;

const ARRIVAL_WORDS: &[&str] = &["when", "eta", "reach", "delay"];
const WEATHER_WORDS: &[&str] = &[
    "weather",
    "rain",
    "sunny",
    "haze",
    "temperature",
    "storm",
    "snow",
    "fog",
];
const LOCATION_WORDS: &[&str] = &["where", "location", "status"];

#[async_trait]
pub trait Planner: Send + Sync {
    fn name(&self) -> &str;

    async fn plan(&self, query: &str, context: &[ContextItem]) -> Result<Plan, EngineError>;
}

/// Deterministic keyword planner
///
/// The first matching intent wins:
/// - arrival (`when`, `eta`, `reach`, `delay`): `[gps], weather, eta`, where
///   the leading gps step is only added when the query names a bus
/// - weather words: `gps, weather`
/// - location (`where`, `location`, `status`): `gps`
/// - anything else: the empty plan
#[derive(Debug, Clone, Copy, Default)]
pub struct RulePlanner;

impl RulePlanner {
    pub fn plan_for(&self, query: &str) -> Plan {
        let bus_id = extract_bus_id(query);
        let stop_id = extract_stop_id(query);
        let gps = || PlanStep::new(ToolKind::Gps).with_param("bus_id", bus_id.clone());

        let steps = if mentions_any(query, ARRIVAL_WORDS) {
            let mut steps = Vec::with_capacity(3);
            if bus_id.is_some() {
                steps.push(gps());
            }
            steps.push(PlanStep::new(ToolKind::Weather));
            steps.push(
                PlanStep::new(ToolKind::Eta)
                    .with_param("bus_id", bus_id.clone())
                    .with_param("stop_id", stop_id),
            );
            steps
        } else if mentions_any(query, WEATHER_WORDS) {
            vec![gps(), PlanStep::new(ToolKind::Weather)]
        } else if mentions_any(query, LOCATION_WORDS) {
            vec![gps()]
        } else {
            Vec::new()
        };

        Plan::new(steps, PlanSource::Rules)
    }
}

#[async_trait]
impl Planner for RulePlanner {
    fn name(&self) -> &str {
        "rules"
    }

    async fn plan(&self, query: &str, _context: &[ContextItem]) -> Result<Plan, EngineError> {
        Ok(self.plan_for(query))
    }
}

/// Planner backed by the reasoning service
pub struct RemotePlanner {
    reasoning: Arc<dyn ReasoningService>,
    timeout: Duration,
}

impl RemotePlanner {
    pub fn new(reasoning: Arc<dyn ReasoningService>, timeout: Duration) -> Self {
        Self { reasoning, timeout }
    }
}

#[async_trait]
impl Planner for RemotePlanner {
    fn name(&self) -> &str {
        "remote"
    }

    async fn plan(&self, query: &str, context: &[ContextItem]) -> Result<Plan, EngineError> {
        let prompt = plan_prompt(query, context);
        let raw = bounded(
            self.timeout,
            "plan generation",
            self.reasoning.generate_plan(&prompt),
        )
        .await?;
        parse_plan(&raw)
    }
}

fn plan_prompt(query: &str, context: &[ContextItem]) -> String {
    let context: Vec<Value> = context
        .iter()
        .map(|c| {
            json!({
                "id": c.document.id,
                "kind": c.document.source_kind,
                "text": c.document.text,
            })
        })
        .collect();

    json!({
        "query": query,
        "context": context,
        "tools": ["gps", "weather", "eta", "none"],
    })
    .to_string()
}

/// Parse reasoning-service output into a plan
///
/// Accepts `{"plan": [...]}` or a bare array, optionally fenced or wrapped
/// in prose. Steps with an unknown or missing tool are dropped with a note.
/// Parameter values that are not strings are stringified; nulls are skipped.
pub fn parse_plan(raw: &str) -> Result<Plan, EngineError> {
    let payload = extract_json_payload(raw)
        .ok_or_else(|| EngineError::Parse("no JSON plan in response".to_string()))?;
    let value: Value = serde_json::from_str(payload)?;

    let items = match &value {
        Value::Array(items) => items,
        Value::Object(obj) => obj
            .get("plan")
            .and_then(Value::as_array)
            .ok_or_else(|| EngineError::Parse("plan object has no \"plan\" array".to_string()))?,
        _ => return Err(EngineError::Parse("plan is not an array".to_string())),
    };

    let mut plan = Plan::new(Vec::with_capacity(items.len()), PlanSource::Remote);

    for (i, item) in items.iter().enumerate() {
        let Some(tool_name) = item.get("tool").and_then(Value::as_str) else {
            plan.notes.push(format!("dropped step {}: no tool named", i + 1));
            continue;
        };
        let tool = match tool_name.parse::<ToolKind>() {
            Ok(tool) => tool,
            Err(e) => {
                plan.notes.push(format!("dropped step {}: {}", i + 1, e));
                continue;
            }
        };

        let mut step = PlanStep::new(tool);
        if let Some(params) = item.get("params").and_then(Value::as_object) {
            for (key, v) in params {
                let value = match v {
                    Value::Null => continue,
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                step.params.insert(key.clone(), value);
            }
        }
        plan.steps.push(step);
    }

    Ok(plan)
}

/// Picks the remote planner when the reasoning service is up, rules otherwise
pub struct PlanGenerator {
    reasoning: Arc<dyn ReasoningService>,
    remote: RemotePlanner,
    rules: RulePlanner,
    timeout: Duration,
}

impl PlanGenerator {
    pub fn new(reasoning: Arc<dyn ReasoningService>, timeout: Duration) -> Self {
        Self {
            remote: RemotePlanner::new(Arc::clone(&reasoning), timeout),
            reasoning,
            rules: RulePlanner,
            timeout,
        }
    }

    /// Always produces a plan
    pub async fn plan(&self, query: &str, context: &[ContextItem]) -> Plan {
        let available = bounded(self.timeout, "reasoning availability", async {
            Ok(self.reasoning.is_available().await)
        })
        .await
        .unwrap_or(false);

        if available {
            match self.remote.plan(query, context).await {
                Ok(plan) => {
                    for note in &plan.notes {
                        warn!(note = %note, "remote plan adjusted");
                    }
                    debug!(steps = ?plan.tools(), "using remote plan");
                    return plan;
                }
                Err(e) => {
                    warn!(error = %e, "remote planning failed, using rule-based plan");
                }
            }
        } else {
            debug!(service = self.reasoning.name(), "reasoning service unavailable, using rule-based plan");
        }

        let plan = self.rules.plan_for(query);
        debug!(steps = ?plan.tools(), "using rule-based plan");
        plan
    }
}
