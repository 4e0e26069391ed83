//! Answer composition
//!
//! [`RemoteComposer`] asks the reasoning service for prose. [`RuleComposer`]
//! builds a fixed sentence from the eta result. [`AnswerComposer`] picks one
//! per call and always returns some text.

use async_trait::async_trait;
use sdk::collaborators::ReasoningService;
use sdk::errors::EngineError;
use sdk::types::{ContextItem, ToolKind, ToolOutcome, ToolPayload, ToolResult, WeatherReport};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::bounded::bounded;

pub const NO_INFORMATION: &str = "No information available for this query.";

#[async_trait]
pub trait Composer: Send + Sync {
    fn name(&self) -> &str;

    async fn compose(
        &self,
        query: &str,
        context: &[ContextItem],
        results: &[ToolResult],
    ) -> Result<String, EngineError>;
}

/// Human phrase for a duration in seconds
///
/// Under a minute is "less than a minute", under an hour is whole minutes,
/// anything longer is whole hours plus the leftover minutes when non-zero.
pub fn eta_phrase(secs: u64) -> String {
    if secs < 60 {
        "less than a minute".to_string()
    } else if secs < 3600 {
        format!("{} minutes", secs / 60)
    } else {
        let hours = secs / 3600;
        let minutes = (secs % 3600) / 60;
        if minutes == 0 {
            format!("{} hours", hours)
        } else {
            format!("{} hours {} minutes", hours, minutes)
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub struct RemoteComposer {
    reasoning: Arc<dyn ReasoningService>,
    timeout: Duration,
}

impl RemoteComposer {
    pub fn new(reasoning: Arc<dyn ReasoningService>, timeout: Duration) -> Self {
        Self { reasoning, timeout }
    }

    fn prompt(query: &str, context: &[ContextItem], results: &[ToolResult]) -> String {
        let context: Vec<_> = context
            .iter()
            .map(|c| json!({ "id": c.document.id, "text": c.document.text }))
            .collect();
        json!({
            "query": query,
            "context": context,
            "tool_results": results,
        })
        .to_string()
    }
}

#[async_trait]
impl Composer for RemoteComposer {
    fn name(&self) -> &str {
        "remote"
    }

    async fn compose(
        &self,
        query: &str,
        context: &[ContextItem],
        results: &[ToolResult],
    ) -> Result<String, EngineError> {
        let prompt = Self::prompt(query, context, results);
        let raw = bounded(
            self.timeout,
            "prose generation",
            self.reasoning.generate_prose(&prompt),
        )
        .await?;

        let answer = collapse_whitespace(&raw);
        if answer.is_empty() {
            return Err(EngineError::LLMProvider(
                "reasoning service returned empty prose".to_string(),
            ));
        }
        Ok(answer)
    }
}

/// Deterministic composer working only from the tool results
#[derive(Debug, Clone, Copy)]
pub struct RuleComposer {
    alternative_threshold_secs: u64,
}

impl RuleComposer {
    pub fn new(alternative_threshold_secs: u64) -> Self {
        Self {
            alternative_threshold_secs,
        }
    }

    pub fn compose_text(&self, results: &[ToolResult]) -> String {
        let eta_result = results
            .iter()
            .find(|r| r.tool == ToolKind::Eta && r.outcome.is_usable() && r.eta().is_some());

        let Some((result, eta)) = eta_result.and_then(|r| r.eta().map(|e| (r, e))) else {
            return Self::no_information(results);
        };

        let mut parts = vec![format!(
            "Bus {} is expected to reach stop {} in {}.",
            eta.bus_id,
            eta.stop_id,
            eta_phrase(eta.eta_secs)
        )];

        if eta.delay_factor > 1.0 {
            let percent = ((eta.delay_factor - 1.0) * 100.0).round() as u64;
            let condition = weather_report(results)
                .map(|w| format!("{} weather", w.condition))
                .unwrap_or_else(|| "the weather".to_string());
            parts.push(format!("This includes a {}% allowance for {}.", percent, condition));
        }

        if result.outcome == ToolOutcome::Degraded {
            if let Some(note) = &result.note {
                parts.push(format!("Note: {}.", note));
            }
        }

        if eta.eta_secs >= self.alternative_threshold_secs {
            match (eta.alternatives.first(), eta.route_id.as_deref()) {
                (Some(alt), Some(route)) => parts.push(format!(
                    "As an alternative, consider bus {} on route {}, which may reach stop {} earlier.",
                    alt, route, eta.stop_id
                )),
                _ => parts.push(format!(
                    "With a wait this long, a faster mode such as metro or a cab to stop {} may be quicker.",
                    eta.stop_id
                )),
            }
        }

        collapse_whitespace(&parts.join(" "))
    }

    fn no_information(results: &[ToolResult]) -> String {
        let degraded: Vec<&str> = results
            .iter()
            .filter(|r| r.outcome == ToolOutcome::Degraded)
            .map(|r| r.tool.as_str())
            .collect();

        if degraded.is_empty() {
            NO_INFORMATION.to_string()
        } else {
            format!(
                "{} Some data sources were degraded: {}.",
                NO_INFORMATION,
                degraded.join(", ")
            )
        }
    }
}

fn weather_report(results: &[ToolResult]) -> Option<&WeatherReport> {
    results.iter().find_map(|r| match &r.payload {
        ToolPayload::Weather(w) if r.outcome.is_usable() => Some(w),
        _ => None,
    })
}

#[async_trait]
impl Composer for RuleComposer {
    fn name(&self) -> &str {
        "rules"
    }

    async fn compose(
        &self,
        _query: &str,
        _context: &[ContextItem],
        results: &[ToolResult],
    ) -> Result<String, EngineError> {
        Ok(self.compose_text(results))
    }
}

/// Picks the remote composer when the reasoning service is up, rules otherwise
pub struct AnswerComposer {
    reasoning: Arc<dyn ReasoningService>,
    remote: RemoteComposer,
    rules: RuleComposer,
    timeout: Duration,
}

impl AnswerComposer {
    pub fn new(
        reasoning: Arc<dyn ReasoningService>,
        timeout: Duration,
        alternative_threshold_secs: u64,
    ) -> Self {
        Self {
            remote: RemoteComposer::new(Arc::clone(&reasoning), timeout),
            reasoning,
            rules: RuleComposer::new(alternative_threshold_secs),
            timeout,
        }
    }

    /// Never fails; falls back to the rule-based text
    pub async fn compose(
        &self,
        query: &str,
        context: &[ContextItem],
        results: &[ToolResult],
    ) -> String {
        let available = bounded(self.timeout, "reasoning availability", async {
            Ok(self.reasoning.is_available().await)
        })
        .await
        .unwrap_or(false);

        if available {
            match self.remote.compose(query, context, results).await {
                Ok(answer) => {
                    debug!("using remote answer");
                    return answer;
                }
                Err(e) => warn!(error = %e, "remote composition failed, using rule-based answer"),
            }
        }

        self.rules.compose_text(results)
    }
}
