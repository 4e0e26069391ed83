//! Reasoning service backed by the LLM router
//!
//! Wraps each prompt with a role-specific system message. The pipeline
//! decides what to do with the raw text; nothing here parses it.

use async_trait::async_trait;
use sdk::collaborators::ReasoningService;
use sdk::errors::EngineError;

use super::router::LLMRouter;
use super::Message;

const PLAN_SYSTEM_PROMPT: &str = "You plan data lookups for a city bus fleet assistant. \
Available tools: gps (params: bus_id), weather (params: lat, lon), \
eta (params: bus_id, stop_id), none. \
Reply with JSON only, shaped as {\"plan\": [{\"tool\": \"...\", \"params\": {...}}]}. \
Order steps so later steps can use earlier results.";

const PROSE_SYSTEM_PROMPT: &str = "You answer questions about a city bus fleet. \
Use only the tool results and context provided. \
Reply in one or two plain sentences, without JSON or markdown.";

/// `ReasoningService` that talks to real LLM providers
pub struct LlmReasoner {
    router: LLMRouter,
}

impl LlmReasoner {
    pub fn new(router: LLMRouter) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &LLMRouter {
        &self.router
    }

    async fn complete(&self, system: &str, prompt: &str) -> Result<String, EngineError> {
        let messages = [Message::system(system), Message::user(prompt)];
        let (response, provider) = self.router.call(&messages).await?;
        tracing::debug!(provider = %provider, chars = response.content.len(), "reasoning reply");
        Ok(response.content)
    }
}

#[async_trait]
impl ReasoningService for LlmReasoner {
    fn name(&self) -> &str {
        "llm"
    }

    async fn is_available(&self) -> bool {
        if self.router.is_empty() {
            return false;
        }
        self.router
            .check_health()
            .await
            .iter()
            .any(|(_, healthy)| *healthy)
    }

    async fn generate_plan(&self, prompt: &str) -> Result<String, EngineError> {
        self.complete(PLAN_SYSTEM_PROMPT, prompt).await
    }

    async fn generate_prose(&self, prompt: &str) -> Result<String, EngineError> {
        self.complete(PROSE_SYSTEM_PROMPT, prompt).await
    }
}

/// Stand-in used when `[llm] enabled = false`
///
/// Always unavailable, so planning and composition go straight to the
/// rule-based path.
pub struct DisabledReasoner;

#[async_trait]
impl ReasoningService for DisabledReasoner {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn is_available(&self) -> bool {
        false
    }

    async fn generate_plan(&self, _prompt: &str) -> Result<String, EngineError> {
        Err(EngineError::LLMProvider(
            "reasoning service disabled".to_string(),
        ))
    }

    async fn generate_prose(&self, _prompt: &str) -> Result<String, EngineError> {
        Err(EngineError::LLMProvider(
            "reasoning service disabled".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_empty_router_is_unavailable() {
        let reasoner = LlmReasoner::new(LLMRouter::new(
            Vec::new(),
            "ollama",
            Duration::from_millis(10),
        ));
        assert!(!reasoner.is_available().await);
        assert!(reasoner.generate_plan("{}").await.is_err());
    }

    #[tokio::test]
    async fn test_disabled_reasoner() {
        let reasoner = DisabledReasoner;
        assert!(!reasoner.is_available().await);
        let err = reasoner.generate_prose("hi").await.unwrap_err();
        assert!(matches!(err, EngineError::LLMProvider(_)));
    }
}
