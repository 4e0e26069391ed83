//! LLM Router
//!
//! Holds the configured providers and tries them in ranked order with a
//! per-provider timeout. Ranking is simple: the configured default provider
//! first, then local providers before cloud ones, otherwise registration
//! order.

use super::{LLMError, LLMProvider, LLMResponse, Message};
use std::time::Duration;

/// Router that fails over between providers
pub struct LLMRouter {
    providers: Vec<Box<dyn LLMProvider>>,
    default_provider: String,
    per_call_timeout: Duration,
}

impl LLMRouter {
    /// Create a new LLM router
    ///
    /// # Arguments
    /// * `providers` - List of available LLM providers
    /// * `default_provider` - Name of the provider to try first
    /// * `per_call_timeout` - Budget for each provider attempt
    pub fn new(
        providers: Vec<Box<dyn LLMProvider>>,
        default_provider: impl Into<String>,
        per_call_timeout: Duration,
    ) -> Self {
        Self {
            providers,
            default_provider: default_provider.into(),
            per_call_timeout,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Providers in the order `call` will try them
    pub fn rank_providers(&self) -> Vec<&dyn LLMProvider> {
        let mut providers: Vec<&dyn LLMProvider> =
            self.providers.iter().map(|b| b.as_ref()).collect();

        // sort_by_key is stable, so ties keep registration order
        providers.sort_by_key(|p| (p.name() != self.default_provider, !p.is_local()));
        providers
    }

    /// Call LLM providers with automatic failover
    ///
    /// Returns the response together with the name of the provider that
    /// produced it, or `ProviderUnavailable` once every provider failed.
    pub async fn call(&self, messages: &[Message]) -> super::Result<(LLMResponse, String)> {
        if self.providers.is_empty() {
            return Err(LLMError::ProviderUnavailable(
                "No LLM providers configured".to_string(),
            ));
        }

        for provider in self.rank_providers() {
            tracing::debug!(
                "Attempting provider: {} (timeout: {}ms)",
                provider.name(),
                self.per_call_timeout.as_millis()
            );

            let result = tokio::time::timeout(self.per_call_timeout, provider.generate(messages)).await;

            match result {
                Ok(Ok(response)) => {
                    tracing::debug!("Provider {} succeeded", provider.name());
                    return Ok((response, provider.name().to_string()));
                }
                Ok(Err(e)) => {
                    tracing::warn!("Provider {} failed: {}", provider.name(), e);
                }
                Err(_) => {
                    tracing::warn!(
                        "Provider {} timed out after {}ms",
                        provider.name(),
                        self.per_call_timeout.as_millis()
                    );
                }
            }
        }

        tracing::warn!("All LLM providers exhausted");
        Err(LLMError::ProviderUnavailable(
            "All LLM providers failed".to_string(),
        ))
    }

    /// Check the health of all registered providers
    /// Returns a list of (provider_name, is_healthy)
    pub async fn check_health(&self) -> Vec<(&str, bool)> {
        let mut results = Vec::new();
        for provider in &self.providers {
            let is_healthy = provider.check_health().await;
            results.push((provider.name(), is_healthy));
        }
        results
    }
}
