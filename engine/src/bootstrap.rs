//! Engine assembly
//!
//! Builds concrete collaborators from the config and hands them to
//! [`AnswerEngine`]. Backends that cannot be reached at startup are swapped
//! for their disabled stand-ins so the engine can still answer.

use anyhow::{Context, Result};
use sdk::collaborators::{FleetSource, KvStore, ReasoningService, WeatherSource};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::bounded::bounded;
use crate::cache::{DisabledKvStore, MemoryKvStore};
use crate::conductor::{AnswerEngine, Collaborators};
use crate::config::Config;
use crate::db::Database;
use crate::fleet::{FleetSnapshot, HttpFleetClient};
use crate::llm::ollama::OllamaProvider;
use crate::llm::openai::OpenAIProvider;
use crate::llm::reasoner::{DisabledReasoner, LlmReasoner};
use crate::llm::router::LLMRouter;
use crate::llm::LLMProvider;
use crate::retrieval::{Embedder, HashingEmbedder, OllamaEmbedder};
use crate::weather::{DisabledWeather, OpenWeatherClient};

/// A ready engine plus the pieces `doctor` reports on
pub struct EngineHandle {
    pub engine: AnswerEngine,
    pub snapshot: Arc<FleetSnapshot>,
    pub collaborators: Collaborators,
    /// Set when the reasoning service is backed by LLM providers
    pub llm: Option<Arc<LlmReasoner>>,
    database: Option<Database>,
}

impl EngineHandle {
    /// Checkpoint and close the cache database, if one is open
    pub async fn shutdown(self) -> Result<()> {
        if let Some(db) = self.database {
            db.close().await?;
        }
        Ok(())
    }
}

pub async fn build_engine(config: &Config) -> Result<EngineHandle> {
    let snapshot = Arc::new(
        FleetSnapshot::load(&config.fleet.data_dir).context("Failed to load fleet snapshot")?,
    );

    let fleet: Arc<dyn FleetSource> = match config.fleet.source.as_str() {
        "http" => Arc::new(HttpFleetClient::new(config.fleet.base_url.clone())),
        _ => Arc::clone(&snapshot) as Arc<dyn FleetSource>,
    };

    let weather: Arc<dyn WeatherSource> = match config.weather.provider.as_str() {
        "openweather" => Arc::new(OpenWeatherClient::new(
            config.weather.base_url.clone(),
            config.weather.api_key_env.clone(),
        )),
        _ => Arc::new(DisabledWeather),
    };

    let llm = config.llm.enabled.then(|| Arc::new(build_reasoner(config)));
    let reasoning: Arc<dyn ReasoningService> = match &llm {
        Some(reasoner) => Arc::clone(reasoner) as Arc<dyn ReasoningService>,
        None => Arc::new(DisabledReasoner),
    };

    let (kv, database) = build_kv_store(config).await;

    let embedder: Arc<dyn Embedder> = match config.retrieval.embedder.as_str() {
        "ollama" => Arc::new(OllamaEmbedder::new(
            config.llm.ollama.base_url.clone(),
            config.retrieval.ollama_model.clone(),
        )),
        _ => Arc::new(HashingEmbedder::new(config.retrieval.dims)),
    };

    info!(
        fleet = fleet.name(),
        weather = weather.name(),
        reasoning = reasoning.name(),
        cache = kv.name(),
        embedder = embedder.name(),
        "collaborators ready"
    );

    let collaborators = Collaborators {
        fleet,
        weather,
        reasoning,
        kv,
    };

    let engine = AnswerEngine::new(
        collaborators.clone(),
        snapshot.documents(),
        snapshot.route_table(),
        embedder,
        config,
    )
    .await;

    Ok(EngineHandle {
        engine,
        snapshot,
        collaborators,
        llm,
        database,
    })
}

fn build_reasoner(config: &Config) -> LlmReasoner {
    let mut providers: Vec<Box<dyn LLMProvider>> = vec![Box::new(OllamaProvider::new(
        config.llm.ollama.base_url.clone(),
        config.llm.ollama.model.clone(),
    ))];

    // Cloud provider only when its key is present
    let has_openai_key = std::env::var(&config.llm.openai.api_key_env)
        .map(|k| !k.trim().is_empty())
        .unwrap_or(false);
    if has_openai_key {
        providers.push(Box::new(OpenAIProvider::new(config.llm.openai.clone())));
    }

    LlmReasoner::new(LLMRouter::new(
        providers,
        config.llm.default_provider.clone(),
        config.timeouts.reasoning(),
    ))
}

async fn build_kv_store(config: &Config) -> (Arc<dyn KvStore>, Option<Database>) {
    match config.cache.backend.as_str() {
        "sqlite" => match Database::new(&config.cache.path).await {
            Ok(db) => {
                let store = db.kv_store();
                match bounded(config.timeouts.cache(), "cache purge", store.purge_expired()).await
                {
                    Ok(purged) => debug!(purged, "expired cache rows removed"),
                    Err(e) => warn!(error = %e, "could not purge expired cache rows"),
                }
                (Arc::new(store), Some(db))
            }
            Err(e) => {
                warn!(path = %config.cache.path.display(), error = %e, "cache database unavailable, caching disabled");
                (Arc::new(DisabledKvStore), None)
            }
        },
        "disabled" => (Arc::new(DisabledKvStore), None),
        _ => (Arc::new(MemoryKvStore::new(config.cache.max_entries)), None),
    }
}
