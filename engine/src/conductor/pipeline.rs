//! The query pipeline
//!
//! `answer` runs cache check, retrieval, planning, execution, composition
//! and cache write in that order. It has no error path: every collaborator
//! failure has already been turned into a fallback by the stage that met it.

use sdk::collaborators::{FleetSource, KvStore, ReasoningService, WeatherSource};
use sdk::types::{AnswerRecord, Document};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use super::cache::QueryCache;
use super::composer::AnswerComposer;
use super::executor::PlanExecutor;
use super::planner::PlanGenerator;
use super::query::{is_answerable, normalize};
use super::types::Plan;
use crate::cache::JsonCache;
use crate::config::Config;
use crate::fleet::RouteTable;
use crate::retrieval::{ContextRetriever, Embedder};
use crate::tools::{ToolRegistry, ToolSettings};

pub const EMPTY_QUERY_ANSWER: &str = "Please provide a question.";

/// External services the pipeline talks to
#[derive(Clone)]
pub struct Collaborators {
    pub fleet: Arc<dyn FleetSource>,
    pub weather: Arc<dyn WeatherSource>,
    pub reasoning: Arc<dyn ReasoningService>,
    pub kv: Arc<dyn KvStore>,
}

pub struct AnswerEngine {
    cache: QueryCache,
    retriever: ContextRetriever,
    planner: PlanGenerator,
    executor: PlanExecutor,
    composer: AnswerComposer,
    top_k: usize,
}

impl AnswerEngine {
    /// Wire the stages together and embed the corpus
    pub async fn new(
        collaborators: Collaborators,
        documents: Vec<Document>,
        routes: RouteTable,
        embedder: Arc<dyn Embedder>,
        config: &Config,
    ) -> Self {
        let store = JsonCache::new(collaborators.kv, config.timeouts.cache());
        let retriever =
            ContextRetriever::build(documents, embedder, config.timeouts.retrieval()).await;

        let tools = ToolRegistry::new(
            collaborators.fleet,
            collaborators.weather,
            store.clone(),
            routes,
            ToolSettings::from_config(config),
        );

        Self {
            cache: QueryCache::new(store, config.pipeline.query_ttl_secs),
            retriever,
            planner: PlanGenerator::new(
                Arc::clone(&collaborators.reasoning),
                config.timeouts.reasoning(),
            ),
            executor: PlanExecutor::new(tools),
            composer: AnswerComposer::new(
                collaborators.reasoning,
                config.timeouts.reasoning(),
                config.pipeline.alternative_threshold_secs,
            ),
            top_k: config.retrieval.top_k,
        }
    }

    pub fn retriever(&self) -> &ContextRetriever {
        &self.retriever
    }

    /// Answer a free-text question; never fails
    pub async fn answer(&self, query: &str) -> AnswerRecord {
        let normalized = normalize(query);
        if !is_answerable(&normalized) {
            debug!("empty query, skipping pipeline");
            return AnswerRecord::new(EMPTY_QUERY_ANSWER, Vec::new(), Vec::new());
        }

        let run_id = Uuid::new_v4();
        let span = info_span!("answer", %run_id, query = %normalized);
        self.run(query, &normalized).instrument(span).await
    }

    async fn run(&self, query: &str, normalized: &str) -> AnswerRecord {
        let start = Instant::now();

        if let Some(record) = self.cache.get(normalized).await {
            info!("answer served from cache");
            return record;
        }

        let context = self.retriever.retrieve(query, self.top_k).await;
        let plan = self.planner.plan(query, &context).await;
        let results = self.executor.execute(&plan, query, &context).await;
        let answer = self.composer.compose(query, &context, &results).await;

        let record = AnswerRecord::new(answer, results, context);
        self.cache.put(normalized, &record).await;

        info!(
            plan_source = %plan.source,
            steps = plan.steps.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "answer composed"
        );
        record
    }

    /// The plan a query would run with, without executing it
    pub async fn plan_for(&self, query: &str) -> Plan {
        let context = self.retriever.retrieve(query, self.top_k).await;
        self.planner.plan(query, &context).await
    }
}
