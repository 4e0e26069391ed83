//! Context retrieval
//!
//! The corpus is embedded once when the retriever is built. Queries are
//! ranked by cosine similarity, highest first, with ties left in corpus
//! order. If the index could not be built, or a query cannot be embedded
//! in time, the first `k` documents are returned instead; the caller sees
//! the same shape either way and can check [`ContextRetriever::health`].

use sdk::types::{ContextItem, Document};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::bounded::bounded;

pub mod embedder;

pub use embedder::{cosine_similarity, Embedder, HashingEmbedder, OllamaEmbedder};

/// Out-of-band view of how retrieval is going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrieverHealth {
    /// The corpus was embedded successfully
    pub index_ready: bool,
    /// The most recent `retrieve` call used corpus order instead of the index
    pub last_used_fallback: bool,
}

pub struct ContextRetriever {
    documents: Vec<Document>,
    embedder: Arc<dyn Embedder>,
    index: Option<Vec<Vec<f32>>>,
    timeout: Duration,
    last_used_fallback: AtomicBool,
}

impl ContextRetriever {
    /// Embed `documents` and build the index, bounded by `timeout`
    pub async fn build(
        documents: Vec<Document>,
        embedder: Arc<dyn Embedder>,
        timeout: Duration,
    ) -> Self {
        let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();

        let index = if texts.is_empty() {
            Some(Vec::new())
        } else {
            match bounded(timeout, "corpus embedding", embedder.embed(&texts)).await {
                Ok(vectors) if vectors.len() == texts.len() => Some(vectors),
                Ok(vectors) => {
                    warn!(
                        expected = texts.len(),
                        got = vectors.len(),
                        "embedder returned the wrong number of vectors, retrieval falls back to corpus order"
                    );
                    None
                }
                Err(e) => {
                    warn!(embedder = embedder.name(), error = %e, "corpus embedding failed, retrieval falls back to corpus order");
                    None
                }
            }
        };

        debug!(
            documents = documents.len(),
            indexed = index.is_some(),
            "context retriever ready"
        );

        Self {
            documents,
            embedder,
            index,
            timeout,
            last_used_fallback: AtomicBool::new(false),
        }
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn embedder_name(&self) -> &str {
        self.embedder.name()
    }

    pub fn health(&self) -> RetrieverHealth {
        RetrieverHealth {
            index_ready: self.index.is_some(),
            last_used_fallback: self.last_used_fallback.load(Ordering::Relaxed),
        }
    }

    /// Top `k` documents for `query`, ranked 0..k
    pub async fn retrieve(&self, query: &str, k: usize) -> Vec<ContextItem> {
        let order = match self.rank(query).await {
            Some(order) => {
                self.last_used_fallback.store(false, Ordering::Relaxed);
                order
            }
            None => {
                self.last_used_fallback.store(true, Ordering::Relaxed);
                (0..self.documents.len()).collect()
            }
        };

        order
            .into_iter()
            .take(k)
            .enumerate()
            .map(|(rank, i)| ContextItem {
                document: self.documents[i].clone(),
                rank,
            })
            .collect()
    }

    /// Document indices by descending similarity, or `None` to fall back
    async fn rank(&self, query: &str) -> Option<Vec<usize>> {
        let index = self.index.as_ref()?;

        let query_vec = match bounded(
            self.timeout,
            "query embedding",
            self.embedder.embed(&[query.to_string()]),
        )
        .await
        {
            Ok(mut v) if v.len() == 1 => v.pop()?,
            Ok(_) => {
                warn!("embedder returned no query vector, using corpus order");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "query embedding failed, using corpus order");
                return None;
            }
        };

        let mut scored: Vec<(usize, f32)> = index
            .iter()
            .enumerate()
            .map(|(i, v)| (i, cosine_similarity(&query_vec, v)))
            .collect();
        // Stable: equal scores keep corpus order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        Some(scored.into_iter().map(|(i, _)| i).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sdk::errors::EngineError;
    use sdk::types::SourceKind;

    fn corpus() -> Vec<Document> {
        vec![
            Document::new("B1", "Bus B1 on route R1", SourceKind::Bus),
            Document::new("B2", "Bus B2 on route R2", SourceKind::Bus),
            Document::new("R1", "Route R1 has 2 stops", SourceKind::Route),
        ]
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        fn name(&self) -> &str {
            "failing"
        }

        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EngineError> {
            Err(EngineError::Network("down".to_string()))
        }
    }

    struct SlowEmbedder;

    #[async_trait]
    impl Embedder for SlowEmbedder {
        fn name(&self) -> &str {
            "slow"
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EngineError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![vec![1.0]; texts.len()])
        }
    }

    /// Every text gets the same vector, so every score ties
    struct ConstantEmbedder;

    #[async_trait]
    impl Embedder for ConstantEmbedder {
        fn name(&self) -> &str {
            "constant"
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EngineError> {
            Ok(vec![vec![1.0, 1.0]; texts.len()])
        }
    }

    fn ids(items: &[ContextItem]) -> Vec<&str> {
        items.iter().map(|i| i.document.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_ranks_by_similarity() {
        let r = ContextRetriever::build(
            corpus(),
            Arc::new(HashingEmbedder::new(256)),
            Duration::from_secs(1),
        )
        .await;

        let items = r.retrieve("bus b2 route r2", 2).await;
        assert_eq!(items[0].document.id, "B2");
        assert_eq!(items[0].rank, 0);
        assert_eq!(items[1].rank, 1);
        assert!(r.health().index_ready);
        assert!(!r.health().last_used_fallback);
    }

    #[tokio::test]
    async fn test_ties_keep_corpus_order() {
        let r = ContextRetriever::build(corpus(), Arc::new(ConstantEmbedder), Duration::from_secs(1)).await;
        assert_eq!(ids(&r.retrieve("anything", 3).await), vec!["B1", "B2", "R1"]);
    }

    #[tokio::test]
    async fn test_failed_index_falls_back_to_corpus_order() {
        let r = ContextRetriever::build(corpus(), Arc::new(FailingEmbedder), Duration::from_secs(1)).await;
        assert!(!r.health().index_ready);

        let items = r.retrieve("route r1", 2).await;
        assert_eq!(ids(&items), vec!["B1", "B2"]);
        assert!(r.health().last_used_fallback);
    }

    #[tokio::test]
    async fn test_slow_embedder_times_out_to_fallback() {
        let r = ContextRetriever::build(corpus(), Arc::new(SlowEmbedder), Duration::from_millis(20)).await;
        assert!(!r.health().index_ready);
        assert_eq!(r.retrieve("x", 1).await.len(), 1);
    }

    #[tokio::test]
    async fn test_k_bounds() {
        let r = ContextRetriever::build(
            corpus(),
            Arc::new(HashingEmbedder::new(64)),
            Duration::from_secs(1),
        )
        .await;
        assert!(r.retrieve("bus", 0).await.is_empty());
        assert_eq!(r.retrieve("bus", 10).await.len(), 3);
    }
}
