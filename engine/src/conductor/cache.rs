//! Whole-answer cache keyed by normalized query text

use sdk::types::AnswerRecord;

use crate::cache::JsonCache;

pub fn cache_key(normalized: &str) -> String {
    format!("ask:{}", normalized)
}

/// Cache-aside wrapper around the shared store
///
/// A store that is down behaves as an empty cache.
pub struct QueryCache {
    store: JsonCache,
    ttl_secs: u64,
}

impl QueryCache {
    pub fn new(store: JsonCache, ttl_secs: u64) -> Self {
        Self { store, ttl_secs }
    }

    pub async fn get(&self, normalized: &str) -> Option<AnswerRecord> {
        self.store.get_json(&cache_key(normalized)).await
    }

    /// Only called with a fully composed record
    pub async fn put(&self, normalized: &str, record: &AnswerRecord) {
        self.store
            .put_json(&cache_key(normalized), record, self.ttl_secs)
            .await;
    }
}
