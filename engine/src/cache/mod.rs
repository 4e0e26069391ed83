//! Key-value cache layer
//!
//! [`JsonCache`] sits between the pipeline and a [`KvStore`]. It serializes
//! values as JSON, bounds every store call with the cache timeout and turns
//! any store failure into a miss. A broken cache therefore slows answers
//! down but never changes them.

use sdk::collaborators::KvStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::bounded::bounded;

pub mod memory;

pub use memory::{DisabledKvStore, MemoryKvStore};

/// JSON view over a shared key-value store
#[derive(Clone)]
pub struct JsonCache {
    store: Arc<dyn KvStore>,
    timeout: Duration,
}

impl JsonCache {
    pub fn new(store: Arc<dyn KvStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub fn backend(&self) -> &str {
        self.store.name()
    }

    /// Read and decode a value; anything other than a clean hit is `None`
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = match bounded(self.timeout, "cache get", self.store.get(key)).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!(key, "cache miss");
                return None;
            }
            Err(e) => {
                warn!(key, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => {
                debug!(key, "cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(key, error = %e, "undecodable cache entry, treating as miss");
                None
            }
        }
    }

    /// Encode and store a value; failures are logged and dropped
    pub async fn put_json<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) {
        let bytes = match serde_json::to_vec(value) {
            Ok(b) => b,
            Err(e) => {
                warn!(key, error = %e, "failed to encode cache entry");
                return;
            }
        };

        if let Err(e) = bounded(
            self.timeout,
            "cache set",
            self.store.set_with_expiry(key, bytes, ttl_secs),
        )
        .await
        {
            warn!(key, error = %e, "cache write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sdk::errors::EngineError;

    struct BrokenStore;

    #[async_trait]
    impl KvStore for BrokenStore {
        fn name(&self) -> &str {
            "broken"
        }

        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, EngineError> {
            Err(EngineError::Cache("connection refused".to_string()))
        }

        async fn set_with_expiry(
            &self,
            _key: &str,
            _value: Vec<u8>,
            _ttl_secs: u64,
        ) -> Result<(), EngineError> {
            Err(EngineError::Cache("connection refused".to_string()))
        }
    }

    struct StalledStore;

    #[async_trait]
    impl KvStore for StalledStore {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, EngineError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Some(b"1".to_vec()))
        }

        async fn set_with_expiry(
            &self,
            _key: &str,
            _value: Vec<u8>,
            _ttl_secs: u64,
        ) -> Result<(), EngineError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_round_trip_through_memory_store() {
        let cache = JsonCache::new(Arc::new(MemoryKvStore::new(16)), Duration::from_millis(100));
        cache.put_json("eta:B1:S1", &vec![1u32, 2, 3], 60).await;
        let got: Option<Vec<u32>> = cache.get_json("eta:B1:S1").await;
        assert_eq!(got, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_store_errors_are_misses() {
        let cache = JsonCache::new(Arc::new(BrokenStore), Duration::from_millis(100));
        cache.put_json("k", &1u8, 60).await;
        assert_eq!(cache.get_json::<u8>("k").await, None);
    }

    #[tokio::test]
    async fn test_slow_store_is_a_miss() {
        let cache = JsonCache::new(Arc::new(StalledStore), Duration::from_millis(20));
        cache.put_json("k", &1u8, 60).await;
        assert_eq!(cache.get_json::<u8>("k").await, None);
    }

    #[tokio::test]
    async fn test_wrong_shape_is_a_miss() {
        let cache = JsonCache::new(Arc::new(MemoryKvStore::new(16)), Duration::from_millis(100));
        cache.put_json("k", &"text", 60).await;
        assert_eq!(cache.get_json::<Vec<u32>>("k").await, None);
    }
}
