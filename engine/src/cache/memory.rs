//! In-process key-value stores

use async_trait::async_trait;
use sdk::collaborators::KvStore;
use sdk::errors::EngineError;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// Bounded in-memory store with per-key expiry
///
/// When full, expired entries are purged first; if that frees nothing the
/// entry closest to expiry is evicted.
pub struct MemoryKvStore {
    entries: RwLock<HashMap<String, Entry>>,
    max_entries: usize,
}

impl MemoryKvStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryKvStore {
    fn default() -> Self {
        Self::new(4096)
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, EngineError> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(e) if e.expires_at > now => return Ok(Some(e.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired: drop it so the map does not keep stale values around
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|e| e.expires_at <= now) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl_secs: u64,
    ) -> Result<(), EngineError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        if !entries.contains_key(key) && entries.len() >= self.max_entries {
            entries.retain(|_, e| e.expires_at > now);

            if entries.len() >= self.max_entries {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, e)| e.expires_at)
                    .map(|(k, _)| k.clone());
                if let Some(k) = oldest {
                    entries.remove(&k);
                }
            }
        }

        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: expiry(now, ttl_secs),
            },
        );
        Ok(())
    }
}

// Saturates at roughly a century out instead of overflowing `Instant`
fn expiry(now: Instant, ttl_secs: u64) -> Instant {
    const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 3600);
    let ttl = Duration::from_secs(ttl_secs).min(FAR_FUTURE);
    now.checked_add(ttl).unwrap_or(now)
}

/// Store that never holds anything
///
/// Used when `cache.backend = "disabled"`; every read is a miss.
pub struct DisabledKvStore;

#[async_trait]
impl KvStore for DisabledKvStore {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, EngineError> {
        Ok(None)
    }

    async fn set_with_expiry(
        &self,
        _key: &str,
        _value: Vec<u8>,
        _ttl_secs: u64,
    ) -> Result<(), EngineError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_then_get() {
        let store = MemoryKvStore::new(8);
        store.set_with_expiry("k", b"v".to_vec(), 60).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"v".to_vec()));
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_zero_ttl_expires_immediately() {
        let store = MemoryKvStore::new(8);
        store.set_with_expiry("k", b"v".to_vec(), 0).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_capacity_is_bounded() {
        let store = MemoryKvStore::new(2);
        store.set_with_expiry("a", vec![1], 10).await.unwrap();
        store.set_with_expiry("b", vec![2], 20).await.unwrap();
        store.set_with_expiry("c", vec![3], 30).await.unwrap();

        assert_eq!(store.len().await, 2);
        // "a" expires soonest, so it is the one evicted
        assert_eq!(store.get("a").await.unwrap(), None);
        assert_eq!(store.get("c").await.unwrap(), Some(vec![3]));
    }

    #[tokio::test]
    async fn test_overwrite_does_not_evict() {
        let store = MemoryKvStore::new(1);
        store.set_with_expiry("a", vec![1], 10).await.unwrap();
        store.set_with_expiry("a", vec![2], 10).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(vec![2]));
    }

    #[tokio::test]
    async fn test_huge_ttl_saturates() {
        let store = MemoryKvStore::new(4);
        store.set_with_expiry("ask:x", vec![1], u64::MAX).await.unwrap();
        assert_eq!(store.get("ask:x").await.unwrap(), Some(vec![1]));
    }

    #[tokio::test]
    async fn test_disabled_store_always_misses() {
        let store = DisabledKvStore;
        store.set_with_expiry("k", vec![1], 60).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }
}
