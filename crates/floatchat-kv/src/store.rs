use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// The fast key-value store primitive: a TTL'd, namespaced byte-string
/// store. The Result Cache, Context Store,
/// and Suggestions cache are disjoint-namespace consumers of the same
/// trait object.
///
/// Every operation is fallible only at the transport layer — callers are
/// expected to treat an `Err` the same as a miss/no-op — all cache
/// operations degrade silently on store unreachability.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;

    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration);

    async fn delete(&self, key: &str);

    /// Delete every key whose name starts with `prefix`. Used for mass
    /// cache invalidation on ingest.
    async fn delete_prefix(&self, prefix: &str);
}

/// In-process `DashMap`-backed `KvStore`, generalizing the familiar
/// `Mutex<HashMap<String, T>>` in-process cache idiom into a trait object
/// any crate in this workspace can share through `AppState`.
///
/// Entries expire lazily: a `get` against a stale entry removes it and
/// reports a miss rather than relying on a background sweep.
pub struct InMemoryKvStore {
    entries: DashMap<String, (String, DateTime<Utc>)>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn shared() -> Arc<dyn KvStore> {
        Arc::new(Self::new())
    }
}

impl Default for InMemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> Option<String> {
        let entry = self.entries.get(key)?;
        let (value, expires_at) = entry.value().clone();
        if expires_at <= Utc::now() {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        Some(value)
    }

    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) {
        let expires_at = Utc::now() + chrono::Duration::from_std(ttl).unwrap_or_default();
        self.entries.insert(key.to_string(), (value, expires_at));
    }

    async fn delete(&self, key: &str) {
        self.entries.remove(key);
    }

    async fn delete_prefix(&self, prefix: &str) {
        let to_remove: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.key().starts_with(prefix))
            .map(|e| e.key().clone())
            .collect();
        for key in to_remove {
            self.entries.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips_within_ttl() {
        let store = InMemoryKvStore::new();
        store
            .set_with_ttl("k", "v".to_string(), Duration::from_secs(60))
            .await;
        assert_eq!(store.get("k").await, Some("v".to_string()));
    }

    #[tokio::test]
    async fn expired_entry_degrades_to_miss() {
        let store = InMemoryKvStore::new();
        store
            .set_with_ttl("k", "v".to_string(), Duration::from_millis(1))
            .await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(store.get("k").await, None);
    }

    #[tokio::test]
    async fn delete_prefix_removes_only_matching_keys() {
        let store = InMemoryKvStore::new();
        store
            .set_with_ttl("query_cache:a", "1".to_string(), Duration::from_secs(60))
            .await;
        store
            .set_with_ttl("query_cache:b", "2".to_string(), Duration::from_secs(60))
            .await;
        store
            .set_with_ttl("ctx:session1", "3".to_string(), Duration::from_secs(60))
            .await;

        store.delete_prefix("query_cache:").await;

        assert_eq!(store.get("query_cache:a").await, None);
        assert_eq!(store.get("query_cache:b").await, None);
        assert_eq!(store.get("ctx:session1").await, Some("3".to_string()));
    }
}
