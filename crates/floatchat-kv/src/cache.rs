use std::sync::Arc;
use std::time::Duration;

use floatchat_core::types::Row;
use md5::{Digest, Md5};

use crate::store::KvStore;

const NAMESPACE: &str = "query_cache:";

/// Outcome of [`ResultCache::set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    Stored,
    /// Row count exceeded `cache_max_rows` — never stored.
    SkippedTooLarge,
}

/// Key→rows cache keyed by an MD5 hex digest of the exact SQL string,
/// under the `query_cache:` namespace.
pub struct ResultCache {
    store: Option<Arc<dyn KvStore>>,
    ttl: Duration,
    max_rows: usize,
}

impl ResultCache {
    pub fn new(store: Option<Arc<dyn KvStore>>, ttl_seconds: u64, max_rows: usize) -> Self {
        Self {
            store,
            ttl: Duration::from_secs(ttl_seconds),
            max_rows,
        }
    }

    /// Hex digest of `sql`, namespaced. Identical SQL strings hash to the
    /// same key; different strings hash to different keys.
    pub fn key_for(sql: &str) -> String {
        let mut hasher = Md5::new();
        hasher.update(sql.as_bytes());
        format!("{NAMESPACE}{}", hex::encode(hasher.finalize()))
    }

    /// Returns `None` on a miss, on an absent store, or on any
    /// deserialization failure — the caller proceeds as if the cache is
    /// empty.
    pub async fn get(&self, sql: &str) -> Option<Vec<Row>> {
        let store = self.store.as_ref()?;
        let raw = store.get(&Self::key_for(sql)).await?;
        serde_json::from_str(&raw).ok()
    }

    /// Refuses to store result sets above `cache_max_rows`. A
    /// missing store degrades to a silent no-op, reported as `Stored` so
    /// callers don't need to special-case "no cache configured".
    pub async fn set(&self, sql: &str, rows: &[Row]) -> SetOutcome {
        if rows.len() > self.max_rows {
            return SetOutcome::SkippedTooLarge;
        }
        if let Some(store) = &self.store {
            if let Ok(encoded) = serde_json::to_string(rows) {
                store
                    .set_with_ttl(&Self::key_for(sql), encoded, self.ttl)
                    .await;
            }
        }
        SetOutcome::Stored
    }

    /// Mass-invalidate every cached query on ingest.
    pub async fn invalidate_all(&self) {
        if let Some(store) = &self.store {
            store.delete_prefix(NAMESPACE).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryKvStore;
    use std::sync::Arc;

    fn row(n: i64) -> Row {
        vec![("n".to_string(), serde_json::json!(n))]
    }

    #[tokio::test]
    async fn get_after_set_within_ttl_returns_the_value() {
        let cache = ResultCache::new(Some(Arc::new(InMemoryKvStore::new())), 60, 100);
        let rows = vec![row(1), row(2)];
        assert_eq!(cache.set("SELECT 1", &rows).await, SetOutcome::Stored);
        assert_eq!(cache.get("SELECT 1").await, Some(rows));
    }

    #[tokio::test]
    async fn miss_on_different_sql() {
        let cache = ResultCache::new(Some(Arc::new(InMemoryKvStore::new())), 60, 100);
        cache.set("SELECT 1", &[row(1)]).await;
        assert_eq!(cache.get("SELECT 2").await, None);
    }

    #[tokio::test]
    async fn oversized_result_is_never_stored() {
        let cache = ResultCache::new(Some(Arc::new(InMemoryKvStore::new())), 60, 1);
        let rows = vec![row(1), row(2)];
        assert_eq!(
            cache.set("SELECT 1", &rows).await,
            SetOutcome::SkippedTooLarge
        );
        assert_eq!(cache.get("SELECT 1").await, None);
    }

    #[tokio::test]
    async fn absent_store_degrades_to_always_miss() {
        let cache = ResultCache::new(None, 60, 100);
        cache.set("SELECT 1", &[row(1)]).await;
        assert_eq!(cache.get("SELECT 1").await, None);
    }

    #[tokio::test]
    async fn invalidate_all_clears_namespace_only() {
        let store: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let cache = ResultCache::new(Some(store.clone()), 60, 100);
        cache.set("SELECT 1", &[row(1)]).await;
        store
            .set_with_ttl(
                "ctx:other",
                "untouched".to_string(),
                Duration::from_secs(60),
            )
            .await;

        cache.invalidate_all().await;

        assert_eq!(cache.get("SELECT 1").await, None);
        assert_eq!(store.get("ctx:other").await, Some("untouched".to_string()));
    }

    #[test]
    fn identical_sql_hashes_to_the_same_key() {
        assert_eq!(ResultCache::key_for("SELECT 1"), ResultCache::key_for("SELECT 1"));
    }

    #[test]
    fn different_sql_hashes_to_different_keys() {
        assert_ne!(ResultCache::key_for("SELECT 1"), ResultCache::key_for("SELECT 2"));
    }
}
