use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};

use crate::store::KvStore;

const NAMESPACE: &str = "suggestions:";

/// Thin, single-key wrapper over the shared store for the load-time
/// Suggestions cache. Disjoint namespace from [`crate::cache::ResultCache`]
/// and [`crate::context::ContextStore`].
pub struct SuggestionsCache {
    store: Option<Arc<dyn KvStore>>,
    ttl: Duration,
}

impl SuggestionsCache {
    pub fn new(store: Option<Arc<dyn KvStore>>, ttl_seconds: u64) -> Self {
        Self {
            store,
            ttl: Duration::from_secs(ttl_seconds),
        }
    }

    pub async fn get<T: DeserializeOwned>(&self) -> Option<T> {
        let store = self.store.as_ref()?;
        let raw = store.get(&format!("{NAMESPACE}load_time")).await?;
        serde_json::from_str(&raw).ok()
    }

    pub async fn set<T: Serialize>(&self, value: &T) {
        if let Some(store) = &self.store {
            if let Ok(encoded) = serde_json::to_string(value) {
                store
                    .set_with_ttl(&format!("{NAMESPACE}load_time"), encoded, self.ttl)
                    .await;
            }
        }
    }
}
