use std::sync::Arc;
use std::time::Duration;

use floatchat_core::types::ConversationTurn;

use crate::store::KvStore;

const NAMESPACE: &str = "chat_context:";

/// Per-session rolling window of turn summaries, kept in the fast
/// key-value store.
///
/// The Pipeline itself never writes here — only the Chat Orchestrator
/// appends, and only after a turn has completed.
pub struct ContextStore {
    store: Option<Arc<dyn KvStore>>,
    ttl: Duration,
    max_turns: usize,
}

impl ContextStore {
    pub fn new(store: Option<Arc<dyn KvStore>>, ttl_seconds: u64, max_turns: usize) -> Self {
        Self {
            store,
            ttl: Duration::from_secs(ttl_seconds),
            max_turns,
        }
    }

    fn key_for(session_id: &str) -> String {
        format!("{NAMESPACE}{session_id}")
    }

    /// Returns the stored list, or empty on any failure — a missing store,
    /// a missing key, or malformed JSON.
    pub async fn get(&self, session_id: &str) -> Vec<ConversationTurn> {
        let Some(store) = &self.store else {
            return Vec::new();
        };
        let Some(raw) = store.get(&Self::key_for(session_id)).await else {
            return Vec::new();
        };
        serde_json::from_str(&raw).unwrap_or_default()
    }

    /// Load, append, trim from the front to `max_turns`, write back with a
    /// refreshed TTL. A no-op when the store handle is absent.
    pub async fn append(&self, session_id: &str, turn: ConversationTurn) {
        let Some(store) = &self.store else {
            return;
        };

        let mut turns = self.get(session_id).await;
        turns.push(turn);
        if turns.len() > self.max_turns {
            let overflow = turns.len() - self.max_turns;
            turns.drain(0..overflow);
        }

        if let Ok(encoded) = serde_json::to_string(&turns) {
            store
                .set_with_ttl(&Self::key_for(session_id), encoded, self.ttl)
                .await;
        }
    }

    /// Best-effort delete; never errors.
    pub async fn clear(&self, session_id: &str) {
        if let Some(store) = &self.store {
            store.delete(&Self::key_for(session_id)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryKvStore;
    use floatchat_core::types::MessageRole;
    use std::sync::Arc;

    fn turn(content: &str) -> ConversationTurn {
        ConversationTurn {
            role: MessageRole::User,
            content: content.to_string(),
            sql: None,
            row_count: None,
        }
    }

    #[tokio::test]
    async fn append_then_get_round_trips() {
        let ctx = ContextStore::new(Some(Arc::new(InMemoryKvStore::new())), 3600, 20);
        ctx.append("s1", turn("hello")).await;
        let turns = ctx.get("s1").await;
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].content, "hello");
    }

    #[tokio::test]
    async fn length_never_exceeds_configured_maximum() {
        let ctx = ContextStore::new(Some(Arc::new(InMemoryKvStore::new())), 3600, 3);
        for i in 0..10 {
            ctx.append("s1", turn(&format!("turn {i}"))).await;
        }
        let turns = ctx.get("s1").await;
        assert_eq!(turns.len(), 3);
        // Trimmed from the front: the last 3 turns survive.
        assert_eq!(turns[0].content, "turn 7");
        assert_eq!(turns[2].content, "turn 9");
    }

    #[tokio::test]
    async fn absent_store_is_a_no_op_and_reads_empty() {
        let ctx = ContextStore::new(None, 3600, 20);
        ctx.append("s1", turn("hello")).await;
        assert!(ctx.get("s1").await.is_empty());
    }

    #[tokio::test]
    async fn clear_removes_the_session_list() {
        let ctx = ContextStore::new(Some(Arc::new(InMemoryKvStore::new())), 3600, 20);
        ctx.append("s1", turn("hello")).await;
        ctx.clear("s1").await;
        assert!(ctx.get("s1").await.is_empty());
    }
}
