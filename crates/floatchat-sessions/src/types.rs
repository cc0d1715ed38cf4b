use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use floatchat_core::types::{ErrorType, MessageRole, MessageStatus};

/// A persisted chat session, backed by the `chat_session` table.
///
/// Soft-deleted via `is_active = false` rather than a row delete, so a
/// stale `session_id` a client still holds resolves to "not found" instead
/// of resurrecting a row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub user_identifier: Option<String>,
    pub title: Option<String>,
    pub is_active: bool,
    pub message_count: u32,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

/// One persisted turn, backed by the `chat_message` table.
///
/// `status` starts `Completed` for ordinary turns; a row bound for the
/// confirmation protocol is written `PendingConfirmation` and mutated
/// exactly once into `Confirmed` (never read back to `PendingConfirmation`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub session_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub status: MessageStatus,
    pub generated_sql: Option<String>,
    pub result_metadata: Option<serde_json::Value>,
    pub follow_up_suggestions: Option<Vec<String>>,
    pub error_type: Option<ErrorType>,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to persist a brand-new message row.
pub struct NewMessage {
    pub role: MessageRole,
    pub content: String,
    pub status: MessageStatus,
    pub generated_sql: Option<String>,
    pub result_metadata: Option<serde_json::Value>,
    pub follow_up_suggestions: Option<Vec<String>>,
    pub error_type: Option<ErrorType>,
}

impl NewMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            status: MessageStatus::Completed,
            generated_sql: None,
            result_metadata: None,
            follow_up_suggestions: None,
            error_type: None,
        }
    }
}
