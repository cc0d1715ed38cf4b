//! GET /chat/sessions/{id}/messages.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct ListMessagesParams {
    pub limit: Option<usize>,
    pub before_message_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub session_id: Uuid,
    pub role: floatchat_core::types::MessageRole,
    pub content: String,
    pub status: floatchat_core::types::MessageStatus,
    pub generated_sql: Option<String>,
    pub result_metadata: Option<serde_json::Value>,
    pub follow_up_suggestions: Option<Vec<String>>,
    pub error_type: Option<floatchat_core::types::ErrorType>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<floatchat_sessions::ChatMessage> for MessageResponse {
    fn from(m: floatchat_sessions::ChatMessage) -> Self {
        Self {
            id: m.id,
            session_id: m.session_id,
            role: m.role,
            content: m.content,
            status: m.status,
            generated_sql: m.generated_sql,
            result_metadata: m.result_metadata,
            follow_up_suggestions: m.follow_up_suggestions,
            error_type: m.error_type,
            created_at: m.created_at,
        }
    }
}

/// GET /chat/sessions/{id}/messages — ascending by creation time, with
/// backward cursor pagination via `before_message_id`.
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<ListMessagesParams>,
) -> Result<Json<Vec<MessageResponse>>, ApiError> {
    let session_id = Uuid::parse_str(&id)?;
    state.sessions.get_active_session(session_id).await?;

    let page_size = params.limit.unwrap_or(state.config.chat.message_page_size) as i64;
    let messages = state
        .sessions
        .get_messages(session_id, params.before_message_id, page_size)
        .await?;

    Ok(Json(messages.into_iter().map(MessageResponse::from).collect()))
}
