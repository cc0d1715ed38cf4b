//! Session CRUD endpoints: `/chat/sessions` and `/chat/sessions/{id}`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::extract_user_id;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Serialize)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub id: Uuid,
    pub user_identifier: Option<String>,
    pub title: Option<String>,
    pub is_active: bool,
    pub message_count: u32,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub last_active_at: chrono::DateTime<chrono::Utc>,
}

impl From<floatchat_sessions::ChatSession> for SessionResponse {
    fn from(s: floatchat_sessions::ChatSession) -> Self {
        Self {
            id: s.id,
            user_identifier: s.user_identifier,
            title: s.title,
            is_active: s.is_active,
            message_count: s.message_count,
            created_at: s.created_at,
            last_active_at: s.last_active_at,
        }
    }
}

/// POST /chat/sessions
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), ApiError> {
    let user_id = extract_user_id(&headers);
    let session = state.sessions.create_session(user_id.as_deref()).await?;

    let session = if let Some(name) = req.name {
        state.sessions.rename_session(session.id, &name).await?
    } else {
        session
    };

    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id: session.id,
            created_at: session.created_at,
        }),
    ))
}

/// GET /chat/sessions
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<SessionResponse>>, ApiError> {
    let user_id = extract_user_id(&headers);
    let sessions = state.sessions.list_sessions(user_id.as_deref()).await?;
    Ok(Json(sessions.into_iter().map(SessionResponse::from).collect()))
}

/// GET /chat/sessions/{id}
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let id = Uuid::parse_str(&id)?;
    let session = state.sessions.get_active_session(id).await?;
    Ok(Json(session.into()))
}

#[derive(Deserialize)]
pub struct RenameSessionRequest {
    pub name: String,
}

/// PATCH /chat/sessions/{id}
pub async fn rename_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RenameSessionRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let id = Uuid::parse_str(&id)?;
    // Confirms the session is active before renaming it, so a stale id
    // yields 404 rather than a confusing 200 on a dead session.
    state.sessions.get_active_session(id).await?;
    let session = state.sessions.rename_session(id, &req.name).await?;
    Ok(Json(session.into()))
}

/// DELETE /chat/sessions/{id}
pub async fn delete_session(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    let id = Uuid::parse_str(&id)?;
    state.sessions.delete_session(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
