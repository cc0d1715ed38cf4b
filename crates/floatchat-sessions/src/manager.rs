use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row as SqlxRow};
use tracing::instrument;
use uuid::Uuid;

use floatchat_core::types::{ErrorType, MessageRole, MessageStatus};

use crate::error::{Result, SessionError};
use crate::types::{ChatMessage, ChatSession, NewMessage};

/// Session and message persistence over the read-write pool — the Chat Orchestrator's sole
/// interface to conversation storage.
pub struct SessionStore {
    pool: PgPool,
}

impl SessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new session. `user_identifier` is whatever header/claim the
    /// gateway extracted — this crate treats it as an opaque tag.
    #[instrument(skip(self))]
    pub async fn create_session(&self, user_identifier: Option<&str>) -> Result<ChatSession> {
        let id = Uuid::now_v7();
        let row = sqlx::query(
            "INSERT INTO chat_session (id, user_identifier)
             VALUES ($1, $2)
             RETURNING id, user_identifier, title, is_active, message_count, created_at, last_active_at",
        )
        .bind(id)
        .bind(user_identifier)
        .fetch_one(&self.pool)
        .await?;

        row_to_session(&row)
    }

    /// List sessions, most-recently-active first, optionally scoped to a
    /// single user. Soft-deleted sessions are never returned.
    #[instrument(skip(self))]
    pub async fn list_sessions(&self, user_identifier: Option<&str>) -> Result<Vec<ChatSession>> {
        let rows = match user_identifier {
            Some(uid) => {
                sqlx::query(
                    "SELECT id, user_identifier, title, is_active, message_count, created_at, last_active_at
                     FROM chat_session
                     WHERE is_active = TRUE AND user_identifier = $1
                     ORDER BY last_active_at DESC",
                )
                .bind(uid)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, user_identifier, title, is_active, message_count, created_at, last_active_at
                     FROM chat_session
                     WHERE is_active = TRUE
                     ORDER BY last_active_at DESC",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(row_to_session).collect()
    }

    /// Fetch an active session by id. Returns `NotFound` both when the id
    /// does not exist and when it has been soft-deleted.
    #[instrument(skip(self))]
    pub async fn get_active_session(&self, session_id: Uuid) -> Result<ChatSession> {
        let row = sqlx::query(
            "SELECT id, user_identifier, title, is_active, message_count, created_at, last_active_at
             FROM chat_session
             WHERE id = $1 AND is_active = TRUE",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;

        row_to_session(&row)
    }

    #[instrument(skip(self))]
    pub async fn rename_session(&self, session_id: Uuid, title: &str) -> Result<ChatSession> {
        let row = sqlx::query(
            "UPDATE chat_session SET title = $2
             WHERE id = $1 AND is_active = TRUE
             RETURNING id, user_identifier, title, is_active, message_count, created_at, last_active_at",
        )
        .bind(session_id)
        .bind(title)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;

        row_to_session(&row)
    }

    /// Soft-delete: flips `is_active` rather than removing the row, so the
    /// message history is retained for audit.
    #[instrument(skip(self))]
    pub async fn delete_session(&self, session_id: Uuid) -> Result<()> {
        let rows_changed = sqlx::query(
            "UPDATE chat_session SET is_active = FALSE WHERE id = $1 AND is_active = TRUE",
        )
        .bind(session_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows_changed == 0 {
            return Err(SessionError::NotFound(session_id.to_string()));
        }
        Ok(())
    }

    /// Cursor-paginated message list, ascending by `created_at` for
    /// display. Without a cursor, returns the most recent
    /// `page_size` messages; with one, the `page_size` messages
    /// immediately preceding it. Both cases query `DESC LIMIT` then
    /// reverse, so the SQL plan never has to scan the whole table.
    #[instrument(skip(self))]
    pub async fn get_messages(
        &self,
        session_id: Uuid,
        before_message_id: Option<Uuid>,
        page_size: i64,
    ) -> Result<Vec<ChatMessage>> {
        let cursor_created_at = match before_message_id {
            Some(cursor_id) => {
                let row = sqlx::query("SELECT created_at FROM chat_message WHERE id = $1 AND session_id = $2")
                    .bind(cursor_id)
                    .bind(session_id)
                    .fetch_optional(&self.pool)
                    .await?
                    .ok_or_else(|| SessionError::MessageNotFound(cursor_id.to_string()))?;
                Some(row.try_get::<DateTime<Utc>, _>("created_at")?)
            }
            None => None,
        };

        let rows = match cursor_created_at {
            Some(cursor) => {
                sqlx::query(
                    "SELECT id, session_id, role, content, status, generated_sql,
                            result_metadata, follow_up_suggestions, error_type, created_at
                     FROM chat_message
                     WHERE session_id = $1 AND created_at < $2
                     ORDER BY created_at DESC
                     LIMIT $3",
                )
                .bind(session_id)
                .bind(cursor)
                .bind(page_size)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, session_id, role, content, status, generated_sql,
                            result_metadata, follow_up_suggestions, error_type, created_at
                     FROM chat_message
                     WHERE session_id = $1
                     ORDER BY created_at DESC
                     LIMIT $2",
                )
                .bind(session_id)
                .bind(page_size)
                .fetch_all(&self.pool)
                .await?
            }
        };

        let mut messages: Vec<ChatMessage> = rows.iter().map(row_to_message).collect::<Result<_>>()?;
        messages.reverse();
        Ok(messages)
    }

    /// Append a new message row and bump the session's `message_count` and
    /// `last_active_at` in the same call — every persisted turn,
    /// including an error turn, counts toward `message_count`.
    #[instrument(skip(self, new_message))]
    pub async fn append_message(&self, session_id: Uuid, new_message: NewMessage) -> Result<ChatMessage> {
        let id = Uuid::now_v7();
        let follow_ups_json = new_message
            .follow_up_suggestions
            .as_ref()
            .map(|v| serde_json::to_value(v))
            .transpose()?;

        let row = sqlx::query(
            "INSERT INTO chat_message
                (id, session_id, role, content, status, generated_sql, result_metadata,
                 follow_up_suggestions, error_type)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING id, session_id, role, content, status, generated_sql,
                       result_metadata, follow_up_suggestions, error_type, created_at",
        )
        .bind(id)
        .bind(session_id)
        .bind(new_message.role.as_str())
        .bind(&new_message.content)
        .bind(new_message.status.as_str())
        .bind(&new_message.generated_sql)
        .bind(&new_message.result_metadata)
        .bind(&follow_ups_json)
        .bind(new_message.error_type.map(|e| e.as_str()))
        .fetch_one(&self.pool)
        .await?;

        self.bump_activity(session_id, 1).await?;
        row_to_message(&row)
    }

    /// Atomically flip a message from `pending_confirmation` to
    /// `confirmed`, scoped to its session. A message already in any other
    /// status (including already-confirmed)
    /// yields `NotAwaitingConfirmation` rather than silently re-running —
    /// the confirmation protocol fires exactly once per message.
    #[instrument(skip(self))]
    pub async fn begin_confirmation(&self, session_id: Uuid, message_id: Uuid) -> Result<ChatMessage> {
        let updated = sqlx::query(
            "UPDATE chat_message SET status = $3
             WHERE id = $1 AND session_id = $2 AND status = $4
             RETURNING id, session_id, role, content, status, generated_sql,
                       result_metadata, follow_up_suggestions, error_type, created_at",
        )
        .bind(message_id)
        .bind(session_id)
        .bind(MessageStatus::Confirmed.as_str())
        .bind(MessageStatus::PendingConfirmation.as_str())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = updated {
            return row_to_message(&row);
        }

        // Distinguish "doesn't exist" from "exists but not pending" so the
        // gateway can 404 vs. 400.
        let existing = self.get_message(session_id, message_id).await?;
        match existing.status {
            MessageStatus::PendingConfirmation => unreachable!("race: status changed between UPDATE and read-back"),
            _ => Err(SessionError::NotAwaitingConfirmation(message_id.to_string())),
        }
    }

    /// Mutate an existing message in-place — the confirmation protocol's
    /// `pending_confirmation -> confirmed/completed/error` transition
    ///. Also bumps `message_count` by `count_delta`, which callers should
    /// pass as `0` whenever the call updates an existing row in place:
    /// both rows of the turn (the user message and the pending-
    /// confirmation assistant message) were already counted by the two
    /// `append_message` calls that created them, so an in-place update
    /// persists zero new rows.
    #[instrument(skip(self))]
    #[allow(clippy::too_many_arguments)]
    pub async fn update_message(
        &self,
        message_id: Uuid,
        content: &str,
        status: MessageStatus,
        result_metadata: Option<serde_json::Value>,
        follow_up_suggestions: Option<&[String]>,
        error_type: Option<ErrorType>,
        count_delta: i64,
    ) -> Result<ChatMessage> {
        let follow_ups_json = follow_up_suggestions.map(serde_json::to_value).transpose()?;

        let row = sqlx::query(
            "UPDATE chat_message
             SET content = $2, status = $3, result_metadata = $4,
                 follow_up_suggestions = $5, error_type = $6
             WHERE id = $1
             RETURNING id, session_id, role, content, status, generated_sql,
                       result_metadata, follow_up_suggestions, error_type, created_at",
        )
        .bind(message_id)
        .bind(content)
        .bind(status.as_str())
        .bind(&result_metadata)
        .bind(&follow_ups_json)
        .bind(error_type.map(|e| e.as_str()))
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| SessionError::MessageNotFound(message_id.to_string()))?;

        let message = row_to_message(&row)?;
        if count_delta != 0 {
            self.bump_activity(message.session_id, count_delta).await?;
        }
        Ok(message)
    }

    /// Look up a message scoped to its session, used by the confirmation
    /// endpoint to verify the pending message belongs to the session the
    /// client named.
    #[instrument(skip(self))]
    pub async fn get_message(&self, session_id: Uuid, message_id: Uuid) -> Result<ChatMessage> {
        let row = sqlx::query(
            "SELECT id, session_id, role, content, status, generated_sql,
                    result_metadata, follow_up_suggestions, error_type, created_at
             FROM chat_message
             WHERE id = $1 AND session_id = $2",
        )
        .bind(message_id)
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| SessionError::MessageNotFound(message_id.to_string()))?;

        row_to_message(&row)
    }

    async fn bump_activity(&self, session_id: Uuid, count_delta: i64) -> Result<()> {
        sqlx::query(
            "UPDATE chat_session
             SET message_count = message_count + $2, last_active_at = now()
             WHERE id = $1",
        )
        .bind(session_id)
        .bind(count_delta)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn row_to_session(row: &sqlx::postgres::PgRow) -> Result<ChatSession> {
    Ok(ChatSession {
        id: row.try_get("id")?,
        user_identifier: row.try_get("user_identifier")?,
        title: row.try_get("title")?,
        is_active: row.try_get("is_active")?,
        message_count: row.try_get::<i32, _>("message_count")? as u32,
        created_at: row.try_get("created_at")?,
        last_active_at: row.try_get("last_active_at")?,
    })
}

fn row_to_message(row: &sqlx::postgres::PgRow) -> Result<ChatMessage> {
    let role_str: String = row.try_get("role")?;
    let status_str: String = row.try_get("status")?;
    let error_type_str: Option<String> = row.try_get("error_type")?;
    let follow_up_value: Option<serde_json::Value> = row.try_get("follow_up_suggestions")?;

    Ok(ChatMessage {
        id: row.try_get("id")?,
        session_id: row.try_get("session_id")?,
        role: MessageRole::from_str(&role_str).map_err(SessionError::InvalidId)?,
        content: row.try_get("content")?,
        status: MessageStatus::from_str(&status_str).map_err(SessionError::InvalidId)?,
        generated_sql: row.try_get("generated_sql")?,
        result_metadata: row.try_get("result_metadata")?,
        follow_up_suggestions: follow_up_value.and_then(|v| serde_json::from_value(v).ok()),
        error_type: error_type_str
            .map(|s| match s.as_str() {
                "generation_failure" => Ok(ErrorType::GenerationFailure),
                "execution_error" => Ok(ErrorType::ExecutionError),
                other => Err(SessionError::InvalidId(format!("unknown error_type: {other}"))),
            })
            .transpose()?,
        created_at: row.try_get("created_at")?,
    })
}
