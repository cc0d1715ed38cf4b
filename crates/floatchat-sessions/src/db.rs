use sqlx::PgPool;

use crate::error::Result;

/// Create the `chat_session`/`chat_message` tables if they are not already
/// present. Safe to call on every startup.
///
/// A real deployment would drive this through `sqlx::migrate!`, but the
/// ingestion side of this system (dataset/profile/measurement tables) is
/// owned by a separate pipeline this crate never touches — this crate only
/// owns the two chat tables, so a plain idempotent `CREATE TABLE IF NOT
/// EXISTS` is enough.
pub async fn init_db(pool: &PgPool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS chat_session (
            id                UUID PRIMARY KEY,
            user_identifier   TEXT,
            title             TEXT,
            is_active         BOOLEAN NOT NULL DEFAULT TRUE,
            message_count     INTEGER NOT NULL DEFAULT 0,
            created_at        TIMESTAMPTZ NOT NULL DEFAULT now(),
            last_active_at    TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_chat_session_user
            ON chat_session (user_identifier, last_active_at DESC)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS chat_message (
            id                      UUID PRIMARY KEY,
            session_id              UUID NOT NULL REFERENCES chat_session(id),
            role                    TEXT NOT NULL,
            content                 TEXT NOT NULL,
            status                  TEXT NOT NULL,
            generated_sql           TEXT,
            result_metadata         JSONB,
            follow_up_suggestions   JSONB,
            error_type              TEXT,
            created_at              TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_chat_message_session
            ON chat_message (session_id, created_at DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
