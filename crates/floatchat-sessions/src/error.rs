use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),

    #[error("message not found: {0}")]
    MessageNotFound(String),

    #[error("message {0} is not awaiting confirmation")]
    NotAwaitingConfirmation(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid id: {0}")]
    InvalidId(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SessionError {
    /// Short SCREAMING_SNAKE_CASE code, used in structured log output.
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::NotFound(_) => "SESSION_NOT_FOUND",
            SessionError::MessageNotFound(_) => "MESSAGE_NOT_FOUND",
            SessionError::NotAwaitingConfirmation(_) => "NOT_AWAITING_CONFIRMATION",
            SessionError::Database(_) => "DATABASE_ERROR",
            SessionError::InvalidId(_) => "INVALID_ID",
            SessionError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
