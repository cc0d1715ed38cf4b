use serde::{Deserialize, Serialize};

/// A single result-set cell. Must round-trip through JSON-like
/// serialization so it can be cached
/// verbatim and re-emitted on the SSE `results` event.
pub type CellValue = serde_json::Value;

/// One result row as an ordered mapping from column name to cell value,
/// in the order the executor returned the columns.
pub type Row = Vec<(String, CellValue)>;

/// In-memory result of an Executor run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub row_count: usize,
    /// True only when the executor applied its own `LIMIT` wrapping *and*
    /// the row count reached that cap.
    pub truncated: bool,
    pub error: Option<String>,
}

impl ExecutionResult {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            row_count: 0,
            truncated: false,
            error: Some(error.into()),
        }
    }
}

/// One turn summary kept in the Context Store's rolling window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    pub sql: Option<String>,
    #[serde(default)]
    pub row_count: Option<usize>,
}

/// Role of a chat message turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl std::str::FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("unknown message role: {other}")),
        }
    }
}

/// Lifecycle status of an assistant message.
///
/// `PendingConfirmation` may be mutated exactly once into `Confirmed`,
/// `Completed`, or `Error` by the confirmation protocol; every other status
/// is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Completed,
    Error,
    PendingConfirmation,
    Confirmed,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Completed => "completed",
            MessageStatus::Error => "error",
            MessageStatus::PendingConfirmation => "pending_confirmation",
            MessageStatus::Confirmed => "confirmed",
        }
    }
}

impl std::str::FromStr for MessageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(MessageStatus::Completed),
            "error" => Ok(MessageStatus::Error),
            "pending_confirmation" => Ok(MessageStatus::PendingConfirmation),
            "confirmed" => Ok(MessageStatus::Confirmed),
            other => Err(format!("unknown message status: {other}")),
        }
    }
}

/// The two public error taxa surfaced at the SSE layer. Internal
/// validator/extraction errors never escape by name — they feed the
/// pipeline's retry prompt instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    GenerationFailure,
    ExecutionError,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::GenerationFailure => "generation_failure",
            ErrorType::ExecutionError => "execution_error",
        }
    }
}

/// Embedding row status shared by dataset and entity embeddings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingStatus {
    Indexed,
    EmbeddingFailed,
}

impl EmbeddingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingStatus::Indexed => "indexed",
            EmbeddingStatus::EmbeddingFailed => "embedding_failed",
        }
    }
}

impl std::str::FromStr for EmbeddingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "indexed" => Ok(EmbeddingStatus::Indexed),
            "embedding_failed" => Ok(EmbeddingStatus::EmbeddingFailed),
            other => Err(format!("unknown embedding status: {other}")),
        }
    }
}
