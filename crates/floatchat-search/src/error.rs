use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("embedding provider error: {0}")]
    Embedding(#[from] crate::embeddings::EmbeddingError),

    #[error("dataset not found: {0}")]
    DatasetNotFound(i32),

    /// Fuzzy region resolution missed the configured threshold.
    /// Carries up to the top three closest names so the caller can
    /// suggest them — resolution never silently picks a bad match.
    #[error("region not found: {query}")]
    RegionNotFound {
        query: String,
        suggestions: Vec<String>,
    },

    #[error("variable not allowed: {0}")]
    VariableNotAllowed(String),
}

impl SearchError {
    pub fn code(&self) -> &'static str {
        match self {
            SearchError::Database(_) => "DATABASE_ERROR",
            SearchError::Embedding(_) => "EMBEDDING_ERROR",
            SearchError::DatasetNotFound(_) => "DATASET_NOT_FOUND",
            SearchError::RegionNotFound { .. } => "REGION_NOT_FOUND",
            SearchError::VariableNotAllowed(_) => "VARIABLE_NOT_ALLOWED",
        }
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
