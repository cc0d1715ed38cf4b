use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("query execution failed: {0}")]
    Execution(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, ExecutorError>;
