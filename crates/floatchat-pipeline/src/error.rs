use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The attempt loop exhausted its retry budget without producing
    /// validated SQL. The message enumerates the last few validation
    /// errors. This is the only terminal failure the Pipeline
    /// returns — the caller never executes on it.
    #[error("could not produce a valid query after {attempts} attempt(s): {}", .last_errors.join("; "))]
    Exhausted {
        attempts: u32,
        last_errors: Vec<String>,
    },

    #[error("llm call failed: {0}")]
    Llm(#[from] floatchat_llm::LlmError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
