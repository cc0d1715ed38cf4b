use crate::provider::ProviderError;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("unknown LLM provider: {0}")]
    UnknownProvider(String),

    #[error("no API key configured for provider {0}")]
    MissingApiKey(String),

    #[error("provider call failed: {0}")]
    Provider(#[from] ProviderError),
}

impl LlmError {
    pub fn code(&self) -> &'static str {
        match self {
            LlmError::UnknownProvider(_) => "UNKNOWN_PROVIDER",
            LlmError::MissingApiKey(_) => "MISSING_API_KEY",
            LlmError::Provider(_) => "PROVIDER_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;
