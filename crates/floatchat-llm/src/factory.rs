use std::sync::Arc;

use floatchat_core::config::LlmConfig;

use crate::error::{LlmError, Result};
use crate::openai::OpenAiProvider;
use crate::provider::LlmProvider;

/// Build a provider handle for `provider_name`, reading its API key and
/// base URL out of `config`. Unknown providers are rejected at this
/// boundary; a known provider with no configured API key fails
/// immediately rather than lazily on first call.
pub fn build_provider(config: &LlmConfig, provider_name: &str) -> Result<Arc<dyn LlmProvider>> {
    let (api_key, base_url) = match provider_name {
        "deepseek" => (&config.deepseek_api_key, config.deepseek_base_url.clone()),
        "qwen" => (&config.qwen_api_key, config.qwen_base_url.clone()),
        "gemma" => (&config.gemma_api_key, config.gemma_base_url.clone()),
        "openai" => (&config.openai_api_key, config.openai_base_url.clone()),
        other => return Err(LlmError::UnknownProvider(other.to_string())),
    };

    let api_key = api_key
        .clone()
        .ok_or_else(|| LlmError::MissingApiKey(provider_name.to_string()))?;

    Ok(Arc::new(OpenAiProvider::new(provider_name, api_key, base_url)))
}

/// Resolve the default model for a known provider name. Used when a
/// caller omits a per-request model override.
pub fn default_model_for(provider_name: &str) -> Option<&'static str> {
    match provider_name {
        "deepseek" => Some("deepseek-reasoner"),
        "qwen" => Some("qwen-plus"),
        "gemma" => Some("gemma-2-27b-it"),
        "openai" => Some("gpt-4o-mini"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_provider_is_rejected_at_the_boundary() {
        let config = LlmConfig::default();
        let result = build_provider(&config, "not-a-real-provider");
        assert!(matches!(result, Err(LlmError::UnknownProvider(_))));
    }

    #[test]
    fn missing_api_key_fails_immediately() {
        let config = LlmConfig::default();
        let result = build_provider(&config, "deepseek");
        assert!(matches!(result, Err(LlmError::MissingApiKey(_))));
    }

    #[test]
    fn configured_api_key_succeeds() {
        let mut config = LlmConfig::default();
        config.deepseek_api_key = Some("sk-test".to_string());
        let result = build_provider(&config, "deepseek");
        assert!(result.is_ok());
    }
}
