//! LLM provider implementations

use crate::config::LlmConfig;

mod error;
mod openai_compat;
mod scripted;
mod types;

pub use error::LlmError;
pub use openai_compat::{AuthMethod, OpenAiCompatConfig, OpenAiCompatProvider};
pub use scripted::ScriptedProvider;
pub use types::*;

use anyhow::Result;
use async_trait::async_trait;
use std::env;
use std::time::Duration;

/// Default Ollama daemon address
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Model identifier sent with each request
    fn model(&self) -> &str;

    /// Send a chat completion request (non-streaming)
    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
    ) -> Result<LlmResponse>;

    /// Send a chat completion request whose final text must match `schema`
    ///
    /// Providers without native structured output fall back to `chat()`; the
    /// caller still validates the returned text against the schema.
    async fn chat_with_schema(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        schema: &OutputSchema,
    ) -> Result<LlmResponse> {
        let _ = schema;
        self.chat(messages, tools).await
    }
}

/// Create an LLM provider from the `[llm]` config section
///
/// API keys come from the environment only and never from the config file.
pub fn create_provider(config: &LlmConfig) -> Result<Box<dyn LlmProvider>> {
    let cfg = provider_config(config)?;

    tracing::info!(
        provider = %cfg.name,
        model = %cfg.default_model,
        structured_output = cfg.supports_schema,
        "Using LLM provider"
    );

    Ok(Box::new(OpenAiCompatProvider::new(cfg)))
}

/// Endpoint, auth and request settings for the configured provider
pub fn provider_config(config: &LlmConfig) -> Result<OpenAiCompatConfig> {
    let timeout = Duration::from_secs(config.request_timeout_secs);

    let provider = match config.provider.to_lowercase().as_str() {
        "openai" | "gpt" => {
            let key = api_key("OPENAI_API_KEY")?;
            let mut cfg = OpenAiCompatConfig::new(
                "openai",
                "https://api.openai.com/v1/chat/completions",
                AuthMethod::BearerToken(key),
            );
            if let Some(url) = &config.base_url {
                cfg.base_url = url.clone();
            }
            cfg
        }
        "openrouter" => {
            let key = api_key("OPENROUTER_API_KEY")?;
            let mut cfg = OpenAiCompatConfig::new(
                "openrouter",
                "https://openrouter.ai/api/v1/chat/completions",
                AuthMethod::BearerToken(key),
            )
            .with_header("X-Title", "fitcoach");
            if let Some(url) = &config.base_url {
                cfg.base_url = url.clone();
            }
            cfg
        }
        "ollama" | "local" => {
            let base = config.base_url.as_deref().unwrap_or(DEFAULT_OLLAMA_URL);
            OpenAiCompatConfig::new(
                "ollama",
                format!("{}/v1/chat/completions", base.trim_end_matches('/')),
                AuthMethod::None,
            )
        }
        other => {
            return Err(LlmError::Configuration(format!(
                "Unknown LLM provider: {}. Supported: openai, openrouter, ollama",
                other
            ))
            .into())
        }
    };

    Ok(provider
        .with_model(config.model.clone())
        .with_max_tokens(config.max_tokens)
        .with_timeout(timeout)
        .with_schema_support(config.structured_output))
}

fn api_key(var: &str) -> Result<String> {
    match env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(LlmError::Configuration(format!("{} environment variable not set", var)).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_provider_is_configuration_error() {
        let config = LlmConfig {
            provider: "carrier-pigeon".to_string(),
            ..LlmConfig::default()
        };
        let err = create_provider(&config).err().unwrap();
        let llm_err = err.downcast_ref::<LlmError>().unwrap();
        assert!(matches!(llm_err, LlmError::Configuration(_)));
        assert!(err.to_string().contains("carrier-pigeon"));
    }

    #[test]
    fn test_scripted_is_not_a_configurable_provider() {
        let config = LlmConfig {
            provider: "scripted".to_string(),
            ..LlmConfig::default()
        };
        assert!(create_provider(&config).is_err());
        assert_eq!(ScriptedProvider::new().name(), "scripted");
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let config = LlmConfig {
            provider: "ollama".to_string(),
            model: "llama3.2".to_string(),
            ..LlmConfig::default()
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.name(), "ollama");
        assert_eq!(provider.model(), "llama3.2");
    }

    #[test]
    fn test_structured_output_can_be_disabled() {
        let mut config = LlmConfig {
            provider: "ollama".to_string(),
            base_url: Some("http://10.0.0.5:11434/".to_string()),
            ..LlmConfig::default()
        };
        let cfg = provider_config(&config).unwrap();
        assert!(cfg.supports_schema);
        assert_eq!(cfg.base_url, "http://10.0.0.5:11434/v1/chat/completions");

        config.structured_output = false;
        assert!(!provider_config(&config).unwrap().supports_schema);
    }
}
