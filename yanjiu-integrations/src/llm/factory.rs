//! Builds [`SiumaiChatModel`]s from [`LlmConfig`].

use std::sync::Arc;

use siumai::prelude::*;
use tracing::info;

use yanjiu_core::{ChatModel, LlmConfig, ReasoningStyle, Result, YanjiuError};

use super::SiumaiChatModel;

/// Placeholder key for OpenAI-compatible local servers that ignore auth.
const LOCAL_API_KEY: &str = "not-used";

/// Creates chat models using siumai.
///
/// # Examples
///
/// ```rust,no_run
/// use yanjiu_core::LlmConfig;
/// use yanjiu_integrations::llm::SiumaiModelFactory;
///
/// # async fn example() -> yanjiu_core::Result<()> {
/// let factory = SiumaiModelFactory::new();
/// let model = factory
///     .create(&LlmConfig::local("nvidia/llama-3.3-nemotron-super-49b-v1", "http://localhost:8000/v1"))
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct SiumaiModelFactory;

impl SiumaiModelFactory {
    /// Create a new factory.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Providers this factory can build.
    pub fn supported_providers(&self) -> Vec<&'static str> {
        vec!["openai", "anthropic", "ollama", "local"]
    }

    /// Whether `config` names a supported provider.
    pub fn can_create(&self, config: &LlmConfig) -> bool {
        self.supported_providers()
            .contains(&config.provider.as_str())
    }

    /// Validate `config` for this factory.
    pub fn validate_config(&self, config: &LlmConfig) -> Result<()> {
        config.validate()?;

        if !self.can_create(config) {
            return Err(YanjiuError::configuration(format!(
                "Unsupported provider for SiumaiModelFactory: {}",
                config.provider
            )));
        }

        if config.provider == "local" && config.base_url.is_none() {
            return Err(YanjiuError::configuration(
                "base_url is required for local provider",
            ));
        }

        Ok(())
    }

    /// Build a chat model.
    pub async fn create(&self, config: &LlmConfig) -> Result<Arc<dyn ChatModel>> {
        self.validate_config(config)?;
        let client = self.create_siumai_client(config).await?;

        let mut model = SiumaiChatModel::new(client, &config.model).with_streaming(config.stream);
        if let Some(style) = reasoning_style_override(config)? {
            model = model.with_reasoning_style(style);
        }
        info!(
            provider = %config.provider,
            model = %config.model,
            streaming = config.stream,
            "Created chat model"
        );
        Ok(Arc::new(model))
    }

    async fn create_siumai_client(&self, config: &LlmConfig) -> Result<Siumai> {
        let mut builder = match config.provider.as_str() {
            "openai" => {
                let mut builder = Siumai::builder().openai();
                if let Some(api_key) = &config.api_key {
                    builder = builder.api_key(api_key);
                }
                if let Some(base_url) = &config.base_url {
                    builder = builder.base_url(base_url);
                }
                builder.model(&config.model)
            }
            "anthropic" => {
                let mut builder = Siumai::builder().anthropic();
                if let Some(api_key) = &config.api_key {
                    builder = builder.api_key(api_key);
                }
                if let Some(base_url) = &config.base_url {
                    builder = builder.base_url(base_url);
                }
                builder.model(&config.model)
            }
            "ollama" => {
                let base_url = config
                    .base_url
                    .as_deref()
                    .unwrap_or("http://localhost:11434");
                Siumai::builder()
                    .ollama()
                    .base_url(base_url)
                    .model(&config.model)
            }
            // Local inference servers (vLLM, NIM) speak the OpenAI protocol.
            "local" => {
                let base_url = config.base_url.as_deref().ok_or_else(|| {
                    YanjiuError::configuration("Local provider requires base_url to be specified")
                })?;
                Siumai::builder()
                    .openai()
                    .api_key(config.api_key.as_deref().unwrap_or(LOCAL_API_KEY))
                    .base_url(base_url)
                    .model(&config.model)
            }
            _ => {
                return Err(YanjiuError::configuration(format!(
                    "Unsupported LLM provider: {}",
                    config.provider
                )));
            }
        };

        builder = builder.temperature(config.effective_temperature());
        if let Some(max_tokens) = config.max_tokens {
            builder = builder.max_tokens(max_tokens.try_into().unwrap_or(u32::MAX));
        }

        builder.build().await.map_err(|e| {
            YanjiuError::configuration(format!("Failed to create siumai client: {e}"))
        })
    }
}

/// `additional_config.reasoning_style`, if set.
fn reasoning_style_override(config: &LlmConfig) -> Result<Option<ReasoningStyle>> {
    config
        .additional_config
        .get("reasoning_style")
        .map(|value| {
            serde_json::from_value(value.clone()).map_err(|e| {
                YanjiuError::configuration(format!("Invalid reasoning_style: {e}"))
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_create() {
        let factory = SiumaiModelFactory::new();

        assert!(factory.can_create(&LlmConfig::openai("gpt-4o", "test-key")));
        assert!(factory.can_create(&LlmConfig::anthropic("claude-3", "test-key")));
        assert!(factory.can_create(&LlmConfig::local("nemotron", "http://localhost:8000/v1")));
        assert!(!factory.can_create(&LlmConfig::new("unsupported", "model")));
    }

    #[test]
    fn test_validation() {
        let factory = SiumaiModelFactory::new();

        assert!(
            factory
                .validate_config(&LlmConfig::openai("gpt-4o", "test-key"))
                .is_ok()
        );
        assert!(
            factory
                .validate_config(&LlmConfig::new("openai", "gpt-4o"))
                .is_err()
        );
        assert!(
            factory
                .validate_config(&LlmConfig::new("local", "nemotron"))
                .is_err()
        );
    }

    #[test]
    fn test_reasoning_style_override() {
        let config = LlmConfig::local("my-model", "http://localhost:8000/v1")
            .with_config("reasoning_style", "side_channel");
        assert_eq!(
            reasoning_style_override(&config).unwrap(),
            Some(ReasoningStyle::SideChannel)
        );

        let config = config.with_config("reasoning_style", "sideways");
        assert!(reasoning_style_override(&config).is_err());

        let config = LlmConfig::local("my-model", "http://localhost:8000/v1");
        assert_eq!(reasoning_style_override(&config).unwrap(), None);
    }

    #[tokio::test]
    async fn test_unsupported_provider() {
        let factory = SiumaiModelFactory::new();
        let err = factory
            .create(&LlmConfig::new("unsupported", "model").with_api_key("k"))
            .await
            .unwrap_err();
        assert!(matches!(err, YanjiuError::Configuration { .. }));
    }
}
