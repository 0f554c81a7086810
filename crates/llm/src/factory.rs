//! Provider Factory
//!
//! Maps a `ProviderConfig` to the concrete provider implementation.

use std::sync::Arc;

use crate::anthropic::AnthropicProvider;
use crate::openai::OpenAIProvider;
use crate::provider::LlmProvider;
use crate::types::{LlmResult, ProviderConfig, ProviderType};

/// Create an LLM provider from a ProviderConfig.
///
/// When the config carries no API key, it is read from the provider's
/// environment variable (`ANTHROPIC_API_KEY` / `OPENAI_API_KEY`).
pub fn create_provider(mut config: ProviderConfig) -> LlmResult<Arc<dyn LlmProvider>> {
    if config.api_key.is_none() {
        config.api_key = std::env::var(config.provider.api_key_env())
            .ok()
            .filter(|k| !k.trim().is_empty());
    }

    tracing::debug!(
        provider = %config.provider,
        model = %config.model,
        has_key = config.api_key.is_some(),
        "Creating LLM provider"
    );

    let provider: Arc<dyn LlmProvider> = match config.provider {
        ProviderType::Anthropic => Arc::new(AnthropicProvider::new(config)?),
        ProviderType::OpenAI => Arc::new(OpenAIProvider::new(config)?),
    };
    Ok(provider)
}
