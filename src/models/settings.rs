//! Settings Models
//!
//! Server configuration stored in config.json.

use serde::{Deserialize, Serialize};

use assetworks_core::{CoreError, CoreResult};
use assetworks_llm::{ProviderConfig, ProviderType};

/// Application configuration stored in config.json
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Socket address the HTTP server binds to
    pub bind_address: String,
    /// SQLite database location; `~/.assetworks/reports.db` when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<String>,
    /// Default LLM provider: "anthropic" or "openai"
    pub default_provider: String,
    /// Default model for the provider
    pub default_model: String,
    /// Maximum tokens per report generation
    pub max_tokens: u32,
    /// Sampling temperature (0.0 - 1.0)
    pub temperature: f32,
    /// Capacity of the chunk queue and the relay channel of a generation
    pub stream_buffer: usize,
    /// Number of prior thread messages sent as conversation context
    pub history_limit: usize,
    /// Replaces the built-in report system prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Anthropic endpoint override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anthropic_base_url: Option<String>,
    /// OpenAI-compatible endpoint override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_base_url: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8787".to_string(),
            database_path: None,
            default_provider: "anthropic".to_string(),
            default_model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 8192,
            temperature: 0.7,
            stream_buffer: 64,
            history_limit: 20,
            system_prompt: None,
            anthropic_base_url: None,
            openai_base_url: None,
        }
    }
}

impl AppConfig {
    /// Validate the configuration
    pub fn validate(&self) -> CoreResult<()> {
        if self.bind_address.parse::<std::net::SocketAddr>().is_err() {
            return Err(CoreError::validation(format!(
                "Invalid bind_address: {}",
                self.bind_address
            )));
        }

        if self.default_provider.parse::<ProviderType>().is_err() {
            return Err(CoreError::validation(format!(
                "Invalid default_provider: {}. Must be 'anthropic' or 'openai'",
                self.default_provider
            )));
        }

        if self.default_model.trim().is_empty() {
            return Err(CoreError::validation("default_model cannot be empty"));
        }

        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(CoreError::validation("temperature must be between 0.0 and 1.0"));
        }

        if self.max_tokens == 0 {
            return Err(CoreError::validation("max_tokens must be greater than 0"));
        }

        if self.stream_buffer == 0 || self.stream_buffer > 4096 {
            return Err(CoreError::validation("stream_buffer must be between 1 and 4096"));
        }

        if self.history_limit > 200 {
            return Err(CoreError::validation("history_limit cannot exceed 200"));
        }

        Ok(())
    }

    /// Build the provider configuration for a generation.
    ///
    /// Request overrides win over the configured defaults. The API key is
    /// left unset and resolved from the environment by the provider factory.
    pub fn provider_config(
        &self,
        provider_override: Option<&str>,
        model_override: Option<&str>,
    ) -> CoreResult<ProviderConfig> {
        let provider_name = provider_override.unwrap_or(&self.default_provider);
        let provider: ProviderType = provider_name
            .parse()
            .map_err(|_| CoreError::parse(format!("Unknown provider: {}", provider_name)))?;

        // A provider switch without a model cannot reuse the other provider's default
        let default_provider = self.default_provider.parse::<ProviderType>().ok();
        let model = match model_override {
            Some(model) => model.to_string(),
            None if default_provider == Some(provider) => self.default_model.clone(),
            None => default_model_for(provider).to_string(),
        };

        let base_url = match provider {
            ProviderType::Anthropic => self.anthropic_base_url.clone(),
            ProviderType::OpenAI => self.openai_base_url.clone(),
        };

        Ok(ProviderConfig {
            provider,
            api_key: None,
            base_url,
            model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            ..Default::default()
        })
    }
}

fn default_model_for(provider: ProviderType) -> &'static str {
    match provider {
        ProviderType::Anthropic => "claude-sonnet-4-20250514",
        ProviderType::OpenAI => "gpt-4o",
    }
}
