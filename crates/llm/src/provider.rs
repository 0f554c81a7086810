//! LLM Provider Trait
//!
//! Defines the common interface for all streaming LLM providers.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::types::{LlmError, LlmResponse, LlmResult, Message, ProviderConfig};
use assetworks_core::streaming::UnifiedStreamEvent;

/// Trait that all LLM providers must implement.
///
/// A provider acts as the token source of a report generation: it pushes
/// `UnifiedStreamEvent`s into a bounded channel and returns once the
/// provider's stream ends.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the provider name for identification.
    fn name(&self) -> &'static str;

    /// Returns the current model being used.
    fn model(&self) -> &str;

    /// Stream a message response via a channel.
    ///
    /// Text arrives as `TextDelta` events in source order. Transport and
    /// HTTP failures are returned as `Err`. When `tx` is closed by the
    /// consumer the provider stops reading and returns `LlmError::Cancelled`.
    async fn stream_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        tx: mpsc::Sender<UnifiedStreamEvent>,
    ) -> LlmResult<LlmResponse>;

    /// Check if the provider is reachable and the API key is accepted.
    async fn health_check(&self) -> LlmResult<()>;

    /// Get the configuration for this provider.
    fn config(&self) -> &ProviderConfig;
}

/// Helper function to create an error for missing API key
pub fn missing_api_key_error(provider: &str) -> LlmError {
    LlmError::AuthenticationFailed {
        message: format!("API key not configured for {}", provider),
    }
}

/// Helper function to parse HTTP error status codes
pub fn parse_http_error(status: u16, body: &str, provider: &str) -> LlmError {
    match status {
        401 => LlmError::AuthenticationFailed {
            message: format!("{}: Invalid API key", provider),
        },
        403 => LlmError::AuthenticationFailed {
            message: format!("{}: Access denied", provider),
        },
        404 => LlmError::ModelNotFound {
            model: body.to_string(),
        },
        429 => LlmError::RateLimited {
            message: body.to_string(),
            retry_after: None,
        },
        400 => LlmError::InvalidRequest {
            message: body.to_string(),
        },
        500..=599 => LlmError::ServerError {
            message: body.to_string(),
            status: Some(status),
        },
        _ => LlmError::Other {
            message: format!("HTTP {}: {}", status, body),
        },
    }
}
