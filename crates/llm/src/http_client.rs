//! HTTP Client Factory
//!
//! Builds the reqwest client shared by a provider instance.

use std::time::Duration;

use crate::types::{LlmError, LlmResult, ProviderConfig};

/// Connect timeout applied to every provider client.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Build a `reqwest::Client` for the given provider configuration.
///
/// The overall timeout bounds the whole streamed response, so it is sized
/// for long generations rather than single round-trips.
pub fn build_http_client(config: &ProviderConfig) -> LlmResult<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(concat!("assetworks/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| LlmError::Other {
            message: format!("Failed to build HTTP client: {}", e),
        })
}
