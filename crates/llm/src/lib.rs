//! AssetWorks LLM
//!
//! Provides a unified streaming interface over the report-generating LLM
//! providers:
//! - Anthropic Claude
//! - OpenAI (and OpenAI-compatible gateways)
//!
//! Also includes provider-specific streaming adapters, SSE line handling and
//! the HTTP client factory.

pub mod anthropic;
pub mod factory;
pub mod http_client;
pub mod openai;
pub mod provider;
pub mod sse;
pub mod streaming_adapters;
pub mod types;

// Re-export main types
pub use anthropic::AnthropicProvider;
pub use factory::create_provider;
pub use http_client::build_http_client;
pub use openai::OpenAIProvider;
pub use provider::LlmProvider;
pub use types::*;

// Re-export streaming adapters
pub use streaming_adapters::{ClaudeApiAdapter, OpenAIAdapter};
