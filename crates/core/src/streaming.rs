//! Stream Event Types
//!
//! Two event vocabularies flow through a report generation:
//!
//! - `UnifiedStreamEvent`: provider-agnostic events produced by the LLM
//!   stream adapters (text deltas, usage, errors, completion).
//! - `ReportStreamEvent`: the outbound relay protocol sent to clients
//!   (content deltas, newly recognised sections/insights, terminal events).

use serde::{Deserialize, Serialize};

use crate::report::{Insight, ReportSection};

/// Unified streaming event that all provider adapters convert to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UnifiedStreamEvent {
    /// Text content delta from the model
    TextDelta { content: String },

    /// Token usage information
    Usage {
        input_tokens: u32,
        output_tokens: u32,
    },

    /// Error reported inside the stream by the provider
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },

    /// Stream complete
    Complete {
        #[serde(skip_serializing_if = "Option::is_none")]
        stop_reason: Option<String>,
    },
}

/// Errors that can occur during stream adaptation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum AdapterError {
    /// Invalid format that couldn't be parsed
    InvalidFormat(String),
    /// JSON/data parsing error
    ParseError(String),
}

impl std::fmt::Display for AdapterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdapterError::InvalidFormat(msg) => write!(f, "Invalid format: {}", msg),
            AdapterError::ParseError(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for AdapterError {}

/// Trait for adapting provider-specific stream formats to unified events.
pub trait StreamAdapter: Send + Sync {
    /// Returns the provider name for logging and identification.
    fn provider_name(&self) -> &'static str;

    /// Adapt a raw stream line to unified events.
    ///
    /// A single input line may produce zero, one, or multiple events.
    fn adapt(&mut self, input: &str) -> Result<Vec<UnifiedStreamEvent>, AdapterError>;

    /// Reset adapter state for a new stream.
    fn reset(&mut self) {}
}

/// Which stage of a generation failed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The token source failed; nothing was persisted.
    Generation,
    /// The stream finished but the report could not be saved.
    Persistence,
}

/// Event relayed to the client while a report is generated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReportStreamEvent {
    /// One raw text delta, verbatim from the source
    Content { content: String },

    /// Sections recognised since the previous `sections` event
    Sections { data: Vec<ReportSection> },

    /// Insights recognised since the previous `insights` event
    Insights { data: Vec<Insight> },

    /// Terminal success; always sent after the report is persisted
    #[serde(rename_all = "camelCase")]
    Complete {
        report_id: String,
        /// Wall-clock generation time in milliseconds
        duration: u64,
        content: String,
        sections: Vec<ReportSection>,
        insights: Vec<Insight>,
    },

    /// Terminal failure
    Error { error: String, kind: FailureKind },

    /// Acknowledges an explicit cancellation
    Cancelled,
}

impl ReportStreamEvent {
    /// Whether no further events follow this one.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReportStreamEvent::Complete { .. }
                | ReportStreamEvent::Error { .. }
                | ReportStreamEvent::Cancelled
        )
    }

    /// The `type` discriminator as it appears on the wire.
    pub fn event_type(&self) -> &'static str {
        match self {
            ReportStreamEvent::Content { .. } => "content",
            ReportStreamEvent::Sections { .. } => "sections",
            ReportStreamEvent::Insights { .. } => "insights",
            ReportStreamEvent::Complete { .. } => "complete",
            ReportStreamEvent::Error { .. } => "error",
            ReportStreamEvent::Cancelled => "cancelled",
        }
    }
}
