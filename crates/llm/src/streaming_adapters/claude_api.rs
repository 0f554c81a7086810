//! Claude API Adapter
//!
//! Handles the SSE format of the Anthropic Messages API. Only text content is
//! relevant to report generation; thinking and tool blocks are ignored.

use assetworks_core::streaming::{AdapterError, StreamAdapter, UnifiedStreamEvent};
use serde::Deserialize;

/// Internal event types from Claude API SSE format
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClaudeApiEvent {
    MessageStart {
        message: MessageInfo,
    },
    ContentBlockDelta {
        delta: Delta,
    },
    MessageDelta {
        delta: MessageDelta,
        #[serde(default)]
        usage: Option<DeltaUsage>,
    },
    MessageStop,
    Error {
        error: ApiError,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct MessageInfo {
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Delta {
    TextDelta {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct MessageDelta {
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct DeltaUsage {
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

/// Adapter for Claude API SSE format
#[derive(Debug, Default)]
pub struct ClaudeApiAdapter {
    /// Set once `message_stop` (or a stop reason) has been seen
    completed: bool,
}

impl ClaudeApiAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StreamAdapter for ClaudeApiAdapter {
    fn provider_name(&self) -> &'static str {
        "claude-api"
    }

    fn adapt(&mut self, input: &str) -> Result<Vec<UnifiedStreamEvent>, AdapterError> {
        let trimmed = input.trim();

        // SSE streams interleave event:, id:, retry: and comment lines with data:
        let json_str = if let Some(rest) = trimmed.strip_prefix("data:") {
            rest.trim_start()
        } else if trimmed.starts_with('{') {
            trimmed
        } else {
            return Ok(vec![]);
        };

        if json_str.is_empty() || json_str == "[DONE]" {
            return Ok(vec![]);
        }

        let event: ClaudeApiEvent =
            serde_json::from_str(json_str).map_err(|e| AdapterError::ParseError(e.to_string()))?;

        let events = match event {
            ClaudeApiEvent::MessageStart { message } => match message.usage {
                Some(usage) => vec![UnifiedStreamEvent::Usage {
                    input_tokens: usage.input_tokens,
                    output_tokens: usage.output_tokens,
                }],
                None => vec![],
            },
            ClaudeApiEvent::ContentBlockDelta { delta } => match delta {
                Delta::TextDelta { text } => vec![UnifiedStreamEvent::TextDelta { content: text }],
                Delta::Other => vec![],
            },
            ClaudeApiEvent::MessageDelta { delta, usage } => {
                let mut events = vec![];
                if let Some(u) = usage {
                    events.push(UnifiedStreamEvent::Usage {
                        input_tokens: 0,
                        output_tokens: u.output_tokens,
                    });
                }
                if delta.stop_reason.is_some() {
                    self.completed = true;
                    events.push(UnifiedStreamEvent::Complete {
                        stop_reason: delta.stop_reason,
                    });
                }
                events
            }
            ClaudeApiEvent::MessageStop => {
                if self.completed {
                    vec![]
                } else {
                    self.completed = true;
                    vec![UnifiedStreamEvent::Complete { stop_reason: None }]
                }
            }
            ClaudeApiEvent::Error { error } => vec![UnifiedStreamEvent::Error {
                message: error.message,
                code: error.error_type,
            }],
            ClaudeApiEvent::Unknown => vec![],
        };

        Ok(events)
    }

    fn reset(&mut self) {
        self.completed = false;
    }
}
