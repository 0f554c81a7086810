//! Server-Sent Events Plumbing
//!
//! Splits a provider's byte stream into lines, runs them through a
//! `StreamAdapter`, and forwards the resulting events to the consumer.

use futures_util::StreamExt;
use tokio::sync::mpsc;

use crate::types::{LlmError, LlmResponse, LlmResult, StopReason, UsageStats};
use assetworks_core::streaming::{StreamAdapter, UnifiedStreamEvent};

/// Line splitter for SSE bodies.
///
/// Splits on raw `\n` bytes before decoding, so a multi-byte UTF-8
/// character divided between two network chunks is decoded intact.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    buf: Vec<u8>,
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes and return every line completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            lines.push(decode_line(&raw[..raw.len() - 1]));
        }
        lines
    }

    /// Take whatever is left once the body has ended.
    pub fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.buf);
        Some(decode_line(&raw))
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// Running totals collected while forwarding a stream.
#[derive(Debug, Default)]
struct StreamTotals {
    content: String,
    usage: UsageStats,
    stop_reason: Option<StopReason>,
}

impl StreamTotals {
    fn into_response(self, model: &str) -> LlmResponse {
        LlmResponse {
            content: if self.content.is_empty() {
                None
            } else {
                Some(self.content)
            },
            stop_reason: self.stop_reason.unwrap_or(StopReason::EndTurn),
            usage: self.usage,
            model: model.to_string(),
        }
    }
}

/// Drive an SSE response body to completion.
///
/// Text deltas and usage are forwarded to `tx`; completion markers are
/// folded into the returned `LlmResponse`. An in-stream provider error ends
/// the stream with `Err`. A closed `tx` ends it with `LlmError::Cancelled`.
pub async fn drive_sse_stream(
    response: reqwest::Response,
    adapter: &mut dyn StreamAdapter,
    model: &str,
    tx: &mpsc::Sender<UnifiedStreamEvent>,
) -> LlmResult<LlmResponse> {
    adapter.reset();
    let mut stream = response.bytes_stream();
    let mut lines = SseLineBuffer::new();
    let mut totals = StreamTotals::default();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| LlmError::NetworkError {
            message: e.to_string(),
        })?;

        for line in lines.push(&chunk) {
            forward_line(adapter, &line, &mut totals, tx).await?;
        }
    }

    if let Some(line) = lines.finish() {
        forward_line(adapter, &line, &mut totals, tx).await?;
    }

    tracing::debug!(
        provider = adapter.provider_name(),
        chars = totals.content.len(),
        output_tokens = totals.usage.output_tokens,
        "Provider stream finished"
    );

    Ok(totals.into_response(model))
}

async fn forward_line(
    adapter: &mut dyn StreamAdapter,
    line: &str,
    totals: &mut StreamTotals,
    tx: &mpsc::Sender<UnifiedStreamEvent>,
) -> LlmResult<()> {
    if line.trim().is_empty() {
        return Ok(());
    }

    let events = match adapter.adapt(line) {
        Ok(events) => events,
        Err(e) => {
            tracing::warn!(
                provider = adapter.provider_name(),
                error = %e,
                "Skipping unparseable stream line"
            );
            return Ok(());
        }
    };

    for event in events {
        match &event {
            UnifiedStreamEvent::TextDelta { content } => {
                if content.is_empty() {
                    continue;
                }
                totals.content.push_str(content);
            }
            UnifiedStreamEvent::Usage {
                input_tokens,
                output_tokens,
            } => {
                if *input_tokens > 0 {
                    totals.usage.input_tokens = *input_tokens;
                }
                totals.usage.output_tokens = *output_tokens;
            }
            UnifiedStreamEvent::Complete { stop_reason } => {
                if let Some(reason) = stop_reason {
                    totals.stop_reason = Some(StopReason::from(reason.as_str()));
                }
                continue;
            }
            UnifiedStreamEvent::Error { message, code } => {
                return Err(LlmError::ServerError {
                    message: match code {
                        Some(code) => format!("{} ({})", message, code),
                        None => message.clone(),
                    },
                    status: None,
                });
            }
        }

        if tx.send(event).await.is_err() {
            return Err(LlmError::Cancelled);
        }
    }

    Ok(())
}
