//! Report Generation Pipeline
//!
//! Drives one generation: a producer task streams text from the provider
//! into a bounded queue, and the relay loop accumulates it, extracts
//! sections and insights as they complete, forwards everything to the
//! client, and persists the finished report before announcing completion.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use assetworks_core::{FailureKind, ReportStreamEvent, UnifiedStreamEvent};
use assetworks_llm::{LlmProvider, LlmResponse, LlmResult, Message, UsageStats};

use super::extractor::ReportExtractor;
use super::persistence::ReportStore;
use crate::models::report::{NewReport, ReportMetadata};

/// Everything one generation needs.
pub struct GenerationContext {
    pub thread_id: String,
    pub generation_id: String,
    /// The user's request, recorded in the report metadata
    pub prompt: String,
    /// Conversation sent to the provider, ending with the prompt
    pub messages: Vec<Message>,
    pub system: Option<String>,
    pub provider: Arc<dyn LlmProvider>,
    pub store: Arc<dyn ReportStore>,
    pub cancel: CancellationToken,
    /// Capacity of the chunk queue between provider and relay loop
    pub chunk_capacity: usize,
}

/// How a generation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Completed { report_id: String },
    Failed { error: String },
    PersistenceFailed { error: String },
    Cancelled,
}

/// Result of relaying one event.
enum Relay {
    Sent,
    /// The cancellation token fired while waiting for channel capacity
    Cancelled,
    /// The client side of the channel is gone
    Closed,
}

pub struct ReportPipeline;

impl ReportPipeline {
    /// Run a generation to completion, relaying events into `out`.
    ///
    /// Event order: `content`/`sections`/`insights` as text arrives, then
    /// exactly one of `complete` (after the report is stored), `error`, or
    /// `cancelled` (explicit cancellation only). A closed `out` is treated
    /// as cancellation and nothing further is sent.
    pub async fn run(
        ctx: GenerationContext,
        out: mpsc::Sender<ReportStreamEvent>,
    ) -> GenerationOutcome {
        let started = Instant::now();

        tracing::info!(
            thread_id = %ctx.thread_id,
            generation_id = %ctx.generation_id,
            provider = ctx.provider.name(),
            model = ctx.provider.model(),
            "Report generation started"
        );

        let (chunk_tx, mut chunk_rx) = mpsc::channel(ctx.chunk_capacity.max(1));
        let producer = spawn_producer(&ctx, chunk_tx);
        let mut extractor = ReportExtractor::new();

        loop {
            let event = tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => {
                    producer.abort();
                    return cancelled(&ctx, &out, true);
                }
                _ = out.closed() => {
                    producer.abort();
                    return cancelled(&ctx, &out, false);
                }
                event = chunk_rx.recv() => event,
            };

            let Some(event) = event else {
                break;
            };

            match event {
                UnifiedStreamEvent::TextDelta { content } => {
                    if content.is_empty() {
                        continue;
                    }
                    let update = extractor.push(&content);

                    let mut batch = vec![ReportStreamEvent::Content { content }];
                    if !update.new_sections.is_empty() {
                        batch.push(ReportStreamEvent::Sections {
                            data: update.new_sections,
                        });
                    }
                    if !update.new_insights.is_empty() {
                        batch.push(ReportStreamEvent::Insights {
                            data: update.new_insights,
                        });
                    }

                    for event in batch {
                        match relay(&out, &ctx.cancel, event).await {
                            Relay::Sent => {}
                            Relay::Cancelled => {
                                producer.abort();
                                return cancelled(&ctx, &out, true);
                            }
                            Relay::Closed => {
                                producer.abort();
                                return cancelled(&ctx, &out, false);
                            }
                        }
                    }
                }
                UnifiedStreamEvent::Error { message, code } => {
                    producer.abort();
                    let error = match code {
                        Some(code) => format!("{} ({})", message, code),
                        None => message,
                    };
                    return fail(&ctx, &out, FailureKind::Generation, error).await;
                }
                // Usage and stop reason are taken from the provider's final response
                UnifiedStreamEvent::Usage { .. } | UnifiedStreamEvent::Complete { .. } => {}
            }
        }

        // The queue closed: the producer has finished one way or another
        let response = match producer.await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                return fail(&ctx, &out, FailureKind::Generation, e.to_string()).await;
            }
            Err(e) => {
                return fail(
                    &ctx,
                    &out,
                    FailureKind::Generation,
                    format!("Provider task failed: {}", e),
                )
                .await;
            }
        };

        if ctx.cancel.is_cancelled() {
            return cancelled(&ctx, &out, true);
        }
        if out.is_closed() {
            return cancelled(&ctx, &out, false);
        }

        if extractor.buffer().trim().is_empty() {
            return fail(
                &ctx,
                &out,
                FailureKind::Generation,
                "Provider returned no content".to_string(),
            )
            .await;
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        let (content, sections, insights) = extractor.into_parts();
        let new_report = NewReport {
            thread_id: ctx.thread_id.clone(),
            html_content: content.clone(),
            sections: sections.clone(),
            insights: insights.clone(),
            metadata: metadata(&ctx, &response, duration_ms),
        };

        let report = match ctx.store.create_report(new_report).await {
            Ok(report) => report,
            Err(e) => {
                return fail(&ctx, &out, FailureKind::Persistence, e.to_string()).await;
            }
        };

        tracing::info!(
            thread_id = %ctx.thread_id,
            generation_id = %ctx.generation_id,
            report_id = %report.id,
            version = report.version,
            duration_ms,
            sections = sections.len(),
            insights = insights.len(),
            "Report generation completed"
        );

        let complete = ReportStreamEvent::Complete {
            report_id: report.id.clone(),
            duration: duration_ms,
            content,
            sections,
            insights,
        };
        // The report is stored whether or not the client is still listening
        if out.send(complete).await.is_err() {
            tracing::debug!(
                generation_id = %ctx.generation_id,
                "Client left before completion was delivered"
            );
        }

        GenerationOutcome::Completed {
            report_id: report.id,
        }
    }
}

fn spawn_producer(
    ctx: &GenerationContext,
    chunk_tx: mpsc::Sender<UnifiedStreamEvent>,
) -> JoinHandle<LlmResult<LlmResponse>> {
    let provider = ctx.provider.clone();
    let messages = ctx.messages.clone();
    let system = ctx.system.clone();
    tokio::spawn(async move { provider.stream_message(messages, system, chunk_tx).await })
}

/// Send one event, giving up if the generation is cancelled meanwhile.
async fn relay(
    out: &mpsc::Sender<ReportStreamEvent>,
    cancel: &CancellationToken,
    event: ReportStreamEvent,
) -> Relay {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Relay::Cancelled,
        sent = out.send(event) => match sent {
            Ok(()) => Relay::Sent,
            Err(_) => Relay::Closed,
        },
    }
}

fn cancelled(
    ctx: &GenerationContext,
    out: &mpsc::Sender<ReportStreamEvent>,
    acknowledge: bool,
) -> GenerationOutcome {
    tracing::info!(
        thread_id = %ctx.thread_id,
        generation_id = %ctx.generation_id,
        explicit = acknowledge,
        "Report generation cancelled"
    );
    if acknowledge {
        // Best effort: a full or closed channel drops the acknowledgement
        let _ = out.try_send(ReportStreamEvent::Cancelled);
    }
    GenerationOutcome::Cancelled
}

async fn fail(
    ctx: &GenerationContext,
    out: &mpsc::Sender<ReportStreamEvent>,
    kind: FailureKind,
    error: String,
) -> GenerationOutcome {
    tracing::warn!(
        thread_id = %ctx.thread_id,
        generation_id = %ctx.generation_id,
        kind = ?kind,
        error = %error,
        "Report generation failed"
    );

    let event = ReportStreamEvent::Error {
        error: error.clone(),
        kind,
    };
    if let Relay::Cancelled = relay(out, &ctx.cancel, event).await {
        return cancelled(ctx, out, true);
    }

    match kind {
        FailureKind::Generation => GenerationOutcome::Failed { error },
        FailureKind::Persistence => GenerationOutcome::PersistenceFailed { error },
    }
}

fn metadata(ctx: &GenerationContext, response: &LlmResponse, duration_ms: u64) -> ReportMetadata {
    let UsageStats {
        input_tokens,
        output_tokens,
    } = response.usage;
    ReportMetadata {
        model: ctx.provider.model().to_string(),
        provider: ctx.provider.name().to_string(),
        prompt: ctx.prompt.clone(),
        duration_ms,
        input_tokens: (input_tokens > 0).then_some(input_tokens),
        output_tokens: (output_tokens > 0).then_some(output_tokens),
    }
}
