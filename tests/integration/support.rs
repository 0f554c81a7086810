//! Test Support
//!
//! Scripted LLM provider and database helpers shared by the integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use assetworks::models::report::{NewReport, ReportMetadata};
use assetworks::storage::Database;
use assetworks_core::UnifiedStreamEvent;
use assetworks_llm::{
    LlmError, LlmProvider, LlmResponse, LlmResult, Message, ProviderConfig, StopReason,
    UsageStats,
};

/// What the scripted provider does after its chunks are sent
#[derive(Clone)]
pub enum Ending {
    /// Return successfully
    Finish,
    /// Return the given error
    Fail(LlmError),
    /// Go quiet for a while, then return successfully
    Delay(Duration),
    /// Never return (until aborted)
    Hang,
}

/// Provider that streams a fixed list of text chunks.
pub struct ScriptedProvider {
    chunks: Vec<String>,
    ending: Ending,
    sent: Arc<AtomicUsize>,
    config: ProviderConfig,
}

impl ScriptedProvider {
    pub fn new(chunks: &[&str]) -> Self {
        Self {
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            ending: Ending::Finish,
            sent: Arc::new(AtomicUsize::new(0)),
            config: ProviderConfig::default(),
        }
    }

    pub fn ending(mut self, ending: Ending) -> Self {
        self.ending = ending;
        self
    }

    /// Count chunks as the consumer accepts them.
    pub fn counting(mut self, sent: Arc<AtomicUsize>) -> Self {
        self.sent = sent;
        self
    }

    pub fn shared(self) -> Arc<dyn LlmProvider> {
        Arc::new(self)
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn stream_message(
        &self,
        _messages: Vec<Message>,
        _system: Option<String>,
        tx: mpsc::Sender<UnifiedStreamEvent>,
    ) -> LlmResult<LlmResponse> {
        for chunk in &self.chunks {
            tx.send(UnifiedStreamEvent::TextDelta {
                content: chunk.clone(),
            })
            .await
            .map_err(|_| LlmError::Cancelled)?;
            self.sent.fetch_add(1, Ordering::SeqCst);
        }

        match &self.ending {
            Ending::Finish => {}
            Ending::Fail(err) => return Err(err.clone()),
            Ending::Delay(pause) => tokio::time::sleep(*pause).await,
            Ending::Hang => std::future::pending::<()>().await,
        }

        let usage = UsageStats {
            input_tokens: 100,
            output_tokens: self.chunks.len() as u32,
        };
        let _ = tx
            .send(UnifiedStreamEvent::Usage {
                input_tokens: usage.input_tokens,
                output_tokens: usage.output_tokens,
            })
            .await;
        Ok(LlmResponse {
            content: Some(self.chunks.concat()),
            stop_reason: StopReason::EndTurn,
            usage,
            model: "scripted-model".to_string(),
        })
    }

    async fn health_check(&self) -> LlmResult<()> {
        Ok(())
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

/// A report with two sections, an insight and some tickers, split into chunks.
pub const REPORT_CHUNKS: &[&str] = &[
    "<h1>Semiconductor Outlook</h1>",
    r#"<div data-section-id="section_metric_1"><h3>Revenue</h3>"#,
    "<p>NVIDIA Corporation (NASDAQ: NVDA) grew revenue 94%.</p></d",
    r#"iv><div data-section-id="section_chart_1"><h3>Margins</h3>"#,
    r#"<div class="insight">Critical: supply concentration in $TSM</div>"#,
    "</div>",
];

pub fn test_db() -> Database {
    Database::new_in_memory().expect("Failed to create in-memory test database")
}

pub fn new_report(thread_id: &str, html: &str) -> NewReport {
    NewReport {
        thread_id: thread_id.to_string(),
        html_content: html.to_string(),
        sections: assetworks::services::report::extract_sections(html),
        insights: assetworks::services::report::extract_insights(html),
        metadata: ReportMetadata {
            model: "scripted-model".to_string(),
            provider: "scripted".to_string(),
            prompt: "Analyze".to_string(),
            duration_ms: 5,
            input_tokens: None,
            output_tokens: None,
        },
    }
}
