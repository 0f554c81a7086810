//! Report Service
//!
//! Entry point for starting and cancelling report generations. Resolves the
//! provider, registers the generation, records the user's prompt, builds the
//! conversation context and spawns the pipeline.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use assetworks_core::ReportStreamEvent;
use assetworks_llm::{create_provider, LlmProvider, LlmResult, Message, ProviderConfig};

use super::persistence::{ReportStore, SqliteReportStore};
use super::pipeline::{GenerationContext, ReportPipeline};
use super::prompt::resolve_system_prompt;
use super::registry::GenerationRegistry;
use crate::models::settings::AppConfig;
use crate::models::thread::{ThreadMessage, ThreadRole};
use crate::storage::Database;
use crate::utils::error::{AppError, AppResult};

/// Builds a provider for a generation.
pub type ProviderFactory =
    Arc<dyn Fn(ProviderConfig) -> LlmResult<Arc<dyn LlmProvider>> + Send + Sync>;

/// Request body for starting a generation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateReportRequest {
    pub prompt: String,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// Replaces the configured or built-in system prompt for this request
    #[serde(default)]
    pub system_prompt: Option<String>,
}

#[derive(Clone)]
pub struct ReportService {
    db: Database,
    config: Arc<AppConfig>,
    registry: GenerationRegistry,
    provider_factory: ProviderFactory,
    store: Arc<dyn ReportStore>,
}

impl ReportService {
    /// Service using the real providers and the SQLite store.
    pub fn new(db: Database, config: Arc<AppConfig>, registry: GenerationRegistry) -> Self {
        let store = Arc::new(SqliteReportStore::new(db.clone()));
        Self {
            db,
            config,
            registry,
            provider_factory: Arc::new(create_provider),
            store,
        }
    }

    pub fn with_provider_factory(mut self, factory: ProviderFactory) -> Self {
        self.provider_factory = factory;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn ReportStore>) -> Self {
        self.store = store;
        self
    }

    pub fn registry(&self) -> &GenerationRegistry {
        &self.registry
    }

    /// Start generating a new report version for `thread_id`.
    ///
    /// Everything that can be rejected up front (unknown thread, bad provider
    /// override, generation already running) fails here with an error; once
    /// the receiver is returned, failures arrive as stream events.
    pub async fn start_generation(
        &self,
        thread_id: &str,
        request: GenerateReportRequest,
    ) -> AppResult<mpsc::Receiver<ReportStreamEvent>> {
        let prompt = request.prompt.trim().to_string();
        if prompt.is_empty() {
            return Err(AppError::validation("Prompt cannot be empty"));
        }

        let id = thread_id.to_string();
        if self.db.run_blocking(move |db| db.get_thread(&id)).await?.is_none() {
            return Err(AppError::not_found(format!("Thread not found: {}", thread_id)));
        }

        let provider_config = self
            .config
            .provider_config(request.provider.as_deref(), request.model.as_deref())?;
        let provider = (self.provider_factory)(provider_config)?;

        let guard = self.registry.register(thread_id)?;

        // Early returns below drop the guard, which releases the thread
        let id = thread_id.to_string();
        let content = prompt.clone();
        let history_limit = self.config.history_limit.max(1);
        let history = self
            .db
            .run_blocking(move |db| {
                db.insert_message(&id, ThreadRole::User, &content, None)?;
                db.list_messages(&id, Some(history_limit))
            })
            .await?;

        let system = resolve_system_prompt(
            request.system_prompt.as_deref(),
            self.config.system_prompt.as_deref(),
        );

        let capacity = self.config.stream_buffer.max(1);
        let ctx = GenerationContext {
            thread_id: thread_id.to_string(),
            generation_id: guard.generation_id().to_string(),
            prompt,
            messages: conversation(&history),
            system: Some(system),
            provider,
            store: self.store.clone(),
            cancel: guard.token(),
            chunk_capacity: capacity,
        };

        let (tx, rx) = mpsc::channel(capacity);
        tokio::spawn(async move {
            let outcome = ReportPipeline::run(ctx, tx.clone()).await;
            tracing::debug!(
                thread_id = %guard.thread_id(),
                generation_id = %guard.generation_id(),
                outcome = ?outcome,
                "Generation finished"
            );
            // Release the thread before the client sees the stream end
            drop(guard);
            drop(tx);
        });

        Ok(rx)
    }

    /// Cancel the running generation of a thread.
    pub fn cancel_generation(&self, thread_id: &str) -> AppResult<()> {
        if self.registry.cancel(thread_id) {
            Ok(())
        } else {
            Err(AppError::not_found(format!(
                "No generation running for thread {}",
                thread_id
            )))
        }
    }
}

/// Convert stored thread messages into provider messages.
///
/// Providers expect the conversation to start with a user turn, so leading
/// assistant messages cut off by the history limit are dropped.
fn conversation(history: &[ThreadMessage]) -> Vec<Message> {
    history
        .iter()
        .skip_while(|m| m.role == ThreadRole::Assistant)
        .map(|m| match m.role {
            ThreadRole::User => Message::user(m.content.clone()),
            ThreadRole::Assistant => Message::assistant(m.content.clone()),
        })
        .collect()
}
