//! Report Pipeline Integration Tests
//!
//! Runs whole generations against an in-memory SQLite store:
//! - completed generations persist before `complete` is relayed
//! - provider failures relay `error` and never persist
//! - explicit cancellation and client disconnects stop the generation
//! - a client that stops reading suspends the provider
//! - the report service wires registry, history and pipeline together

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use assetworks::models::report::{NewReport, Report};
use assetworks::models::settings::AppConfig;
use assetworks::models::thread::ThreadRole;
use assetworks::services::report::{
    GenerateReportRequest, GenerationContext, GenerationOutcome, GenerationRegistry,
    ReportPipeline, ReportService, ReportStore, SqliteReportStore,
};
use assetworks::storage::Database;
use assetworks::utils::error::{AppError, AppResult};
use assetworks_core::{FailureKind, ReportStreamEvent};
use assetworks_llm::{LlmError, LlmProvider, LlmResult, Message, ProviderConfig};

use crate::support::{test_db, Ending, ScriptedProvider, REPORT_CHUNKS};

// ============================================================================
// Helpers
// ============================================================================

/// Store that counts calls and delegates to SQLite (or fails).
struct CountingStore {
    inner: SqliteReportStore,
    calls: AtomicUsize,
    fail: bool,
}

impl CountingStore {
    fn new(db: &Database, fail: bool) -> Arc<Self> {
        Arc::new(Self {
            inner: SqliteReportStore::new(db.clone()),
            calls: AtomicUsize::new(0),
            fail,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReportStore for CountingStore {
    async fn create_report(&self, report: NewReport) -> AppResult<Report> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AppError::database("database is locked"));
        }
        self.inner.create_report(report).await
    }
}

fn context(
    thread_id: &str,
    provider: Arc<dyn LlmProvider>,
    store: Arc<dyn ReportStore>,
) -> GenerationContext {
    GenerationContext {
        thread_id: thread_id.to_string(),
        generation_id: uuid::Uuid::new_v4().to_string(),
        prompt: "Semiconductor outlook".to_string(),
        messages: vec![Message::user("Semiconductor outlook")],
        system: None,
        provider,
        store,
        cancel: CancellationToken::new(),
        chunk_capacity: 2,
    }
}

async fn drain(mut rx: mpsc::Receiver<ReportStreamEvent>) -> Vec<ReportStreamEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

fn content_of(events: &[ReportStreamEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            ReportStreamEvent::Content { content } => Some(content.as_str()),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Pipeline
// ============================================================================

#[tokio::test]
async fn test_completed_generation_persists_report() {
    let db = test_db();
    let thread = db.create_thread(Some("Chips")).unwrap();
    let store = CountingStore::new(&db, false);
    let (tx, rx) = mpsc::channel(4);

    let outcome = ReportPipeline::run(
        context(&thread.id, ScriptedProvider::new(REPORT_CHUNKS).shared(), store.clone()),
        tx,
    )
    .await;
    let events = drain(rx).await;

    let GenerationOutcome::Completed { report_id } = outcome else {
        panic!("Expected completion");
    };
    assert_eq!(store.calls(), 1);

    // Chunks are relayed verbatim and in order
    assert_eq!(content_of(&events), REPORT_CHUNKS.concat());

    let complete = events.last().unwrap();
    let ReportStreamEvent::Complete {
        report_id: relayed_id,
        content,
        sections,
        insights,
        ..
    } = complete
    else {
        panic!("Expected complete last, got {:?}", complete);
    };
    assert_eq!(relayed_id, &report_id);
    assert_eq!(content, &REPORT_CHUNKS.concat());
    assert_eq!(sections.len(), 2);
    assert_eq!(insights.len(), 1);

    // The report is readable by the time `complete` is observed
    let report = db.get_report(&report_id).unwrap().unwrap();
    assert_eq!(report.version, 1);
    assert_eq!(report.sections, *sections);
    assert_eq!(report.metadata.provider, "scripted");
    assert_eq!(report.metadata.input_tokens, Some(100));

    let thread = db.get_thread(&thread.id).unwrap().unwrap();
    assert_eq!(thread.current_report_id.as_deref(), Some(report_id.as_str()));
    assert_eq!(thread.report_history, vec![report_id.clone()]);

    let entities = db.list_thread_entities(&thread.id).unwrap();
    let names: Vec<_> = entities.iter().map(|e| e.name.as_str()).collect();
    assert!(names.contains(&"NVDA"));
    assert!(names.contains(&"TSM"));
}

#[tokio::test]
async fn test_incremental_events_precede_complete() {
    let db = test_db();
    let thread = db.create_thread(None).unwrap();
    let (tx, rx) = mpsc::channel(64);

    ReportPipeline::run(
        context(
            &thread.id,
            ScriptedProvider::new(REPORT_CHUNKS).shared(),
            Arc::new(SqliteReportStore::new(db.clone())),
        ),
        tx,
    )
    .await;
    let events = drain(rx).await;

    let types: Vec<_> = events.iter().map(|e| e.event_type()).collect();
    let sections_at = types.iter().position(|t| *t == "sections").unwrap();
    let insights_at = types.iter().position(|t| *t == "insights").unwrap();
    assert!(sections_at < insights_at);
    assert_eq!(types.last(), Some(&"complete"));
    assert_eq!(types.iter().filter(|t| **t == "complete").count(), 1);
    // The two sections close in different chunks
    assert_eq!(types.iter().filter(|t| **t == "sections").count(), 2);
}

#[tokio::test]
async fn test_error_mid_stream_never_persists() {
    let db = test_db();
    let thread = db.create_thread(None).unwrap();
    let store = CountingStore::new(&db, false);
    let provider = ScriptedProvider::new(&REPORT_CHUNKS[..3])
        .ending(Ending::Fail(LlmError::RateLimited {
            message: "slow down".to_string(),
            retry_after: Some(30),
        }))
        .shared();
    let (tx, rx) = mpsc::channel(16);

    let outcome = ReportPipeline::run(context(&thread.id, provider, store.clone()), tx).await;
    let events = drain(rx).await;

    assert!(matches!(outcome, GenerationOutcome::Failed { .. }));
    assert_eq!(store.calls(), 0);
    assert!(!events
        .iter()
        .any(|e| matches!(e, ReportStreamEvent::Complete { .. })));
    assert!(matches!(
        events.last(),
        Some(ReportStreamEvent::Error {
            kind: FailureKind::Generation,
            ..
        })
    ));
    assert!(db.list_reports(&thread.id).unwrap().is_empty());
}

#[tokio::test]
async fn test_persistence_failure_keeps_previous_report() {
    let db = test_db();
    let thread = db.create_thread(None).unwrap();
    let (tx, rx) = mpsc::channel(64);
    let outcome = ReportPipeline::run(
        context(
            &thread.id,
            ScriptedProvider::new(&["<p>v1</p>"]).shared(),
            Arc::new(SqliteReportStore::new(db.clone())),
        ),
        tx,
    )
    .await;
    drain(rx).await;
    let GenerationOutcome::Completed { report_id: first } = outcome else {
        panic!("first generation should complete");
    };

    let store = CountingStore::new(&db, true);
    let (tx, rx) = mpsc::channel(64);
    let outcome = ReportPipeline::run(
        context(&thread.id, ScriptedProvider::new(&["<p>v2</p>"]).shared(), store),
        tx,
    )
    .await;
    let events = drain(rx).await;

    assert!(matches!(outcome, GenerationOutcome::PersistenceFailed { .. }));
    assert!(matches!(
        events.last(),
        Some(ReportStreamEvent::Error {
            kind: FailureKind::Persistence,
            ..
        })
    ));
    let thread = db.get_thread(&thread.id).unwrap().unwrap();
    assert_eq!(thread.current_report_id, Some(first));
}

#[tokio::test]
async fn test_explicit_cancel_stops_generation() {
    let db = test_db();
    let thread = db.create_thread(None).unwrap();
    let store = CountingStore::new(&db, false);
    let provider = ScriptedProvider::new(&["<div>partial "])
        .ending(Ending::Hang)
        .shared();
    let ctx = context(&thread.id, provider, store.clone());
    let cancel = ctx.cancel.clone();
    let (tx, mut rx) = mpsc::channel(16);

    let handle = tokio::spawn(ReportPipeline::run(ctx, tx));

    let first = rx.recv().await.unwrap();
    assert_eq!(
        first,
        ReportStreamEvent::Content {
            content: "<div>partial ".to_string()
        }
    );
    cancel.cancel();

    let outcome = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("pipeline should stop after cancellation")
        .unwrap();
    assert_eq!(outcome, GenerationOutcome::Cancelled);
    assert_eq!(rx.recv().await, Some(ReportStreamEvent::Cancelled));
    assert_eq!(rx.recv().await, None);
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_client_disconnect_cancels() {
    let db = test_db();
    let thread = db.create_thread(None).unwrap();
    let store = CountingStore::new(&db, false);
    let provider = ScriptedProvider::new(REPORT_CHUNKS).shared();
    let (tx, mut rx) = mpsc::channel(1);

    let handle = tokio::spawn(ReportPipeline::run(
        context(&thread.id, provider, store.clone()),
        tx,
    ));
    rx.recv().await.unwrap();
    drop(rx);

    let outcome = handle.await.unwrap();
    assert_eq!(outcome, GenerationOutcome::Cancelled);
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_client_leaving_during_provider_pause_is_not_persisted() {
    let db = test_db();
    let thread = db.create_thread(None).unwrap();
    let store = CountingStore::new(&db, false);
    let provider = ScriptedProvider::new(&["<p>report body</p>"])
        .ending(Ending::Delay(Duration::from_millis(300)))
        .shared();
    let (tx, mut rx) = mpsc::channel(16);

    let handle = tokio::spawn(ReportPipeline::run(
        context(&thread.id, provider, store.clone()),
        tx,
    ));
    assert!(matches!(
        rx.recv().await,
        Some(ReportStreamEvent::Content { .. })
    ));
    drop(rx);

    let outcome = handle.await.unwrap();
    assert_eq!(outcome, GenerationOutcome::Cancelled);
    // Give a straggling write time to show up
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(store.calls(), 0);
    assert!(db.list_reports(&thread.id).unwrap().is_empty());
}

#[tokio::test]
async fn test_client_leaving_hung_provider_stops_promptly() {
    let db = test_db();
    let thread = db.create_thread(None).unwrap();
    let store = CountingStore::new(&db, false);
    let provider = ScriptedProvider::new(&["<div>partial "])
        .ending(Ending::Hang)
        .shared();
    let (tx, mut rx) = mpsc::channel(16);

    let handle = tokio::spawn(ReportPipeline::run(
        context(&thread.id, provider, store.clone()),
        tx,
    ));
    rx.recv().await.unwrap();
    drop(rx);

    let outcome = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("pipeline should stop once the client is gone")
        .unwrap();
    assert_eq!(outcome, GenerationOutcome::Cancelled);
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_slow_client_suspends_provider() {
    let db = test_db();
    let thread = db.create_thread(None).unwrap();
    let store = CountingStore::new(&db, false);
    let chunks: Vec<String> = (0..40).map(|i| format!("<p>row {}</p>", i)).collect();
    let chunk_refs: Vec<&str> = chunks.iter().map(String::as_str).collect();
    let sent = Arc::new(AtomicUsize::new(0));
    let provider = ScriptedProvider::new(&chunk_refs)
        .counting(sent.clone())
        .shared();
    let ctx = context(&thread.id, provider, store.clone());
    let chunk_capacity = ctx.chunk_capacity;
    let (tx, rx) = mpsc::channel(1);

    let handle = tokio::spawn(ReportPipeline::run(ctx, tx));

    // Nobody reads: one event sits in the relay channel, one chunk is in
    // hand, the queue is full and the provider's next send waits
    tokio::time::sleep(Duration::from_millis(200)).await;
    let stalled_at = sent.load(Ordering::SeqCst);
    assert!(
        stalled_at <= chunk_capacity + 2,
        "provider ran ahead of a stalled client: {} chunks accepted",
        stalled_at
    );
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(sent.load(Ordering::SeqCst), stalled_at);
    assert!(!handle.is_finished());

    let events = drain(rx).await;
    let outcome = handle.await.unwrap();
    assert!(matches!(outcome, GenerationOutcome::Completed { .. }));
    assert_eq!(sent.load(Ordering::SeqCst), chunks.len());
    assert_eq!(content_of(&events), chunks.concat());
    assert_eq!(events.last().map(|e| e.event_type()), Some("complete"));
    assert_eq!(store.calls(), 1);
}

// ============================================================================
// Report service
// ============================================================================

fn service(db: &Database, provider: fn() -> ScriptedProvider) -> ReportService {
    ReportService::new(
        db.clone(),
        Arc::new(AppConfig::default()),
        GenerationRegistry::new(),
    )
    .with_provider_factory(Arc::new(
        move |_config: ProviderConfig| -> LlmResult<Arc<dyn LlmProvider>> {
            Ok(provider().shared())
        },
    ))
}

fn request(prompt: &str) -> GenerateReportRequest {
    GenerateReportRequest {
        prompt: prompt.to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_service_versions_reports_and_records_messages() {
    let db = test_db();
    let thread = db.create_thread(None).unwrap();
    let service = service(&db, || ScriptedProvider::new(REPORT_CHUNKS));

    for prompt in ["Semiconductor outlook", "Add a risk section"] {
        let rx = service
            .start_generation(&thread.id, request(prompt))
            .await
            .unwrap();
        let events = drain(rx).await;
        assert_eq!(events.last().map(|e| e.event_type()), Some("complete"));
    }

    let reports = db.list_reports(&thread.id).unwrap();
    let versions: Vec<_> = reports.iter().map(|r| r.version).collect();
    assert_eq!(versions, vec![2, 1]);
    assert_eq!(reports[0].metadata.prompt, "Add a risk section");

    let messages = db.list_messages(&thread.id, None).unwrap();
    let roles: Vec<_> = messages.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![
            ThreadRole::User,
            ThreadRole::Assistant,
            ThreadRole::User,
            ThreadRole::Assistant
        ]
    );
    assert_eq!(messages[1].report_id.as_deref(), Some(reports[1].id.as_str()));

    // Registration is released before the stream closes
    assert!(!service.registry().is_active(&thread.id));
}

#[tokio::test]
async fn test_service_rejects_concurrent_generation() {
    let db = test_db();
    let thread = db.create_thread(None).unwrap();
    let service = service(&db, || {
        ScriptedProvider::new(&["<p>working</p>"]).ending(Ending::Hang)
    });

    let mut rx = service
        .start_generation(&thread.id, request("first"))
        .await
        .unwrap();
    rx.recv().await.unwrap();

    let err = service
        .start_generation(&thread.id, request("second"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    service.cancel_generation(&thread.id).unwrap();
    assert_eq!(rx.recv().await, Some(ReportStreamEvent::Cancelled));

    // Only the first prompt was recorded
    let messages = db.list_messages(&thread.id, None).unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "first");
}

#[tokio::test]
async fn test_cancel_without_generation_is_not_found() {
    let db = test_db();
    let service = service(&db, || ScriptedProvider::new(&[]));
    let err = service.cancel_generation("idle-thread").unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_service_releases_thread_when_client_leaves() {
    let db = test_db();
    let thread = db.create_thread(None).unwrap();
    let service = service(&db, || {
        ScriptedProvider::new(&["<p>working</p>"]).ending(Ending::Hang)
    });

    let mut rx = service
        .start_generation(&thread.id, request("first"))
        .await
        .unwrap();
    rx.recv().await.unwrap();
    drop(rx);

    tokio::time::timeout(Duration::from_secs(5), async {
        while service.registry().is_active(&thread.id) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("thread should be released after the client leaves");

    // A new request is accepted instead of conflicting with the abandoned one
    let rx = service
        .start_generation(&thread.id, request("second"))
        .await
        .unwrap();
    drop(rx);
    assert!(db.list_reports(&thread.id).unwrap().is_empty());
}
