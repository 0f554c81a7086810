//! Thread Commands
//!
//! Endpoints for threads, their messages, report history and entities.

use axum::extract::{Path, State};
use axum::Json;

use super::{required, respond, CommandResult};
use crate::models::report::ReportSummary;
use crate::models::thread::{CreateThreadRequest, Thread, ThreadEntity, ThreadMessage};
use crate::state::AppState;
use crate::storage::Database;
use crate::utils::error::AppResult;

/// POST /api/threads
pub async fn create_thread(
    State(state): State<AppState>,
    Json(request): Json<CreateThreadRequest>,
) -> CommandResult<Thread> {
    let result = state
        .database()
        .run_blocking(move |db| db.create_thread(request.title.as_deref()))
        .await;
    if let Ok(thread) = &result {
        tracing::info!(thread_id = %thread.id, "Thread created");
    }
    respond(result)
}

/// GET /api/threads
pub async fn list_threads(State(state): State<AppState>) -> CommandResult<Vec<Thread>> {
    respond(state.database().run_blocking(|db| db.list_threads()).await)
}

/// GET /api/threads/{id}
pub async fn get_thread(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
) -> CommandResult<Thread> {
    respond(
        state
            .database()
            .run_blocking(move |db| required(db.get_thread(&thread_id), "Thread", &thread_id))
            .await,
    )
}

/// GET /api/threads/{id}/messages
pub async fn list_messages(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
) -> CommandResult<Vec<ThreadMessage>> {
    respond(with_thread(&state, thread_id, |db, id| db.list_messages(id, None)).await)
}

/// GET /api/threads/{id}/reports
pub async fn list_reports(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
) -> CommandResult<Vec<ReportSummary>> {
    respond(
        with_thread(&state, thread_id, |db, id| {
            let reports = db.list_reports(id)?;
            Ok(reports.iter().map(ReportSummary::from).collect())
        })
        .await,
    )
}

/// GET /api/threads/{id}/entities
pub async fn list_entities(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
) -> CommandResult<Vec<ThreadEntity>> {
    respond(with_thread(&state, thread_id, |db, id| db.list_thread_entities(id)).await)
}

/// Run `f` only when the thread exists, so unknown ids give 404 instead of
/// an empty list.
async fn with_thread<T, F>(state: &AppState, thread_id: String, f: F) -> AppResult<T>
where
    F: FnOnce(&Database, &str) -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    state
        .database()
        .run_blocking(move |db| {
            required(db.get_thread(&thread_id), "Thread", &thread_id)?;
            f(db, &thread_id)
        })
        .await
}
