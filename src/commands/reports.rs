//! Report Commands
//!
//! Endpoints for generating, reading and sharing reports.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures_util::stream::Stream;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

use super::{error_response, required, respond, CommandResult};
use crate::models::report::{Report, ReportShare};
use crate::services::report::GenerateReportRequest;
use crate::state::AppState;

/// Interval between SSE keep-alive comments
const KEEP_ALIVE_SECS: u64 = 15;

/// POST /api/threads/{id}/reports/stream
///
/// Starts a generation and streams its events as SSE `data:` frames. Dropping
/// the response closes the relay channel, which cancels the generation.
pub async fn stream_report(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
    Json(request): Json<GenerateReportRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, CommandResult<()>> {
    let rx = state
        .reports()
        .start_generation(&thread_id, request)
        .await
        .map_err(error_response)?;

    let events = ReceiverStream::new(rx).map(|event| {
        let frame = match Event::default().json_data(&event) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode stream event");
                Event::default().data(r#"{"type":"error","error":"encoding failed","kind":"generation"}"#)
            }
        };
        Ok(frame)
    });

    Ok(Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(KEEP_ALIVE_SECS))
            .text("keep-alive"),
    ))
}

/// POST /api/threads/{id}/generation/cancel
pub async fn cancel_generation(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
) -> CommandResult<bool> {
    respond(state.reports().cancel_generation(&thread_id).map(|_| true))
}

/// GET /api/reports/{id}
pub async fn get_report(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
) -> CommandResult<Report> {
    respond(
        state
            .database()
            .run_blocking(move |db| required(db.get_report(&report_id), "Report", &report_id))
            .await,
    )
}

/// POST /api/reports/{id}/share
pub async fn create_share(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
) -> CommandResult<ReportShare> {
    respond(
        state
            .database()
            .run_blocking(move |db| db.create_share(&report_id))
            .await,
    )
}

/// DELETE /api/reports/{id}/share
///
/// Returns the number of revoked tokens.
pub async fn revoke_share(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
) -> CommandResult<usize> {
    let result = state
        .database()
        .run_blocking(move |db| {
            required(db.get_report(&report_id), "Report", &report_id)?;
            db.revoke_shares(&report_id)
        })
        .await;
    respond(result)
}

/// GET /api/shared/{token}
pub async fn get_shared_report(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> CommandResult<Report> {
    respond(
        state
            .database()
            .run_blocking(move |db| {
                required(db.get_shared_report(&token), "Shared report", &token)
            })
            .await,
    )
}
