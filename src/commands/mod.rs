//! HTTP Commands
//!
//! axum handlers for every endpoint. Handlers translate between HTTP and the
//! services; all JSON bodies use the `CommandResponse` envelope.

pub mod health;
pub mod reports;
pub mod threads;

use axum::http::StatusCode;
use axum::Json;

use crate::models::response::CommandResponse;
use crate::utils::error::{AppError, AppResult};

pub use health::*;
pub use reports::*;
pub use threads::*;

/// Status code plus enveloped JSON body
pub type CommandResult<T> = (StatusCode, Json<CommandResponse<T>>);

/// Render a service result as an HTTP response
pub fn respond<T>(result: AppResult<T>) -> CommandResult<T> {
    match result {
        Ok(data) => (StatusCode::OK, Json(CommandResponse::ok(data))),
        Err(e) => error_response(e),
    }
}

/// Render an error with the status code it maps to
pub fn error_response<T>(err: AppError) -> CommandResult<T> {
    let status = err.status_code();
    if status.is_server_error() {
        tracing::error!(error = %err, "Request failed");
    } else {
        tracing::debug!(error = %err, status = status.as_u16(), "Request rejected");
    }
    (status, Json(CommandResponse::err(err.to_string())))
}

/// Turn a missing row into `AppError::NotFound`
pub(crate) fn required<T>(value: AppResult<Option<T>>, what: &str, id: &str) -> AppResult<T> {
    value?.ok_or_else(|| AppError::not_found(format!("{} not found: {}", what, id)))
}
