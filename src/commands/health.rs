//! Health Check Commands
//!
//! Endpoint for checking the health status of backend services.

use axum::extract::State;
use axum::Json;

use crate::models::response::{CommandResponse, HealthResponse};
use crate::state::AppState;

/// GET /health
pub async fn get_health(State(state): State<AppState>) -> Json<CommandResponse<HealthResponse>> {
    let mut health = HealthResponse::default();

    health.database = state
        .database()
        .run_blocking(|db| Ok(db.is_healthy()))
        .await
        .unwrap_or(false);
    health.active_generations = state.registry().active_count();

    health.status = if health.database {
        "healthy".to_string()
    } else {
        "degraded".to_string()
    };

    Json(CommandResponse::ok(health))
}
