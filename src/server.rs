//! HTTP server startup and routing

use std::net::SocketAddr;

use anyhow::Result;
use axum::routing::{get, post};
use axum::{serve, Router};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::commands::{health, reports, threads};
use crate::state::AppState;

/// Create the application router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::get_health))
        // Threads
        .route(
            "/api/threads",
            post(threads::create_thread).get(threads::list_threads),
        )
        .route("/api/threads/{id}", get(threads::get_thread))
        .route("/api/threads/{id}/messages", get(threads::list_messages))
        .route("/api/threads/{id}/reports", get(threads::list_reports))
        .route("/api/threads/{id}/entities", get(threads::list_entities))
        // Generation
        .route(
            "/api/threads/{id}/reports/stream",
            post(reports::stream_report),
        )
        .route(
            "/api/threads/{id}/generation/cancel",
            post(reports::cancel_generation),
        )
        // Reports and sharing
        .route("/api/reports/{id}", get(reports::get_report))
        .route(
            "/api/reports/{id}/share",
            post(reports::create_share).delete(reports::revoke_share),
        )
        .route("/api/shared/{token}", get(reports::get_shared_report))
        .with_state(state)
}

/// Bind `addr` and serve until ctrl-c
pub async fn start_server(state: AppState, addr: SocketAddr) -> Result<()> {
    let registry = state.registry().clone();
    let app = create_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "AssetWorks server listening");

    serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                return;
            }
            tracing::info!(
                active = registry.active_count(),
                "Shutting down, cancelling running generations"
            );
            registry.cancel_all();
        })
        .await?;

    tracing::info!("Server shutdown gracefully");
    Ok(())
}
