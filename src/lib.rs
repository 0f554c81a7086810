//! AssetWorks - Report Streaming Backend Library
//!
//! This library provides the backend for streaming AI-generated financial
//! reports. It includes:
//! - HTTP command handlers (axum) and the router
//! - Report generation services (extraction, relay pipeline, persistence)
//! - Storage layer (SQLite, Config)
//! - Data models and utilities

pub mod commands;
pub mod models;
pub mod server;
pub mod services;
pub mod state;
pub mod storage;
pub mod utils;

pub use models::response::*;
pub use models::settings::AppConfig;
pub use server::{create_router, start_server};
pub use state::AppState;
pub use utils::error::{AppError, AppResult};
