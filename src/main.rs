//! AssetWorks Server
//!
//! HTTP server that streams AI-generated financial reports and stores their
//! versions per conversation thread.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use assetworks::storage::{ConfigService, Database};
use assetworks::{start_server, AppState};

#[derive(Parser)]
#[command(name = "assetworks")]
#[command(about = "AssetWorks report streaming server")]
#[command(version)]
struct Args {
    /// Server bind address (overrides bind_address in the config file)
    #[arg(long, env = "ASSETWORKS_BIND")]
    bind: Option<SocketAddr>,

    /// Path to config.json (default: ~/.assetworks/config.json)
    #[arg(long, env = "ASSETWORKS_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins over the defaults
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if args.verbose {
            EnvFilter::new("assetworks=debug,assetworks_llm=debug,tower_http=debug,info")
        } else {
            EnvFilter::new("assetworks=info,tower_http=info,warn")
        }
    });
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config_service = match args.config {
        Some(path) => ConfigService::from_path(path),
        None => ConfigService::new(),
    }
    .context("Failed to load configuration")?;
    let config = config_service.get_config_clone();

    let database = match &config.database_path {
        Some(path) => Database::open(std::path::Path::new(path)),
        None => Database::new(),
    }
    .context("Failed to open database")?;

    let addr = match args.bind {
        Some(addr) => addr,
        None => config
            .bind_address
            .parse()
            .with_context(|| format!("Invalid bind_address: {}", config.bind_address))?,
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_service.path().display(),
        provider = %config.default_provider,
        model = %config.default_model,
        "Starting AssetWorks server"
    );

    let state = AppState::new(database, config);
    start_server(state, addr).await
}
