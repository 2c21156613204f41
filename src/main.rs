//! plantwatch - Predictive Maintenance Monitoring
//!
//! Alert pipeline server for industrial equipment monitoring.
//!
//! # Usage
//!
//! ```bash
//! # Run with defaults (data under ./data, listen on 0.0.0.0:8080)
//! cargo run --release
//!
//! # Custom bind address and data directory
//! cargo run --release -- --addr 127.0.0.1:9090 --data-dir /var/lib/plantwatch
//! ```
//!
//! # Environment Variables
//!
//! - `PLANTWATCH_CONFIG`: Path to a plantwatch.toml overriding defaults
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::info;

use plantwatch::api::{create_app, ApiState};
use plantwatch::background::Sweeper;
use plantwatch::{AlertPipeline, AlertStore, LifecycleManager, MetricsTracker, PlantConfig};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "plantwatch")]
#[command(about = "Predictive-maintenance alert pipeline server")]
#[command(version)]
struct CliArgs {
    /// Override the server bind address (default from config, "0.0.0.0:8080")
    #[arg(short, long)]
    addr: Option<String>,

    /// Directory for the alert store
    #[arg(long, default_value = "data")]
    data_dir: String,

    /// Wipe the alert store on startup.
    /// WARNING: This is destructive and cannot be undone!
    #[arg(long)]
    reset_db: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();
    let config = Arc::new(PlantConfig::load());

    let store_path = std::path::Path::new(&args.data_dir).join("plantwatch-db");
    if args.reset_db && store_path.exists() {
        info!(path = %store_path.display(), "RESET_DB requested — removing alert store");
        std::fs::remove_dir_all(&store_path).context("Failed to remove alert store")?;
    }
    let store = AlertStore::open(&store_path)
        .with_context(|| format!("Failed to open alert store at {}", store_path.display()))?;

    let metrics = Arc::new(Mutex::new(MetricsTracker::new()));
    let pipeline = Arc::new(AlertPipeline::new(config.clone(), store.clone(), metrics));
    let lifecycle = Arc::new(LifecycleManager::new(config.clone(), store));

    // Background housekeeping
    let cancel = CancellationToken::new();
    let sweeper = Sweeper::new(pipeline.clone(), lifecycle.clone());
    let sweeper_handle = tokio::spawn(sweeper.run(cancel.clone()));

    // HTTP server
    let addr = args.addr.unwrap_or_else(|| config.server.addr.clone());
    let app = create_app(ApiState { pipeline, lifecycle });
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(addr = %addr, "plantwatch listening");

    let shutdown_cancel = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
            shutdown_cancel.cancel();
        })
        .await
        .context("Server error")?;

    cancel.cancel();
    let _ = sweeper_handle.await;
    info!("plantwatch stopped");
    Ok(())
}
