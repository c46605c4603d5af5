// =============================================================================
// NIFTY OI Analyzer - Main Entry Point
// =============================================================================
//
// Polls the NSE index option chain on a fixed cadence, derives OI sentiment
// indicators, and serves the latest snapshot over a read-only JSON API.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod analyzer;
mod api;
mod app_state;
mod nse;
mod runtime_config;
mod scheduler;
mod snapshot;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::ApiState;
use crate::app_state::SharedState;
use crate::nse::NseClient;
use crate::runtime_config::AnalyzerConfig;
use crate::scheduler::Scheduler;

const CONFIG_PATH: &str = "analyzer_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("NIFTY OI Analyzer starting up");

    let mut config = AnalyzerConfig::load(CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AnalyzerConfig::default()
    });
    config.apply_env_overrides();

    info!(
        symbol = %config.symbol,
        base_url = %config.base_url,
        poll_interval_secs = config.poll_interval().as_secs(),
        "Configuration resolved"
    );

    // ── 2. Shared state & data source ────────────────────────────────────
    let state = Arc::new(SharedState::new());
    let client = NseClient::new(
        config.base_url.clone(),
        config.symbol.clone(),
        config.request_timeout(),
    )?;
    info!(symbol = client.symbol(), "NSE client ready");

    // ── 3. Polling scheduler ─────────────────────────────────────────────
    let scheduler = Scheduler::new(state.clone(), Arc::new(client));
    scheduler.start(config.poll_interval());

    // ── 4. Read API ──────────────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "API server listening");

    let app = api::rest::router(ApiState {
        shared: state.clone(),
        phase: scheduler.phase_handle(),
    });
    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "API server failed");
        }
    });

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 5. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received - stopping gracefully");

    scheduler.stop(config.stop_timeout()).await;
    server.abort();

    info!("NIFTY OI Analyzer shut down complete.");
    Ok(())
}
