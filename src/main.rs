// =============================================================================
// Signal Desk — Main Entry Point
// =============================================================================
//
// HTTP front for Kraken market data with a rolling z-score mean-reversion
// signal, plus minimal account signup / login with bearer tokens.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod auth;
mod config;
mod exchange;
mod indicators;
mod market_data;
mod signals;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::config::ServiceConfig;
use crate::exchange::KrakenClient;

const DEFAULT_CONFIG_PATH: &str = "signal_desk.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        Signal Desk — Starting Up                         ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let config_path =
        std::env::var("SIGNAL_DESK_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = ServiceConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(path = %config_path, error = %e, "Failed to load config, using defaults");
        ServiceConfig::default()
    });
    config.apply_env_overrides();
    config.validate().context("invalid service configuration")?;

    info!(
        exchange = %config.gateway.base_url,
        window = config.analysis.window,
        long_below = config.analysis.long_below,
        short_above = config.analysis.short_above,
        max_inflight = config.gateway.max_inflight,
        "Configuration ready"
    );

    // ── 2. Exchange client & shared state ────────────────────────────────
    let kraken = Arc::new(
        KrakenClient::new(config.gateway.base_url.clone())
            .context("failed to build exchange client")?,
    );
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config, kraken));

    // ── 3. Serve ─────────────────────────────────────────────────────────
    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server failed")?;

    info!("Signal Desk stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C; shutting down");
        return;
    }
    info!("Shutdown signal received, draining connections");
}
