// =============================================================================
// Aurora Indicator Feed — Main Entry Point
// =============================================================================
//
// Streams a technical-indicator analysis of one instrument's trailing candle
// window to every connected WebSocket subscriber, on a fixed cadence and
// immediately on connect.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod analyzer;
mod api;
mod app_state;
mod broadcast;
mod indicators;
mod market_data;
mod runtime_config;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::broadcast::{BroadcastScheduler, SubscriberRegistry};
use crate::market_data::{BinanceKlineSource, MarketDataSource};
use crate::runtime_config::RuntimeConfig;

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
    info!("║        Aurora Indicator Feed — Starting Up               ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let config_path =
        std::env::var("FEED_CONFIG").unwrap_or_else(|_| "feed_config.json".to_string());
    let mut config = RuntimeConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });
    config.apply_env_overrides()?;
    config.validate().context("invalid feed configuration")?;

    info!(
        symbol = %config.symbol,
        kline_interval = %config.kline_interval,
        lookback_minutes = config.lookback_minutes,
        interval_ms = config.broadcast_interval_ms,
        "Feed configured"
    );

    // ── 2. Market data source ────────────────────────────────────────────
    let source: Arc<dyn MarketDataSource> = Arc::new(BinanceKlineSource::new(
        &config.symbol,
        &config.kline_interval,
        &config.binance_base_url,
    )?);
    info!(source = %source.describe(), "Market data source ready");

    // ── 3. Registry & scheduler ──────────────────────────────────────────
    let registry = Arc::new(SubscriberRegistry::new());
    let scheduler = Arc::new(BroadcastScheduler::new(
        source,
        registry.clone(),
        config.broadcast_interval(),
        config.lookback_minutes,
    ));
    scheduler.start();

    let state = Arc::new(AppState::new(config.clone(), scheduler.clone()));

    // ── 4. Subscriber WebSocket server ───────────────────────────────────
    let tls = match config.tls_paths() {
        Some((cert, key)) => Some(api::tls::load_tls_acceptor(cert, key)?),
        None => {
            warn!("TLS disabled — subscribers connect over plain ws://");
            None
        }
    };
    let scheme = if tls.is_some() { "wss" } else { "ws" };

    let ws_listener = tokio::net::TcpListener::bind(&config.ws_bind_addr)
        .await
        .with_context(|| format!("failed to bind WebSocket server on {}", config.ws_bind_addr))?;
    info!(addr = %config.ws_bind_addr, scheme, "WebSocket server listening");
    let ws_task = tokio::spawn(api::ws::run_ws_server(ws_listener, tls, scheduler.clone()));

    // ── 5. Status API ────────────────────────────────────────────────────
    let http_task = if config.http_enabled() {
        let listener = tokio::net::TcpListener::bind(&config.http_bind_addr)
            .await
            .with_context(|| format!("failed to bind status API on {}", config.http_bind_addr))?;
        info!(addr = %config.http_bind_addr, "Status API listening");
        let app = api::rest::router(state.clone());
        Some(tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!(error = %e, "Status API failed");
            }
        }))
    } else {
        None
    };

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 6. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received — stopping gracefully");

    scheduler.stop();
    ws_task.abort();
    if let Some(task) = http_task {
        task.abort();
    }

    info!(
        subscribers = registry.len(),
        publishes = state.scheduler.status().count,
        "Aurora Indicator Feed shut down complete."
    );
    Ok(())
}
