// =============================================================================
// Status API — Axum 0.7
// =============================================================================
//
// Read-only HTTP surface next to the subscriber socket:
//   GET /api/v1/health       liveness, subscriber list, last publish summary
//   GET /api/v1/analysis     one on-demand analysis pass, same payload a
//                            subscriber receives (array or `{ error }`)
//
// CORS is configured permissively so browser dashboards can poll it.
// =============================================================================

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use crate::app_state::AppState;
use crate::broadcast::registry::SubscriberInfo;
use crate::broadcast::PublishStatus;

// =============================================================================
// Router construction
// =============================================================================

/// Build the status router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/analysis", get(analysis))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    symbol: String,
    server_time: i64,
    uptime_secs: i64,
    scheduler_running: bool,
    subscribers: Vec<SubscriberInfo>,
    publish: PublishStatus,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        symbol: state.config.symbol.clone(),
        server_time: chrono::Utc::now().timestamp_millis(),
        uptime_secs: state.uptime_secs(),
        scheduler_running: state.scheduler.is_running(),
        subscribers: state.registry.describe(),
        publish: state.scheduler.status(),
    })
}

// =============================================================================
// On-demand analysis
// =============================================================================

async fn analysis(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.scheduler.build_payload().await)
}
