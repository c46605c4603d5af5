// =============================================================================
// REST API Endpoints - Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/` and are read-only:
//
//   GET /api/v1/health    liveness, publish counter, scheduler phase
//   GET /api/v1/snapshot  full snapshot including the strike table
//   GET /api/v1/summary   snapshot without the strike table
//
// CORS is configured permissively so a dashboard can be served from
// anywhere.
// =============================================================================

use axum::{
    extract::{Json, State},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use crate::api::ApiState;
use crate::snapshot::{AtmAnalysis, ChainSummary};
use crate::types::{MarketBias, SchedulerPhase};

// =============================================================================
// Router construction
// =============================================================================

/// Build the read API router with CORS middleware and shared state.
pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/snapshot", get(snapshot))
        .route("/api/v1/summary", get(summary))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    phase: SchedulerPhase,
    uptime_secs: u64,
    server_time: i64,
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        state_version: state.shared.current_state_version(),
        phase: state.phase.get(),
        uptime_secs: state.shared.start_time.elapsed().as_secs(),
        server_time: Utc::now().timestamp_millis(),
    })
}

// =============================================================================
// Snapshot
// =============================================================================

async fn snapshot(State(state): State<ApiState>) -> Response {
    let snap = state.shared.get();
    Json(&*snap).into_response()
}

// =============================================================================
// Summary (no strike table)
// =============================================================================

#[derive(Serialize)]
struct SummaryResponse<'a> {
    timestamp: Option<DateTime<Utc>>,
    market_bias: MarketBias,
    top_resistance: Option<f64>,
    top_support: Option<f64>,
    atm_analysis: Option<&'a AtmAnalysis>,
    summary: Option<&'a ChainSummary>,
    strike_count: usize,
    errors: &'a [String],
}

async fn summary(State(state): State<ApiState>) -> Response {
    let snap = state.shared.get();
    Json(SummaryResponse {
        timestamp: snap.timestamp,
        market_bias: snap.market_bias,
        top_resistance: snap.top_resistance,
        top_support: snap.top_support,
        atm_analysis: snap.atm_analysis.as_ref(),
        summary: snap.summary.as_ref(),
        strike_count: snap.strikes.len(),
        errors: &snap.errors,
    })
    .into_response()
}
