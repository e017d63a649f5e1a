//! Health check endpoints.
//!
//! # Endpoints
//!
//! - `GET /health` - Liveness probe (always 200 if server is up)
//! - `GET /health/ready` - Readiness probe (200 once the database answers)

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::state::ServerState;

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub uptime_secs: u64,
    /// Live streams open right now.
    pub stream_connections: usize,
    pub polls_created: u64,
    pub votes_accepted: u64,
    pub votes_rejected: u64,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
    pub reason: &'static str,
}

/// Liveness probe: `GET /health`
pub async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    let metrics = &state.metrics;

    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now(),
        uptime_secs: state.uptime_secs(),
        stream_connections: state.hub.total_connections(),
        polls_created: metrics.polls(),
        votes_accepted: metrics.accepted(),
        votes_rejected: metrics.rejected(),
    })
}

/// Readiness probe: `GET /health/ready`
///
/// 503 when the store cannot answer a trivial query.
pub async fn ready(State(state): State<ServerState>) -> (StatusCode, Json<ReadyResponse>) {
    match state.with_store(|store| store.poll_count()).await {
        Ok(_) => (
            StatusCode::OK,
            Json(ReadyResponse {
                ready: true,
                reason: "database reachable",
            }),
        ),
        Err(e) => {
            warn!(error = %e, "readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadyResponse {
                    ready: false,
                    reason: "database unavailable",
                }),
            )
        }
    }
}
