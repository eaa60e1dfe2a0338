//! Health check and cluster status endpoints.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use armada_common::ClusterHealthSummary;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Basic health check (is the server running?)
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
pub struct ReadyResponse {
    status: &'static str,
    store: bool,
}

/// Readiness check (is the node store reachable?)
pub async fn ready_check(
    State(state): State<AppState>,
) -> Result<Json<ReadyResponse>, StatusCode> {
    if state.registry.ping().await {
        Ok(Json(ReadyResponse {
            status: "ready",
            store: true,
        }))
    } else {
        // Return 503 if not ready
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}

/// Cluster health as of the last completed probe cycle
pub async fn cluster_health(State(state): State<AppState>) -> Json<ClusterHealthSummary> {
    Json(state.prober.summary().await)
}

/// Run a probe cycle now and return the fresh summary
pub async fn trigger_probe(State(state): State<AppState>) -> Json<ClusterHealthSummary> {
    Json(state.prober.run_cycle().await)
}
