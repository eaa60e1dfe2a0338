//! HTTP route handlers for Helmsman.
//!
//! Thin ops surface over the registry, dispatcher, and prober. Device
//! resource schemas and the full management API/UI live outside this crate.

use axum::{
    Router,
    http::StatusCode,
    routing::{get, post},
};

use armada_common::FleetError;

use crate::state::AppState;

mod health;
mod nodes;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health & status
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/cluster/health", get(health::cluster_health))
        .route("/cluster/probe", post(health::trigger_probe))
        // Node registry administration
        .nest("/nodes", nodes::routes())
        // Request tracing
        .layer(
            tower::ServiceBuilder::new().layer(tower_http::trace::TraceLayer::new_for_http()),
        )
        // Add shared state
        .with_state(state)
}

/// Map a fleet error onto its HTTP status
pub(crate) fn error_status(err: &FleetError) -> StatusCode {
    StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}
