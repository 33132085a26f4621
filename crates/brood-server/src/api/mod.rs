//! Status HTTP API
//!
//! Read-only views over live supervisor state.
//!
//! This module contains:
//! - `state`: Shared application state
//! - `health`: Liveness probe
//! - `status`: Deployment status report and profiling
//! - `metrics`: Prometheus metrics endpoint

mod health;
mod metrics;
mod state;
mod status;

pub use state::AppState;

use axum::{
    routing::{get, post},
    Router,
};

/// Create the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/status", get(status::get_status))
        .route("/metrics", get(metrics::get_metrics))
        .route("/profile", post(status::run_profile))
        .with_state(state)
}
