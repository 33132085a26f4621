//! Health check endpoint
//!
//! Liveness probe for the supervisor process.

use super::state::AppState;
use axum::extract::State;

/// Liveness probe endpoint.
#[tracing::instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> String {
    format!(
        "OK {} ({})",
        state.supervisor.deployment().app.name,
        crate::version::full_version()
    )
}
