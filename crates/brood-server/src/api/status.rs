//! Status and profiling endpoints

use super::state::AppState;
use axum::{extract::State, Json};
use brood_api::status::{ProfileReport, ProfileRequest, StatusReport};

/// GET /status - full deployment status report.
#[tracing::instrument(skip(state))]
pub async fn get_status(State(state): State<AppState>) -> Json<StatusReport> {
    Json(state.supervisor.status())
}

/// POST /profile - profile every worker and return the merged report.
#[tracing::instrument(skip(state))]
pub async fn run_profile(
    State(state): State<AppState>,
    Json(req): Json<ProfileRequest>,
) -> Json<ProfileReport> {
    Json(state.supervisor.profile(req).await)
}
