//! Application state
//!
//! Shared state passed to all API handlers.

use crate::observability::metrics::MetricsState;
use crate::supervisor::Supervisor;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub supervisor: Arc<Supervisor>,
    /// Prometheus handle; `None` when the recorder failed to install.
    pub metrics_state: Option<MetricsState>,
}
