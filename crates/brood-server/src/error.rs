//! Supervisor error model
//!
//! One enum covering every error class the supervisor can surface.
//! Synchronous request errors travel back to the calling worker; background
//! failures travel through the completion channel. The core never retries;
//! the request surface is idempotent, so callers can.

use brood_api::DeploymentError;
use thiserror::Error;

/// Top-level supervisor error.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The deployment manifest is malformed. Surfaced at construction,
    /// before any worker is launched.
    #[error("invalid deployment: {0}")]
    Config(#[from] DeploymentError),

    /// A proxy listener could not be bound. Address-in-use is handled as a
    /// soft failure inside the export-listener reply and never reaches this
    /// variant.
    #[error("binding proxy listener on {addr}: {source}")]
    ListenerBind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Spawning a worker replica failed.
    #[error("launching worker for group {group:?}: {message}")]
    WorkerLaunch { group: String, message: String },

    /// A running worker exited with an error. Forwarded once to the
    /// completion channel; the supervisor does not restart it.
    #[error("worker in group {group:?} failed: {message}")]
    WorkerRuntime { group: String, message: String },

    /// A long poll or background task observed supervisor shutdown.
    #[error("cancelled by supervisor shutdown")]
    Cancelled,

    /// A log or trace sink rejected a payload. Logged, never fatal.
    #[error("telemetry sink: {message}")]
    Sink { message: String },
}

impl SupervisorError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SupervisorError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, SupervisorError>;
