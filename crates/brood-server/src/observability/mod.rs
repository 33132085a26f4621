//! Observability
//!
//! Structured logging, Prometheus metrics, and per-method call statistics
//! for the supervisor.

pub mod metrics;
pub mod stats;
pub mod tracing;
