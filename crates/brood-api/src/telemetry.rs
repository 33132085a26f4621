//! Telemetry payloads
//!
//! Log entries, trace spans, load reports, and metric snapshots flow from
//! workers to the supervisor, which forwards them to pluggable sinks.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Well-known metric names workers export for per-method call statistics.
///
/// The supervisor's stats tracker aggregates counters with these names,
/// keyed by their `component` and `method` labels.
pub mod metric_names {
    /// Counter: number of method calls served.
    pub const METHOD_COUNT: &str = "brood_method_count";
    /// Counter: cumulative method latency in milliseconds.
    pub const METHOD_LATENCY_MS: &str = "brood_method_latency_ms";
    /// Counter: bytes received by method handlers.
    pub const METHOD_BYTES_RECV: &str = "brood_method_bytes_received";
    /// Counter: bytes sent by method handlers.
    pub const METHOD_BYTES_SENT: &str = "brood_method_bytes_sent";
}

/// A log entry produced by a worker (or by the supervisor itself).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub app: String,
    pub deployment_id: String,
    pub component: String,
    /// Identifier of the emitting worker; empty for supervisor-origin logs.
    #[serde(default)]
    pub worker_id: String,
    pub level: String,
    pub msg: String,
    /// Microseconds since the Unix epoch, as stamped by the emitter.
    #[serde(default)]
    pub time_micros: i64,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
}

/// A completed trace span reported by a worker.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceSpan {
    pub name: String,
    pub trace_id: String,
    pub span_id: String,
    #[serde(default)]
    pub parent_span_id: String,
    pub start_micros: i64,
    pub end_micros: i64,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

/// Load observed by a replica, keyed by component.
///
/// Accepted and discarded today; the hook stays so a later revision can
/// feed an admission controller without a protocol change.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadReport {
    pub address: String,
    #[serde(default)]
    pub load: BTreeMap<String, f64>,
}

/// Kind of a metric snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

/// A flattened point-in-time metric reading.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub name: String,
    pub kind: MetricKind,
    #[serde(default)]
    pub help: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    pub value: f64,
}

impl MetricSnapshot {
    /// Convenience constructor for counter snapshots.
    pub fn counter(name: &str, labels: BTreeMap<String, String>, value: f64) -> Self {
        MetricSnapshot {
            name: name.to_string(),
            kind: MetricKind::Counter,
            help: String::new(),
            labels,
            value,
        }
    }
}
