//! Status and introspection report types
//!
//! Read-only views the supervisor assembles over its in-memory state,
//! served by the status HTTP API and by deployment tooling.

use crate::telemetry::MetricSnapshot;
use serde::{Deserialize, Serialize};

/// Windowed call statistics for one method.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodCallStats {
    pub num_calls: f64,
    pub avg_latency_ms: f64,
    pub recv_kb_per_sec: f64,
    pub sent_kb_per_sec: f64,
}

/// Per-method statistics over the trailing minute, hour, and all time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodStats {
    pub name: String,
    pub minute: MethodCallStats,
    pub hour: MethodCallStats,
    pub total: MethodCallStats,
}

/// One started component as seen by the supervisor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComponentStatus {
    pub name: String,
    /// Colocation group hosting the component.
    pub group: String,
    /// OS pids of the group's worker replicas.
    pub pids: Vec<i64>,
    #[serde(default)]
    pub methods: Vec<MethodStats>,
}

/// One exported listener.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerStatus {
    pub name: String,
    /// Bound address of the serving proxy.
    pub addr: String,
}

/// Full deployment status report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub app: String,
    pub deployment_id: String,
    /// Milliseconds since the Unix epoch at supervisor construction.
    pub submitted_at_ms: u64,
    pub components: Vec<ComponentStatus>,
    pub listeners: Vec<ListenerStatus>,
}

/// Flattened metric snapshots from the supervisor and every worker.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub metrics: Vec<MetricSnapshot>,
}

/// Kind of profile to capture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileType {
    Cpu,
    Heap,
}

/// Request to profile every worker in the deployment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRequest {
    pub profile_type: ProfileType,
    /// Sampling duration for CPU profiles.
    #[serde(default)]
    pub duration_ms: u64,
}

/// Profile captured from a single worker replica.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerProfile {
    /// Raw profile bytes, opaque to the supervisor.
    #[serde(default)]
    pub data: Vec<u8>,
    /// Set when this replica failed to produce a profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Profiles of one colocation group's replicas.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupProfile {
    pub group: String,
    pub profiles: Vec<WorkerProfile>,
}

/// Deployment-wide profile, grouped by colocation group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileReport {
    pub app: String,
    pub deployment_id: String,
    pub groups: Vec<GroupProfile>,
}
