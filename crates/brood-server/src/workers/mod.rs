//! Worker collaborators
//!
//! The supervisor does not know how worker processes are made. It talks to
//! them through two seams: a [`WorkerSpawner`] that turns a per-replica
//! descriptor into a [`WorkerHandle`], and a [`RequestHandler`] it hands to
//! every spawned worker so the worker can call back in.

pub mod process;
pub mod testing;

use crate::error::Result;
use async_trait::async_trait;
use brood_api::messages::{
    ComponentsToStart, ExportListenerReply, ExportListenerRequest, GetAddressReply,
    GetAddressRequest, GetComponentsToStartRequest, GetRoutingInfoRequest,
    RegisterReplicaRequest, StartComponentRequest,
};
use brood_api::routing::RoutingInfo;
use brood_api::status::ProfileRequest;
use brood_api::telemetry::{LoadReport, LogEntry, MetricSnapshot, TraceSpan};
use std::sync::Arc;

/// Launch descriptor for one worker replica.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerDescriptor {
    pub app: String,
    pub deployment_id: String,
    /// Colocation group the worker hosts.
    pub group: String,
    /// Unique id of the group within this deployment.
    pub group_id: String,
    /// Unique id of this replica.
    pub worker_id: String,
    /// The deployment's full colocate stanza, so the worker can resolve
    /// component placement locally.
    pub colocate: Vec<Vec<String>>,
}

/// The supervisor-side surface a worker calls into.
///
/// One handler is created per worker; it pairs the supervisor with the
/// worker's colocation group so group-scoped reads need no lookup.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn start_component(&self, req: StartComponentRequest) -> Result<()>;
    async fn register_replica(&self, req: RegisterReplicaRequest) -> Result<()>;
    async fn get_components_to_start(
        &self,
        req: GetComponentsToStartRequest,
    ) -> Result<ComponentsToStart>;
    async fn get_routing_info(&self, req: GetRoutingInfoRequest) -> Result<RoutingInfo>;
    async fn get_address(&self, req: GetAddressRequest) -> Result<GetAddressReply>;
    async fn export_listener(&self, req: ExportListenerRequest) -> Result<ExportListenerReply>;
    async fn report_load(&self, report: LoadReport) -> Result<()>;
    async fn recv_log_entry(&self, entry: LogEntry);
    async fn recv_trace_spans(&self, spans: Vec<TraceSpan>) -> Result<()>;
}

/// A handle on one running worker replica.
#[async_trait]
pub trait WorkerHandle: Send + Sync {
    /// Drive the worker until it exits. Returns `Err` when the worker
    /// failed; the supervising task forwards that to the completion
    /// channel.
    async fn run(&self) -> anyhow::Result<()>;

    /// Read the worker's current metric snapshots.
    async fn read_metrics(&self) -> anyhow::Result<Vec<MetricSnapshot>>;

    /// Capture a profile from the worker.
    async fn run_profiling(&self, req: ProfileRequest) -> anyhow::Result<Vec<u8>>;
}

/// Factory for worker replicas.
pub trait WorkerSpawner: Send + Sync {
    /// Create (but do not drive) a worker. The caller is responsible for
    /// driving [`WorkerHandle::run`] on its own task.
    fn spawn(
        &self,
        descriptor: WorkerDescriptor,
        handler: Arc<dyn RequestHandler>,
    ) -> anyhow::Result<Arc<dyn WorkerHandle>>;
}
