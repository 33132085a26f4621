//! Per-worker request handler
//!
//! Each spawned worker gets its own handler pairing the supervisor with
//! the worker's colocation group. Handlers are ephemeral views; the
//! supervisor owns the groups, so no ownership cycle exists.

use super::{Poll, Supervisor};
use crate::error::Result;
use crate::workers::RequestHandler;
use async_trait::async_trait;
use brood_api::messages::{
    ComponentsToStart, ExportListenerReply, ExportListenerRequest, GetAddressReply,
    GetAddressRequest, GetComponentsToStartRequest, GetRoutingInfoRequest,
    RegisterReplicaRequest, StartComponentRequest,
};
use brood_api::routing::RoutingInfo;
use brood_api::telemetry::{LoadReport, LogEntry, TraceSpan};
use std::sync::Arc;

/// The request surface handed to one worker.
pub struct WorkerRequestHandler {
    supervisor: Arc<Supervisor>,
    group: Arc<super::Group>,
}

impl WorkerRequestHandler {
    pub fn new(supervisor: Arc<Supervisor>, group: Arc<super::Group>) -> Self {
        WorkerRequestHandler { supervisor, group }
    }
}

#[async_trait]
impl RequestHandler for WorkerRequestHandler {
    async fn start_component(&self, req: StartComponentRequest) -> Result<()> {
        self.supervisor.start_component(&req)
    }

    async fn register_replica(&self, req: RegisterReplicaRequest) -> Result<()> {
        self.supervisor.register_replica(&req)
    }

    /// Long-poll the started-component set of this worker's group.
    async fn get_components_to_start(
        &self,
        req: GetComponentsToStartRequest,
    ) -> Result<ComponentsToStart> {
        match self
            .supervisor
            .poll_cell(&self.group.components, &req.version)
            .await?
        {
            Poll::Changed(snap) => Ok(ComponentsToStart {
                version: snap.version,
                components: snap.value.into_iter().collect(),
                unchanged: false,
            }),
            Poll::Unchanged => Ok(ComponentsToStart {
                version: req.version,
                components: Vec::new(),
                unchanged: true,
            }),
        }
    }

    async fn get_routing_info(&self, req: GetRoutingInfoRequest) -> Result<RoutingInfo> {
        self.supervisor.get_routing_info(&req).await
    }

    async fn get_address(&self, req: GetAddressRequest) -> Result<GetAddressReply> {
        Ok(self.supervisor.get_address(&req))
    }

    async fn export_listener(&self, req: ExportListenerRequest) -> Result<ExportListenerReply> {
        self.supervisor.export_listener(&req)
    }

    async fn report_load(&self, report: LoadReport) -> Result<()> {
        self.supervisor.report_load(&report);
        Ok(())
    }

    async fn recv_log_entry(&self, entry: LogEntry) {
        self.supervisor.recv_log_entry(entry);
    }

    async fn recv_trace_spans(&self, spans: Vec<TraceSpan>) -> Result<()> {
        self.supervisor.recv_trace_spans(spans)
    }
}
