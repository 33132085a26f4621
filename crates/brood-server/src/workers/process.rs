//! OS-process worker spawner
//!
//! Thin glue for running worker binaries as child processes. Each replica
//! is launched from a command template with its descriptor passed through
//! the environment. The control channel that would carry the
//! [`RequestHandler`](super::RequestHandler) surface to the child is
//! transport-specific and lives outside this crate; this spawner only
//! manages process lifetime.

use super::{RequestHandler, WorkerDescriptor, WorkerHandle, WorkerSpawner};
use anyhow::Context;
use async_trait::async_trait;
use brood_api::status::ProfileRequest;
use brood_api::telemetry::MetricSnapshot;
use std::sync::Arc;
use tokio::process::{Child, Command};
use tracing::info;

/// Spawner that launches one OS process per replica.
pub struct ProcessSpawner {
    command: String,
    args: Vec<String>,
}

impl ProcessSpawner {
    pub fn new(command: String, args: Vec<String>) -> Self {
        ProcessSpawner { command, args }
    }
}

impl WorkerSpawner for ProcessSpawner {
    fn spawn(
        &self,
        descriptor: WorkerDescriptor,
        _handler: Arc<dyn RequestHandler>,
    ) -> anyhow::Result<Arc<dyn WorkerHandle>> {
        let colocate = serde_json::to_string(&descriptor.colocate)
            .context("serializing colocate stanza")?;
        let child = Command::new(&self.command)
            .args(&self.args)
            .env("BROOD_APP", &descriptor.app)
            .env("BROOD_DEPLOYMENT_ID", &descriptor.deployment_id)
            .env("BROOD_GROUP", &descriptor.group)
            .env("BROOD_GROUP_ID", &descriptor.group_id)
            .env("BROOD_WORKER_ID", &descriptor.worker_id)
            .env("BROOD_COLOCATE", colocate)
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("spawning worker process {:?}", self.command))?;

        info!(
            target: "brood::workers",
            group = %descriptor.group,
            worker_id = %descriptor.worker_id,
            pid = child.id().unwrap_or(0),
            "Worker process spawned"
        );

        Ok(Arc::new(ProcessWorker {
            descriptor,
            child: tokio::sync::Mutex::new(child),
        }))
    }
}

struct ProcessWorker {
    descriptor: WorkerDescriptor,
    child: tokio::sync::Mutex<Child>,
}

#[async_trait]
impl WorkerHandle for ProcessWorker {
    async fn run(&self) -> anyhow::Result<()> {
        let status = self
            .child
            .lock()
            .await
            .wait()
            .await
            .with_context(|| format!("waiting on worker {}", self.descriptor.worker_id))?;
        if status.success() {
            Ok(())
        } else {
            anyhow::bail!(
                "worker {} exited with {status}",
                self.descriptor.worker_id
            )
        }
    }

    async fn read_metrics(&self) -> anyhow::Result<Vec<MetricSnapshot>> {
        // Needs the worker control channel, which this spawner does not
        // carry.
        Ok(Vec::new())
    }

    async fn run_profiling(&self, _req: ProfileRequest) -> anyhow::Result<Vec<u8>> {
        anyhow::bail!(
            "profiling worker {} requires a control-channel transport",
            self.descriptor.worker_id
        )
    }
}
