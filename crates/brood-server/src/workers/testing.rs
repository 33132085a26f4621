//! In-memory worker doubles for the test suite.

use super::{RequestHandler, WorkerDescriptor, WorkerHandle, WorkerSpawner};
use async_trait::async_trait;
use brood_api::status::ProfileRequest;
use brood_api::telemetry::MetricSnapshot;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

enum Outcome {
    Finish,
    Fail(String),
}

/// A worker that runs until told to finish or fail.
pub struct FakeWorker {
    pub descriptor: WorkerDescriptor,
    metrics: Mutex<Vec<MetricSnapshot>>,
    outcome: Mutex<Option<Outcome>>,
    signal: Notify,
}

impl FakeWorker {
    fn new(descriptor: WorkerDescriptor, metrics: Vec<MetricSnapshot>) -> Self {
        FakeWorker {
            descriptor,
            metrics: Mutex::new(metrics),
            outcome: Mutex::new(None),
            signal: Notify::new(),
        }
    }

    /// Make `run` return `Ok(())`.
    pub fn finish(&self) {
        *self.outcome.lock().unwrap() = Some(Outcome::Finish);
        self.signal.notify_one();
    }

    /// Make `run` return an error, as a crashed worker would.
    pub fn fail(&self, message: &str) {
        *self.outcome.lock().unwrap() = Some(Outcome::Fail(message.to_string()));
        self.signal.notify_one();
    }

    /// Replace the canned metric snapshots served by `read_metrics`.
    pub fn set_metrics(&self, metrics: Vec<MetricSnapshot>) {
        *self.metrics.lock().unwrap() = metrics;
    }
}

#[async_trait]
impl WorkerHandle for FakeWorker {
    async fn run(&self) -> anyhow::Result<()> {
        loop {
            self.signal.notified().await;
            match self.outcome.lock().unwrap().take() {
                Some(Outcome::Finish) => return Ok(()),
                Some(Outcome::Fail(message)) => return Err(anyhow::anyhow!(message)),
                None => {}
            }
        }
    }

    async fn read_metrics(&self) -> anyhow::Result<Vec<MetricSnapshot>> {
        Ok(self.metrics.lock().unwrap().clone())
    }

    async fn run_profiling(&self, _req: ProfileRequest) -> anyhow::Result<Vec<u8>> {
        Ok(format!("profile:{}", self.descriptor.worker_id).into_bytes())
    }
}

/// Spawner that records every launch and hands out [`FakeWorker`]s.
#[derive(Default)]
pub struct RecordingSpawner {
    launched: Mutex<Vec<WorkerDescriptor>>,
    workers: Mutex<Vec<Arc<FakeWorker>>>,
    handlers: Mutex<Vec<Arc<dyn RequestHandler>>>,
    canned_metrics: Mutex<Vec<MetricSnapshot>>,
    fail_next: AtomicBool,
}

impl RecordingSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metric snapshots every subsequently spawned worker will serve.
    pub fn with_metrics(metrics: Vec<MetricSnapshot>) -> Self {
        let spawner = Self::default();
        *spawner.canned_metrics.lock().unwrap() = metrics;
        spawner
    }

    /// Make the next `spawn` call fail.
    pub fn fail_next_launch(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn launched(&self) -> Vec<WorkerDescriptor> {
        self.launched.lock().unwrap().clone()
    }

    pub fn workers(&self) -> Vec<Arc<FakeWorker>> {
        self.workers.lock().unwrap().clone()
    }

    pub fn handlers(&self) -> Vec<Arc<dyn RequestHandler>> {
        self.handlers.lock().unwrap().clone()
    }
}

impl WorkerSpawner for RecordingSpawner {
    fn spawn(
        &self,
        descriptor: WorkerDescriptor,
        handler: Arc<dyn RequestHandler>,
    ) -> anyhow::Result<Arc<dyn WorkerHandle>> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            anyhow::bail!("injected launch failure");
        }
        let worker = Arc::new(FakeWorker::new(
            descriptor.clone(),
            self.canned_metrics.lock().unwrap().clone(),
        ));
        self.launched.lock().unwrap().push(descriptor);
        self.workers.lock().unwrap().push(worker.clone());
        self.handlers.lock().unwrap().push(handler);
        Ok(worker)
    }
}
