//! Brood Server - Local Deployment Supervisor
//!
//! Reads a deployment manifest, supervises the deployment's worker fleet,
//! and serves the status API until the first fatal worker error or Ctrl-C.
//!
//! Environment variables:
//! - `DEPLOYMENT_FILE` - path to the JSON deployment manifest (required)
//! - `WORKER_COMMAND` - worker binary launched for each replica (required)
//! - `BROOD_*` - see [`brood_server::config::SupervisorConfig`]

use anyhow::Context;
use brood_api::messages::StartComponentRequest;
use brood_api::Deployment;
use brood_server::api::{self, AppState};
use brood_server::config::SupervisorConfig;
use brood_server::observability;
use brood_server::sinks::{JsonFileTraceSink, NullTraceSink, TraceSink};
use brood_server::supervisor::Supervisor;
use brood_server::workers::process::ProcessSpawner;
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::tracing::init_tracing();
    info!("Starting {}", brood_server::version::full_version());

    let config = SupervisorConfig::from_env();

    // Load and parse the deployment manifest.
    let manifest_path = std::env::var("DEPLOYMENT_FILE")
        .context("DEPLOYMENT_FILE must name the deployment manifest")?;
    let manifest = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("reading deployment manifest {manifest_path:?}"))?;
    let deployment: Deployment = serde_json::from_str(&manifest)
        .with_context(|| format!("parsing deployment manifest {manifest_path:?}"))?;
    info!(
        app = %deployment.app.name,
        deployment_id = %deployment.id,
        components = deployment.app.components.len(),
        "Deployment manifest loaded"
    );

    let metrics_state = match observability::metrics::init_metrics() {
        Ok(state) => Some(state),
        Err(e) => {
            warn!(error = %e, "Metrics recorder failed to install; /metrics disabled");
            None
        }
    };

    let worker_command =
        std::env::var("WORKER_COMMAND").context("WORKER_COMMAND must name the worker binary")?;
    let spawner = Arc::new(ProcessSpawner::new(worker_command, Vec::new()));

    let trace_sink: Arc<dyn TraceSink> = match &config.trace_path {
        Some(path) => Arc::new(
            JsonFileTraceSink::create(path)
                .with_context(|| format!("opening trace sink {path:?}"))?,
        ),
        None => Arc::new(NullTraceSink),
    };

    let (supervisor, mut done) = Supervisor::new(
        deployment,
        config.clone(),
        spawner,
        brood_server::sinks::tracing_log_sink(),
        trace_sink,
    )?;

    // Seed the root component; everything else is started on demand by
    // the workers themselves.
    let root = {
        let components = &supervisor.deployment().app.components;
        components
            .iter()
            .find(|c| *c == "main")
            .or_else(|| components.first())
            .cloned()
    };
    if let Some(component) = root {
        supervisor.start_component(&StartComponentRequest {
            component,
            routed: false,
        })?;
    }

    // Serve the status API.
    let listener = tokio::net::TcpListener::bind(&config.status_addr)
        .await
        .with_context(|| format!("binding status API on {}", config.status_addr))?;
    info!(address = %config.status_addr, "Status API listening");
    let router = api::create_router(AppState {
        supervisor: supervisor.clone(),
        metrics_state,
    });
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            error!(error = %e, "Status API server failed");
        }
    });

    tokio::select! {
        failure = done.recv() => {
            supervisor.shutdown();
            match failure {
                // A worker torn down by shutdown is not a deployment
                // failure.
                Some(e) if e.is_cancelled() => {
                    info!("Worker cancelled during shutdown");
                    Ok(())
                }
                Some(e) => {
                    error!(error = %e, "Deployment failed");
                    Err(e.into())
                }
                None => Ok(()),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            supervisor.shutdown();
            Ok(())
        }
    }
}
