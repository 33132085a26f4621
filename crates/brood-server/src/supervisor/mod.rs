//! Deployment supervisor
//!
//! The supervisor owns everything a single-machine deployment needs at
//! runtime: the colocation map, the group table, the proxy table, and the
//! background metrics collection task. Workers call in through a
//! per-worker [`WorkerRequestHandler`]; every request is served on its own
//! task and may touch a different group concurrently.
//!
//! Locking is layered to keep request handling deadlock-free:
//! supervisor table lock → group lock → routing cell → components cell.
//! No lock is ever held across a version wait; long polls resolve the cell
//! first, drop every outer lock, and only then suspend.

mod group;
mod handler;
mod status;

pub use group::{Group, GroupState};
pub use handler::WorkerRequestHandler;

use crate::config::SupervisorConfig;
use crate::error::{Result, SupervisorError};
use crate::observability::{metrics as obs, stats::StatsTracker};
use crate::proxy::Proxy;
use crate::routing;
use crate::shutdown::Shutdown;
use crate::sinks::{LogSink, TraceSink};
use crate::versioned::{Snapshot, Versioned};
use crate::workers::{RequestHandler, WorkerDescriptor, WorkerSpawner};
use brood_api::messages::{
    ExportListenerReply, ExportListenerRequest, GetAddressReply, GetAddressRequest,
    GetRoutingInfoRequest, RegisterReplicaRequest, StartComponentRequest,
};
use brood_api::routing::RoutingInfo;
use brood_api::telemetry::{LoadReport, LogEntry, MetricSnapshot, TraceSpan};
use brood_api::{Deployment, Version};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// How many worker replicas every colocation group runs.
pub const REPLICATION: usize = 2;

/// An exported listener and the proxy serving it.
#[derive(Clone)]
pub struct ProxyInfo {
    /// Listener name.
    pub listener: String,
    pub proxy: Arc<Proxy>,
    /// Dialable address of the proxy.
    pub addr: String,
}

struct Tables {
    groups: HashMap<String, Arc<Group>>,
    proxies: HashMap<String, ProxyInfo>,
}

/// Outcome of a bounded long-poll against a versioned cell.
enum Poll<T> {
    Changed(Snapshot<T>),
    Unchanged,
}

/// Manages one application deployment.
pub struct Supervisor {
    deployment: Deployment,
    config: SupervisorConfig,
    shutdown: Shutdown,
    started_at_ms: u64,
    log_sink: LogSink,
    trace_sink: Arc<dyn TraceSink>,
    spawner: Arc<dyn WorkerSpawner>,
    done_tx: mpsc::Sender<SupervisorError>,
    /// component → group name, for components named in a colocate stanza.
    /// Everything else forms a singleton group named after itself.
    colocation: HashMap<String, String>,
    /// Guards the group and proxy maps, not their contents.
    tables: Mutex<Tables>,
    stats: StatsTracker,
}

impl Supervisor {
    /// Validate the deployment and construct a supervisor for it.
    ///
    /// The returned receiver carries the first fatal error of every failed
    /// worker; the first one received is grounds for tearing the
    /// deployment down.
    pub fn new(
        deployment: Deployment,
        config: SupervisorConfig,
        spawner: Arc<dyn WorkerSpawner>,
        log_sink: LogSink,
        trace_sink: Arc<dyn TraceSink>,
    ) -> Result<(Arc<Supervisor>, mpsc::Receiver<SupervisorError>)> {
        deployment.validate()?;

        let mut colocation = HashMap::new();
        for stanza in &deployment.app.colocate {
            for component in stanza {
                colocation.insert(component.clone(), stanza[0].clone());
            }
        }

        // Capacity of at least one so a reporting task never blocks.
        let (done_tx, done_rx) = mpsc::channel(config.completion_capacity.max(1));

        let started_at_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let supervisor = Arc::new(Supervisor {
            deployment,
            config,
            shutdown: Shutdown::new(),
            started_at_ms,
            log_sink,
            trace_sink,
            spawner,
            done_tx,
            colocation,
            tables: Mutex::new(Tables {
                groups: HashMap::new(),
                proxies: HashMap::new(),
            }),
            stats: StatsTracker::new(),
        });

        tokio::spawn(supervisor.clone().collect_metrics_loop());

        info!(
            target: "brood::supervisor",
            app = %supervisor.deployment.app.name,
            deployment_id = %supervisor.deployment.id,
            "Supervisor started"
        );
        Ok((supervisor, done_rx))
    }

    pub fn deployment(&self) -> &Deployment {
        &self.deployment
    }

    /// Request deployment teardown. Wakes every long poll and background
    /// task.
    pub fn shutdown(&self) {
        self.shutdown.trigger();
    }

    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// The colocation group hosting `component`, created on first
    /// reference. Also resolves a group by its own name.
    fn group(&self, component: &str) -> Arc<Group> {
        let name = self
            .colocation
            .get(component)
            .cloned()
            .unwrap_or_else(|| component.to_string());

        let mut tables = self.lock_tables();
        tables
            .groups
            .entry(name.clone())
            .or_insert_with(|| {
                debug!(target: "brood::supervisor", group = %name, "Group created");
                Arc::new(Group::new(&name))
            })
            .clone()
    }

    fn all_groups(&self) -> Vec<Arc<Group>> {
        self.lock_tables().groups.values().cloned().collect()
    }

    fn all_proxies(&self) -> Vec<ProxyInfo> {
        self.lock_tables().proxies.values().cloned().collect()
    }

    fn lock_tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Ensure `component` is marked started in its group and the group's
    /// worker fleet is running. Idempotent.
    pub fn start_component(self: &Arc<Self>, req: &StartComponentRequest) -> Result<()> {
        let group = self.group(&req.component);
        let mut state = group.lock();

        if group
            .components
            .read(|set| set.contains(&req.component))
        {
            // Already started, or being started by a racing call that
            // holds nothing we need.
            return Ok(());
        }

        // Publish the routing info first: a worker that observes the
        // component in the started set must already be able to read its
        // routing.
        let replicas = state.sorted_addresses();
        let routing = state.routing(&req.component);
        routing.update(|info| {
            info.replicas = replicas.clone();
            if req.routed {
                let prev = info.assignment.take();
                info.assignment = Some(routing::plan(prev.as_ref(), replicas.clone()));
            }
        });
        obs::record_routing_update(&req.component);

        group.components.update(|set| {
            set.insert(req.component.clone());
        });
        obs::record_component_started(&group.name);
        info!(
            target: "brood::supervisor",
            component = %req.component,
            group = %group.name,
            routed = req.routed,
            "Component started"
        );

        self.launch_replicas(&group, &mut state)
    }

    /// Launch workers until the group is at full replication.
    ///
    /// Each worker's supervising task is detached; a fatal error is
    /// forwarded to the completion channel with a non-blocking send.
    fn launch_replicas(self: &Arc<Self>, group: &Arc<Group>, state: &mut GroupState) -> Result<()> {
        while state.workers.len() < REPLICATION {
            let descriptor = WorkerDescriptor {
                app: self.deployment.app.name.clone(),
                deployment_id: self.deployment.id.clone(),
                group: group.name.clone(),
                group_id: Uuid::new_v4().to_string(),
                worker_id: Uuid::new_v4().to_string(),
                colocate: self.deployment.app.colocate.clone(),
            };
            let handler: Arc<dyn RequestHandler> =
                Arc::new(WorkerRequestHandler::new(self.clone(), group.clone()));
            let worker = self.spawner.spawn(descriptor, handler).map_err(|e| {
                SupervisorError::WorkerLaunch {
                    group: group.name.clone(),
                    message: format!("{e:#}"),
                }
            })?;
            state.workers.push(worker.clone());

            let done = self.done_tx.clone();
            let shutdown = self.shutdown.clone();
            let group_name = group.name.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = shutdown.cancelled() => {}
                    result = worker.run() => {
                        if let Err(e) = result {
                            error!(
                                target: "brood::supervisor",
                                group = %group_name,
                                error = %e,
                                "Worker failed"
                            );
                            obs::record_worker_failure(&group_name);
                            let _ = done.try_send(SupervisorError::WorkerRuntime {
                                group: group_name,
                                message: format!("{e:#}"),
                            });
                        }
                    }
                }
            });
        }
        Ok(())
    }

    /// Record a newly-listening replica and fold its address into every
    /// existing routing in the group. Idempotent per address.
    pub fn register_replica(&self, req: &RegisterReplicaRequest) -> Result<()> {
        let group = self.group(&req.group);
        let mut state = group.lock();

        if !state.addresses.insert(req.address.clone()) {
            return Ok(());
        }
        state.pids.push(req.pid);
        obs::record_replica_registered(&group.name);
        info!(
            target: "brood::supervisor",
            group = %group.name,
            address = %req.address,
            pid = req.pid,
            "Replica registered"
        );

        let replicas = state.sorted_addresses();
        for cell in state.routings() {
            cell.update(|info| {
                info.replicas = replicas.clone();
                if info.assignment.is_some() {
                    let prev = info.assignment.take();
                    info.assignment = Some(routing::plan(prev.as_ref(), replicas.clone()));
                }
            });
        }
        Ok(())
    }

    /// Long-poll the routing info of `component`. Returns a snapshot copy;
    /// callers cannot reach supervisor state through it.
    pub async fn get_routing_info(&self, req: &GetRoutingInfoRequest) -> Result<RoutingInfo> {
        let group = self.group(&req.component);
        // Resolve the cell and drop the group lock before suspending.
        let routing = {
            let mut state = group.lock();
            state.routing(&req.component)
        };

        match self.poll_cell(&routing, &req.version).await? {
            Poll::Changed(snap) => {
                let mut info = snap.value;
                info.version = snap.version;
                info.unchanged = false;
                Ok(info)
            }
            Poll::Unchanged => Ok(RoutingInfo {
                version: req.version.clone(),
                unchanged: true,
                ..RoutingInfo::default()
            }),
        }
    }

    /// Wait for `cell` to move past `known`, bounded by the poll timeout
    /// and supervisor shutdown.
    async fn poll_cell<T: Clone>(&self, cell: &Versioned<T>, known: &Version) -> Result<Poll<T>> {
        tokio::select! {
            snap = cell.wait_newer(known) => Ok(Poll::Changed(snap)),
            _ = tokio::time::sleep(self.config.poll_timeout) => Ok(Poll::Unchanged),
            _ = self.shutdown.cancelled() => Err(SupervisorError::Cancelled),
        }
    }

    /// Expose a worker listener through a supervisor-owned proxy.
    ///
    /// Repeated exports of the same listener reuse the proxy and extend
    /// its backend set. An already-in-use local address is a soft failure
    /// carried in the reply so the worker can surface it.
    pub fn export_listener(&self, req: &ExportListenerRequest) -> Result<ExportListenerReply> {
        let mut tables = self.lock_tables();

        if let Some(existing) = tables.proxies.get(&req.listener.name) {
            existing.proxy.add_backend(&req.listener.addr);
            return Ok(ExportListenerReply {
                proxy_address: existing.addr.clone(),
                error: None,
            });
        }

        // Bind synchronously so the table lock is never held across an
        // await; registration into the runtime happens on the same call.
        let std_listener = match std::net::TcpListener::bind(&req.local_address) {
            Ok(l) => l,
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                return Ok(ExportListenerReply {
                    proxy_address: String::new(),
                    error: Some(e.to_string()),
                });
            }
            Err(e) => {
                return Err(SupervisorError::ListenerBind {
                    addr: req.local_address.clone(),
                    source: e,
                });
            }
        };
        let bind_error = |e: std::io::Error| SupervisorError::ListenerBind {
            addr: req.local_address.clone(),
            source: e,
        };
        std_listener.set_nonblocking(true).map_err(bind_error)?;
        let listener = tokio::net::TcpListener::from_std(std_listener).map_err(bind_error)?;
        let addr = listener.local_addr().map_err(bind_error)?.to_string();

        let proxy = Arc::new(Proxy::new(&req.listener.name));
        proxy.add_backend(&req.listener.addr);
        tables.proxies.insert(
            req.listener.name.clone(),
            ProxyInfo {
                listener: req.listener.name.clone(),
                proxy: proxy.clone(),
                addr: addr.clone(),
            },
        );
        info!(
            target: "brood::supervisor",
            listener = %req.listener.name,
            address = %addr,
            "Proxy listening"
        );
        tokio::spawn(proxy.serve(listener, self.shutdown.clone()));

        Ok(ExportListenerReply {
            proxy_address: addr,
            error: None,
        })
    }

    /// Which address a named listener should bind inside the worker. The
    /// local deployer always lets the OS pick.
    pub fn get_address(&self, _req: &GetAddressRequest) -> GetAddressReply {
        GetAddressReply {
            address: "localhost:0".to_string(),
        }
    }

    /// Accepted and discarded; the hook stays for a future admission
    /// controller.
    pub fn report_load(&self, report: &LoadReport) {
        debug!(
            target: "brood::supervisor",
            address = %report.address,
            components = report.load.len(),
            "Load report discarded"
        );
    }

    pub fn recv_log_entry(&self, entry: LogEntry) {
        (self.log_sink)(entry);
    }

    pub fn recv_trace_spans(&self, spans: Vec<TraceSpan>) -> Result<()> {
        self.trace_sink
            .store(&self.deployment.app.name, &self.deployment.id, &spans)
            .map_err(|e| {
                warn!(target: "brood::supervisor", error = %e, "Trace sink rejected spans");
                SupervisorError::Sink {
                    message: format!("{e:#}"),
                }
            })
    }

    /// Gather metric snapshots from every worker plus the supervisor's
    /// own. Worker handles are copied out under the group lock and read
    /// after it is released; a read can take arbitrarily long.
    pub async fn read_metrics(&self) -> Vec<MetricSnapshot> {
        let mut out = self.own_metrics();
        for group in self.all_groups() {
            let workers = group.lock().workers.clone();
            for worker in workers {
                match worker.read_metrics().await {
                    Ok(snapshots) => out.extend(snapshots),
                    Err(e) => debug!(
                        target: "brood::supervisor",
                        group = %group.name,
                        error = %e,
                        "Worker metrics read failed"
                    ),
                }
            }
        }
        out
    }

    fn own_metrics(&self) -> Vec<MetricSnapshot> {
        let (groups, workers, proxies) = self.counts();
        let labels: BTreeMap<String, String> = BTreeMap::from([
            ("app".to_string(), self.deployment.app.name.clone()),
            ("deployment_id".to_string(), self.deployment.id.clone()),
        ]);
        vec![
            MetricSnapshot {
                name: "brood_group_count".to_string(),
                kind: brood_api::telemetry::MetricKind::Gauge,
                help: "Number of colocation groups".to_string(),
                labels: labels.clone(),
                value: groups as f64,
            },
            MetricSnapshot {
                name: "brood_worker_count".to_string(),
                kind: brood_api::telemetry::MetricKind::Gauge,
                help: "Number of launched worker replicas".to_string(),
                labels: labels.clone(),
                value: workers as f64,
            },
            MetricSnapshot {
                name: "brood_proxy_count".to_string(),
                kind: brood_api::telemetry::MetricKind::Gauge,
                help: "Number of exported listener proxies".to_string(),
                labels,
                value: proxies as f64,
            },
        ]
    }

    fn counts(&self) -> (usize, usize, usize) {
        let groups = self.all_groups();
        let workers = groups.iter().map(|g| g.lock().workers.len()).sum();
        let proxies = self.lock_tables().proxies.len();
        (groups.len(), workers, proxies)
    }

    async fn collect_metrics_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.config.metrics_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => return,
                _ = interval.tick() => {}
            }
            let snapshots = self.read_metrics().await;
            self.stats.observe(&snapshots);
            let (groups, workers, proxies) = self.counts();
            obs::set_group_count(groups);
            obs::set_worker_count(workers);
            obs::set_proxy_count(proxies);
        }
    }
}
