//! Status, metrics, and profile reports
//!
//! Read-only views assembled over live supervisor state, served by the
//! status HTTP API.

use super::Supervisor;
use brood_api::status::{
    ComponentStatus, GroupProfile, ListenerStatus, MetricsReport, ProfileReport, ProfileRequest,
    StatusReport, WorkerProfile,
};
use futures::future::join_all;

impl Supervisor {
    /// Report every started component and exported listener.
    pub fn status(&self) -> StatusReport {
        let stats = self.stats.method_stats();

        let mut components = Vec::new();
        for group in self.all_groups() {
            let started: Vec<String> = group.components.read(|set| set.iter().cloned().collect());
            let pids = group.lock().pids.clone();
            for name in started {
                let methods = stats.get(&name).cloned().unwrap_or_default();
                components.push(ComponentStatus {
                    name,
                    group: group.name.clone(),
                    pids: pids.clone(),
                    methods,
                });
            }
        }
        components.sort_by(|a, b| a.name.cmp(&b.name));

        let mut listeners: Vec<ListenerStatus> = self
            .all_proxies()
            .into_iter()
            .map(|p| ListenerStatus {
                name: p.listener,
                addr: p.addr,
            })
            .collect();
        listeners.sort_by(|a, b| a.name.cmp(&b.name));

        StatusReport {
            app: self.deployment.app.name.clone(),
            deployment_id: self.deployment.id.clone(),
            submitted_at_ms: self.started_at_ms,
            components,
            listeners,
        }
    }

    /// Flattened metric snapshots from the supervisor and every worker.
    pub async fn metrics(&self) -> MetricsReport {
        MetricsReport {
            metrics: self.read_metrics().await,
        }
    }

    /// Profile every worker: replicas of a group in parallel, groups
    /// concurrently, results grouped by group name.
    ///
    /// Worker handles are copied out under each group lock before any
    /// profiling starts; a profile can run for a long time.
    pub async fn profile(&self, req: ProfileRequest) -> ProfileReport {
        let mut groups: Vec<_> = self
            .all_groups()
            .into_iter()
            .map(|g| (g.name.clone(), g.lock().workers.clone()))
            .collect();
        groups.sort_by(|a, b| a.0.cmp(&b.0));

        let group_tasks = groups.into_iter().map(|(name, workers)| async move {
            let profiles = join_all(workers.iter().map(|worker| async {
                match worker.run_profiling(req).await {
                    Ok(data) => WorkerProfile { data, error: None },
                    Err(e) => WorkerProfile {
                        data: Vec::new(),
                        error: Some(format!("{e:#}")),
                    },
                }
            }))
            .await;
            GroupProfile {
                group: name,
                profiles,
            }
        });

        ProfileReport {
            app: self.deployment.app.name.clone(),
            deployment_id: self.deployment.id.clone(),
            groups: join_all(group_tasks).await,
        }
    }
}
