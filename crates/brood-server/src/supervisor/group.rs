//! Colocation group state
//!
//! A group is the unit of process replication: every component placed in it
//! runs inside each of the group's worker replicas. Groups are created on
//! first reference and live for the deployment's lifetime.

use crate::versioned::Versioned;
use crate::workers::WorkerHandle;
use brood_api::routing::RoutingInfo;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// One colocation group.
pub struct Group {
    /// Group name (the first component of its colocate stanza).
    pub name: String,
    /// Started components. Published to long-polling workers; entries are
    /// never removed during a deployment.
    pub components: Versioned<BTreeSet<String>>,
    /// Guards the mutable interior, but not the versioned cells inside it.
    state: Mutex<GroupState>,
}

/// Interior of a group, accessed only under its lock.
pub struct GroupState {
    /// Dialable addresses of registered replicas. Grows monotonically.
    pub addresses: BTreeSet<String>,
    /// One handle per launched worker replica.
    pub workers: Vec<Arc<dyn WorkerHandle>>,
    /// OS pids of registered replicas, diagnostic only.
    pub pids: Vec<i64>,
    routings: BTreeMap<String, Arc<Versioned<RoutingInfo>>>,
}

impl GroupState {
    /// The routing cell for `component`, auto-vivified empty on first
    /// access.
    pub fn routing(&mut self, component: &str) -> Arc<Versioned<RoutingInfo>> {
        self.routings
            .entry(component.to_string())
            .or_insert_with(|| Arc::new(Versioned::new(RoutingInfo::default())))
            .clone()
    }

    /// All existing routing cells.
    pub fn routings(&self) -> impl Iterator<Item = &Arc<Versioned<RoutingInfo>>> {
        self.routings.values()
    }

    /// The sorted replica set, as published in routing info.
    pub fn sorted_addresses(&self) -> Vec<String> {
        self.addresses.iter().cloned().collect()
    }
}

impl Group {
    pub fn new(name: &str) -> Self {
        Group {
            name: name.to_string(),
            components: Versioned::new(BTreeSet::new()),
            state: Mutex::new(GroupState {
                addresses: BTreeSet::new(),
                workers: Vec::new(),
                pids: Vec::new(),
                routings: BTreeMap::new(),
            }),
        }
    }

    /// Lock the group's interior.
    pub fn lock(&self) -> MutexGuard<'_, GroupState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_cell_is_auto_vivified_once() {
        let group = Group::new("A");
        let mut state = group.lock();
        let first = state.routing("A");
        let second = state.routing("A");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(state.routings().count(), 1);
    }

    #[test]
    fn test_sorted_addresses() {
        let group = Group::new("A");
        let mut state = group.lock();
        state.addresses.insert("10.0.0.2:80".to_string());
        state.addresses.insert("10.0.0.1:80".to_string());
        assert_eq!(
            state.sorted_addresses(),
            vec!["10.0.0.1:80".to_string(), "10.0.0.2:80".to_string()]
        );
    }
}
