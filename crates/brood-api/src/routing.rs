//! Routing types
//!
//! Routing information tells a worker which replicas host a component and,
//! for routed components, how the 64-bit key space is sharded across them.

use crate::version::Version;
use serde::{Deserialize, Serialize};

/// A contiguous sub-range of the 64-bit key space with its assigned replicas.
///
/// Slice `i` of an assignment covers `[slices[i].start, slices[i+1].start)`;
/// the last slice extends to `u64::MAX`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slice {
    pub start: u64,
    /// Replica addresses serving this slice. Non-empty.
    pub replicas: Vec<String>,
}

/// A sharded assignment of the full key space to replicas.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Monotonic counter, bumped each time the assignment is recomputed.
    pub version: u64,
    /// Slices sorted ascending by `start`; `slices[0].start == 0`.
    pub slices: Vec<Slice>,
}

impl Assignment {
    /// The slice covering `key`, or `None` for an empty assignment.
    pub fn slice_for(&self, key: u64) -> Option<&Slice> {
        let idx = match self.slices.binary_search_by_key(&key, |s| s.start) {
            Ok(i) => i,
            // A well-formed assignment starts at key 0, so only an empty
            // one can leave a key uncovered.
            Err(0) => return None,
            Err(i) => i - 1,
        };
        self.slices.get(idx)
    }

    /// The first replica serving `key`. Workers use this to route a hashed
    /// method call to its owner.
    pub fn replica_for(&self, key: u64) -> Option<&str> {
        self.slice_for(key)
            .and_then(|s| s.replicas.first())
            .map(String::as_str)
    }
}

/// Per-component routing state published to workers.
///
/// `version` and `unchanged` are filled in by the supervisor when it
/// snapshots the routing cell for a reply; the stored value leaves them at
/// their defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingInfo {
    /// Sorted addresses of the replicas hosting the component.
    pub replicas: Vec<String>,
    /// Sharded assignment. `None` for unrouted components.
    pub assignment: Option<Assignment>,
    /// Version of the routing cell this snapshot was taken at.
    #[serde(default)]
    pub version: Version,
    /// Set when a long poll expired without observing a change; the caller
    /// retries with the same version.
    #[serde(default)]
    pub unchanged: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slice(start: u64, replica: &str) -> Slice {
        Slice {
            start,
            replicas: vec![replica.to_string()],
        }
    }

    #[test]
    fn test_slice_for_empty() {
        let a = Assignment::default();
        assert_eq!(a.slice_for(0), None);
        assert_eq!(a.replica_for(u64::MAX), None);
    }

    #[test]
    fn test_replica_lookup() {
        let a = Assignment {
            version: 1,
            slices: vec![slice(0, "r1"), slice(1 << 63, "r2")],
        };
        assert_eq!(a.replica_for(0), Some("r1"));
        assert_eq!(a.replica_for((1 << 63) - 1), Some("r1"));
        assert_eq!(a.replica_for(1 << 63), Some("r2"));
        assert_eq!(a.replica_for(u64::MAX), Some("r2"));
    }

    #[test]
    fn test_exact_boundary_hits_owning_slice() {
        let a = Assignment {
            version: 1,
            slices: vec![slice(0, "r1"), slice(100, "r2"), slice(200, "r3")],
        };
        assert_eq!(a.replica_for(100), Some("r2"));
        assert_eq!(a.replica_for(199), Some("r2"));
        assert_eq!(a.replica_for(200), Some("r3"));
    }
}
