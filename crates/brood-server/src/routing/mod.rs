//! Routing module
//!
//! Deterministic sharded routing for routed components. The planner maps
//! the full 64-bit key space onto a replica set; the supervisor republishes
//! its output through per-component versioned cells whenever the replica
//! set grows.

mod planner;

pub use planner::plan;
