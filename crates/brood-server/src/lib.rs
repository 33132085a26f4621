//! Brood supervisor library
//!
//! Core runtime for supervising a single-machine deployment of a
//! component-based application: colocation groups, versioned routing
//! publication, worker fleets, and exported listener proxies.

pub mod api;
pub mod config;
pub mod error;
pub mod observability;
pub mod proxy;
pub mod routing;
pub mod shutdown;
pub mod sinks;
pub mod supervisor;
pub mod version;
pub mod versioned;
pub mod workers;
