//! Worker request/reply messages
//!
//! The request surface a worker uses against the supervisor. The carrying
//! transport is pluggable; these are the payloads.

use crate::version::Version;
use serde::{Deserialize, Serialize};

/// Ask the supervisor to ensure a component is running somewhere.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartComponentRequest {
    pub component: String,
    /// Whether method calls on the component are routed by key.
    pub routed: bool,
}

/// Announce a freshly-listening worker replica.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterReplicaRequest {
    /// Colocation group the replica belongs to.
    pub group: String,
    /// Dialable address the replica is listening on.
    pub address: String,
    /// OS process id, recorded for diagnostics.
    pub pid: i64,
}

/// Long-poll for the set of components the worker's group should host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetComponentsToStartRequest {
    /// Last version the caller observed; `Version::initial()` on first poll.
    pub version: Version,
}

/// Reply to [`GetComponentsToStartRequest`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentsToStart {
    pub version: Version,
    pub components: Vec<String>,
    /// Set when the poll expired without a change; retry with the same
    /// version.
    #[serde(default)]
    pub unchanged: bool,
}

/// Long-poll for a component's routing info.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetRoutingInfoRequest {
    pub component: String,
    pub version: Version,
}

/// Ask which address a named listener should bind locally.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetAddressRequest {
    pub name: String,
    pub local_address: String,
}

/// Reply to [`GetAddressRequest`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetAddressReply {
    pub address: String,
}

/// A listener a worker wants exposed through the supervisor's proxy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listener {
    /// Listener name; proxies are keyed by it.
    pub name: String,
    /// Backend address the worker is serving the listener on.
    pub addr: String,
}

/// Export a listener through a supervisor-managed proxy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportListenerRequest {
    pub listener: Listener,
    /// Address the proxy should bind. `host:0` picks a free port.
    pub local_address: String,
}

/// Reply to [`ExportListenerRequest`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportListenerReply {
    /// Dialable address of the proxy.
    pub proxy_address: String,
    /// Soft failure: the requested local address was already in use. The
    /// worker surfaces this to the user instead of tearing anything down.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
