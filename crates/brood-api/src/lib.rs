//! Shared wire types for brood
//!
//! This crate contains the message types exchanged between the brood
//! supervisor and the worker processes it manages, plus the deployment
//! model both sides agree on. The transport that carries these messages
//! is deliberately out of scope; everything here is plain data.

pub mod deployment;
pub mod messages;
pub mod routing;
pub mod status;
pub mod telemetry;
pub mod version;

pub use deployment::{AppConfig, Deployment, DeploymentError};
pub use messages::{
    ComponentsToStart, ExportListenerReply, ExportListenerRequest, GetAddressReply,
    GetAddressRequest, GetComponentsToStartRequest, GetRoutingInfoRequest, Listener,
    RegisterReplicaRequest, StartComponentRequest,
};
pub use routing::{Assignment, RoutingInfo, Slice};
pub use version::Version;
