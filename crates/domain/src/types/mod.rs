//! Domain types and models

pub mod lifecycle;
pub mod network;
pub mod request;

pub use lifecycle::ClientLifecycleState;
pub use network::NetworkState;
pub use request::{Headers, HttpMethod, Operation, Params, RequestId};
