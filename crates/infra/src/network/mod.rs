//! Connectivity observation
//!
//! `NetworkStateMonitor` turns raw readings from a `ConnectivitySource` into
//! debounced transitions. Two sources are provided: one pushed by the host
//! application and one that probes a TCP endpoint.

pub mod manual;
pub mod monitor;
pub mod probe;

pub use manual::ManualConnectivity;
pub use monitor::{NetworkListener, NetworkStateMonitor, SubscriptionHandle};
pub use probe::ProbeConnectivity;
