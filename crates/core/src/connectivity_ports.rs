//! Connectivity port interfaces
//!
//! A platform-level "is there a route to the network" signal. Sources never
//! debounce; the network state monitor owns that policy.

use tokio::sync::watch;

/// Platform connectivity signal.
pub trait ConnectivitySource: Send + Sync {
    /// Current raw reading.
    fn is_connected(&self) -> bool;

    /// Receiver that wakes whenever the source publishes a new reading.
    fn watch(&self) -> watch::Receiver<bool>;
}
