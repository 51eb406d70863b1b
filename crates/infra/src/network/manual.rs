//! Connectivity source driven by the host application.

use netrelay_core::ConnectivitySource;
use tokio::sync::watch;

/// Connectivity reported by platform glue (or tests) through
/// [`set_connected`](Self::set_connected).
#[derive(Debug)]
pub struct ManualConnectivity {
    tx: watch::Sender<bool>,
}

impl ManualConnectivity {
    pub fn new(connected: bool) -> Self {
        let (tx, _) = watch::channel(connected);
        Self { tx }
    }

    /// Report a raw reading. Repeating the current value still counts as a
    /// signal; the monitor decides whether it is a transition.
    pub fn set_connected(&self, connected: bool) {
        self.tx.send_replace(connected);
    }
}

impl ConnectivitySource for ManualConnectivity {
    fn is_connected(&self) -> bool {
        *self.tx.borrow()
    }

    fn watch(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
