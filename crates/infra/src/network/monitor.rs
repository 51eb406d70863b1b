//! Connectivity monitor with listener subscriptions.
//!
//! The monitor watches a [`ConnectivitySource`] on a background task, settles
//! raw readings through a bounded debounce window and publishes a transition
//! only when the settled value differs from the last published one. The new
//! state is stored before listeners run, so a listener (or anything it wakes)
//! always observes the state it was notified about.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use netrelay_core::ConnectivitySource;
use netrelay_domain::constants::MAX_DEBOUNCE_WINDOWS;
use netrelay_domain::{NetRelayError, NetworkState, Result};
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Callback fired once per published transition.
pub type NetworkListener = Arc<dyn Fn(NetworkState) + Send + Sync + 'static>;

/// Returned by [`NetworkStateMonitor::subscribe`]; pass it to `unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

struct MonitorShared {
    state: RwLock<NetworkState>,
    listeners: Mutex<Vec<(SubscriptionHandle, NetworkListener)>>,
    next_handle: AtomicU64,
}

impl MonitorShared {
    /// Store `available` and notify listeners if it changes the state.
    fn publish(&self, available: bool) -> bool {
        let next = {
            let mut state = self.state.write();
            if state.available == available {
                return false;
            }
            *state = NetworkState::new(available);
            *state
        };

        // Snapshot so listeners may (un)subscribe while being notified.
        let listeners: Vec<NetworkListener> =
            self.listeners.lock().iter().map(|(_, listener)| Arc::clone(listener)).collect();

        info!(available, listeners = listeners.len(), "network state changed");
        for listener in listeners {
            listener(next);
        }
        true
    }
}

/// Tracks connectivity and notifies subscribers of transitions.
///
/// The monitor owns a handle to its source, so a source whose background
/// work stops on drop (such as a probe) keeps running for the monitor's
/// lifetime.
pub struct NetworkStateMonitor {
    source: Arc<dyn ConnectivitySource>,
    shared: Arc<MonitorShared>,
    cancel: CancellationToken,
    debounce: Duration,
}

impl NetworkStateMonitor {
    /// Read the source's current value and start observing it.
    ///
    /// `debounce` of zero publishes every distinct reading immediately.
    ///
    /// # Errors
    /// Returns `NetRelayError::Runtime` when called outside a tokio runtime.
    pub fn start(source: Arc<dyn ConnectivitySource>, debounce: Duration) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|err| {
            NetRelayError::Runtime(format!("network monitor requires a tokio runtime: {err}"))
        })?;

        let mut readings = source.watch();
        let initial = *readings.borrow_and_update();
        let shared = Arc::new(MonitorShared {
            state: RwLock::new(NetworkState::new(initial)),
            listeners: Mutex::new(Vec::new()),
            next_handle: AtomicU64::new(1),
        });
        let cancel = CancellationToken::new();

        debug!(initial, debounce_ms = debounce.as_millis() as u64, "starting network monitor");
        runtime.spawn(observe(Arc::clone(&shared), readings, debounce, cancel.clone()));

        Ok(Self { source, shared, cancel, debounce })
    }

    /// Last published availability. Never blocks on I/O.
    pub fn is_available(&self) -> bool {
        self.shared.state.read().available
    }

    /// Last published state, including when it last changed.
    pub fn state(&self) -> NetworkState {
        *self.shared.state.read()
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Register a listener, called on the monitor task for each transition.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionHandle
    where
        F: Fn(NetworkState) + Send + Sync + 'static,
    {
        let handle = SubscriptionHandle(self.shared.next_handle.fetch_add(1, Ordering::Relaxed));
        self.shared.listeners.lock().push((handle, Arc::new(listener)));
        handle
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let mut listeners = self.shared.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(h, _)| *h != handle);
        listeners.len() != before
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.shared.listeners.lock().len()
    }

    /// Stop observing the source. The last published state stays readable.
    pub fn stop(&self) {
        if !self.cancel.is_cancelled() {
            debug!("stopping network monitor");
            self.cancel.cancel();
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for NetworkStateMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for NetworkStateMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkStateMonitor")
            .field("state", &self.state())
            .field("source_connected", &self.source.is_connected())
            .field("listeners", &self.listener_count())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

async fn observe(
    shared: Arc<MonitorShared>,
    mut readings: watch::Receiver<bool>,
    debounce: Duration,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = readings.changed() => {
                if changed.is_err() {
                    debug!("connectivity source closed");
                    break;
                }
                let raw = *readings.borrow_and_update();
                let settled = if debounce.is_zero() {
                    Some(raw)
                } else {
                    settle(&mut readings, raw, debounce, &cancel).await
                };
                match settled {
                    Some(available) => {
                        shared.publish(available);
                    }
                    None => break,
                }
            }
        }
    }
    debug!("network monitor stopped");
}

/// Wait until readings have been quiet for one `debounce` window, bounded to
/// `MAX_DEBOUNCE_WINDOWS` windows in total. Returns `None` on cancellation.
async fn settle(
    readings: &mut watch::Receiver<bool>,
    mut value: bool,
    debounce: Duration,
    cancel: &CancellationToken,
) -> Option<bool> {
    let hard_deadline = Instant::now() + debounce * MAX_DEBOUNCE_WINDOWS;
    loop {
        let window_end = (Instant::now() + debounce).min(hard_deadline);
        tokio::select! {
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep_until(window_end) => return Some(value),
            changed = readings.changed() => {
                if changed.is_err() {
                    return Some(value);
                }
                value = *readings.borrow_and_update();
                if Instant::now() >= hard_deadline {
                    return Some(value);
                }
            }
        }
    }
}
