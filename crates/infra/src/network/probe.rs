//! Connectivity source that probes a TCP endpoint.
//!
//! A successful connect within the timeout counts as "a route to the network
//! exists". The probe loop only publishes readings that differ from the last
//! one.

use std::sync::Arc;
use std::time::Duration;

use netrelay_core::ConnectivitySource;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Periodically connects to `target` (`host:port`).
#[derive(Debug)]
pub struct ProbeConnectivity {
    target: String,
    tx: Arc<watch::Sender<bool>>,
    cancel: CancellationToken,
}

impl ProbeConnectivity {
    /// Probe once, then keep probing every `interval` on a background task
    /// until the source is dropped.
    pub async fn start(
        target: impl Into<String>,
        interval: Duration,
        connect_timeout: Duration,
    ) -> Arc<Self> {
        let target = target.into();
        let initial = probe(&target, connect_timeout).await;
        let (tx, _) = watch::channel(initial);
        let tx = Arc::new(tx);
        let cancel = CancellationToken::new();

        debug!(%target, initial, interval_ms = interval.as_millis() as u64, "starting connectivity probe");
        tokio::spawn(probe_loop(
            target.clone(),
            Arc::clone(&tx),
            interval,
            connect_timeout,
            cancel.clone(),
        ));

        Arc::new(Self { target, tx, cancel })
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

impl ConnectivitySource for ProbeConnectivity {
    fn is_connected(&self) -> bool {
        *self.tx.borrow()
    }

    fn watch(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Drop for ProbeConnectivity {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn probe_loop(
    target: String,
    tx: Arc<watch::Sender<bool>>,
    interval: Duration,
    connect_timeout: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // First tick completes immediately; the initial probe already ran.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let reachable = probe(&target, connect_timeout).await;
                tx.send_if_modified(|current| {
                    if *current == reachable {
                        return false;
                    }
                    *current = reachable;
                    true
                });
            }
        }
    }
    debug!(%target, "connectivity probe stopped");
}

async fn probe(target: &str, connect_timeout: Duration) -> bool {
    let reachable =
        matches!(tokio::time::timeout(connect_timeout, TcpStream::connect(target)).await, Ok(Ok(_)));
    trace!(%target, reachable, "connectivity probe");
    reachable
}
