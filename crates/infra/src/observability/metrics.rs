//! Request counters for one client instance.
//!
//! Counters are independent of each other, so `Relaxed` ordering is enough;
//! a snapshot is not a consistent cut across counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Lock-free counters updated by the client's submit and dispatch paths.
#[derive(Debug, Default)]
pub struct ClientMetrics {
    submitted: AtomicU64,
    dispatched: AtomicU64,
    retried: AtomicU64,
    queued: AtomicU64,
    replayed: AtomicU64,
    expired: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    discarded: AtomicU64,
    rejected: AtomicU64,
}

/// Point-in-time copy of [`ClientMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Requests accepted by `submit`
    pub submitted: u64,
    /// Transport attempts, including retries
    pub dispatched: u64,
    pub retried: u64,
    /// Requests parked because the network was unavailable
    pub queued: u64,
    pub replayed: u64,
    /// Queued requests that went stale before replay
    pub expired: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Requests dropped without a callback during shutdown
    pub discarded: u64,
    /// Submissions refused after destroy
    pub rejected: u64,
}

impl ClientMetrics {
    /// All counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepted by `submit`.
    pub fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// One transport attempt started.
    pub fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// A retryable failure scheduled another attempt.
    pub fn record_retried(&self) {
        self.retried.fetch_add(1, Ordering::Relaxed);
    }

    /// Parked while offline.
    pub fn record_queued(&self) {
        self.queued.fetch_add(1, Ordering::Relaxed);
    }

    /// Handed to dispatch by a replay drain.
    pub fn record_replayed(&self) {
        self.replayed.fetch_add(1, Ordering::Relaxed);
    }

    /// Dropped on replay for exceeding the staleness limit.
    pub fn record_expired(&self) {
        self.expired.fetch_add(1, Ordering::Relaxed);
    }

    /// Terminal success.
    pub fn record_succeeded(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    /// Terminal error, including expiry.
    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Handlers dropped unrun (shutdown).
    pub fn record_discarded(&self, count: u64) {
        self.discarded.fetch_add(count, Ordering::Relaxed);
    }

    /// Refused synchronously by an inactive client.
    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
            replayed: self.replayed.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}
