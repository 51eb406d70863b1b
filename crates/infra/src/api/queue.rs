//! Ordered buffer of requests submitted while the network was unavailable.

use std::collections::VecDeque;

use parking_lot::Mutex;

use super::request::PendingRequest;

#[derive(Debug, Default)]
struct QueueInner {
    entries: VecDeque<PendingRequest>,
    generation: u64,
}

/// FIFO queue of pending requests.
///
/// Every operation takes one short mutex hold and never performs I/O. A drain
/// detaches the whole current contents at once, so a request enqueued
/// concurrently lands either in that drain or in the next generation.
#[derive(Debug, Default)]
pub struct PendingRequestQueue {
    inner: Mutex<QueueInner>,
}

impl PendingRequestQueue {
    /// An empty queue at generation zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request. Returns the new queue size.
    pub fn enqueue(&self, request: PendingRequest) -> usize {
        let mut inner = self.inner.lock();
        inner.entries.push_back(request);
        inner.entries.len()
    }

    /// Append `request` only if `predicate` holds, evaluated under the queue
    /// lock. Hands the request back when the predicate is false.
    pub fn enqueue_if<P>(&self, request: PendingRequest, predicate: P) -> Result<usize, PendingRequest>
    where
        P: FnOnce() -> bool,
    {
        let mut inner = self.inner.lock();
        if !predicate() {
            return Err(request);
        }
        inner.entries.push_back(request);
        Ok(inner.entries.len())
    }

    /// Detach everything queued so far, oldest first.
    pub fn drain_in_order(&self) -> Vec<PendingRequest> {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        inner.entries.drain(..).collect()
    }

    /// Remove everything. Used during shutdown; the caller decides what
    /// happens to the returned entries.
    pub fn clear(&self) -> Vec<PendingRequest> {
        self.drain_in_order()
    }

    /// Entries currently waiting.
    pub fn size(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// `true` when nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// Number of drains (including clears) performed so far.
    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }
}
