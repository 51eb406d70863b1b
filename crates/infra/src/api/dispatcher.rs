//! Delivery of terminal outcomes to result handlers.
//!
//! Each request's handlers sit in a take-once slot, so a second delivery for
//! the same request is a no-op no matter which thread attempts it. Where the
//! handler runs depends on [`DeliveryMode`]:
//!
//! - `SameThread`: inline, on the thread that produced the result
//! - `DedicatedCallbackContext`: in FIFO order on the `netrelay-callbacks`
//!   thread
//!
//! Results produced after shutdown begins are discarded without running any
//! handler. Jobs already queued on the callback thread still run; `close`
//! only drops the sender so the thread exits once the channel is empty.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use netrelay_domain::{ApiError, DeliveryMode, NetRelayError, RequestId, Result};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::lifecycle::Lifecycle;
use super::request::{PendingRequest, RequestOutcome, ResultHandlers};

/// Name of the thread that runs handlers in dedicated mode.
pub const CALLBACK_THREAD_NAME: &str = "netrelay-callbacks";

/// What happened to one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Handler ran (same-thread) or was scheduled (dedicated).
    Delivered,
    /// The request already received its outcome.
    Duplicate,
    /// The client is shutting down; handlers were dropped.
    Discarded,
}

struct DeliveryJob {
    request_id: RequestId,
    handlers: ResultHandlers,
    outcome: RequestOutcome,
}

impl DeliveryJob {
    fn run(self) {
        let request_id = self.request_id;
        let handlers = self.handlers;
        let outcome = self.outcome;
        let result = panic::catch_unwind(AssertUnwindSafe(move || handlers.complete(outcome)));
        if result.is_err() {
            warn!(%request_id, "result handler panicked");
        }
    }
}

/// Routes outcomes to handlers on the configured execution context.
pub struct CallbackDispatcher {
    mode: DeliveryMode,
    lifecycle: Arc<Lifecycle>,
    sender: Mutex<Option<mpsc::UnboundedSender<DeliveryJob>>>,
}

impl CallbackDispatcher {
    /// Create a dispatcher. In dedicated mode this spawns the callback thread.
    ///
    /// # Errors
    /// Returns `NetRelayError::Runtime` if the callback thread cannot be
    /// spawned.
    pub fn new(mode: DeliveryMode, lifecycle: Arc<Lifecycle>) -> Result<Self> {
        let sender = match mode {
            DeliveryMode::SameThread => None,
            DeliveryMode::DedicatedCallbackContext => Some(spawn_callback_thread()?),
        };

        Ok(Self { mode, lifecycle, sender: Mutex::new(sender) })
    }

    /// Execution context handlers run on.
    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    /// Route a success to the request's handlers. At most one delivery per
    /// request succeeds; later calls report `Duplicate`.
    pub fn deliver_success(&self, request: &PendingRequest, value: Value) -> DeliveryOutcome {
        self.deliver(request, RequestOutcome::Success(value))
    }

    /// Error counterpart of [`Self::deliver_success`].
    pub fn deliver_error(&self, request: &PendingRequest, error: ApiError) -> DeliveryOutcome {
        self.deliver(request, RequestOutcome::Failure(error))
    }

    /// Drop a request's handlers without running them. Returns `false` if
    /// they were already consumed.
    pub fn discard(&self, request: &PendingRequest) -> bool {
        request.handlers().take().is_some()
    }

    /// Stop accepting new jobs. Jobs already queued still run.
    pub fn close(&self) {
        if self.sender.lock().take().is_some() {
            debug!("callback channel closed");
        }
    }

    fn deliver(&self, request: &PendingRequest, outcome: RequestOutcome) -> DeliveryOutcome {
        let state = self.lifecycle.read();

        let Some(handlers) = request.handlers().take() else {
            debug!(request_id = %request.id, "duplicate delivery ignored");
            return DeliveryOutcome::Duplicate;
        };

        let current = *state;
        if !current.is_active() {
            warn!(request_id = %request.id, state = %current, "client shutting down; result discarded");
            return DeliveryOutcome::Discarded;
        }

        let job = DeliveryJob { request_id: request.id, handlers, outcome };
        match self.mode {
            DeliveryMode::SameThread => {
                // Handlers may call back into the client (even destroy it).
                drop(state);
                job.run();
                DeliveryOutcome::Delivered
            }
            DeliveryMode::DedicatedCallbackContext => {
                let sender = self.sender.lock();
                match sender.as_ref().map(|tx| tx.send(job)) {
                    Some(Ok(())) => DeliveryOutcome::Delivered,
                    _ => {
                        warn!(request_id = %request.id, "callback thread unavailable; result discarded");
                        DeliveryOutcome::Discarded
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for CallbackDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackDispatcher")
            .field("mode", &self.mode)
            .field("open", &self.sender.lock().is_some())
            .finish()
    }
}

fn spawn_callback_thread() -> Result<mpsc::UnboundedSender<DeliveryJob>> {
    let (tx, mut rx) = mpsc::unbounded_channel::<DeliveryJob>();

    thread::Builder::new()
        .name(CALLBACK_THREAD_NAME.to_string())
        .spawn(move || {
            while let Some(job) = rx.blocking_recv() {
                job.run();
            }
            debug!("callback thread exiting");
        })
        .map_err(|err| {
            NetRelayError::Runtime(format!("failed to spawn callback thread: {err}"))
        })?;

    Ok(tx)
}
