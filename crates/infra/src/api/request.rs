//! A submitted request and its take-once result handlers.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use netrelay_domain::{ApiError, Operation, Params, RequestId};
use parking_lot::Mutex;
use serde_json::Value;

/// Invoked with the decoded response payload.
pub type SuccessHandler = Box<dyn FnOnce(Value) + Send + 'static>;

/// Invoked with the classified terminal error.
pub type ErrorHandler = Box<dyn FnOnce(ApiError) + Send + 'static>;

/// Terminal result routed to exactly one handler.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    Success(Value),
    Failure(ApiError),
}

/// The caller's two handlers. Consumed by whichever outcome arrives first.
pub struct ResultHandlers {
    on_success: SuccessHandler,
    on_error: ErrorHandler,
}

impl ResultHandlers {
    pub fn complete(self, outcome: RequestOutcome) {
        match outcome {
            RequestOutcome::Success(value) => (self.on_success)(value),
            RequestOutcome::Failure(error) => (self.on_error)(error),
        }
    }
}

/// Shared take-once slot holding a request's handlers.
///
/// Every clone refers to the same slot; the first `take` wins and every later
/// one sees `None`.
#[derive(Clone)]
pub struct HandlerSlot(Arc<Mutex<Option<ResultHandlers>>>);

impl HandlerSlot {
    pub fn new<S, E>(on_success: S, on_error: E) -> Self
    where
        S: FnOnce(Value) + Send + 'static,
        E: FnOnce(ApiError) + Send + 'static,
    {
        Self(Arc::new(Mutex::new(Some(ResultHandlers {
            on_success: Box::new(on_success),
            on_error: Box::new(on_error),
        }))))
    }

    pub fn take(&self) -> Option<ResultHandlers> {
        self.0.lock().take()
    }

    /// Whether a terminal outcome (or a discard) already consumed the handlers.
    pub fn is_spent(&self) -> bool {
        self.0.lock().is_none()
    }
}

impl fmt::Debug for HandlerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerSlot").field("spent", &self.is_spent()).finish()
    }
}

/// One not-yet-completed call.
///
/// Owned by exactly one of: the offline queue, a dispatch task, or nobody
/// once its outcome has been delivered.
#[derive(Debug)]
pub struct PendingRequest {
    pub id: RequestId,
    pub operation: Operation,
    pub params: Params,
    pub enqueued_at: DateTime<Utc>,
    /// Dispatch attempts made so far.
    pub attempt: u32,
    handlers: HandlerSlot,
}

impl PendingRequest {
    pub fn new<S, E>(operation: Operation, params: Params, on_success: S, on_error: E) -> Self
    where
        S: FnOnce(Value) + Send + 'static,
        E: FnOnce(ApiError) + Send + 'static,
    {
        Self {
            id: RequestId::new(),
            operation,
            params,
            enqueued_at: Utc::now(),
            attempt: 0,
            handlers: HandlerSlot::new(on_success, on_error),
        }
    }

    pub fn handlers(&self) -> &HandlerSlot {
        &self.handlers
    }

    /// Time spent since submission.
    pub fn age(&self) -> chrono::Duration {
        Utc::now().signed_duration_since(self.enqueued_at)
    }
}
