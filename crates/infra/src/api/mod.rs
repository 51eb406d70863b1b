//! Request client: submission, offline queueing, replay and result delivery.

pub mod client;
pub mod dispatcher;
pub mod headers;
pub mod instance;
pub mod lifecycle;
pub mod queue;
pub mod request;

pub use client::ApiClient;
pub use dispatcher::{CallbackDispatcher, DeliveryOutcome, CALLBACK_THREAD_NAME};
pub use headers::build_common_headers;
pub use instance::ClientSlot;
pub use lifecycle::Lifecycle;
pub use queue::PendingRequestQueue;
pub use request::{
    ErrorHandler, HandlerSlot, PendingRequest, RequestOutcome, ResultHandlers, SuccessHandler,
};
