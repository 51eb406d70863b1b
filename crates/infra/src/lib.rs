//! # NetRelay Infrastructure
//!
//! Infrastructure implementations of the core ports plus the request client
//! that orchestrates them.
//!
//! This crate contains:
//! - The `ApiClient` orchestrator and its process-wide slot
//! - Network state monitoring and connectivity sources
//! - The offline request queue and the callback dispatcher
//! - The reqwest-backed transport
//! - Configuration loading and tracing setup
//!
//! ## Architecture
//! - Implements traits defined in `netrelay-core`
//! - Contains all "impure" code (sockets, threads, HTTP, environment)

pub mod api;
pub mod config;
pub mod errors;
pub mod http;
pub mod network;
pub mod observability;

// Re-export commonly used items
pub use api::{
    build_common_headers, ApiClient, CallbackDispatcher, ClientSlot, DeliveryOutcome,
    PendingRequest, PendingRequestQueue,
};
pub use http::ReqwestTransport;
pub use network::{ManualConnectivity, NetworkStateMonitor, ProbeConnectivity, SubscriptionHandle};
pub use observability::metrics::{ClientMetrics, MetricsSnapshot};
pub use observability::{init_tracing, LogFormat};
