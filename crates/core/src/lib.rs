//! # NetRelay Core
//!
//! Pure orchestration logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits) for the transport and the platform
//!   connectivity signal
//! - The raw failure model transports report
//! - The retry classifier that turns raw failures into normalized errors
//!
//! ## Architecture Principles
//! - Only depends on `netrelay-domain`
//! - No HTTP, socket, or platform code
//! - All external dependencies via traits

pub mod retry_classifier;

// Infrastructure ports
pub mod connectivity_ports;
pub mod transport_ports;

// Re-export specific items to avoid ambiguity
pub use connectivity_ports::ConnectivitySource;
pub use retry_classifier::{classify, Classification};
pub use transport_ports::{RawFailure, Transport, TransportOutcome};
