//! # NetRelay Domain
//!
//! Business domain types and models for the NetRelay request client.
//!
//! This crate contains:
//! - Request data types (`RequestId`, `Operation`, `Params`)
//! - Connectivity and lifecycle state (`NetworkState`,
//!   `ClientLifecycleState`)
//! - The normalized error taxonomy (`ErrorKind`, `ApiError`) and the
//!   workspace error type (`NetRelayError`)
//! - Configuration structures
//!
//! ## Architecture
//! - Depends only on `netrelay-common` (foundation tier) and external crates
//! - Pure data structures, no I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
