//! Transport port interfaces
//!
//! The client never speaks a wire protocol itself. A transport performs one
//! request attempt and reports either the decoded success payload or a raw
//! failure signal, which the retry classifier normalizes.

use std::time::Duration;

use async_trait::async_trait;
use netrelay_domain::{Headers, Operation, Params};
use thiserror::Error;

/// Low-level failure signal reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RawFailure {
    /// No route to the host.
    #[error("no route to host: {0}")]
    NoRoute(String),

    /// Name resolution failed.
    #[error("dns lookup failed: {0}")]
    DnsFailure(String),

    /// The host refused the connection.
    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    /// The attempt did not finish within its deadline.
    #[error("deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    /// The remote answered with a non-success status.
    #[error("remote returned status {code}")]
    Status { code: u16, body: String },

    /// The payload could not be decoded.
    #[error("undecodable payload: {0}")]
    Decode(String),

    /// Anything else the transport could not attribute.
    #[error("{0}")]
    Other(String),
}

/// Result of one transport attempt.
pub type TransportOutcome = Result<serde_json::Value, RawFailure>;

/// Performs exactly one request attempt.
///
/// Implementations should honour `deadline` themselves where they can; the
/// client additionally bounds every attempt with the same deadline.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn perform_request(
        &self,
        operation: &Operation,
        params: &Params,
        headers: &Headers,
        deadline: Duration,
    ) -> TransportOutcome;
}
