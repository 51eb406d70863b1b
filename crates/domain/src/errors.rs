//! Error types used throughout the client

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Normalized classification of a failed request.
///
/// Callers never see raw transport failures; every error handed to an
/// `on_error` callback carries one of these kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "code", rename_all = "snake_case")]
pub enum ErrorKind {
    /// No route to the remote host (offline, DNS failure)
    NetworkUnavailable,
    /// The attempt exceeded its deadline
    Timeout,
    /// The remote host actively refused the connection
    ConnectionRefused,
    /// Remote returned a 5xx-equivalent status
    ServerError(u16),
    /// Remote rejected the input (4xx-equivalent: bad input, auth)
    ValidationError,
    /// The response payload could not be decoded
    ParseError,
    /// The client was destroyed before the request could be accepted
    ClientDestroyed,
    /// Anything the classifier does not recognize
    Unknown,
}

impl ErrorKind {
    /// Stable label suitable for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NetworkUnavailable => "network_unavailable",
            Self::Timeout => "timeout",
            Self::ConnectionRefused => "connection_refused",
            Self::ServerError(_) => "server_error",
            Self::ValidationError => "validation_error",
            Self::ParseError => "parse_error",
            Self::ClientDestroyed => "client_destroyed",
            Self::Unknown => "unknown",
        }
    }

    /// Whether a failure of this kind may succeed if dispatched again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkUnavailable | Self::Timeout | Self::ConnectionRefused | Self::ServerError(_)
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServerError(code) => write!(f, "server_error({code})"),
            other => f.write_str(other.label()),
        }
    }
}

/// Terminal error delivered to a request's `on_error` handler.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    /// Error handed to submitters after the client has been destroyed.
    pub fn client_destroyed() -> Self {
        Self::new(ErrorKind::ClientDestroyed, "client has been destroyed")
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// Main error type for NetRelay setup and infrastructure
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum NetRelayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for NetRelay operations
pub type Result<T> = std::result::Result<T, NetRelayError>;
