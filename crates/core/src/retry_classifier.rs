//! Retry classification of raw transport failures.
//!
//! | Raw signal | ErrorKind | Retryable |
//! |---|---|---|
//! | no route / DNS failure | NetworkUnavailable | yes |
//! | connection refused | ConnectionRefused | yes |
//! | deadline exceeded | Timeout | yes |
//! | status 5xx | ServerError(code) | yes |
//! | status 4xx | ValidationError | no |
//! | undecodable payload | ParseError | no |
//! | anything else | Unknown | no |

use netrelay_domain::constants::MAX_ERROR_BODY_CHARS;
use netrelay_domain::{ApiError, ErrorKind};

use crate::transport_ports::RawFailure;

/// Outcome of classifying one raw failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: ErrorKind,
    pub retryable: bool,
    pub message: String,
}

impl Classification {
    fn new(kind: ErrorKind, message: String) -> Self {
        Self { kind, retryable: kind.is_retryable(), message }
    }

    /// Caller-facing error for this classification.
    pub fn into_api_error(self) -> ApiError {
        ApiError::new(self.kind, self.message)
    }
}

/// Classify a raw transport failure. Pure: no shared state, no I/O.
pub fn classify(failure: &RawFailure) -> Classification {
    match failure {
        RawFailure::NoRoute(_) | RawFailure::DnsFailure(_) => {
            Classification::new(ErrorKind::NetworkUnavailable, failure.to_string())
        }
        RawFailure::ConnectionRefused(_) => {
            Classification::new(ErrorKind::ConnectionRefused, failure.to_string())
        }
        RawFailure::DeadlineExceeded(_) => {
            Classification::new(ErrorKind::Timeout, failure.to_string())
        }
        RawFailure::Status { code, body } => {
            let message = status_message(*code, body);
            match code {
                500..=599 => Classification::new(ErrorKind::ServerError(*code), message),
                400..=499 => Classification::new(ErrorKind::ValidationError, message),
                _ => Classification::new(ErrorKind::Unknown, message),
            }
        }
        RawFailure::Decode(_) => Classification::new(ErrorKind::ParseError, failure.to_string()),
        RawFailure::Other(_) => Classification::new(ErrorKind::Unknown, failure.to_string()),
    }
}

fn status_message(code: u16, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return format!("remote returned status {code}");
    }

    let mut truncated: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
    if truncated.len() < body.len() {
        truncated.push_str("...");
    }
    format!("remote returned status {code}: {truncated}")
}
