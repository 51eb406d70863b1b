//! Conversions from external infrastructure errors into domain and core
//! error types.

use std::error::Error as StdError;
use std::time::Duration;

use netrelay_core::RawFailure;
use netrelay_domain::NetRelayError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub NetRelayError);

impl From<InfraError> for NetRelayError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<NetRelayError> for InfraError {
    fn from(value: NetRelayError) -> Self {
        InfraError(value)
    }
}

impl From<HttpError> for InfraError {
    fn from(err: HttpError) -> Self {
        InfraError(NetRelayError::Transport(error_chain(&err)))
    }
}

/// Map a transport library failure onto the raw failure signal the retry
/// classifier understands.
pub trait IntoRawFailure {
    /// `deadline` is reported back when the failure was a timeout.
    fn into_raw_failure(self, deadline: Duration) -> RawFailure;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → RawFailure */
/* -------------------------------------------------------------------------- */

impl IntoRawFailure for HttpError {
    fn into_raw_failure(self, deadline: Duration) -> RawFailure {
        let detail = error_chain(&self);

        if self.is_timeout() {
            return RawFailure::DeadlineExceeded(deadline);
        }

        if self.is_connect() {
            let lower = detail.to_ascii_lowercase();
            return if lower.contains("refused") {
                RawFailure::ConnectionRefused(detail)
            } else if lower.contains("dns") || lower.contains("resolve") || lower.contains("lookup")
            {
                RawFailure::DnsFailure(detail)
            } else {
                RawFailure::NoRoute(detail)
            };
        }

        if self.is_decode() {
            return RawFailure::Decode(detail);
        }

        if self.is_request() || self.is_body() {
            return RawFailure::NoRoute(detail);
        }

        if let Some(status) = self.status() {
            return RawFailure::Status { code: status.as_u16(), body: String::new() };
        }

        RawFailure::Other(detail)
    }
}

/// Flatten an error and its sources into one line.
fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
