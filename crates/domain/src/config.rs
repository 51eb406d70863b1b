//! Client configuration
//!
//! Durations are written as integer milliseconds in JSON/TOML (`*_ms` keys).

use std::time::Duration;

use netrelay_common::{duration_millis, option_duration_millis};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_BASE_URL, DEFAULT_CLIENT_ID, DEFAULT_INITIAL_BACKOFF_MS,
    DEFAULT_MAX_BACKOFF_MS, DEFAULT_MAX_RETRIES, DEFAULT_NETWORK_DEBOUNCE_MS,
    DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_WORKER_POOL_SIZE,
};
use crate::errors::{NetRelayError, Result};

/// Execution context on which result handlers run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Run the handler on whichever thread produced the result.
    SameThread,
    /// Run handlers in order on one dedicated callback thread.
    #[default]
    #[serde(alias = "dedicated")]
    DedicatedCallbackContext,
}

/// Retry budget and backoff shape for retryable failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Additional attempts after the first dispatch.
    pub max_retries: u32,
    #[serde(rename = "initial_backoff_ms", with = "duration_millis")]
    pub initial_backoff: Duration,
    #[serde(rename = "max_backoff_ms", with = "duration_millis")]
    pub max_backoff: Duration,
    pub multiplier: f64,
    /// Randomize each delay between half and the full computed value.
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff: Duration::from_millis(DEFAULT_INITIAL_BACKOFF_MS),
            max_backoff: Duration::from_millis(DEFAULT_MAX_BACKOFF_MS),
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            jitter: false,
        }
    }
}

/// Configuration fixed at client construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL the transport resolves operation paths against.
    pub base_url: String,
    /// Sent as the `User-Agent` header.
    pub client_id: String,
    /// Deadline applied to every dispatch attempt.
    #[serde(rename = "request_timeout_ms", with = "duration_millis")]
    pub request_timeout: Duration,
    pub retry: RetrySettings,
    pub delivery: DeliveryMode,
    /// Maximum number of concurrent transport calls.
    pub worker_pool_size: usize,
    /// Connectivity flaps shorter than this are coalesced. Zero disables.
    #[serde(rename = "network_debounce_ms", with = "duration_millis")]
    pub network_debounce: Duration,
    /// Queued requests older than this expire instead of replaying.
    #[serde(rename = "stale_after_ms", with = "option_duration_millis")]
    pub stale_after: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            retry: RetrySettings::default(),
            delivery: DeliveryMode::default(),
            worker_pool_size: DEFAULT_WORKER_POOL_SIZE,
            network_debounce: Duration::from_millis(DEFAULT_NETWORK_DEBOUNCE_MS),
            stale_after: None,
        }
    }
}

impl ClientConfig {
    /// Reject configurations the client cannot run with.
    ///
    /// # Errors
    /// Returns `NetRelayError::Config` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(NetRelayError::Config("base_url must not be empty".into()));
        }
        if self.client_id.trim().is_empty() {
            return Err(NetRelayError::Config("client_id must not be empty".into()));
        }
        if self.request_timeout.is_zero() {
            return Err(NetRelayError::Config("request_timeout_ms must be greater than 0".into()));
        }
        if self.worker_pool_size == 0 {
            return Err(NetRelayError::Config("worker_pool_size must be greater than 0".into()));
        }
        if !(self.retry.multiplier >= 1.0 && self.retry.multiplier.is_finite()) {
            return Err(NetRelayError::Config(format!(
                "retry.multiplier must be a finite value >= 1.0, got {}",
                self.retry.multiplier
            )));
        }
        if self.retry.initial_backoff > self.retry.max_backoff {
            return Err(NetRelayError::Config(
                "retry.initial_backoff_ms must not exceed retry.max_backoff_ms".into(),
            ));
        }
        Ok(())
    }
}
