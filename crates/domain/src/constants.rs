//! Client constants
//!
//! Header values and configuration defaults shared across the workspace.

// Common request headers
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const HEADER_ACCEPT: &str = "Accept";
pub const HEADER_USER_AGENT: &str = "User-Agent";
pub const CONTENT_TYPE_JSON_UTF8: &str = "application/json; charset=utf-8";
pub const ACCEPT_JSON: &str = "application/json";

// Client identification
pub const DEFAULT_CLIENT_ID: &str = concat!("netrelay/", env!("CARGO_PKG_VERSION"));

// Dispatch defaults
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_WORKER_POOL_SIZE: usize = 4;

// Retry defaults
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 500;
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 8_000;
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

// Connectivity
pub const DEFAULT_NETWORK_DEBOUNCE_MS: u64 = 100;
/// Continuous flapping settles after at most this many debounce windows.
pub const MAX_DEBOUNCE_WINDOWS: u32 = 8;

// Error reporting
pub const MAX_ERROR_BODY_CHARS: usize = 256;
