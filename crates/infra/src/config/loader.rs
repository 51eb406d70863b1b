//! Configuration loader
//!
//! Loads client configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `NETRELAY_BASE_URL` is missing, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! Every loaded configuration is validated before it is returned.
//!
//! ## Environment Variables
//! - `NETRELAY_BASE_URL`: Base URL of the remote API (required)
//! - `NETRELAY_CLIENT_ID`: Value sent as `User-Agent`
//! - `NETRELAY_REQUEST_TIMEOUT_MS`: Per-attempt deadline in milliseconds
//! - `NETRELAY_MAX_RETRIES`: Additional attempts for retryable failures
//! - `NETRELAY_WORKER_POOL_SIZE`: Maximum concurrent transport calls
//! - `NETRELAY_DELIVERY`: `same_thread` or `dedicated`
//! - `NETRELAY_STALE_AFTER_MS`: Expiry age for queued requests
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./netrelay.json` or `./netrelay.toml` (current working directory)
//! 2. `./config.json` or `./config.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use netrelay_domain::{ClientConfig, DeliveryMode, NetRelayError, Result};

pub const ENV_BASE_URL: &str = "NETRELAY_BASE_URL";
pub const ENV_CLIENT_ID: &str = "NETRELAY_CLIENT_ID";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "NETRELAY_REQUEST_TIMEOUT_MS";
pub const ENV_MAX_RETRIES: &str = "NETRELAY_MAX_RETRIES";
pub const ENV_WORKER_POOL_SIZE: &str = "NETRELAY_WORKER_POOL_SIZE";
pub const ENV_DELIVERY: &str = "NETRELAY_DELIVERY";
pub const ENV_STALE_AFTER_MS: &str = "NETRELAY_STALE_AFTER_MS";

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `NetRelayError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - The resulting configuration fails validation
pub fn load() -> Result<ClientConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from process environment variables
///
/// # Errors
/// Returns `NetRelayError::Config` if `NETRELAY_BASE_URL` is missing or a
/// variable has an invalid value.
pub fn load_from_env() -> Result<ClientConfig> {
    load_from_vars(|key| std::env::var(key).ok())
}

/// Build a configuration from an arbitrary variable lookup. Unset optional
/// variables keep their defaults.
///
/// # Errors
/// See [`load_from_env`].
pub fn load_from_vars<F>(lookup: F) -> Result<ClientConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let base_url = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()).ok_or_else(|| {
        NetRelayError::Config(format!("Missing required environment variable: {ENV_BASE_URL}"))
    })?;

    let mut config = ClientConfig { base_url, ..ClientConfig::default() };

    if let Some(client_id) = lookup(ENV_CLIENT_ID) {
        config.client_id = client_id;
    }
    if let Some(ms) = parse_var::<u64>(&lookup, ENV_REQUEST_TIMEOUT_MS)? {
        config.request_timeout = Duration::from_millis(ms);
    }
    if let Some(retries) = parse_var::<u32>(&lookup, ENV_MAX_RETRIES)? {
        config.retry.max_retries = retries;
    }
    if let Some(size) = parse_var::<usize>(&lookup, ENV_WORKER_POOL_SIZE)? {
        config.worker_pool_size = size;
    }
    if let Some(mode) = lookup(ENV_DELIVERY) {
        config.delivery = parse_delivery(&mode)?;
    }
    if let Some(ms) = parse_var::<u64>(&lookup, ENV_STALE_AFTER_MS)? {
        config.stale_after = Some(Duration::from_millis(ms));
    }

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
///
/// # Errors
/// Returns `NetRelayError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid or validation fails
pub fn load_from_file(path: Option<PathBuf>) -> Result<ClientConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(NetRelayError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            NetRelayError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| NetRelayError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Parse and validate configuration; format is detected by file extension.
///
/// # Errors
/// Returns `NetRelayError::Config` if format is invalid, parsing fails or
/// validation fails.
pub fn parse_config(contents: &str, path: &Path) -> Result<ClientConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    let config: ClientConfig = match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| NetRelayError::Config(format!("Invalid TOML format: {}", e)))?,
        "json" => serde_json::from_str(contents)
            .map_err(|e| NetRelayError::Config(format!("Invalid JSON format: {}", e)))?,
        _ => {
            return Err(NetRelayError::Config(format!("Unsupported config format: {}", extension)))
        }
    };

    config.validate()?;
    Ok(config)
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidate_paths(&cwd));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidate_paths(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidate_paths(dir: &Path) -> Vec<PathBuf> {
    vec![
        dir.join("netrelay.json"),
        dir.join("netrelay.toml"),
        dir.join("config.json"),
        dir.join("config.toml"),
        dir.join("../config.json"),
        dir.join("../config.toml"),
    ]
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| NetRelayError::Config(format!("Invalid value for {key}: {e}")))
        })
        .transpose()
}

fn parse_delivery(raw: &str) -> Result<DeliveryMode> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "same_thread" | "same-thread" | "inline" => Ok(DeliveryMode::SameThread),
        "dedicated" | "dedicated_callback_context" => Ok(DeliveryMode::DedicatedCallbackContext),
        other => Err(NetRelayError::Config(format!(
            "Invalid value for {ENV_DELIVERY}: {other} (expected same_thread or dedicated)"
        ))),
    }
}
