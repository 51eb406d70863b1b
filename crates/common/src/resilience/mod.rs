//! Resilience patterns for transient failure handling
//!
//! This module provides **generic, reusable** backoff calculation:
//! - **[`BackoffPolicy`]**: capped exponential delays, which is what retry
//!   loops hold
//! - **[`Jitter`]**: optional randomization so retries from many clients do
//!   not synchronize
//!
//! The retry loop itself lives with the component that owns the failure
//! taxonomy (see `netrelay-infra`'s dispatch path); this module only answers
//! "how long until attempt N".

pub mod backoff;

pub use backoff::{BackoffPolicy, Jitter};
