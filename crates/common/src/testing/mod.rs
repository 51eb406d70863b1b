//! Testing utilities and helpers
//!
//! - **[`async_utils`]**: eventual/never assertions and timeout helpers for
//!   tests that observe background tasks
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! # async fn example(flag: std::sync::Arc<std::sync::atomic::AtomicBool>) {
//! netrelay_common::assert_eventually_async!(Duration::from_secs(1), async {
//!     flag.load(std::sync::atomic::Ordering::SeqCst)
//! });
//! # }
//! ```

pub mod async_utils;

pub use async_utils::timeout_ok;
