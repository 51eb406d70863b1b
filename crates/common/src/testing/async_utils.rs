//! Async testing utilities
//!
//! Provides async-specific test helpers and assertions.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::future::Future;
use std::time::Duration;

/// Assert that a condition eventually becomes true within a timeout.
///
/// The condition is an async block re-evaluated every 10ms.
#[macro_export]
macro_rules! assert_eventually_async {
    ($timeout:expr, $fut:expr) => {{
        let timeout_duration = $timeout;
        let result = tokio::time::timeout(timeout_duration, async {
            loop {
                if $fut.await {
                    break;
                }
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        })
        .await;

        assert!(result.is_ok(), "Condition did not become true within {:?}", timeout_duration);
    }};
}

/// Assert that a condition stays false for the whole window.
///
/// Used to check that something does *not* happen (e.g. no callback fires
/// while a request is parked offline).
#[macro_export]
macro_rules! assert_never_async {
    ($window:expr, $fut:expr) => {{
        let window = $window;
        let deadline = tokio::time::Instant::now() + window;
        while tokio::time::Instant::now() < deadline {
            assert!(!$fut.await, "Condition became true within {:?}", window);
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    }};
}

/// Wait for a future to complete with a timeout, returning a Result
pub async fn timeout_ok<F, T>(duration: Duration, fut: F) -> Result<T, tokio::time::error::Elapsed>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(duration, fut).await
}
