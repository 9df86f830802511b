//! Retry policy for model calls.
//!
//! [`RetryPolicy::run`] wraps a fallible async operation. Errors accepted by
//! `retry_on` are retried after a fixed back-off until `max_attempts` calls
//! have been made; anything else is returned immediately.

use std::future::Future;
use std::time::Duration;

use firmscope_shared::{ExtractionSettings, FirmscopeError, Result};
use tracing::warn;

/// Default predicate: transient failures plus envelope problems.
///
/// A malformed envelope from the provider (e.g. no choices) is usually a
/// gateway hiccup, unlike malformed *content*, which is never retried.
pub fn is_retriable(err: &FirmscopeError) -> bool {
    err.is_transient() || matches!(err, FirmscopeError::MalformedResponse(_))
}

/// How often and when to repeat a failed call.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total calls allowed, first attempt included. Zero behaves as one.
    pub max_attempts: u32,
    /// Sleep between attempts. Never applied after the final attempt.
    pub backoff: Duration,
    /// Which errors are worth another attempt.
    pub retry_on: fn(&FirmscopeError) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(3, Duration::from_secs(2))
    }
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
            retry_on: is_retriable,
        }
    }

    pub fn from_settings(settings: &ExtractionSettings) -> Self {
        Self::fixed(
            settings.max_attempts,
            Duration::from_millis(settings.retry_backoff_ms),
        )
    }

    /// Run `operation` under this policy.
    ///
    /// When every attempt fails with a retriable error the result is
    /// [`FirmscopeError::ExtractionFailed`] carrying the attempt count and the
    /// last error message.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if !(self.retry_on)(&err) => return Err(err),
                Err(err) => {
                    if attempt >= max_attempts {
                        warn!(attempt, max_attempts, error = %err, "{label}: retries exhausted");
                        return Err(FirmscopeError::ExtractionFailed {
                            attempts: attempt,
                            last_error: err.to_string(),
                        });
                    }
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = self.backoff.as_millis() as u64,
                        error = %err,
                        "{label}: attempt failed, retrying after back-off"
                    );
                    if !self.backoff.is_zero() {
                        tokio::time::sleep(self.backoff).await;
                    }
                }
            }
        }
    }
}
