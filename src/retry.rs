// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bounded retry with fixed backoff.
//!
//! One reusable unit for "attempt, classify, maybe wait, attempt again"
//! instead of ad hoc retry loops at every call site. The classification is
//! the caller's job; the budget and the waiting live here.

use crate::error::{Result, SyncError};
use std::future::Future;
use std::time::Duration;

/// Retry budget and backoff for an operation.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of retries (not counting the initial attempt).
    pub max_retries: u32,
    /// Fixed delay between attempts. A rate-limit hint from the provider
    /// overrides this for that attempt.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_secs(2),
        }
    }
}

/// Outcome of a single attempt.
pub enum Attempt<T> {
    /// Operation succeeded.
    Ok(T),
    /// Failed with a transient error (429, 5xx, timeout); may be retried.
    Transient(SyncError),
    /// Failed permanently; retrying would not help.
    Fatal(SyncError),
}

impl<T> Attempt<T> {
    /// Classify a result by the error's own transience.
    pub fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(value) => Attempt::Ok(value),
            Err(e) if e.is_transient() => Attempt::Transient(e),
            Err(e) => Attempt::Fatal(e),
        }
    }
}

/// Run `operation` until it succeeds, fails permanently, or the retry
/// budget is spent. The closure receives the current attempt number
/// (0-indexed) and returns an [`Attempt`].
pub async fn retry_with_backoff<F, Fut, T>(policy: RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Attempt<T>>,
{
    let mut attempt = 0u32;
    loop {
        match operation(attempt).await {
            Attempt::Ok(value) => return Ok(value),
            Attempt::Fatal(err) => return Err(err),
            Attempt::Transient(err) => {
                if attempt >= policy.max_retries {
                    return Err(err);
                }
                let wait = err.retry_after().unwrap_or(policy.delay);
                tracing::warn!(
                    attempt = attempt + 1,
                    max = policy.max_retries,
                    wait_ms = wait.as_millis() as u64,
                    error = %err,
                    "Retrying after transient error"
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
        }
    }
}
