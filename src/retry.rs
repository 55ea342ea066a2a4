// Copyright (c) 2025 - Cowboy AI, Inc.
//! Bounded Retry for Provider Calls
//!
//! Throttled and transient provider errors are retried with exponential
//! backoff. Every attempt is bounded by the configured creation timeout.
//! Cancellation stops further attempts; an attempt already in flight runs
//! until it returns or times out.

use backon::{ExponentialBuilder, Retryable};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::RetryConfig;
use crate::domain::LogicalId;
use crate::provider::ProviderError;

/// Backoff schedule derived from the retry policy
pub fn backoff(config: &RetryConfig) -> ExponentialBuilder {
    let builder = ExponentialBuilder::default()
        .with_min_delay(config.initial_delay)
        .with_max_delay(config.max_delay)
        .with_max_times(config.max_attempts.saturating_sub(1) as usize);

    if config.jitter {
        builder.with_jitter()
    } else {
        builder
    }
}

/// Run `op` until it succeeds, fails permanently, or attempts run out
///
/// Each attempt is wrapped in `timeout`. A timed-out attempt is reported as
/// [`ProviderError::Timeout`] and is not retried.
pub async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    timeout: Duration,
    cancel: &CancellationToken,
    resource: &LogicalId,
    op: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut op = op;
    let attempt = || {
        let call = op();
        async move {
            if cancel.is_cancelled() {
                return Err(ProviderError::Cancelled);
            }
            tokio::time::timeout(timeout, call)
                .await
                .map_err(|_| ProviderError::Timeout(timeout))?
        }
    };

    attempt
        .retry(backoff(config))
        .when(|e| e.is_retryable() && !cancel.is_cancelled())
        .notify(|e, dur| {
            warn!(
                resource = %resource,
                delay = ?dur,
                error = %e,
                "Provider call failed, retrying"
            );
        })
        .await
}
