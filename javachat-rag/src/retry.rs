//! Bounded retry with exponential backoff, per-attempt deadlines and cancellation.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::cancel::CancellationToken;
use crate::config::RetrySettings;
use crate::error::{RagError, Result};

/// Runs a fallible async operation under a retry policy.
///
/// `operation` is invoked once per attempt. Implementations must stop as
/// soon as `cancel` fires and must not retry non-transient errors.
pub trait RetryExecutor: Send + Sync {
    fn execute<T, F, Fut>(
        &self,
        label: &str,
        timeout: Duration,
        cancel: &CancellationToken,
        operation: F,
    ) -> impl Future<Output = Result<T>> + Send
    where
        T: Send,
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send;
}

/// Retries transient failures with exponential backoff.
///
/// Each attempt is bounded by `timeout`; a timed-out attempt counts as a
/// transient failure. Backoff sleeps are interrupted by cancellation.
#[derive(Debug, Clone, Default)]
pub struct BackoffRetryExecutor {
    settings: RetrySettings,
}

impl BackoffRetryExecutor {
    pub fn new(settings: RetrySettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &RetrySettings {
        &self.settings
    }
}

impl RetryExecutor for BackoffRetryExecutor {
    fn execute<T, F, Fut>(
        &self,
        label: &str,
        timeout: Duration,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> impl Future<Output = Result<T>> + Send
    where
        T: Send,
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
    {
        async move {
            let max_attempts = self.settings.max_attempts.max(1);
            let cancelled = || RagError::Cancelled { operation: label.to_string() };
            let mut attempt = 0;

            loop {
                attempt += 1;
                if cancel.is_cancelled() {
                    return Err(cancelled());
                }

                let result = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(cancelled()),
                    outcome = tokio::time::timeout(timeout, operation()) => match outcome {
                        Ok(result) => result,
                        Err(_) => Err(RagError::Timeout { operation: label.to_string(), timeout }),
                    },
                };

                match result {
                    Ok(value) => {
                        if attempt > 1 {
                            debug!(label, attempt, "operation succeeded after retry");
                        }
                        return Ok(value);
                    }
                    Err(e) if e.is_transient() && attempt < max_attempts => {
                        let delay = self.settings.backoff_for(attempt);
                        warn!(
                            label,
                            attempt,
                            max_attempts,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "transient failure, retrying"
                        );
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => return Err(cancelled()),
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                    Err(e) => {
                        if e.is_transient() {
                            error!(label, attempt, error = %e, "retries exhausted");
                        }
                        return Err(e);
                    }
                }
            }
        }
    }
}
