use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{GateError, Result};
use crate::resilience::backoff::BackoffSchedule;

/// Which failures the retry stage re-attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryOn {
    /// Every failure except cancellation
    AnyFailure,
    /// Transport failures, timeouts and timeout-or-server-error responses
    Transient,
}

impl RetryOn {
    pub fn matches(&self, err: &GateError) -> bool {
        match self {
            RetryOn::AnyFailure => true,
            RetryOn::Transient => err.is_transient(),
        }
    }
}

/// Configuration for retry strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of additional attempts after the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    /// Delay before each retry, indexed by attempt
    #[serde(default)]
    pub backoff: BackoffSchedule,
    /// Failure classes that are retried
    #[serde(default = "default_retry_on")]
    pub retry_on: RetryOn,
}

fn default_max_attempts() -> usize {
    3
}

fn default_retry_on() -> RetryOn {
    RetryOn::AnyFailure
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff: BackoffSchedule::default(),
            retry_on: default_retry_on(),
        }
    }
}

type RetryPredicate = Arc<dyn Fn(&GateError) -> bool + Send + Sync>;

/// Retry stage: re-invokes a failing operation following a [`BackoffSchedule`].
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: usize,
    backoff: BackoffSchedule,
    should_retry: RetryPredicate,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .finish()
    }
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        let retry_on = config.retry_on;
        Self {
            max_attempts: config.max_attempts,
            backoff: config.backoff,
            should_retry: Arc::new(move |err| retry_on.matches(err)),
        }
    }

    /// Replace the retry predicate with a custom one.
    pub fn retry_if<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&GateError) -> bool + Send + Sync + 'static,
    {
        self.should_retry = Arc::new(predicate);
        self
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn backoff(&self) -> &BackoffSchedule {
        &self.backoff
    }

    /// Run `operation`, retrying matching failures.
    ///
    /// Returns the first success, the first non-retryable failure unchanged,
    /// `RetryExhausted` carrying the last failure, or `Cancelled` as soon as
    /// `cancel` fires (including mid-attempt and mid-delay).
    pub async fn execute<T, F, Fut>(&self, cancel: &CancellationToken, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;

        loop {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(GateError::Cancelled),
                outcome = operation() => outcome,
            };

            let err = match outcome {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(GateError::Cancelled) => return Err(GateError::Cancelled),
                Err(err) => err,
            };

            if !(self.should_retry)(&err) {
                debug!(attempt, error = %err, "Failure is not retryable");
                return Err(err);
            }

            if attempt >= self.max_attempts {
                warn!(attempts = attempt + 1, error = %err, "Retry attempts exhausted");
                return Err(GateError::RetryExhausted {
                    attempts: attempt + 1,
                    last: Box::new(err),
                });
            }

            let delay = self.backoff.delay_for(attempt);
            warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Operation failed, retrying"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(GateError::Cancelled),
                _ = time::sleep(delay) => {}
            }

            attempt += 1;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}
