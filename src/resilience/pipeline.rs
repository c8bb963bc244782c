use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::option_duration_serde;
use crate::error::Result;
use crate::resilience::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::resilience::retry::{RetryConfig, RetryOn, RetryPolicy};
use crate::resilience::timeout::with_timeout;

/// Stage parameters for one [`ResiliencePipeline`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Bound on the whole retry sequence; `None` disables the timeout stage
    #[serde(default, with = "option_duration_serde")]
    pub timeout: Option<Duration>,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::outgoing_calls()
    }
}

impl PipelineConfig {
    /// Timeout(5s) -> Retry(3, transient) -> CircuitBreaker(window 30s)
    pub fn outgoing_calls() -> Self {
        Self {
            timeout: Some(Duration::from_secs(5)),
            retry: RetryConfig {
                retry_on: RetryOn::Transient,
                ..RetryConfig::default()
            },
            circuit_breaker: CircuitBreakerConfig::outgoing(),
        }
    }

    /// Retry(3, any failure) -> CircuitBreaker(window 10s), no timeout
    pub fn dependency_startup() -> Self {
        Self {
            timeout: None,
            retry: RetryConfig {
                retry_on: RetryOn::AnyFailure,
                ..RetryConfig::default()
            },
            circuit_breaker: CircuitBreakerConfig::startup(),
        }
    }
}

/// Timeout -> Retry -> CircuitBreaker, outermost first.
///
/// The timeout bounds the entire retry sequence; the breaker sees every
/// individual attempt. Cloning shares the breaker state.
#[derive(Debug, Clone)]
pub struct ResiliencePipeline {
    timeout: Option<Duration>,
    retry: RetryPolicy,
    breaker: Arc<CircuitBreaker>,
}

impl ResiliencePipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            timeout: config.timeout,
            retry: RetryPolicy::new(config.retry),
            breaker: Arc::new(CircuitBreaker::new(config.circuit_breaker)),
        }
    }

    /// Pipeline for outgoing runtime calls
    pub fn outgoing_calls() -> Self {
        Self::new(PipelineConfig::outgoing_calls())
    }

    /// Pipeline driving the startup dependency probes
    pub fn dependency_startup() -> Self {
        Self::new(PipelineConfig::dependency_startup())
    }

    /// Replace the retry stage, e.g. to install a custom predicate.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Run `operation` through every stage.
    ///
    /// `operation` is only invoked for attempts the breaker admits.
    pub async fn execute<T, F, Fut>(&self, cancel: &CancellationToken, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let breaker: &CircuitBreaker = &self.breaker;
        let attempt = move || {
            let admitted = breaker
                .try_acquire()
                .map(|permit| (permit, operation()));
            async move {
                let (permit, call) = admitted?;
                let outcome = call.await;
                permit.record(&outcome);
                outcome
            }
        };

        let retried = self.retry.execute(cancel, attempt);
        let outcome = match self.timeout {
            Some(limit) => with_timeout(limit, retried).await,
            None => retried.await,
        };

        match &outcome {
            Ok(_) => debug!(breaker = breaker.name(), "Pipeline call succeeded"),
            Err(err) if err.is_cancelled() => {
                debug!(breaker = breaker.name(), "Pipeline call cancelled")
            }
            Err(err) => warn!(breaker = breaker.name(), error = %err, "Pipeline call failed"),
        }

        outcome
    }
}
