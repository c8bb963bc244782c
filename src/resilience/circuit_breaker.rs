use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::breaker_transition;
use crate::config::duration_serde;
use crate::error::{GateError, Result};

/// The state of the circuit breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CircuitState {
    /// Circuit is closed, requests flow normally
    Closed,
    /// Circuit is open, requests fail without being sent
    Open,
    /// A single trial request is in flight to test recovery
    HalfOpen,
}

/// Configuration for circuit breaker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Name used in logs and `CircuitOpen` errors
    #[serde(default = "default_name")]
    pub name: String,
    /// Failure ratio within the window at which the circuit opens
    #[serde(default = "default_failure_ratio")]
    pub failure_ratio: f64,
    /// Samples required in the window before the ratio is evaluated
    #[serde(default = "default_minimum_throughput")]
    pub minimum_throughput: usize,
    /// Age beyond which samples leave the window
    #[serde(default = "default_window", with = "duration_serde")]
    pub sampling_duration: Duration,
    /// How long the circuit stays open before admitting a trial call
    #[serde(default = "default_break", with = "duration_serde")]
    pub break_duration: Duration,
}

fn default_name() -> String {
    "outgoing".to_string()
}

fn default_failure_ratio() -> f64 {
    1.0
}

fn default_minimum_throughput() -> usize {
    5
}

fn default_window() -> Duration {
    Duration::from_secs(30)
}

fn default_break() -> Duration {
    Duration::from_secs(30)
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self::outgoing()
    }
}

impl CircuitBreakerConfig {
    /// Breaker guarding outgoing runtime calls
    pub fn outgoing() -> Self {
        Self {
            name: default_name(),
            failure_ratio: default_failure_ratio(),
            minimum_throughput: default_minimum_throughput(),
            sampling_duration: default_window(),
            break_duration: default_break(),
        }
    }

    /// Breaker guarding the startup dependency pipeline
    pub fn startup() -> Self {
        Self {
            name: "startup".to_string(),
            sampling_duration: Duration::from_secs(10),
            ..Self::outgoing()
        }
    }
}

/// Point-in-time view of the breaker, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub samples: usize,
    pub failures: usize,
}

#[derive(Debug, Clone, Copy)]
enum BreakerState {
    Closed,
    Open { opened_at: Instant },
    // the trial call is always in flight while half-open
    HalfOpen { opened_at: Instant },
}

impl BreakerState {
    fn public(&self) -> CircuitState {
        match self {
            BreakerState::Closed => CircuitState::Closed,
            BreakerState::Open { .. } => CircuitState::Open,
            BreakerState::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    /// (timestamp, success) pairs, oldest first
    window: VecDeque<(Instant, bool)>,
}

impl Inner {
    fn prune(&mut self, now: Instant, sampling: Duration) {
        while let Some((at, _)) = self.window.front() {
            if now.saturating_duration_since(*at) >= sampling {
                self.window.pop_front();
            } else {
                break;
            }
        }
    }

    fn failures(&self) -> usize {
        self.window.iter().filter(|(_, ok)| !ok).count()
    }
}

/// Failure-ratio circuit breaker.
///
/// Shared by every call through one pipeline; all transitions happen under a
/// single lock acquisition which is never held across an await point.
#[derive(Debug)]
pub struct CircuitBreaker {
    inner: Mutex<Inner>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given configuration
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                window: VecDeque::new(),
            }),
            config,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Current state. An open circuit whose break has elapsed still reports
    /// `Open` until the next call claims the trial.
    pub fn state(&self) -> CircuitState {
        self.lock().state.public()
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let mut inner = self.lock();
        inner.prune(Instant::now(), self.config.sampling_duration);
        BreakerSnapshot {
            state: inner.state.public(),
            samples: inner.window.len(),
            failures: inner.failures(),
        }
    }

    fn open_error(&self) -> GateError {
        GateError::CircuitOpen {
            name: self.config.name.clone(),
        }
    }

    /// Ask to make a call. Fails fast with `CircuitOpen` when open, or when
    /// half-open with the trial already in flight.
    pub fn try_acquire(&self) -> Result<CallPermit<'_>> {
        let now = Instant::now();
        let mut inner = self.lock();

        match inner.state {
            BreakerState::Closed => Ok(CallPermit::new(self, false)),
            BreakerState::Open { opened_at } => {
                if now.saturating_duration_since(opened_at) >= self.config.break_duration {
                    inner.state = BreakerState::HalfOpen { opened_at };
                    breaker_transition!(
                        self.config.name.as_str(),
                        CircuitState::Open,
                        CircuitState::HalfOpen
                    );
                    Ok(CallPermit::new(self, true))
                } else {
                    Err(self.open_error())
                }
            }
            BreakerState::HalfOpen { .. } => {
                debug!(breaker = %self.config.name, "Trial call in flight, rejecting");
                Err(self.open_error())
            }
        }
    }

    /// Run `operation` through the breaker. The operation is not invoked at
    /// all when the call is rejected.
    pub async fn execute<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let permit = self.try_acquire()?;
        let outcome = operation().await;
        permit.record(&outcome);
        outcome
    }

    fn on_success(&self, trial: bool) {
        let now = Instant::now();
        let mut inner = self.lock();

        match inner.state {
            BreakerState::HalfOpen { .. } if trial => {
                inner.state = BreakerState::Closed;
                inner.window.clear();
                breaker_transition!(
                    self.config.name.as_str(),
                    CircuitState::HalfOpen,
                    CircuitState::Closed
                );
            }
            BreakerState::Closed => {
                inner.window.push_back((now, true));
                inner.prune(now, self.config.sampling_duration);
            }
            // late result of a call admitted before the circuit opened
            _ => {}
        }
    }

    fn on_failure(&self, trial: bool) {
        let now = Instant::now();
        let mut inner = self.lock();

        match inner.state {
            BreakerState::HalfOpen { .. } if trial => {
                inner.state = BreakerState::Open { opened_at: now };
                breaker_transition!(
                    self.config.name.as_str(),
                    CircuitState::HalfOpen,
                    CircuitState::Open
                );
            }
            BreakerState::Closed => {
                inner.window.push_back((now, false));
                inner.prune(now, self.config.sampling_duration);

                let samples = inner.window.len();
                if samples < self.config.minimum_throughput {
                    return;
                }

                let failures = inner.failures();
                let ratio = failures as f64 / samples as f64;
                if ratio >= self.config.failure_ratio {
                    inner.state = BreakerState::Open { opened_at: now };
                    warn!(
                        breaker = %self.config.name,
                        failures,
                        samples,
                        ratio,
                        "Circuit breaker opened"
                    );
                }
            }
            _ => {}
        }
    }

    fn on_abandoned(&self, trial: bool) {
        if !trial {
            return;
        }

        let mut inner = self.lock();
        if let BreakerState::HalfOpen { opened_at } = inner.state {
            // keep the elapsed break so the next caller becomes the trial
            inner.state = BreakerState::Open { opened_at };
            debug!(breaker = %self.config.name, "Trial call abandoned");
        }
    }
}

/// Admission to make one call through a [`CircuitBreaker`].
///
/// Dropping a permit without recording an outcome (the call was cancelled or
/// timed out from outside) records nothing, and releases the half-open trial.
#[must_use = "the call outcome must be recorded"]
#[derive(Debug)]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    settled: bool,
}

impl<'a> CallPermit<'a> {
    fn new(breaker: &'a CircuitBreaker, trial: bool) -> Self {
        Self {
            breaker,
            trial,
            settled: false,
        }
    }

    /// Whether this permit is the half-open trial
    pub fn is_trial(&self) -> bool {
        self.trial
    }

    pub fn record<T>(mut self, outcome: &Result<T>) {
        self.settled = true;
        match outcome {
            Ok(_) => self.breaker.on_success(self.trial),
            Err(GateError::Cancelled) => self.breaker.on_abandoned(self.trial),
            Err(_) => self.breaker.on_failure(self.trial),
        }
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.on_abandoned(self.trial);
        }
    }
}
