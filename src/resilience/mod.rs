// src/resilience/mod.rs
//! Resilience pipeline for calls to external dependencies.
//!
//! Three composable stages, outermost first:
//!
//! 1. **Timeout** - bounds the whole retry sequence, capping caller-observed latency
//! 2. **Retry** - fixed 1s/3s/9s backoff, only for failures matching a predicate
//! 3. **Circuit Breaking** - sheds load from a dependency whose recent calls all failed
//!
//! ```plaintext
//! caller ──► Timeout ──► Retry ──► CircuitBreaker ──► operation
//!                          ▲              │
//!                          └── backoff ◄──┘ (failure)
//! ```

mod backoff;
mod circuit_breaker;
mod pipeline;
mod retry;
mod timeout;

#[cfg(test)]
mod tests;

// Re-export key components
pub use backoff::BackoffSchedule;
pub use circuit_breaker::{
    BreakerSnapshot, CallPermit, CircuitBreaker, CircuitBreakerConfig, CircuitState,
};
pub use pipeline::{PipelineConfig, ResiliencePipeline};
pub use retry::{RetryConfig, RetryOn, RetryPolicy};
pub use timeout::with_timeout;
