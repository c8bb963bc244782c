// src/resilience/tests/mod.rs
//! Tests for resilience features

mod timeout_tests;

// Common test utilities for resilience testing
pub(crate) mod utils {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use crate::error::{GateError, Result};
    use crate::resilience::CircuitBreakerConfig;

    /// Breaker config with a short break for tests
    pub fn breaker_config(minimum_throughput: usize, break_duration: Duration) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            name: "test".to_string(),
            failure_ratio: 1.0,
            minimum_throughput,
            sampling_duration: Duration::from_secs(30),
            break_duration,
        }
    }

    /// Counts invocations and fails the first `failures` of them
    #[derive(Debug, Clone, Default)]
    pub struct FlakyOperation {
        calls: Arc<AtomicUsize>,
        failures: usize,
    }

    impl FlakyOperation {
        pub fn failing_first(failures: usize) -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
                failures,
            }
        }

        pub fn always_failing() -> Self {
            Self::failing_first(usize::MAX)
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub async fn call(&self) -> Result<u32> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(GateError::Transport("connection refused".to_string()))
            } else {
                Ok(42)
            }
        }
    }
}
