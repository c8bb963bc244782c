use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::durations_serde;

/// Fixed, non-randomized backoff schedule indexed by attempt number.
///
/// The last entry repeats for every attempt past the end of the schedule, so
/// the default `[1s, 3s, 9s]` yields 1s, 3s, 9s, 9s, 9s...
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackoffSchedule {
    #[serde(with = "durations_serde")]
    delays: Vec<Duration>,
}

impl Default for BackoffSchedule {
    fn default() -> Self {
        Self::new(vec![
            Duration::from_secs(1),
            Duration::from_secs(3),
            Duration::from_secs(9),
        ])
    }
}

impl BackoffSchedule {
    /// Create a schedule from explicit delays
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    /// Delay to wait after the failure of the given 0-based attempt.
    ///
    /// An empty schedule never waits.
    pub fn delay_for(&self, attempt: usize) -> Duration {
        match self.delays.last() {
            Some(last) => self.delays.get(attempt).copied().unwrap_or(*last),
            None => Duration::ZERO,
        }
    }

    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    pub fn is_empty(&self) -> bool {
        self.delays.is_empty()
    }
}
