// src/resilience/tests/timeout_tests.rs

use std::time::Duration;
use tokio::time::{self, Instant};

use crate::error::GateError;
use crate::resilience::with_timeout;

#[tokio::test(start_paused = true)]
async fn test_fast_operation_passes_through() {
    let result = with_timeout(Duration::from_secs(5), async { Ok::<_, GateError>(7) }).await;
    assert_eq!(result.unwrap(), 7);
}

#[tokio::test(start_paused = true)]
async fn test_inner_failure_passes_through() {
    let result: crate::Result<()> = with_timeout(Duration::from_secs(5), async {
        Err(GateError::Transport("refused".to_string()))
    })
    .await;
    assert!(matches!(result, Err(GateError::Transport(_))));
}

#[tokio::test(start_paused = true)]
async fn test_slow_operation_is_aborted() {
    let start = Instant::now();
    let mut finished = false;

    let result = with_timeout(Duration::from_secs(5), async {
        time::sleep(Duration::from_secs(60)).await;
        finished = true;
        Ok::<_, GateError>(())
    })
    .await;

    assert!(matches!(result, Err(GateError::Timeout(d)) if d == Duration::from_secs(5)));
    assert_eq!(start.elapsed(), Duration::from_secs(5));
    assert!(!finished, "inner future must be dropped on timeout");
}
