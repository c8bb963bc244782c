use std::future::Future;
use std::time::Duration;
use tokio::time;
use tracing::warn;

use crate::error::{GateError, Result};

/// Bound `operation` by `limit`, dropping it and reporting `Timeout` on expiry.
pub async fn with_timeout<T, Fut>(limit: Duration, operation: Fut) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    match time::timeout(limit, operation).await {
        Ok(outcome) => outcome,
        Err(_) => {
            warn!(timeout_ms = limit.as_millis() as u64, "Operation timed out");
            Err(GateError::Timeout(limit))
        }
    }
}
