// src/probes/mod.rs

pub mod http;
pub mod redis;
pub mod tcp;

pub use self::http::HttpProbe;
pub use self::redis::RedisProbe;
pub use self::tcp::TcpProbe;

use super::error::{GateError, Result};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt;
use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Core trait that all dependency checks must implement
///
/// An attempt either returns `Ok(())` (the dependency is reachable) or an
/// error describing why not. Implementations must bound their own running
/// time, release anything they opened on every exit path, and return
/// `GateError::Cancelled` promptly once `cancel` fires.
#[async_trait]
pub trait Probe: Send + Sync + Debug {
    // Stable name used in logs and failure reports
    fn name(&self) -> &str;

    // Performs one reachability check
    async fn attempt(&self, cancel: &CancellationToken) -> Result<()>;
}

/// Races `check` against `cancel` and `limit`; shared by the bundled probes.
pub(crate) async fn bounded<Fut>(cancel: &CancellationToken, limit: Duration, check: Fut) -> Result<()>
where
    Fut: Future<Output = Result<()>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(GateError::Cancelled),
        outcome = tokio::time::timeout(limit, check) => {
            outcome.unwrap_or(Err(GateError::Timeout(limit)))
        }
    }
}

type CheckFn = dyn Fn(CancellationToken) -> BoxFuture<'static, Result<()>> + Send + Sync;

/// Probe backed by a closure, for checks the crate does not ship
/// (message brokers, custom handshakes...).
///
/// ```rust,no_run
/// use futures::FutureExt;
/// use readiness_gate::probes::FnProbe;
///
/// let probe = FnProbe::new("broker", |_cancel| {
///     async move {
///         // open a connection, open a channel, close both
///         Ok::<(), readiness_gate::GateError>(())
///     }
///     .boxed()
/// });
/// ```
pub struct FnProbe {
    name: String,
    check: Box<CheckFn>,
}

impl FnProbe {
    pub fn new<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(CancellationToken) -> BoxFuture<'static, Result<()>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            check: Box::new(check),
        }
    }
}

impl Debug for FnProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnProbe").field("name", &self.name).finish()
    }
}

#[async_trait]
impl Probe for FnProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn attempt(&self, cancel: &CancellationToken) -> Result<()> {
        (self.check)(cancel.clone()).await
    }
}
