use tokio::sync::watch;

use crate::error::{GateError, Result};

/// One-way readiness flag: starts false, can be set true exactly once.
///
/// The latch itself is the only writer and is meant to be owned by the
/// [`DependencyGate`](crate::readiness::DependencyGate); everyone else reads
/// through a [`ReadinessHandle`].
#[derive(Debug)]
pub struct ReadinessLatch {
    tx: watch::Sender<bool>,
}

impl ReadinessLatch {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Read-only view for publishers
    pub fn handle(&self) -> ReadinessHandle {
        ReadinessHandle {
            rx: self.tx.subscribe(),
        }
    }

    pub fn is_ready(&self) -> bool {
        *self.tx.borrow()
    }

    /// Flip to ready. Returns true only for the call that performed the flip.
    pub fn mark_ready(&self) -> bool {
        self.tx.send_if_modified(|ready| {
            if *ready {
                false
            } else {
                *ready = true;
                true
            }
        })
    }
}

impl Default for ReadinessLatch {
    fn default() -> Self {
        Self::new()
    }
}

/// Cheap, cloneable read access to a [`ReadinessLatch`]
#[derive(Debug, Clone)]
pub struct ReadinessHandle {
    rx: watch::Receiver<bool>,
}

impl ReadinessHandle {
    pub fn is_ready(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the latch is set. Fails with `Cancelled` if the latch
    /// was dropped before ever becoming ready.
    pub async fn wait_ready(&self) -> Result<()> {
        let mut rx = self.rx.clone();
        rx.wait_for(|ready| *ready)
            .await
            .map(|_| ())
            .map_err(|_| GateError::Cancelled)
    }
}
