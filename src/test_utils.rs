// src/test_utils.rs

use super::error::{GateError, Result};
use super::probes::Probe;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Scripted behaviour for a [`MockProbe`]
#[derive(Debug, Clone, Copy)]
pub enum Script {
    AlwaysSucceeds,
    AlwaysFails,
    /// Fails the first `n` attempts, succeeds afterwards
    FailsThenSucceeds(usize),
    /// Waits for the given time (cancellable) before succeeding
    Slow(Duration),
}

/// Probe recording every attempt, with scripted outcomes
#[derive(Debug)]
pub struct MockProbe {
    name: String,
    script: Script,
    calls: AtomicUsize,
    started: Instant,
    call_times: Mutex<Vec<Duration>>,
}

impl MockProbe {
    pub fn new(name: &str, script: Script) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            script,
            calls: AtomicUsize::new(0),
            started: Instant::now(),
            call_times: Mutex::new(Vec::new()),
        })
    }

    pub fn succeeding(name: &str) -> Arc<Self> {
        Self::new(name, Script::AlwaysSucceeds)
    }

    pub fn failing(name: &str) -> Arc<Self> {
        Self::new(name, Script::AlwaysFails)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Whole seconds since probe creation at which each attempt started
    pub fn call_secs(&self) -> Vec<u64> {
        self.call_times
            .lock()
            .unwrap()
            .iter()
            .map(Duration::as_secs)
            .collect()
    }
}

#[async_trait]
impl Probe for MockProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn attempt(&self, cancel: &CancellationToken) -> Result<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.call_times
            .lock()
            .unwrap()
            .push(self.started.elapsed());

        match self.script {
            Script::AlwaysSucceeds => Ok(()),
            Script::AlwaysFails => Err(GateError::Transport(format!(
                "{} unreachable",
                self.name
            ))),
            Script::FailsThenSucceeds(n) if call < n => Err(GateError::Transport(format!(
                "{} unreachable (attempt {})",
                self.name, call
            ))),
            Script::FailsThenSucceeds(_) => Ok(()),
            Script::Slow(delay) => {
                tokio::select! {
                    _ = cancel.cancelled() => Err(GateError::Cancelled),
                    _ = tokio::time::sleep(delay) => Ok(()),
                }
            }
        }
    }
}

/// Erase mock probe types for the gate
pub fn as_probes(probes: &[Arc<MockProbe>]) -> Vec<Arc<dyn Probe>> {
    probes
        .iter()
        .map(|p| Arc::clone(p) as Arc<dyn Probe>)
        .collect()
}
