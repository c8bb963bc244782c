use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::{duration_serde, option_duration_serde, validate_pipeline};
use crate::error::{GateError, Result};
use crate::probe_event;
use crate::probes::Probe;
use crate::readiness::latch::{ReadinessHandle, ReadinessLatch};
use crate::resilience::{with_timeout, CircuitState, PipelineConfig, ResiliencePipeline};

/// Configuration for the dependency gate loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Wait before the next round when the breaker is open
    #[serde(default = "default_open_circuit_delay", with = "duration_serde")]
    pub open_circuit_delay: Duration,
    /// Wait before the next round after retries were exhausted
    #[serde(default = "default_retry_exhausted_delay", with = "duration_serde")]
    pub retry_exhausted_delay: Duration,
    /// Upper bound on a single probe attempt; `None` trusts the probe's own timeout
    #[serde(
        default = "default_probe_timeout",
        with = "option_duration_serde"
    )]
    pub probe_timeout: Option<Duration>,
    /// Pipeline every round runs through
    #[serde(default = "PipelineConfig::dependency_startup")]
    pub pipeline: PipelineConfig,
}

fn default_open_circuit_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_retry_exhausted_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_probe_timeout() -> Option<Duration> {
    Some(Duration::from_secs(10))
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            open_circuit_delay: default_open_circuit_delay(),
            retry_exhausted_delay: default_retry_exhausted_delay(),
            probe_timeout: default_probe_timeout(),
            pipeline: PipelineConfig::dependency_startup(),
        }
    }
}

impl GateConfig {
    pub fn validate(&self) -> Result<()> {
        if self.probe_timeout == Some(Duration::ZERO) {
            return Err(GateError::Config("probe_timeout must be non-zero".to_string()));
        }
        validate_pipeline(&self.pipeline)
    }
}

/// Drives the probe set through a resilience pipeline until one full round
/// succeeds, then sets the readiness latch. Never re-checks afterwards.
#[derive(Debug)]
pub struct DependencyGate {
    probes: Vec<Arc<dyn Probe>>,
    pipeline: ResiliencePipeline,
    latch: ReadinessLatch,
    config: GateConfig,
}

impl DependencyGate {
    /// Probes run in the given order every round.
    pub fn new(probes: Vec<Arc<dyn Probe>>, latch: ReadinessLatch, config: GateConfig) -> Self {
        Self {
            pipeline: ResiliencePipeline::new(config.pipeline.clone()),
            probes,
            latch,
            config,
        }
    }

    /// Use a pre-built pipeline instead of one built from the config.
    pub fn with_pipeline(mut self, pipeline: ResiliencePipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn readiness(&self) -> ReadinessHandle {
        self.latch.handle()
    }

    pub fn pipeline(&self) -> &ResiliencePipeline {
        &self.pipeline
    }

    pub fn probe_count(&self) -> usize {
        self.probes.len()
    }

    /// Run the gate on its own task.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<Result<()>> {
        tokio::spawn(self.run(cancel))
    }

    /// Loop until ready (`Ok`) or cancelled (`Err(Cancelled)`).
    ///
    /// Consumes the gate: it runs at most once.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let run_id = Uuid::new_v4();
        let span = info_span!("dependency_gate", %run_id, probes = self.probes.len());
        self.run_loop(cancel).instrument(span).await
    }

    async fn run_loop(&self, cancel: CancellationToken) -> Result<()> {
        if self.probes.is_empty() {
            self.latch.mark_ready();
            info!("No dependencies registered, ready immediately");
            return Ok(());
        }

        let started = Instant::now();
        let mut round: u64 = 0;

        while !self.latch.is_ready() {
            if cancel.is_cancelled() {
                return Err(GateError::Cancelled);
            }

            round += 1;
            debug!(round, "Starting dependency round");

            let err = match self.pipeline.execute(&cancel, || self.run_round(&cancel)).await {
                Ok(()) => {
                    self.latch.mark_ready();
                    info!(
                        round,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "All dependencies ready"
                    );
                    break;
                }
                Err(GateError::Cancelled) => {
                    info!(round, "Dependency gate cancelled");
                    return Err(GateError::Cancelled);
                }
                Err(err) => err,
            };

            let breaker_open = err.is_circuit_open()
                || self.pipeline.circuit_breaker().state() == CircuitState::Open;
            let delay = if breaker_open {
                self.config.open_circuit_delay
            } else {
                self.config.retry_exhausted_delay
            };

            warn!(
                round,
                breaker_open,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Dependencies not ready, waiting before next round"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(round, "Dependency gate cancelled while waiting");
                    return Err(GateError::Cancelled);
                }
                _ = time::sleep(delay) => {}
            }
        }

        Ok(())
    }

    /// One pass over every probe, stopping at the first failure.
    async fn run_round(&self, cancel: &CancellationToken) -> Result<()> {
        for probe in &self.probes {
            let started = Instant::now();
            let attempt = probe.attempt(cancel);
            let outcome = match self.config.probe_timeout {
                Some(limit) => with_timeout(limit, attempt).await,
                None => attempt.await,
            };
            let elapsed_ms = started.elapsed().as_millis() as u64;

            probe_event!(probe.name(), outcome.is_ok(), elapsed_ms);

            if let Err(err) = outcome {
                return Err(GateError::probe(probe.name(), err));
            }
        }

        Ok(())
    }
}

/// Block until every probe has succeeded once, using the default startup
/// pipeline and loop delays.
///
/// Returns `Err(Cancelled)` if `cancel` fires first; never gives up otherwise.
pub async fn wait_for_dependencies(
    probes: Vec<Arc<dyn Probe>>,
    cancel: Option<CancellationToken>,
) -> Result<()> {
    let gate = DependencyGate::new(probes, ReadinessLatch::new(), GateConfig::default());
    gate.run(cancel.unwrap_or_default()).await
}
