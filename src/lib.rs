// library entry
pub mod config;
pub mod error;
pub mod logging;
pub mod probes;
pub mod readiness;
pub mod resilience;

#[cfg(test)]
pub(crate) mod test_utils;

#[cfg(test)]
mod tests;

// Re-export key components for convenience
pub use config::Settings;
pub use error::{GateError, Result};
pub use logging::init as init_logging;
pub use probes::Probe;
pub use readiness::{
    wait_for_dependencies, DependencyGate, GateConfig, ReadinessCheck, ReadinessHandle,
    ReadinessLatch,
};
pub use resilience::ResiliencePipeline;
