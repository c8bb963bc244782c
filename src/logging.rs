use std::sync::Once;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// Ensure initialization happens only once
static INIT: Once = Once::new();

fn env_filter() -> EnvFilter {
    // Default to 'info' level if RUST_LOG is not specified
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize the logging system with sensible defaults.
///
/// Log level can be set using the RUST_LOG environment variable.
/// Example: RUST_LOG=debug,readiness_gate=trace
pub fn init() {
    INIT.call_once(|| {
        tracing_subscriber::registry()
            .with(env_filter())
            .with(
                fmt::layer()
                    .with_target(true) // Include module path in logs
                    .with_thread_ids(true) // gate task vs. request handlers
                    .with_line_number(true),
            )
            .init();

        tracing::info!("Logging initialized");
    });
}

/// Same as [`init`] but emits one JSON object per event, for log shippers.
pub fn init_json() {
    INIT.call_once(|| {
        tracing_subscriber::registry()
            .with(env_filter())
            .with(fmt::layer().json().with_current_span(true))
            .init();

        tracing::info!(format = "json", "Logging initialized");
    });
}

/// Macro for logging the outcome of a single probe attempt
#[macro_export]
macro_rules! probe_event {
    ($probe:expr, $success:expr, $elapsed_ms:expr) => {
        tracing::debug!(
            probe = $probe,
            success = $success,
            elapsed_ms = $elapsed_ms,
            "Probe attempt"
        )
    };
}

/// Macro for logging circuit breaker state transitions
#[macro_export]
macro_rules! breaker_transition {
    ($breaker:expr, $from:expr, $to:expr) => {
        tracing::info!(
            breaker = $breaker,
            from = ?$from,
            to = ?$to,
            "Circuit breaker transition"
        )
    };
}
