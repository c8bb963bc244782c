// for error definitions
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GateError {
    /// A dependency check failed; the underlying cause is kept for diagnostics only
    #[error("Probe '{probe}' failed: {reason}")]
    ProbeFailure { probe: String, reason: String },

    /// Connection-level failure (refused, reset, DNS, TLS...)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The operation did not complete within its bound
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// A response arrived but its status does not indicate success
    #[error("Unexpected response status: {status}")]
    UnexpectedStatus { status: u16 },

    /// Every retry attempt failed
    #[error("All {attempts} attempts exhausted, last error: {last}")]
    RetryExhausted {
        attempts: usize,
        #[source]
        last: Box<GateError>,
    },

    /// The circuit breaker short-circuited the call
    #[error("Circuit '{name}' is open")]
    CircuitOpen { name: String },

    /// Caller requested an abort
    #[error("Operation was cancelled")]
    Cancelled,

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl GateError {
    /// Wraps a probe-level error, keeping cancellation intact.
    pub fn probe(name: &str, err: GateError) -> Self {
        match err {
            GateError::Cancelled => GateError::Cancelled,
            other => GateError::ProbeFailure {
                probe: name.to_string(),
                reason: other.to_string(),
            },
        }
    }

    /// Maps an HTTP status code to `Ok` for 2xx and `UnexpectedStatus` otherwise.
    pub fn from_status(status: u16) -> Result<()> {
        if (200..300).contains(&status) {
            Ok(())
        } else {
            Err(GateError::UnexpectedStatus { status })
        }
    }

    /// Transport failures, timeouts and timeout-or-server-error responses.
    pub fn is_transient(&self) -> bool {
        match self {
            GateError::Transport(_) | GateError::Timeout(_) => true,
            GateError::UnexpectedStatus { status } => *status == 408 || *status >= 500,
            _ => false,
        }
    }

    /// True for `CircuitOpen`, including when it was the last failure of an exhausted retry.
    pub fn is_circuit_open(&self) -> bool {
        match self {
            GateError::CircuitOpen { .. } => true,
            GateError::RetryExhausted { last, .. } => last.is_circuit_open(),
            _ => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, GateError::Cancelled)
    }
}

impl From<redis::RedisError> for GateError {
    fn from(err: redis::RedisError) -> Self {
        GateError::Transport(err.to_string())
    }
}

// implement conversions from serde_json::Error to GateError
impl From<serde_json::Error> for GateError {
    fn from(err: serde_json::Error) -> Self {
        GateError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for GateError {
    fn from(err: std::io::Error) -> Self {
        GateError::Transport(err.to_string())
    }
}

// define a Result type alias for convenience
pub type Result<T> = std::result::Result<T, GateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(GateError::Transport("refused".to_string()).is_transient());
        assert!(GateError::Timeout(Duration::from_secs(5)).is_transient());
        assert!(GateError::UnexpectedStatus { status: 503 }.is_transient());
        assert!(GateError::UnexpectedStatus { status: 408 }.is_transient());
        assert!(!GateError::UnexpectedStatus { status: 404 }.is_transient());
        assert!(!GateError::CircuitOpen { name: "x".to_string() }.is_transient());
        assert!(!GateError::Cancelled.is_transient());
    }

    #[test]
    fn test_circuit_open_seen_through_retry_exhaustion() {
        let err = GateError::RetryExhausted {
            attempts: 4,
            last: Box::new(GateError::CircuitOpen {
                name: "startup".to_string(),
            }),
        };
        assert!(err.is_circuit_open());
        assert!(err.to_string().contains("Circuit 'startup' is open"));

        let err = GateError::RetryExhausted {
            attempts: 4,
            last: Box::new(GateError::Transport("refused".to_string())),
        };
        assert!(!err.is_circuit_open());
    }

    #[test]
    fn test_probe_wrapping_keeps_cancellation() {
        let wrapped = GateError::probe("db", GateError::Transport("refused".to_string()));
        match wrapped {
            GateError::ProbeFailure { probe, reason } => {
                assert_eq!(probe, "db");
                assert!(reason.contains("refused"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(GateError::probe("db", GateError::Cancelled).is_cancelled());
    }

    #[test]
    fn test_from_status() {
        assert!(GateError::from_status(200).is_ok());
        assert!(GateError::from_status(204).is_ok());
        assert!(matches!(
            GateError::from_status(500),
            Err(GateError::UnexpectedStatus { status: 500 })
        ));
    }
}
