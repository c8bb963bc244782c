// src/config/mod.rs

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{GateError, Result};
use crate::probes::{HttpProbe, Probe, RedisProbe, TcpProbe};
use crate::readiness::GateConfig;
use crate::resilience::{CircuitBreakerConfig, PipelineConfig};

/// Environment variable naming a JSON settings file
pub const CONFIG_PATH_ENV: &str = "READINESS_GATE_CONFIG";
/// Comma-separated `name=host:port` (or bare `host:port`) TCP targets
pub const TCP_PROBES_ENV: &str = "READINESS_GATE_TCP";
/// Comma-separated `name=url` (or bare url) HTTP targets
pub const HTTP_PROBES_ENV: &str = "READINESS_GATE_HTTP";
/// Comma-separated `name=url` (or bare url) Redis targets
pub const REDIS_PROBES_ENV: &str = "READINESS_GATE_REDIS";

/// One dependency check, as written in a settings file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeConfig {
    /// Plain TCP connect
    Tcp {
        name: String,
        address: String,
        #[serde(default = "default_probe_timeout", with = "duration_serde")]
        timeout: Duration,
    },
    /// HTTP GET expecting a 2xx status
    Http {
        name: String,
        url: String,
        #[serde(default = "default_probe_timeout", with = "duration_serde")]
        timeout: Duration,
    },
    /// Redis connect + PING
    Redis {
        name: String,
        url: String,
        #[serde(default = "default_probe_timeout", with = "duration_serde")]
        timeout: Duration,
    },
}

fn default_probe_timeout() -> Duration {
    Duration::from_secs(5)
}

impl ProbeConfig {
    pub fn name(&self) -> &str {
        match self {
            ProbeConfig::Tcp { name, .. }
            | ProbeConfig::Http { name, .. }
            | ProbeConfig::Redis { name, .. } => name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProbeConfig::Tcp { .. } => "tcp",
            ProbeConfig::Http { .. } => "http",
            ProbeConfig::Redis { .. } => "redis",
        }
    }

    pub fn target(&self) -> &str {
        match self {
            ProbeConfig::Tcp { address, .. } => address,
            ProbeConfig::Http { url, .. } | ProbeConfig::Redis { url, .. } => url,
        }
    }

    /// Instantiate the probe described by this entry
    pub fn build(&self) -> Result<Arc<dyn Probe>> {
        let probe: Arc<dyn Probe> = match self {
            ProbeConfig::Tcp {
                name,
                address,
                timeout,
            } => Arc::new(TcpProbe::new(name.clone(), address.clone(), *timeout)),
            ProbeConfig::Http { name, url, timeout } => {
                Arc::new(HttpProbe::new(name.clone(), url.clone(), *timeout)?)
            }
            ProbeConfig::Redis { name, url, timeout } => {
                Arc::new(RedisProbe::new(name.clone(), url, *timeout)?)
            }
        };
        Ok(probe)
    }
}

/// Root settings for the gate binaries
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub gate: GateConfig,
    /// Checked in this order every round
    #[serde(default)]
    pub probes: Vec<ProbeConfig>,
}

impl Settings {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            GateError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "Loaded settings file");
        Self::from_json_str(&raw)
    }

    /// Settings from `READINESS_GATE_CONFIG` if set, otherwise defaults with
    /// probes taken from the `READINESS_GATE_TCP`/`_HTTP`/`_REDIS` lists.
    ///
    /// A `.env` file in the working directory is honored.
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        if let Ok(path) = env::var(CONFIG_PATH_ENV) {
            info!(path = %path, "Loading settings from file");
            return Self::from_file(Path::new(&path));
        }

        let mut probes = Vec::new();
        for (var, kind) in [
            (TCP_PROBES_ENV, "tcp"),
            (HTTP_PROBES_ENV, "http"),
            (REDIS_PROBES_ENV, "redis"),
        ] {
            if let Ok(raw) = env::var(var) {
                probes.extend(parse_probe_list(kind, &raw)?);
            }
        }

        let settings = Settings {
            gate: GateConfig::default(),
            probes,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.gate.validate()?;

        let mut seen = HashSet::new();
        for probe in &self.probes {
            if probe.name().is_empty() {
                return Err(GateError::Config("probe name must not be empty".to_string()));
            }
            if !seen.insert(probe.name()) {
                return Err(GateError::Config(format!(
                    "duplicate probe name '{}'",
                    probe.name()
                )));
            }
        }
        Ok(())
    }

    pub fn build_probes(&self) -> Result<Vec<Arc<dyn Probe>>> {
        self.probes.iter().map(ProbeConfig::build).collect()
    }
}

/// Parse `name=target,target2,...` into probe entries of one kind.
///
/// A bare target is also used as its own name.
pub fn parse_probe_list(kind: &str, raw: &str) -> Result<Vec<ProbeConfig>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            // `=` inside a URL query is not a name separator
            let (name, target) = match entry.split_once('=') {
                Some((name, target)) if !name.contains([':', '/']) => {
                    (name.trim().to_string(), target.trim().to_string())
                }
                _ => (entry.to_string(), entry.to_string()),
            };
            let timeout = default_probe_timeout();
            match kind {
                "tcp" => Ok(ProbeConfig::Tcp {
                    name,
                    address: target,
                    timeout,
                }),
                "http" => Ok(ProbeConfig::Http {
                    name,
                    url: target,
                    timeout,
                }),
                "redis" => Ok(ProbeConfig::Redis {
                    name,
                    url: target,
                    timeout,
                }),
                other => Err(GateError::Config(format!("unknown probe kind '{other}'"))),
            }
        })
        .collect()
}

pub(crate) fn validate_pipeline(config: &PipelineConfig) -> Result<()> {
    if config.timeout == Some(Duration::ZERO) {
        return Err(GateError::Config("pipeline timeout must be non-zero".to_string()));
    }
    validate_breaker(&config.circuit_breaker)
}

fn validate_breaker(config: &CircuitBreakerConfig) -> Result<()> {
    if !(config.failure_ratio > 0.0 && config.failure_ratio <= 1.0) {
        return Err(GateError::Config(format!(
            "failure_ratio must be in (0, 1], got {}",
            config.failure_ratio
        )));
    }
    if config.minimum_throughput == 0 {
        return Err(GateError::Config(
            "minimum_throughput must be at least 1".to_string(),
        ));
    }
    if config.sampling_duration.is_zero() || config.break_duration.is_zero() {
        return Err(GateError::Config(
            "sampling_duration and break_duration must be non-zero".to_string(),
        ));
    }
    Ok(())
}

// Helper module to serialize/deserialize Duration with serde
pub(crate) mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

// Optional duration in milliseconds, `null` meaning disabled
pub(crate) mod option_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(duration) => serializer.serialize_some(&(duration.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Option::<u64>::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}

// List of durations in milliseconds
pub(crate) mod durations_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[allow(clippy::ptr_arg)]
    pub fn serialize<S>(durations: &Vec<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(durations.iter().map(|d| d.as_millis() as u64))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Vec::<u64>::deserialize(deserializer)?;
        Ok(millis.into_iter().map(Duration::from_millis).collect())
    }
}

#[cfg(test)]
mod tests;
