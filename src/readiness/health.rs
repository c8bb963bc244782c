use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::readiness::latch::ReadinessHandle;

pub const READY_DESCRIPTION: &str = "Dependencies ready";
pub const NOT_READY_DESCRIPTION: &str = "Dependencies not ready";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Result of one readiness query, ready to be served by a health endpoint
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub name: String,
    pub status: HealthStatus,
    pub description: &'static str,
    pub checked_at: DateTime<Utc>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Reports healthy exactly when the readiness latch is set
#[derive(Debug, Clone)]
pub struct ReadinessCheck {
    name: String,
    readiness: ReadinessHandle,
}

impl ReadinessCheck {
    pub fn new(readiness: ReadinessHandle) -> Self {
        Self::named("dependencies", readiness)
    }

    pub fn named(name: impl Into<String>, readiness: ReadinessHandle) -> Self {
        Self {
            name: name.into(),
            readiness,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn check(&self) -> HealthReport {
        let (status, description) = if self.readiness.is_ready() {
            (HealthStatus::Healthy, READY_DESCRIPTION)
        } else {
            (HealthStatus::Unhealthy, NOT_READY_DESCRIPTION)
        };

        HealthReport {
            name: self.name.clone(),
            status,
            description,
            checked_at: Utc::now(),
        }
    }
}
