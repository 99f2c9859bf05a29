use chrono::{DateTime, Utc};
use serde::Serialize;

// ============================================================================
// Health Abstractions
// ============================================================================
//
// Status values shared by the health monitor, the /health endpoint and the
// database health gauge.
//
// ============================================================================

/// Health status of a component
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
    Unhealthy(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    pub fn is_unhealthy(&self) -> bool {
        matches!(self, HealthStatus::Unhealthy(_))
    }

    /// Gauge encoding: 0=Unhealthy, 1=Degraded, 2=Healthy.
    pub fn gauge_level(&self) -> i64 {
        match self {
            HealthStatus::Healthy => 2,
            HealthStatus::Degraded(_) => 1,
            HealthStatus::Unhealthy(_) => 0,
        }
    }
}

/// Health information for a component
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub last_check: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ComponentHealth {
    pub fn new(name: impl Into<String>, status: HealthStatus) -> Self {
        Self {
            name: name.into(),
            status,
            last_check: Utc::now(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Option<String>) -> Self {
        self.details = details;
        self
    }
}
