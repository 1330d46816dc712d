//! Health check endpoints and monitoring
//!
//! This module provides health check functionality for the draft-room
//! coordination service, including readiness and liveness probes.

use crate::catalog::CatalogProvider;
use crate::service::app::AppState;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Health check status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Overall service status
    pub status: HealthStatus,
    /// Service name
    pub service: String,
    /// Service version
    pub version: String,
    /// Current timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Detailed component checks
    pub checks: Vec<ComponentCheck>,
    /// Service statistics
    pub stats: ServiceStats,
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional message for degraded or unhealthy components
    pub message: Option<String>,
}

/// Service statistics for health reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStats {
    /// Number of active sessions
    pub active_sessions: usize,
    /// Grace timers currently pending
    pub pending_grace_timers: usize,
    /// Drafts entered since service start
    pub drafts_started: u64,
    /// Drafts completed since service start
    pub drafts_completed: u64,
    /// Series completed since service start
    pub series_completed: u64,
    /// Service uptime information
    pub uptime_info: String,
}

impl HealthCheck {
    /// Perform a health check of the service
    pub async fn check(app_state: Arc<AppState>) -> Result<Self> {
        let mut checks = Vec::new();
        let mut overall_status = HealthStatus::Healthy;

        // Session registry must be reachable
        let registry_check = match app_state.registry().get_stats() {
            Ok(_) => ComponentCheck {
                name: "session_registry".to_string(),
                status: HealthStatus::Healthy,
                message: None,
            },
            Err(e) => ComponentCheck {
                name: "session_registry".to_string(),
                status: HealthStatus::Unhealthy,
                message: Some(e.to_string()),
            },
        };
        if registry_check.status == HealthStatus::Unhealthy {
            overall_status = HealthStatus::Unhealthy;
        }
        checks.push(registry_check);

        // An empty catalog degrades timeout auto-picks but is not fatal
        let catalog_check = if app_state.catalog().is_empty() {
            if overall_status == HealthStatus::Healthy {
                overall_status = HealthStatus::Degraded;
            }
            ComponentCheck {
                name: "champion_catalog".to_string(),
                status: HealthStatus::Degraded,
                message: Some("Catalog is empty; auto-picks cannot resolve".to_string()),
            }
        } else {
            ComponentCheck {
                name: "champion_catalog".to_string(),
                status: HealthStatus::Healthy,
                message: None,
            }
        };
        checks.push(catalog_check);

        let registry_stats = app_state.registry().get_stats().unwrap_or_default();
        let uptime = chrono::Utc::now() - app_state.started_at();

        Ok(Self {
            status: overall_status,
            service: app_state.config().service.name.clone(),
            version: crate::VERSION.to_string(),
            timestamp: chrono::Utc::now(),
            checks,
            stats: ServiceStats {
                active_sessions: app_state.registry().session_count(),
                pending_grace_timers: app_state.registry().pending_grace_timers(),
                drafts_started: registry_stats.drafts_started,
                drafts_completed: registry_stats.drafts_completed,
                series_completed: registry_stats.series_completed,
                uptime_info: format!("{}s", uptime.num_seconds().max(0)),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_status_display() {
        assert_eq!(HealthStatus::Healthy.to_string(), "healthy");
        assert_eq!(HealthStatus::Degraded.to_string(), "degraded");
        assert_eq!(HealthStatus::Unhealthy.to_string(), "unhealthy");
    }

    #[test]
    fn test_health_status_serialization() {
        let json = serde_json::to_string(&HealthStatus::Degraded).unwrap();
        assert_eq!(json, "\"degraded\"");
    }
}
