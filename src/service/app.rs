//! Main application state and HTTP server
//!
//! This module contains the production AppState that wires the champion
//! catalog, session registry, broadcaster and metrics together, and serves
//! the WebSocket endpoint plus health and metrics routes.

use crate::catalog::{load_catalog, CatalogProvider, ChampionCatalog};
use crate::config::AppConfig;
use crate::metrics::MetricsCollector;
use crate::protocol::broadcaster::{Broadcaster, ChannelBroadcaster};
use crate::service::health::{HealthCheck, HealthStatus};
use crate::service::ws::ws_handler;
use crate::session::registry::{DraftTiming, SessionRegistry};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::info;

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Server error: {message}")]
    Server { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Core session registry
    registry: Arc<SessionRegistry>,

    /// Channel broadcaster shared with the WebSocket layer
    broadcaster: Arc<ChannelBroadcaster>,

    /// Champion catalog, read-only after startup
    catalog: Arc<ChampionCatalog>,

    /// Metrics collector for the /metrics endpoint
    metrics: Arc<MetricsCollector>,

    /// Startup timestamp for uptime reporting
    started_at: DateTime<Utc>,

    /// Graceful shutdown signal
    shutdown_tx: broadcast::Sender<()>,
}

impl AppState {
    /// Initialize the application with all dependencies
    pub async fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing draft-room coordination service");

        // One-shot catalog fetch; a failure degrades auto-picks but never
        // aborts startup.
        let catalog = Arc::new(load_catalog(&config.catalog).await);

        let metrics = Arc::new(MetricsCollector::new().map_err(|e| {
            ServiceError::Initialization {
                message: format!("Failed to create metrics collector: {}", e),
            }
        })?);

        let broadcaster = Arc::new(ChannelBroadcaster::new());
        let registry = Arc::new(SessionRegistry::with_metrics(
            broadcaster.clone() as Arc<dyn Broadcaster>,
            catalog.clone() as Arc<dyn CatalogProvider>,
            DraftTiming::from_settings(&config.draft),
            metrics.clone(),
        ));

        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            config,
            registry,
            broadcaster,
            catalog,
            metrics,
            started_at: Utc::now(),
            shutdown_tx,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn broadcaster(&self) -> &Arc<ChannelBroadcaster> {
        &self.broadcaster
    }

    pub fn catalog(&self) -> &Arc<ChampionCatalog> {
        &self.catalog
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Create the Axum router with the draft channel and monitoring routes
    pub fn router(self: &Arc<Self>) -> Router {
        Router::new()
            .route("/", get(root_handler))
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .route("/alive", get(alive_handler))
            .route("/metrics", get(metrics_handler))
            .route("/stats", get(stats_handler))
            .with_state(Arc::clone(self))
    }

    /// Bind and serve until a shutdown signal arrives
    pub async fn serve(self: &Arc<Self>) -> Result<(), ServiceError> {
        let addr = self.config.bind_address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ServiceError::Server {
                message: format!("Failed to bind {}: {}", addr, e),
            })?;

        info!("Draft room server listening on http://{}", addr);

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("Server shutdown signal received");
            })
            .await
            .map_err(|e| ServiceError::Server {
                message: format!("Server error: {}", e),
            })?;

        info!("Server stopped");
        Ok(())
    }

    /// Signal the server to stop accepting connections and drain
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Root endpoint with basic service information
async fn root_handler(State(app): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "service": app.config().service.name,
        "version": crate::VERSION,
        "endpoints": ["/ws", "/health", "/alive", "/metrics", "/stats"],
    }))
}

/// Health check endpoint
async fn health_handler(State(app): State<Arc<AppState>>) -> Response {
    match HealthCheck::check(app).await {
        Ok(health) => {
            let code = match health.status {
                HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
                HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
            };
            (code, Json(health)).into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

/// Liveness probe
async fn alive_handler() -> StatusCode {
    StatusCode::OK
}

/// Prometheus metrics endpoint
async fn metrics_handler(State(app): State<Arc<AppState>>) -> Response {
    let encoder = TextEncoder::new();
    let metric_families = app.metrics().registry().gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            buffer,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {}", e),
        )
            .into_response(),
    }
}

/// Registry statistics endpoint
async fn stats_handler(State(app): State<Arc<AppState>>) -> Response {
    match app.registry().get_stats() {
        Ok(stats) => Json(json!({
            "sessionsCreated": stats.sessions_created,
            "sessionsTornDown": stats.sessions_torn_down,
            "draftsStarted": stats.drafts_started,
            "draftsCompleted": stats.drafts_completed,
            "seriesCompleted": stats.series_completed,
            "activeSessions": app.registry().session_count(),
            "pendingGraceTimers": app.registry().pending_grace_timers(),
        }))
        .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build an AppState without fetching the real catalog
    async fn test_app_state() -> Arc<AppState> {
        let mut config = AppConfig::default();
        // Point the loader at an unreachable source; the catalog degrades
        // to empty without failing startup.
        config.catalog.url = "http://127.0.0.1:1/champions.json".to_string();
        config.catalog.fetch_timeout_seconds = 1;

        Arc::new(AppState::new(config).await.unwrap())
    }

    #[tokio::test]
    async fn test_app_state_survives_catalog_failure() {
        let app = test_app_state().await;
        assert!(app.catalog().is_empty());
        assert_eq!(app.registry().session_count(), 0);
    }

    #[tokio::test]
    async fn test_health_reports_degraded_catalog() {
        let app = test_app_state().await;
        let health = HealthCheck::check(app).await.unwrap();

        assert_eq!(health.status, HealthStatus::Degraded);
        assert!(health
            .checks
            .iter()
            .any(|check| check.name == "champion_catalog"
                && check.status == HealthStatus::Degraded));
    }

    #[tokio::test]
    async fn test_router_builds() {
        let app = test_app_state().await;
        let _router = app.router();
    }
}
