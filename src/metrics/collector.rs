//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the draft-room coordination
//! service using Prometheus metrics.

use anyhow::Result;
use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::Arc;

/// Main metrics collector for the draft-room service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Sessions created since startup
    pub sessions_created_total: IntCounter,

    /// Sessions torn down, labeled by reason (completed, grace_expired, pool_exhausted)
    pub sessions_torn_down_total: IntCounterVec,

    /// Currently active sessions
    pub active_sessions: IntGauge,

    /// Drafts entered since startup
    pub drafts_started_total: IntCounter,

    /// Drafts that resolved all twenty turns
    pub drafts_completed_total: IntCounter,

    /// Turns resolved, labeled by resolution (manual, timeout)
    pub turns_resolved_total: IntCounterVec,

    /// Series that reached their win threshold
    pub series_completed_total: IntCounter,
}

impl MetricsCollector {
    /// Create a new metrics collector with its own registry
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let sessions_created_total = IntCounter::with_opts(Opts::new(
            "draftroom_sessions_created_total",
            "Total number of draft sessions created",
        ))?;
        registry.register(Box::new(sessions_created_total.clone()))?;

        let sessions_torn_down_total = IntCounterVec::new(
            Opts::new(
                "draftroom_sessions_torn_down_total",
                "Total number of draft sessions destroyed",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(sessions_torn_down_total.clone()))?;

        let active_sessions = IntGauge::with_opts(Opts::new(
            "draftroom_active_sessions",
            "Number of currently active draft sessions",
        ))?;
        registry.register(Box::new(active_sessions.clone()))?;

        let drafts_started_total = IntCounter::with_opts(Opts::new(
            "draftroom_drafts_started_total",
            "Total number of drafts entered",
        ))?;
        registry.register(Box::new(drafts_started_total.clone()))?;

        let drafts_completed_total = IntCounter::with_opts(Opts::new(
            "draftroom_drafts_completed_total",
            "Total number of drafts that resolved all turns",
        ))?;
        registry.register(Box::new(drafts_completed_total.clone()))?;

        let turns_resolved_total = IntCounterVec::new(
            Opts::new(
                "draftroom_turns_resolved_total",
                "Total number of resolved ban/pick turns",
            ),
            &["resolution"],
        )?;
        registry.register(Box::new(turns_resolved_total.clone()))?;

        let series_completed_total = IntCounter::with_opts(Opts::new(
            "draftroom_series_completed_total",
            "Total number of completed best-of-N series",
        ))?;
        registry.register(Box::new(series_completed_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            sessions_created_total,
            sessions_torn_down_total,
            active_sessions,
            drafts_started_total,
            drafts_completed_total,
            turns_resolved_total,
            series_completed_total,
        })
    }

    /// Access the underlying registry for the metrics endpoint
    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    pub fn record_session_created(&self) {
        self.sessions_created_total.inc();
        self.active_sessions.inc();
    }

    pub fn record_session_torn_down(&self, reason: &str) {
        self.sessions_torn_down_total
            .with_label_values(&[reason])
            .inc();
        self.active_sessions.dec();
    }

    pub fn record_draft_started(&self) {
        self.drafts_started_total.inc();
    }

    pub fn record_draft_completed(&self) {
        self.drafts_completed_total.inc();
    }

    pub fn record_turn_resolved(&self, resolution: &str) {
        self.turns_resolved_total
            .with_label_values(&[resolution])
            .inc();
    }

    pub fn record_series_completed(&self) {
        self.series_completed_total.inc();
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        // Registration against a fresh registry cannot collide
        Self::new().expect("Failed to create metrics collector")
    }
}
