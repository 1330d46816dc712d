//! Service layer for the draft-room coordination service
//!
//! This module contains the main application state, the HTTP/WebSocket
//! server, and health check endpoints.

pub mod app;
pub mod health;
pub mod ws;

pub use app::{AppState, ServiceError};
pub use health::{HealthCheck, HealthStatus};
