//! Configuration management for the draft-room service
//!
//! This module handles all configuration loading from environment variables,
//! validation, and default values for the draft coordination service.

pub mod app;

// Re-export commonly used types
pub use app::{AppConfig, CatalogSettings, DraftSettings, ServiceSettings};
