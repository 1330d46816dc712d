//! Error types for the draft coordination service
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific draft coordination scenarios
#[derive(Debug, thiserror::Error)]
pub enum DraftRoomError {
    #[error("Champion catalog unavailable: {message}")]
    CatalogUnavailable { message: String },

    #[error("Champion pool exhausted in session {session_id}")]
    ChampionPoolExhausted { session_id: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}
