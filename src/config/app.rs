//! Main application configuration
//!
//! This module defines the primary configuration structures for the draft-room
//! coordination service, including environment variable loading and validation.

use crate::error::DraftRoomError;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub catalog: CatalogSettings,
    pub draft: DraftSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Host to bind the HTTP/WebSocket server to
    pub bind_host: String,
    /// Port for the HTTP/WebSocket server
    pub http_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

/// Champion catalog source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSettings {
    /// URL of the static champion catalog (Data Dragon format)
    pub url: String,
    /// Timeout for the one-shot catalog fetch in seconds
    pub fetch_timeout_seconds: u64,
}

/// Draft timing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftSettings {
    /// Wall-clock budget per ban/pick turn in seconds
    pub turn_seconds: u64,
    /// Grace window after an implicit channel loss in seconds
    pub disconnect_grace_seconds: u64,
    /// Grace window after an explicit leave signal in seconds
    pub leave_grace_seconds: u64,
    /// Countdown broadcast interval in milliseconds
    pub tick_interval_ms: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "draft-room".to_string(),
            log_level: "info".to_string(),
            bind_host: "0.0.0.0".to_string(),
            http_port: 8080,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            url: "https://ddragon.leagueoflegends.com/cdn/14.12.1/data/ko_KR/champion.json"
                .to_string(),
            fetch_timeout_seconds: 15,
        }
    }
}

impl Default for DraftSettings {
    fn default() -> Self {
        Self {
            turn_seconds: 30,
            disconnect_grace_seconds: 10,
            leave_grace_seconds: 60,
            tick_interval_ms: 1000,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            config.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.service.log_level = log_level;
        }
        if let Ok(host) = env::var("BIND_HOST") {
            config.service.bind_host = host;
        }
        if let Ok(port) = env::var("HTTP_PORT") {
            config.service.http_port = port
                .parse()
                .map_err(|_| anyhow!("Invalid HTTP_PORT value: {}", port))?;
        }
        if let Ok(timeout) = env::var("SHUTDOWN_TIMEOUT_SECONDS") {
            config.service.shutdown_timeout_seconds = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid SHUTDOWN_TIMEOUT_SECONDS value: {}", timeout))?;
        }

        // Catalog settings
        if let Ok(url) = env::var("CATALOG_URL") {
            config.catalog.url = url;
        }
        if let Ok(timeout) = env::var("CATALOG_FETCH_TIMEOUT_SECONDS") {
            config.catalog.fetch_timeout_seconds = timeout.parse().map_err(|_| {
                anyhow!("Invalid CATALOG_FETCH_TIMEOUT_SECONDS value: {}", timeout)
            })?;
        }

        // Draft settings
        if let Ok(turn) = env::var("TURN_SECONDS") {
            config.draft.turn_seconds = turn
                .parse()
                .map_err(|_| anyhow!("Invalid TURN_SECONDS value: {}", turn))?;
        }
        if let Ok(grace) = env::var("DISCONNECT_GRACE_SECONDS") {
            config.draft.disconnect_grace_seconds = grace
                .parse()
                .map_err(|_| anyhow!("Invalid DISCONNECT_GRACE_SECONDS value: {}", grace))?;
        }
        if let Ok(grace) = env::var("LEAVE_GRACE_SECONDS") {
            config.draft.leave_grace_seconds = grace
                .parse()
                .map_err(|_| anyhow!("Invalid LEAVE_GRACE_SECONDS value: {}", grace))?;
        }
        if let Ok(tick) = env::var("TICK_INTERVAL_MS") {
            config.draft.tick_interval_ms = tick
                .parse()
                .map_err(|_| anyhow!("Invalid TICK_INTERVAL_MS value: {}", tick))?;
        }

        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            anyhow!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            )
        })?;

        let config: AppConfig = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file: {}", e))?;

        validate_config(&config)?;
        Ok(config)
    }

    /// Graceful shutdown timeout as a duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Address the HTTP/WebSocket server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.service.bind_host, self.service.http_port)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    let fail = |message: String| -> Result<()> {
        Err(DraftRoomError::ConfigurationError { message }.into())
    };

    if config.service.name.is_empty() {
        return fail("Service name cannot be empty".to_string());
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.service.log_level.as_str()) {
        return fail(format!(
            "Invalid log level '{}', must be one of: {}",
            config.service.log_level,
            valid_levels.join(", ")
        ));
    }

    if config.catalog.url.is_empty() {
        return fail("Catalog URL cannot be empty".to_string());
    }

    if config.draft.turn_seconds == 0 {
        return fail("turn_seconds must be at least 1".to_string());
    }

    if config.draft.tick_interval_ms == 0 {
        return fail("tick_interval_ms must be at least 1".to_string());
    }

    if config.draft.disconnect_grace_seconds == 0 || config.draft.leave_grace_seconds == 0 {
        return fail("Grace windows must be at least 1 second".to_string());
    }

    Ok(())
}
