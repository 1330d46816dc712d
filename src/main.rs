//! Main entry point for the Draft Room coordination service
//!
//! This is the production entry point that initializes and runs the draft
//! coordination server with proper error handling, logging, and graceful
//! shutdown.

use anyhow::Result;
use clap::Parser;
use draft_room::config::AppConfig;
use draft_room::service::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

/// Draft Room - Real-time champion ban/pick coordination for match series
#[derive(Parser)]
#[command(
    name = "draft-room",
    version,
    about = "A real-time champion draft coordination service",
    long_about = "Draft Room coordinates turn-based champion ban/pick drafts between two \
                 teams over persistent WebSocket channels, enforces turn deadlines with \
                 automatic resolution, survives short disconnects through grace windows, \
                 and progresses best-of-N series with side swapping between games."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// HTTP port override
    #[arg(long, value_name = "PORT", help = "Override HTTP/WebSocket server port")]
    port: Option<u16>,

    /// Catalog URL override
    #[arg(long, value_name = "URL", help = "Override champion catalog source URL")]
    catalog_url: Option<String>,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and exit)
    #[arg(
        long,
        help = "Validate configuration and exit without starting service"
    )]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C) signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

/// Display startup banner with service information
fn display_startup_banner(config: &AppConfig) {
    info!("Draft Room Coordination Service");
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!("   Bind address: {}", config.bind_address());
    info!("   Catalog: {}", config.catalog.url);
    info!("   Turn budget: {}s", config.draft.turn_seconds);
    info!(
        "   Grace windows: {}s disconnect / {}s leave",
        config.draft.disconnect_grace_seconds, config.draft.leave_grace_seconds
    );
}

/// Load and merge configuration from environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path.display());
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    // Apply CLI overrides
    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if let Some(port) = args.port {
        config.service.http_port = port;
    }

    if let Some(catalog_url) = &args.catalog_url {
        config.catalog.url = catalog_url.clone();
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration (CLI args can override environment/config file)
    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    // Initialize logging early (before any other operations)
    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if args.dry_run {
        info!("Configuration validation successful");
        display_startup_banner(&config);
        info!("Dry run completed - exiting without starting service");
        return Ok(());
    }

    display_startup_banner(&config);

    // Initialize application state (includes the one-shot catalog fetch)
    info!("Initializing service components...");
    let shutdown_timeout = config.shutdown_timeout();
    let app_state = match AppState::new(config).await {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    // Run the server in the background
    let server_task = {
        let app_state = app_state.clone();
        tokio::spawn(async move {
            if let Err(e) = app_state.serve().await {
                error!("Server failed: {}", e);
            }
        })
    };

    info!("Draft Room Coordination Service is running");
    info!("Press Ctrl+C to shutdown gracefully...");

    // Wait for shutdown signal
    wait_for_shutdown_signal().await;

    info!("Shutdown signal received, beginning graceful shutdown...");
    app_state.shutdown();

    match tokio::time::timeout(shutdown_timeout, server_task).await {
        Ok(_) => {
            info!("Graceful shutdown completed successfully");
        }
        Err(_) => {
            warn!("Shutdown timeout exceeded, forcing exit");
        }
    }

    info!("Draft Room Coordination Service stopped");
    Ok(())
}
