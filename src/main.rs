//! Gemini Key Rotator
//!
//! An HTTP service that spreads Gemini requests across a pool of API keys
//! and fails over to the next key when one is rate limited.

use anyhow::{Context, Result};
use clap::Parser;
use gemini_key_rotator::{
    config::{Environment, Settings},
    logging,
    server::App,
};
use std::path::PathBuf;

/// Gemini Key Rotator
///
/// Round-robin Gemini API key rotation with automatic failover.
#[derive(Parser, Debug)]
#[command(name = "gemini-key-rotator")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on (overrides PORT env var)
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to (overrides HOST env var)
    #[arg(long)]
    host: Option<String>,

    /// Log level: trace, debug, info, warn, error (overrides LOG_LEVEL env var)
    #[arg(long)]
    log_level: Option<String>,

    /// Environment: dev, staging, prod (overrides ENVIRONMENT env var)
    #[arg(short, long)]
    env: Option<Environment>,

    /// Log file path for JSON logs (enables file logging with 10MB rotation)
    /// Example: --log-file /var/log/rotator/app.log
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration first (before logging, so we can use log_level)
    let mut settings = Settings::load()?;

    if let Some(port) = args.port {
        settings.port = port;
    }
    if let Some(host) = args.host {
        settings.host = host;
    }
    if let Some(log_level) = args.log_level {
        settings.log_level = log_level;
    }
    if let Some(env) = args.env {
        settings.environment = env;
    }

    logging::init_tracing(&settings.log_level, args.log_file.as_deref())
        .context("Failed to initialize logging")?;

    tracing::info!(
        app_name = %settings.app_name,
        version = %settings.app_version,
        environment = %settings.environment,
        host = %settings.host,
        port = %settings.port,
        model = %settings.gemini_model,
        "Starting application"
    );

    let app = App::new(settings)?;

    app.run_with_graceful_shutdown().await?;

    tracing::info!("Application shutdown complete");

    Ok(())
}
