//! messenger-auth - Credential authentication and session service
//!
//! This is the main entry point for the messenger-auth application.

use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use messenger_auth::auth::{AuthService, AuthServiceConfig, RateLimitConfig};
use messenger_auth::config::{Config, LoggingConfig};
use messenger_auth::database::{Database, SqliteDatabase};
use messenger_auth::server::{AppState, Server};

/// messenger-auth - Credential authentication and session service
#[derive(Parser, Debug)]
#[command(name = "messenger-auth")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env = "MESSENGER_AUTH_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration
    let config = load_config(&args)?;

    // Initialize tracing/logging
    init_tracing(&config.logging);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting messenger-auth"
    );

    // Initialize database
    let database = SqliteDatabase::new(&config.database.path).await?;
    let database = Arc::new(database);
    info!(path = %config.database.path, "Database initialized");

    // Initialize authentication service
    let service_config = AuthServiceConfig {
        session_ttl_secs: config.auth.session.ttl_secs,
        rate_limit: RateLimitConfig {
            max_failures: config.auth.rate_limit.max_failures,
            block_duration: std::time::Duration::from_secs(
                config.auth.rate_limit.block_duration_secs,
            ),
            window_duration: std::time::Duration::from_secs(
                config.auth.rate_limit.window_duration_secs,
            ),
        },
    };
    let auth_service = Arc::new(AuthService::new(Arc::clone(&database), service_config));
    info!(
        session_ttl_secs = config.auth.session.ttl_secs,
        "Authentication service initialized"
    );

    // Sweep expired sessions in the background
    spawn_session_sweeper(
        Arc::clone(&auth_service),
        config.auth.session.sweep_interval_secs,
    );

    // Create application state
    let state = AppState {
        auth_service,
        database,
    };

    // Create and start the HTTP server
    let server = Server::new(config.server.clone(), state);

    info!(
        host = %config.server.host,
        port = %config.server.port,
        "Starting HTTP server"
    );

    server.run(shutdown_signal()).await?;

    info!("messenger-auth shutdown complete");

    Ok(())
}

/// Load configuration from file or environment
fn load_config(args: &Args) -> anyhow::Result<Config> {
    match &args.config {
        Some(path) => {
            // Use eprintln! since tracing is not yet initialized
            eprintln!("Loading configuration from file: {}", path);
            Config::from_file(path).map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
        }
        None => {
            // Use eprintln! since tracing is not yet initialized
            eprintln!("Loading configuration from environment variables");
            Config::from_env().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
        }
    }
}

/// Initialize the tracing subscriber from the logging configuration
fn init_tracing(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.format.as_str() {
        "pretty" => builder.pretty().init(),
        _ => builder.json().init(),
    }
}

/// Spawn the periodic expired-session sweeper
///
/// Expired sessions are also rejected and lazily evicted at verification
/// time; the sweep removes the ones never presented again.
fn spawn_session_sweeper<D: Database + 'static>(service: Arc<AuthService<D>>, interval_secs: u64) {
    let period = std::time::Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // The first tick completes immediately
        interval.tick().await;

        loop {
            interval.tick().await;

            match service.sessions().sweep_expired().await {
                Ok(0) => {}
                Ok(removed) => info!(removed, "Swept expired sessions"),
                Err(e) => error!(error = %e, "Expired-session sweep failed"),
            }

            service.cleanup_rate_limiter();
        }
    });
}

/// Create a future that resolves when a shutdown signal is received
async fn shutdown_signal() {
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
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
