//! Warzone Server - headless authority for team PvP warzones
//!
//! This is the main entry point for the server. It handles:
//! - Loading the war config and every registered zone
//! - The serial authority loop that owns all game state
//! - HTTP endpoints for health, zone status and console commands

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use warzone::app::{AppState, Authority, StatusBoard};
use warzone::config::Config;
use warzone::host::memory::MemoryWorld;
use warzone::http::build_router;
use warzone::util::time::{init_server_time, SystemClock};
use warzone::War;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    // Initialize server time tracking
    init_server_time();

    info!("Starting Warzone Server");
    info!("Server address: {}", config.server_addr);
    info!("Data directory: {}", config.data_dir.display());

    // Load zones; without a game host attached the world lives in memory
    let war = War::open(
        config.data_dir.clone(),
        Box::new(MemoryWorld::new()),
        Box::new(SystemClock),
    )?;

    // Spawn the authority loop
    let status = Arc::new(StatusBoard::new());
    let (authority, console) = Authority::new(war, config.tick_rate, status.clone());
    let authority_task = tokio::spawn(authority.run());

    // Build router
    let state = AppState::new(config.clone(), console, status);
    let router = build_router(state);

    // Start server
    let addr: SocketAddr = config.server_addr;
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);
    info!("Health check: http://{}/health", addr);
    info!("Console endpoint: http://{}/console", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Zone data is written as each command runs, so nothing is pending here
    authority_task.abort();

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
