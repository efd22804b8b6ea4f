//! # Casetrack Runtime
//!
//! The service binary. Startup sequence:
//!
//! 1. Load configuration from the environment and refuse default secrets in
//!    production.
//! 2. Initialize tracing.
//! 3. Open the durable collections and wire the services.
//! 4. Start the login-guard sweeper.
//! 5. Serve the HTTP API until ctrl-c, then drain in-flight requests.

mod config;
mod wiring;

use anyhow::{Context, Result};
use config::AppConfig;
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_filter.clone())),
        )
        .init();

    info!("casetrack v{}", env!("CARGO_PKG_VERSION"));

    let subsystems = wiring::build(&config)?;
    let sweeper = subsystems.guard.spawn_sweeper();

    let router = casetrack_gateway::build_router(subsystems.state)
        .into_make_service_with_connect_info::<SocketAddr>();

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    sweeper.abort();
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("ctrl-c received, shutting down");
    }
}
