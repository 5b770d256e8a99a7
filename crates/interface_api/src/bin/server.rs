//! Diecastor - API Server Binary
//!
//! This binary starts the HTTP API server for the diecast catalogue.
//!
//! # Usage
//!
//! ```bash
//! DB_HOST=localhost DB_PORT=5432 DB_USER=diecastor DB_PASSWORD=... DB_DATABASE=diecastor \
//!     cargo run --bin diecastor-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` - Server host (default: 0.0.0.0)
//! * `API_PORT` - Server port (default: 8080)
//! * `API_LOG_LEVEL` - Log level: trace, debug, info, warn, error (default: info)
//! * `DB_HOST`, `DB_PORT`, `DB_USER`, `DB_PASSWORD`, `DB_DATABASE` - Connection parameters
//! * `DB_DRIVER` - Connection scheme (default: postgresql://)
//! * `DB_POOL__POOL_TIMEOUT`, `DB_POOL__POOL_RECYCLE`, `DB_POOL__POOL_PRE_PING`,
//!   `DB_POOL__POOL_SIZE`, `DB_POOL__MAX_OVERFLOW` - Pool tuning

use anyhow::Context;
use infra_db::Database;
use interface_api::{
    config::{database_settings_from_env, ApiConfig},
    create_router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Main entry point for the API server.
///
/// Builds the database manager before serving and disposes it once the
/// server stops, whatever the reason.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration cannot be loaded from environment
/// - The database engine cannot be created
/// - Server fails to bind to the configured address
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().context("loading API configuration")?;
    init_tracing(&config.log_level);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        "Starting Diecastor API Server"
    );

    let settings = database_settings_from_env().context("loading database settings")?;
    let database = Arc::new(Database::new(settings).context("creating database engine")?);

    let served = serve(Arc::clone(&database), &config).await;
    if let Err(e) = &served {
        tracing::error!(error = %e, "Application init error");
    }

    database.close().await;
    tracing::info!("Server shutdown complete");
    served
}

async fn serve(database: Arc<Database>, config: &ApiConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .context("parsing server address")?;
    let app = create_router(database);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// # Arguments
///
/// * `log_level` - The minimum log level to output (trace, debug, info, warn, error)
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// In-flight requests complete and release their sessions before the
/// database manager is disposed.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
