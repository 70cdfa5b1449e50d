//! # Stockroom API server
//!
//! ```text
//! env ──► ApiConfig::load ──► Database (migrations) ──► axum::serve
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use stockroom_api::{build_router, ApiConfig, AppState, LogFormat};
use stockroom_db::{Database, DbConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info,stockroom_api=debug,stockroom_db=debug";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = ApiConfig::load()?;

    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match config.log_format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Pretty => subscriber.pretty().init(),
    }

    info!("Starting Stockroom API server...");
    info!(
        port = config.port,
        database = %config.database_path,
        tax_precedence = config.tax_precedence.as_str(),
        "Configuration loaded"
    );

    // Connect to database (runs migrations)
    let db_config = if config.database_path == ":memory:" {
        DbConfig::in_memory()
    } else {
        DbConfig::new(&config.database_path).max_connections(config.db_max_connections)
    }
    .tax_precedence(config.tax_precedence)
    .stock_retries(config.stock_update_retries);

    let db = Database::new(db_config).await?;
    info!("Database ready");

    let port = config.port;
    let state = Arc::new(AppState::new(db.clone(), config));
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
