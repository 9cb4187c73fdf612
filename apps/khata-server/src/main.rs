//! # Khata Server
//!
//! Binary entry point: configuration, tracing, database, HTTP listener.
//!
//! ```text
//! Auth gateway ───► HTTP (8080) ───► Engine ───► SQLite (WAL)
//! ```

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use khata_db::{Database, Engine};
use khata_server::{router, AppState, ServerConfig};

const DEFAULT_FILTER: &str = "info,khata_db=debug,khata_server=debug,sqlx=warn";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing (RUST_LOG overrides the default filter)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .with_target(true)
        .init();

    info!("Starting Khata server...");

    // Load configuration
    let config = ServerConfig::load()?;
    info!(
        addr = %config.bind_addr,
        database = %config.database_path,
        timeout_ms = config.operation_timeout.as_millis() as u64,
        reconcile_on_delete = config.reconcile_on_delete,
        "Configuration loaded"
    );

    // Connect to database (runs migrations)
    let db = Database::new(config.db_config()).await?;
    let engine = Engine::new(db.clone(), config.engine_config());

    let app = router(AppState::new(engine));

    let listener = TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "Listening");

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
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
