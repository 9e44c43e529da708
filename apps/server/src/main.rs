//! # Comptoir
//!
//! Back-office server binary.
//!
//! ```text
//!   env (COMPTOIR_*) ─► ServerConfig
//!                           │
//!                           ├─► Database (SQLite, migrations)
//!                           ├─► bootstrap_admin
//!                           ├─► ColissimoClient
//!                           ▼
//!                       axum::serve ─► graceful shutdown on Ctrl+C / SIGTERM
//! ```

use std::sync::Arc;

use anyhow::Context;
use comptoir_db::{Database, DbConfig};
use comptoir_parcel::ColissimoClient;
use comptoir_server::config::ServerConfig;
use comptoir_server::state::AppState;
use comptoir_server::{bootstrap_admin, build_app};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("Starting Comptoir server...");

    let config = ServerConfig::load().context("invalid configuration")?;
    if config.uses_dev_secrets() {
        warn!("Using development secrets; set COMPTOIR_SESSION_SECRET and COMPTOIR_CREDENTIALS_KEY");
    }
    info!(
        bind = %config.bind,
        database = %config.database_path.display(),
        "Configuration loaded"
    );

    let db = Database::new(DbConfig::new(config.database_path.clone()))
        .await
        .context("failed to open database")?;
    info!("Database ready");

    if bootstrap_admin(&db, &config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to create the administrator: {}", e.message))?
    {
        info!("Administrator account bootstrapped");
    }

    let tracker = ColissimoClient::new(config.colissimo_endpoint.clone(), config.colissimo_timeout)
        .context("failed to build the Colissimo client")?;

    let bind = config.bind;
    let app = build_app(AppState::new(db.clone(), config, Arc::new(tracker)));

    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!(%bind, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
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
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
