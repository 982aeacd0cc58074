mod config;

use std::net::SocketAddr;

use tracing::{info, warn};

use board_api::AppStateInner;
use board_api::report::ReportRelay;
use board_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "board=debug,board_api=debug,board_db=info,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    config.warn_on_placeholders();

    // Creates the file and schema on first run
    let db = Database::open(&config.db_path)?;
    let purged = db.purge_expired_sessions()?;
    if purged > 0 {
        info!("Removed {} expired sessions", purged);
    }

    let relay = ReportRelay::new(config.report_webhook_url.clone(), config.report_timeout)?;
    info!(
        "Reports go to {} (timeout {}s)",
        relay.url(),
        config.report_timeout.as_secs()
    );

    let state = AppStateInner::new(db, config.settings, relay)?;
    let app = board_api::router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Message board listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
