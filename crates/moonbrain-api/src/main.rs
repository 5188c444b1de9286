//! moonbrain-api - HTTP server for moonbrain

use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};

use moonbrain_api::telemetry::{init_tracing, LogSettings};
use moonbrain_api::{build_router, AppState, Config};
use moonbrain_db::{Database, PoolConfig, PoolHealth};

const POOL_METRICS_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let _log_guard = init_tracing(&LogSettings::from_env());

    let config = Config::from_env();
    if !config.github_configured() {
        warn!("GITHUB_ID or GITHUB_SECRET is not set, GitHub login will fail");
    }
    if config.debug {
        info!("Debug mode enabled");
    }

    info!("Connecting to database...");
    let db = Database::connect_with_config(&config.database_url, PoolConfig::from_env())
        .await
        .context("connect to database")?;
    info!("Database connected");

    info!("Running database migrations...");
    db.migrate().await.context("run migrations")?;
    info!("Database migrations complete");

    tokio::fs::create_dir_all(&config.media_path)
        .await
        .with_context(|| format!("create media directory {}", config.media_path.display()))?;

    let pool = db.pool.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(POOL_METRICS_INTERVAL);
        loop {
            ticker.tick().await;
            PoolHealth::sample(&pool).log();
        }
    });

    let addr = config.app_address.clone();
    let app = build_router(AppState::from_database(db, config));

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
