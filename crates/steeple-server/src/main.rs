mod config;

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderValue, Method, header::{AUTHORIZATION, CONTENT_TYPE}};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;

use steeple_api::AppStateInner;
use steeple_db::Database;
use steeple_ledger::{Ledger, RewardSchedule};

use crate::config::{Config, CorsOrigin};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "steeple=debug,steeple_api=debug,steeple_ledger=debug,steeple_db=info,tower_http=debug"
                    .into()
            }),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = Arc::new(Database::open(&config.db_path)?);

    // Shared state
    let ledger = Ledger::new(db, RewardSchedule::default());
    let state = Arc::new(AppStateInner::new(ledger, config.store_timeout));

    let app = steeple_api::router(state).layer(cors_layer(&config.cors_origin)?);

    let addr = config.bind_addr()?;
    info!("Steeple server listening on {}", addr);
    info!("Store timeout: {:?}", config.store_timeout);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn cors_layer(origin: &CorsOrigin) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(12 * 60 * 60));

    Ok(match origin {
        CorsOrigin::Any => layer.allow_origin(AllowOrigin::any()),
        CorsOrigin::Exact(origin) => layer
            .allow_origin(origin.parse::<HeaderValue>()?)
            .allow_credentials(true),
    })
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    tracing::warn!("Failed to install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    info!("Received Ctrl+C, shutting down...");
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
