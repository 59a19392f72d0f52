use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod db;
mod state;

use boundary_api::config;
use boundary_api::store::PgBoundaryStore;
use state::AppState;

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "boundary_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration / 加载配置
    let app_config = config::load_config().context("failed to load configuration")?;
    tracing::info!("Server will listen on {}", app_config.get_bind_address());

    let pool = db::connect(&app_config.database).await?;

    // Failed steps are logged and skipped / 失败的步骤只记录日志
    db::run_provisioning(&pool, &app_config.search).await;

    let store = PgBoundaryStore::new(
        pool,
        &app_config.search,
        app_config.database.query_timeout(),
    );
    let state = Arc::new(AppState::new(Arc::new(store)));

    let app = api::build_router(state, api::cors_layer(&app_config.cors));

    let bind_addr = app_config.get_bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Server running at http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
