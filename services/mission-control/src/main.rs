use anyhow::Context;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use skydrop_broadcast::spawn_status_loop;
use skydrop_core::logging;
use skydrop_mission_control::{router, AppState, ServiceConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let service = ServiceConfig::from_env()?;
    logging::init_with(service.log_format);

    let mission = service
        .mission_config()
        .context("failed to load mission configuration")?;
    info!(blocks = mission.blocks.len(), "mission configuration loaded");

    let state = AppState::from_config(&service, mission)?;
    let status_feed = spawn_status_loop(
        Arc::clone(state.registry()),
        Arc::clone(state.broadcaster()),
        service.status_interval,
    );

    let bind_addr = service.bind_addr();
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!(
        %bind_addr,
        database = %service.database_path.display(),
        orders_api = %service.orders_api_base,
        "mission control listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    status_feed.abort();
    info!("mission control stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
}
