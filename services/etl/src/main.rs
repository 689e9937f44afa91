mod error;
mod http;
mod orchestrator;
mod sync;
mod validate;

use std::net::SocketAddr;

use courtsync_config::{init_tracing, AppConfig};

use crate::http::AppState;
use crate::orchestrator::Orchestrator;

#[tokio::main]
async fn main() {
    init_tracing("info");

    let config = AppConfig::from_env().expect("failed to load config");
    tracing::info!(
        service = "courtsync-etl",
        interval_secs = config.sync_interval_secs,
        "starting"
    );

    if config.sync_token.is_none() {
        tracing::warn!("SYNC_TOKEN not set; on-demand sync trigger will reject every request");
    }

    // On-demand trigger runs on its own task with its own connections;
    // only the destination store is shared with the periodic loop.
    let app = http::build_router(AppState {
        config: config.clone(),
    });
    let addr: SocketAddr = config.bind_addr().parse().expect("invalid bind address");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");
    tracing::info!(%addr, "sync trigger listening");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server error");
    });

    Orchestrator::new(config).run_loop().await;
    tracing::info!("shutting down");
}
