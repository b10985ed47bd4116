pub mod api;
pub mod router;
pub mod state;
pub mod validate;

pub use router::build_router;
pub use state::AppState;

use std::sync::Arc;

use specdraft_common::Result;
use specdraft_config::AppConfig;
use specdraft_engine::DraftService;
use tracing::info;

/// Bind the configured address and serve the gateway until shutdown.
pub async fn serve(config: &AppConfig, service: Arc<DraftService>) -> Result<()> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "gateway listening");

    let router = build_router(AppState { service });
    axum::serve(listener, router).await?;
    Ok(())
}
