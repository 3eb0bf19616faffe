//! Coordinator Module
//!
//! The coordinator only tracks liveness: workers ping it every few seconds and
//! pull the list of live workers from it. It holds no table data.

pub mod handlers;

#[cfg(test)]
mod tests;

use axum::{Router, extract::Extension, routing::get};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::CoordinatorConfig;
use crate::membership::registry::LivenessRegistry;
use handlers::{handle_ping, handle_workers};

/// Builds the control-plane router.
///
/// Must be served with connect info (`into_make_service_with_connect_info`),
/// since pings are attributed to the caller's address.
pub fn router(registry: Arc<LivenessRegistry>) -> Router {
    Router::new()
        .route("/ping", get(handle_ping))
        .route("/workers", get(handle_workers))
        .layer(Extension(registry))
}

pub async fn run(config: CoordinatorConfig) -> anyhow::Result<()> {
    let registry = LivenessRegistry::new(config.liveness_window);
    let _sweeper = registry.clone().start_sweeper(config.sweep_interval);

    let bind_addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Coordinator listening on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(
        listener,
        router(registry).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
