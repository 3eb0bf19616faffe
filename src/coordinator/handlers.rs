use axum::{
    extract::{ConnectInfo, Extension, Query},
    http::StatusCode,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::membership::registry::LivenessRegistry;
use crate::membership::types::WorkerId;

#[derive(Debug, Deserialize)]
pub struct PingParams {
    pub id: Option<String>,
    pub port: Option<String>,
}

/// `GET /ping?id=&port=`: registers or refreshes the calling worker.
///
/// The worker's ip is taken from the connection, not from the request.
pub async fn handle_ping(
    Extension(registry): Extension<Arc<LivenessRegistry>>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    Query(params): Query<PingParams>,
) -> (StatusCode, &'static str) {
    let Some(id) = params.id.filter(|id| !id.is_empty()) else {
        tracing::debug!("Ping from {} without id", remote);
        return (StatusCode::BAD_REQUEST, "Missing worker id");
    };
    let Some(port) = params.port.and_then(|p| p.parse::<u16>().ok()) else {
        tracing::debug!("Ping from {} ({}) with bad port", remote, id);
        return (StatusCode::BAD_REQUEST, "Bad port");
    };

    registry.heartbeat(WorkerId(id), &remote.ip().to_string(), port);
    (StatusCode::OK, "OK")
}

/// `GET /workers`: `count` line followed by one `id,ip:port` line per live worker.
pub async fn handle_workers(Extension(registry): Extension<Arc<LivenessRegistry>>) -> String {
    registry.render_worker_list()
}
