//! Worker Node Module
//!
//! A worker owns a [`TableCatalog`](crate::storage::catalog::TableCatalog) and serves it
//! over HTTP.
//!
//! ## Core Concepts
//! - **Data plane**: Cell, row and table reads and writes, rename, delete, count, listing.
//! - **Replication**: Every client write is pushed to the next two workers on the ring
//!   after it is committed locally (fire-and-forget, marked so it is not forwarded again).
//! - **Membership**: Heartbeats to the coordinator and periodic pulls of its worker list
//!   into a local liveness view.
//! - **Recovery**: On join, rows missing locally are copied from a ring predecessor.

pub mod context;
pub mod handlers;
pub mod identity;
pub mod protocol;
pub mod recovery;
pub mod replication;
pub mod sync;


use axum::{
    Router,
    extract::Extension,
    routing::{get, put},
};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::WorkerConfig;
use context::WorkerContext;
use handlers::*;

/// Builds the worker's data-plane router.
pub fn router(ctx: Arc<WorkerContext>) -> Router {
    Router::new()
        .route(
            "/data/:table/:row/:column",
            put(handle_put_cell).get(handle_get_cell),
        )
        .route("/data/:table/:row", get(handle_get_row))
        .route("/data/:table", get(handle_get_table))
        .route("/count/:table", get(handle_count))
        .route("/rename/:table", put(handle_rename))
        .route("/delete/:table", put(handle_delete))
        .route("/list", get(handle_list))
        .route("/metas/:table", get(handle_metas))
        .layer(Extension(ctx))
}

/// Runs a worker until the server stops.
pub async fn run(config: WorkerConfig) -> anyhow::Result<()> {
    let bind_addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let ctx = WorkerContext::new(config)?;

    let _tasks = sync::start(ctx.clone());
    let app = router(ctx.clone());

    tracing::info!("Worker {} listening on {}", ctx.id, bind_addr);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
