use axum::body::Bytes;
use std::sync::Arc;

use super::context::WorkerContext;
use super::protocol::replicate_url;

/// Forwards one committed cell write to this worker's ring successors.
///
/// Each push runs in its own task with the `end` marker set, so the receiver
/// stores it without forwarding further. Failures are logged and dropped:
/// the caller already has its answer.
pub fn replicate_write(
    ctx: &Arc<WorkerContext>,
    table: &str,
    row: &str,
    column: &str,
    value: Bytes,
) {
    let targets = ctx.replica_targets();
    if targets.is_empty() {
        tracing::debug!("No replica targets for {}/{}", table, row);
        return;
    }

    for target in targets {
        let url = replicate_url(&target.addr(), table, row, column);
        let http = ctx.http.clone();
        let timeout = ctx.config.replication_timeout;
        let value = value.clone();

        tokio::spawn(async move {
            match http.put(&url).body(value).timeout(timeout).send().await {
                Ok(resp) if resp.status().is_success() => {
                    tracing::debug!("Replicated to {} ({})", target.id, url);
                }
                Ok(resp) => {
                    tracing::warn!(
                        "Replica {} rejected write {}: {}",
                        target.id,
                        url,
                        resp.status()
                    );
                }
                Err(e) => {
                    tracing::warn!("Replication to {} failed: {}", target.id, e);
                }
            }
        });
    }
}
