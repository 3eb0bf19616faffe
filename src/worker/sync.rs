//! Background loops keeping a worker in touch with the coordinator.

use anyhow::bail;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::context::WorkerContext;
use super::recovery;
use crate::membership::registry::parse_worker_list;

/// Announces this worker to the coordinator once.
pub async fn send_heartbeat(ctx: &WorkerContext) -> anyhow::Result<()> {
    let url = format!(
        "http://{}/ping?id={}&port={}",
        ctx.config.coordinator,
        urlencoding::encode(ctx.id.as_str()),
        ctx.config.port
    );
    let resp = ctx
        .http
        .get(&url)
        .timeout(ctx.config.control_timeout)
        .send()
        .await?;
    if !resp.status().is_success() {
        bail!("coordinator answered ping with {}", resp.status());
    }
    Ok(())
}

/// Refreshes the local view from the coordinator's worker list.
///
/// Returns the number of workers listed. Workers missing from the list are
/// not removed here; they age out of the view like any silent record.
pub async fn pull_membership(ctx: &WorkerContext) -> anyhow::Result<usize> {
    let url = format!("http://{}/workers", ctx.config.coordinator);
    let resp = ctx
        .http
        .get(&url)
        .timeout(ctx.config.control_timeout)
        .send()
        .await?;
    if !resp.status().is_success() {
        bail!("coordinator answered worker list with {}", resp.status());
    }

    let entries = parse_worker_list(&resp.text().await?);
    for entry in &entries {
        ctx.view.heartbeat(entry.id.clone(), &entry.ip, entry.port);
    }
    Ok(entries.len())
}

async fn heartbeat_loop(ctx: Arc<WorkerContext>) {
    let mut interval = tokio::time::interval(ctx.config.heartbeat_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        interval.tick().await;
        if let Err(e) = send_heartbeat(&ctx).await {
            tracing::warn!("Heartbeat to {} failed: {:#}", ctx.config.coordinator, e);
        }
    }
}

async fn membership_loop(ctx: Arc<WorkerContext>) {
    let mut interval = tokio::time::interval(ctx.config.pull_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        interval.tick().await;
        match pull_membership(&ctx).await {
            Ok(n) => tracing::debug!("View refreshed: {} worker(s) listed", n),
            Err(e) => tracing::warn!("Worker list pull failed: {:#}", e),
        }
    }
}

/// Waits until the view knows at least one predecessor, then recovers.
pub async fn join_recovery(ctx: Arc<WorkerContext>) -> usize {
    for attempt in 1..=ctx.config.recovery_view_attempts {
        if let Err(e) = pull_membership(&ctx).await {
            tracing::debug!("Pre-recovery pull {} failed: {:#}", attempt, e);
        }
        if !ctx.source_candidates().is_empty() {
            break;
        }
        tokio::time::sleep(ctx.config.pull_interval).await;
    }
    recovery::recover(&ctx).await
}

/// Spawns heartbeat, membership pull, view sweep and join recovery.
pub fn start(ctx: Arc<WorkerContext>) -> Vec<JoinHandle<()>> {
    tracing::info!(
        "Worker {} reporting to coordinator {}",
        ctx.id,
        ctx.config.coordinator
    );

    let recovery_ctx = ctx.clone();
    vec![
        tokio::spawn(heartbeat_loop(ctx.clone())),
        tokio::spawn(membership_loop(ctx.clone())),
        ctx.view.clone().start_sweeper(ctx.config.sweep_interval),
        tokio::spawn(async move {
            join_recovery(recovery_ctx).await;
        }),
    ]
}
