//! Join-time recovery.
//!
//! A worker that (re)joins copies the rows it is missing from its nearest ring
//! predecessor, falling back to the second one. Rows it already holds are kept:
//! local data always wins over the source's.

use anyhow::{Context, bail};
use futures::TryStreamExt;
use std::collections::HashSet;
use std::io::BufReader;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::io::{StreamReader, SyncIoBridge};

use super::context::WorkerContext;
use super::protocol::{list_url, metas_url, table_url};
use crate::membership::types::WorkerRecord;
use crate::storage::catalog::TableCatalog;
use crate::storage::error::StorageResult;
use crate::storage::row::{Row, RowMeta};

/// Decoded rows waiting to be written locally.
const ROW_BUFFER: usize = 64;

/// Copies missing rows from the first reachable source candidate.
///
/// Returns the number of rows written locally. Never fails: an unreachable
/// source leaves the worker serving whatever it already has.
pub async fn recover(ctx: &WorkerContext) -> usize {
    let candidates = ctx.source_candidates();
    if candidates.is_empty() {
        tracing::info!("No ring predecessors known, skipping recovery");
        return 0;
    }

    for source in &candidates {
        match fetch_table_list(ctx, source).await {
            Ok(tables) => {
                tracing::info!(
                    "Recovering {} table(s) from {} at {}",
                    tables.len(),
                    source.id,
                    source.addr()
                );
                let recovered = merge_tables(ctx, source, &tables).await;
                tracing::info!("Recovery from {} copied {} row(s)", source.id, recovered);
                return recovered;
            }
            Err(e) => {
                tracing::warn!("Recovery source {} unavailable: {:#}", source.id, e);
            }
        }
    }

    tracing::warn!("No recovery source reachable, continuing with local state");
    0
}

async fn fetch_table_list(ctx: &WorkerContext, source: &WorkerRecord) -> anyhow::Result<Vec<String>> {
    let resp = ctx
        .http
        .get(list_url(&source.addr()))
        .timeout(ctx.config.control_timeout)
        .send()
        .await?;
    if !resp.status().is_success() {
        bail!("table list returned {}", resp.status());
    }
    Ok(resp.json().await?)
}

async fn merge_tables(ctx: &WorkerContext, source: &WorkerRecord, tables: &[String]) -> usize {
    let mut recovered = 0;
    for table in tables {
        if let Err(e) = TableCatalog::validate_name(table) {
            tracing::warn!("Skipping table from {}: {}", source.id, e);
            continue;
        }
        match merge_table(ctx, source, table).await {
            Ok(n) => recovered += n,
            Err(e) => tracing::warn!("Recovery of {} from {} failed: {:#}", table, source.id, e),
        }
    }
    recovered
}

async fn merge_table(ctx: &WorkerContext, source: &WorkerRecord, table: &str) -> anyhow::Result<usize> {
    let resp = ctx
        .http
        .get(metas_url(&source.addr(), table))
        .timeout(ctx.config.recovery_timeout)
        .send()
        .await?;
    if !resp.status().is_success() {
        bail!("row metadata returned {}", resp.status());
    }
    let metas: Vec<RowMeta> = resp.json().await?;

    let local_keys: HashSet<String> = match ctx.catalog.get(table) {
        Some(shared) => shared.read().await.keys().into_iter().collect(),
        None => HashSet::new(),
    };
    let missing: HashSet<String> = metas
        .into_iter()
        .map(|m| m.key)
        .filter(|k| !local_keys.contains(k))
        .collect();
    if missing.is_empty() {
        tracing::debug!("Table {} already up to date", table);
        return Ok(0);
    }

    let resp = ctx
        .http
        .get(table_url(&source.addr(), table))
        .timeout(ctx.config.recovery_timeout)
        .send()
        .await?;
    if !resp.status().is_success() {
        bail!("row stream returned {}", resp.status());
    }
    let (tx, mut rx) = mpsc::channel::<Row>(ROW_BUFFER);
    let decoder = spawn_row_decoder(resp, tx);

    let mut written = 0;
    while let Some(row) = rx.recv().await {
        if !missing.contains(row.key()) {
            continue;
        }
        if ctx.catalog.put_row_if_absent(table, row).await? {
            written += 1;
        }
    }
    decoder
        .await?
        .with_context(|| format!("decoding rows of {}", table))?;

    tracing::debug!("Copied {} missing row(s) of {}", written, table);
    Ok(written)
}

/// Decodes the row stream of `resp` on a blocking thread as it arrives.
///
/// Rows are handed over through `tx`; decoding stops early once the receiver
/// is gone.
fn spawn_row_decoder(
    resp: reqwest::Response,
    tx: mpsc::Sender<Row>,
) -> JoinHandle<StorageResult<()>> {
    let body = Box::pin(resp.bytes_stream().map_err(std::io::Error::other));
    let bridge = SyncIoBridge::new(StreamReader::new(body));

    tokio::task::spawn_blocking(move || {
        let mut input = BufReader::new(bridge);
        while let Some(row) = Row::read_from(&mut input)? {
            if tx.blocking_send(row).is_err() {
                break;
            }
        }
        Ok(())
    })
}
