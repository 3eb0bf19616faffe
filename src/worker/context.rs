use anyhow::Context;
use std::sync::Arc;

use crate::config::WorkerConfig;
use crate::membership::registry::LivenessRegistry;
use crate::membership::ring::Ring;
use crate::membership::types::{WorkerId, WorkerRecord};
use crate::storage::catalog::TableCatalog;

use super::identity::load_or_create_id;

/// Everything a worker's handlers and background loops share.
pub struct WorkerContext {
    pub id: WorkerId,
    pub config: WorkerConfig,
    pub catalog: TableCatalog,
    /// Local copy of the coordinator's live-worker list.
    pub view: Arc<LivenessRegistry>,
    pub http: reqwest::Client,
}

impl WorkerContext {
    /// Prepares the storage directory, identity and catalog.
    ///
    /// Does not touch the network; background loops are started separately.
    pub fn new(config: WorkerConfig) -> anyhow::Result<Arc<Self>> {
        std::fs::create_dir_all(&config.storage_dir).with_context(|| {
            format!(
                "creating storage directory {}",
                config.storage_dir.display()
            )
        })?;

        let id = load_or_create_id(&config.storage_dir)?;
        let catalog = TableCatalog::open(&config.storage_dir)
            .with_context(|| format!("opening tables in {}", config.storage_dir.display()))?;
        tracing::info!(
            "Worker {} loaded {} persistent table(s)",
            id,
            catalog.len()
        );

        let http = reqwest::Client::builder()
            .connect_timeout(config.control_timeout)
            .build()?;

        Ok(Arc::new(Self {
            id,
            view: LivenessRegistry::new(config.liveness_window),
            config,
            catalog,
            http,
        }))
    }

    /// The ring over the current view. Always contains this worker.
    pub fn ring(&self) -> Ring {
        Ring::new(
            self.view
                .snapshot()
                .into_iter()
                .map(|r| r.id)
                .chain(std::iter::once(self.id.clone())),
        )
    }

    /// The (up to two) ring successors that receive this worker's writes.
    pub fn replica_targets(&self) -> Vec<WorkerRecord> {
        let ids = self.ring().replica_targets(&self.id);
        self.resolve(&ids)
    }

    /// Ring predecessors to recover from, nearest first.
    pub fn source_candidates(&self) -> Vec<WorkerRecord> {
        let ids = self.ring().source_candidates(&self.id);
        self.resolve(&ids)
    }

    fn resolve(&self, ids: &[WorkerId]) -> Vec<WorkerRecord> {
        ids.iter().filter_map(|id| self.view.get(id)).collect()
    }
}
