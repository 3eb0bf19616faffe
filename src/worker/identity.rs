use anyhow::{Context, bail};
use std::fs;
use std::path::Path;

use crate::membership::types::WorkerId;

/// File under the storage directory holding the worker's identity.
pub const ID_FILE: &str = "id";

/// Reads the identity stored under `storage_dir`, or generates and stores a new one.
///
/// The identity survives restarts so a worker keeps its ring position.
pub fn load_or_create_id(storage_dir: &Path) -> anyhow::Result<WorkerId> {
    let path = storage_dir.join(ID_FILE);

    if path.exists() {
        let stored = fs::read_to_string(&path)
            .with_context(|| format!("reading worker id from {}", path.display()))?;
        let stored = stored.trim();
        if stored.is_empty() {
            bail!("worker id file {} is empty", path.display());
        }
        tracing::info!("Loaded worker id {} from {}", stored, path.display());
        return Ok(WorkerId::from(stored));
    }

    let id = WorkerId::generate();
    fs::write(&path, id.as_str())
        .with_context(|| format!("writing worker id to {}", path.display()))?;
    tracing::info!("Generated worker id {}", id);
    Ok(id)
}
