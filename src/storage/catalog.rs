use super::error::{CatalogError, StorageResult};
use super::row::Row;
use super::table::{Table, TableKind};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

pub type SharedTable = Arc<RwLock<Table>>;

/// The set of named tables owned by one worker.
///
/// Lookups and lazy creation go through the concurrent map; rename and delete
/// take the write lock of the one table they touch, never a global lock.
pub struct TableCatalog {
    tables: DashMap<String, SharedTable>,
    storage_dir: PathBuf,
}

impl TableCatalog {
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            tables: DashMap::new(),
            storage_dir: storage_dir.into(),
        }
    }

    /// Opens the catalog rooted at `storage_dir`, loading every persistent
    /// table directory found there.
    pub fn open(storage_dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let catalog = Self::new(storage_dir);
        fs::create_dir_all(&catalog.storage_dir)?;

        for entry in fs::read_dir(&catalog.storage_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                tracing::warn!("Skipping non utf-8 directory {:?}", entry.path());
                continue;
            };
            if TableKind::for_name(&name) != TableKind::Persistent {
                tracing::warn!("Ignoring directory {} (not a persistent table name)", name);
                continue;
            }

            let table = Table::create(&name, &catalog.storage_dir)?;
            tracing::info!("Loaded persistent table {} ({} rows)", name, table.count());
            catalog
                .tables
                .insert(name, Arc::new(RwLock::new(table)));
        }

        Ok(catalog)
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Rejects names that cannot safely be used as a directory name.
    pub fn validate_name(name: &str) -> Result<(), CatalogError> {
        let invalid = name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\', '\0']);
        if invalid {
            return Err(CatalogError::InvalidName(name.to_string()));
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<SharedTable> {
        self.tables.get(name).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Returns the table `name`, creating it exactly once if unknown.
    pub fn get_or_create(&self, name: &str) -> Result<SharedTable, CatalogError> {
        Self::validate_name(name)?;
        let table = match self.tables.entry(name.to_string()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let table = Table::create(name, &self.storage_dir)?;
                tracing::info!("Created {:?} table {}", table.kind(), name);
                entry.insert(Arc::new(RwLock::new(table))).clone()
            }
        };
        Ok(table)
    }

    /// Table names in ascending order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Runs `op` against the live table called `name`, creating it if needed.
    ///
    /// A handle that was renamed or deleted while we waited for its lock is
    /// discarded and the name is resolved again. On persistent tables `op`
    /// runs on the blocking pool: it does file I/O and may wait on a key lock.
    async fn with_live_table<T>(
        &self,
        name: &str,
        op: impl FnOnce(&Table) -> Result<T, CatalogError> + Send + 'static,
    ) -> Result<T, CatalogError>
    where
        T: Send + 'static,
    {
        loop {
            let table = self.get_or_create(name)?;
            let guard = table.read_owned().await;
            if guard.is_retired() || guard.name() != name {
                tracing::debug!("Table {} changed under a writer, retrying", name);
                continue;
            }
            return match guard.kind() {
                TableKind::Memory => op(&guard),
                TableKind::Persistent => tokio::task::spawn_blocking(move || op(&guard))
                    .await
                    .map_err(|e| CatalogError::from(std::io::Error::other(e)))?,
            };
        }
    }

    /// Sets one column of one row. Returns the new version for versioned tables.
    pub async fn put_column(
        &self,
        table: &str,
        key: &str,
        column: &str,
        value: &[u8],
    ) -> Result<Option<u64>, CatalogError> {
        let (key, column, value) = (key.to_string(), column.to_string(), value.to_vec());
        self.with_live_table(table, move |t| Ok(t.put_column(&key, &column, &value)?))
            .await
    }

    /// Stores `row` unless its key already exists. Returns whether it was written.
    pub async fn put_row_if_absent(&self, table: &str, row: Row) -> Result<bool, CatalogError> {
        self.with_live_table(table, move |t| {
            let key = row.key().to_string();
            if t.get(&key, None).is_some() {
                return Ok(false);
            }
            t.put(&key, row)?;
            Ok(true)
        })
        .await
    }

    pub async fn rename(&self, old: &str, new: &str) -> Result<(), CatalogError> {
        let table = self
            .get(old)
            .ok_or_else(|| CatalogError::NotFound(old.to_string()))?;
        Self::validate_name(new)?;
        if self.contains(new) {
            return Err(CatalogError::AlreadyExists(new.to_string()));
        }
        if TableKind::for_name(old) != TableKind::for_name(new) {
            return Err(CatalogError::KindMismatch {
                from: old.to_string(),
                to: new.to_string(),
            });
        }

        let mut guard = table.write().await;
        if guard.is_retired() || guard.name() != old {
            return Err(CatalogError::NotFound(old.to_string()));
        }

        match self.tables.entry(new.to_string()) {
            Entry::Occupied(_) => return Err(CatalogError::AlreadyExists(new.to_string())),
            Entry::Vacant(slot) => {
                guard.rename(new, &self.storage_dir)?;
                slot.insert(table.clone());
            }
        }
        self.tables.remove_if(old, |_, t| Arc::ptr_eq(t, &table));

        tracing::info!("Renamed table {} to {}", old, new);
        Ok(())
    }

    /// Destroys the table and forgets its name.
    ///
    /// The name is released even when destroying the rows partially fails; the
    /// failure is still reported.
    pub async fn delete(&self, name: &str) -> Result<(), CatalogError> {
        let table = self
            .get(name)
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))?;

        let mut guard = table.write().await;
        if guard.is_retired() || guard.name() != name {
            return Err(CatalogError::NotFound(name.to_string()));
        }

        let result = guard.destroy();
        self.tables.remove_if(name, |_, t| Arc::ptr_eq(t, &table));

        match &result {
            Ok(()) => tracing::info!("Deleted table {}", name),
            Err(e) => tracing::error!("Deleting table {} left files behind: {}", name, e),
        }
        Ok(result?)
    }
}
