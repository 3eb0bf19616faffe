use super::error::StorageResult;
use super::memory::MemoryTable;
use super::persistent::PersistentTable;
use super::row::{Row, RowMeta};

use std::path::Path;

/// Table names with this prefix are stored on disk.
pub const PERSISTENT_PREFIX: &str = "pt-";

/// Capability set shared by both table backends.
pub trait RowStore: Send + Sync {
    /// Current row for `key`.
    fn get(&self, key: &str) -> Option<Row>;

    /// Stores a whole row. Returns the new version for versioned tables.
    fn put(&self, key: &str, row: Row) -> StorageResult<Option<u64>>;

    /// Sets one column on the current row (creating the row if needed) as a
    /// single step with respect to other writers of the same key.
    fn put_column(&self, key: &str, column: &str, value: &[u8]) -> StorageResult<Option<u64>>;

    fn keys(&self) -> Vec<String>;

    fn count(&self) -> usize;

    /// Drops every row held by the table.
    fn destroy(&self) -> StorageResult<()>;

    fn generate_hash(&self, key: &str) -> Option<String> {
        self.get(key).map(|row| row.content_hash())
    }

    fn row_metas(&self) -> Vec<RowMeta> {
        self.keys()
            .into_iter()
            .filter_map(|key| self.get(&key).map(|row| row.meta()))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Memory,
    Persistent,
}

impl TableKind {
    pub fn for_name(name: &str) -> Self {
        if name.starts_with(PERSISTENT_PREFIX) {
            TableKind::Persistent
        } else {
            TableKind::Memory
        }
    }
}

enum Backend {
    Memory(MemoryTable),
    Persistent(PersistentTable),
}

/// A named table. The backend is chosen once, from the name, at creation.
pub struct Table {
    name: String,
    backend: Backend,
    retired: bool,
}

impl Table {
    /// Creates the table `name`; persistent tables live in `storage_dir/name`.
    pub fn create(name: &str, storage_dir: &Path) -> StorageResult<Self> {
        let backend = match TableKind::for_name(name) {
            TableKind::Memory => Backend::Memory(MemoryTable::new()),
            TableKind::Persistent => {
                Backend::Persistent(PersistentTable::open(storage_dir.join(name))?)
            }
        };

        Ok(Self {
            name: name.to_string(),
            backend,
            retired: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TableKind {
        match self.backend {
            Backend::Memory(_) => TableKind::Memory,
            Backend::Persistent(_) => TableKind::Persistent,
        }
    }

    fn store(&self) -> &dyn RowStore {
        match &self.backend {
            Backend::Memory(table) => table as &dyn RowStore,
            Backend::Persistent(table) => table,
        }
    }

    /// Reads a row. `version` only applies to versioned tables; persistent
    /// tables hold a single version and ignore it.
    pub fn get(&self, key: &str, version: Option<u64>) -> Option<Row> {
        match &self.backend {
            Backend::Memory(table) => table.get_version(key, version),
            Backend::Persistent(table) => table.get(key),
        }
    }

    pub fn newest_version(&self, key: &str) -> Option<u64> {
        match &self.backend {
            Backend::Memory(table) => table.newest_version(key),
            Backend::Persistent(_) => None,
        }
    }

    pub fn put(&self, key: &str, row: Row) -> StorageResult<Option<u64>> {
        self.store().put(key, row)
    }

    pub fn put_column(&self, key: &str, column: &str, value: &[u8]) -> StorageResult<Option<u64>> {
        self.store().put_column(key, column, value)
    }

    pub fn keys(&self) -> Vec<String> {
        self.store().keys()
    }

    /// Keys in ascending order, optionally limited to `[start, end)`.
    pub fn keys_in_range(&self, start: Option<&str>, end_exclusive: Option<&str>) -> Vec<String> {
        let mut keys: Vec<String> = self
            .keys()
            .into_iter()
            .filter(|key| start.is_none_or(|start| key.as_str() >= start))
            .filter(|key| end_exclusive.is_none_or(|end| key.as_str() < end))
            .collect();
        keys.sort();
        keys
    }

    pub fn count(&self) -> usize {
        self.store().count()
    }

    pub fn generate_hash(&self, key: &str) -> Option<String> {
        self.store().generate_hash(key)
    }

    pub fn row_metas(&self) -> Vec<RowMeta> {
        self.store().row_metas()
    }

    /// Gives the table a new name, moving its directory for persistent tables.
    pub(crate) fn rename(&mut self, new_name: &str, storage_dir: &Path) -> StorageResult<()> {
        if let Backend::Persistent(table) = &mut self.backend {
            table.relocate(storage_dir.join(new_name))?;
        }
        self.name = new_name.to_string();
        Ok(())
    }

    /// Destroys all rows and marks the table as no longer addressable.
    pub(crate) fn destroy(&mut self) -> StorageResult<()> {
        self.retired = true;
        self.store().destroy()
    }

    /// True once the table has been deleted; holders must re-resolve its name.
    #[cfg(test)]
    pub(crate) fn key_locks(&self) -> Option<&super::persistent::KeyLocks> {
        match &self.backend {
            Backend::Memory(_) => None,
            Backend::Persistent(table) => Some(table.key_locks()),
        }
    }

    pub fn is_retired(&self) -> bool {
        self.retired
    }
}
