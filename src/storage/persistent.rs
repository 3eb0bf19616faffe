use super::error::{StorageError, StorageResult};
use super::row::Row;
use super::table::RowStore;

use dashmap::DashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Single-version table stored as one file per row under its own directory.
///
/// Only the directory path lives in memory; every read and write goes to disk.
/// Writers of the same key are serialized through [`KeyLocks`]; readers take no
/// lock and see either the previous or the new file thanks to rename-into-place.
pub struct PersistentTable {
    dir: PathBuf,
    locks: KeyLocks,
}

impl PersistentTable {
    /// Opens (creating if needed) the table stored in `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            locks: KeyLocks::default(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[cfg(test)]
    pub(crate) fn key_locks(&self) -> &KeyLocks {
        &self.locks
    }

    /// Moves the table directory to `new_dir`.
    ///
    /// The caller must hold exclusive access to the table.
    pub fn relocate(&mut self, new_dir: PathBuf) -> StorageResult<()> {
        fs::rename(&self.dir, &new_dir)?;
        tracing::debug!("Moved table directory {:?} -> {:?}", self.dir, new_dir);
        self.dir = new_dir;
        Ok(())
    }

    fn row_path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(encode_key(key)))
    }

    fn read_row(&self, key: &str) -> Option<Row> {
        let path = self.row_path(key).ok()?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::error!("Failed to read row file {:?}: {}", path, e);
                return None;
            }
        };

        match Row::from_bytes(&bytes) {
            Ok(row) => Some(row),
            Err(e) => {
                tracing::error!("Failed to decode row file {:?}: {}", path, e);
                None
            }
        }
    }

    fn write_row(&self, key: &str, row: &Row) -> StorageResult<()> {
        let path = self.row_path(key)?;
        fs::create_dir_all(&self.dir)?;

        let tmp = self.dir.join(format!(".{}.tmp", encode_key(key)));
        fs::write(&tmp, row.to_bytes())?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        tracing::debug!("Row {} written as {:?}", key, path);
        Ok(())
    }

    /// Names of visible row files; hidden (temporary) files are skipped.
    fn row_file_names(&self) -> Vec<String> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    tracing::error!("Failed to list table directory {:?}: {}", self.dir, e);
                }
                return Vec::new();
            }
        };

        entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| !name.starts_with('.'))
            .collect()
    }
}

impl RowStore for PersistentTable {
    fn get(&self, key: &str) -> Option<Row> {
        self.read_row(key)
    }

    fn put(&self, key: &str, row: Row) -> StorageResult<Option<u64>> {
        self.locks.with_lock(key, || self.write_row(key, &row))?;
        Ok(None)
    }

    fn put_column(&self, key: &str, column: &str, value: &[u8]) -> StorageResult<Option<u64>> {
        self.locks.with_lock(key, || {
            let mut row = self.read_row(key).unwrap_or_else(|| Row::new(key));
            row.put(column, value);
            self.write_row(key, &row)
        })?;
        Ok(None)
    }

    fn keys(&self) -> Vec<String> {
        self.row_file_names()
            .into_iter()
            .filter_map(|name| {
                let key = decode_key(&name);
                if key.is_none() {
                    tracing::warn!("Skipping undecodable row file {:?} in {:?}", name, self.dir);
                }
                key
            })
            .collect()
    }

    fn count(&self) -> usize {
        self.row_file_names().len()
    }

    /// Deletes every file in the table directory, then the directory itself.
    ///
    /// Keeps going after individual failures and reports the first one.
    fn destroy(&self) -> StorageResult<()> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let mut first_error: Option<std::io::Error> = None;
        for entry in entries {
            let result = entry.and_then(|entry| fs::remove_file(entry.path()));
            if let Err(e) = result {
                tracing::error!("Failed to delete row file in {:?}: {}", self.dir, e);
                first_error.get_or_insert(e);
            }
        }

        if let Err(e) = fs::remove_dir(&self.dir) {
            tracing::error!("Failed to delete table directory {:?}: {}", self.dir, e);
            first_error.get_or_insert(e);
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

/// Maps a row key onto a safe, reversible file name.
///
/// Percent-encodes everything outside `[A-Za-z0-9-_.~]`; a leading `.` is
/// escaped as well so row files never collide with hidden or special entries.
pub fn encode_key(key: &str) -> String {
    let encoded = urlencoding::encode(key);
    match encoded.strip_prefix('.') {
        Some(rest) => format!("%2E{}", rest),
        None => encoded.into_owned(),
    }
}

pub fn decode_key(file_name: &str) -> Option<String> {
    urlencoding::decode(file_name).ok().map(|key| key.into_owned())
}

/// Critical sections keyed by string, created on demand.
///
/// A key's mutex is removed again once no other writer holds a handle to it.
#[derive(Default)]
pub struct KeyLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyLocks {
    pub fn with_lock<T>(&self, key: &str, f: impl FnOnce() -> T) -> T {
        let lock = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let result = {
            let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            f()
        };

        drop(lock);
        self.locks
            .remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    /// Number of keys that currently have a live lock entry.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
