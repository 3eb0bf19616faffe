use super::error::StorageResult;
use super::row::Row;
use super::table::RowStore;

use dashmap::DashMap;
use std::collections::BTreeMap;

/// Multi-version in-memory table.
///
/// Every write appends a new version (1, 2, ...) for its key; nothing is ever
/// overwritten. The DashMap entry lock serializes writers of one key while
/// writers of different keys proceed independently.
#[derive(Default)]
pub struct MemoryTable {
    rows: DashMap<String, BTreeMap<u64, Row>>,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `version` of `key`, or the newest version when `version` is `None`.
    pub fn get_version(&self, key: &str, version: Option<u64>) -> Option<Row> {
        let versions = self.rows.get(key)?;
        match version {
            Some(v) => versions.get(&v).cloned(),
            None => versions.last_key_value().map(|(_, row)| row.clone()),
        }
    }

    pub fn newest_version(&self, key: &str) -> Option<u64> {
        self.rows
            .get(key)
            .and_then(|versions| versions.last_key_value().map(|(v, _)| *v))
    }

    fn append(versions: &mut BTreeMap<u64, Row>, row: Row) -> u64 {
        let next = versions.last_key_value().map(|(v, _)| v + 1).unwrap_or(1);
        versions.insert(next, row);
        next
    }
}

impl RowStore for MemoryTable {
    fn get(&self, key: &str) -> Option<Row> {
        self.get_version(key, None)
    }

    fn put(&self, key: &str, row: Row) -> StorageResult<Option<u64>> {
        let mut versions = self.rows.entry(key.to_string()).or_default();
        let version = Self::append(&mut versions, row);
        tracing::debug!("Appended version {} of row {}", version, key);
        Ok(Some(version))
    }

    fn put_column(&self, key: &str, column: &str, value: &[u8]) -> StorageResult<Option<u64>> {
        let mut versions = self.rows.entry(key.to_string()).or_default();
        let mut row = versions
            .last_key_value()
            .map(|(_, row)| row.clone())
            .unwrap_or_else(|| Row::new(key));
        row.put(column, value);
        let version = Self::append(&mut versions, row);
        tracing::debug!("Appended version {} of row {} (column {})", version, key, column);
        Ok(Some(version))
    }

    fn keys(&self) -> Vec<String> {
        self.rows.iter().map(|entry| entry.key().clone()).collect()
    }

    fn count(&self) -> usize {
        self.rows.len()
    }

    fn destroy(&self) -> StorageResult<()> {
        self.rows.clear();
        Ok(())
    }
}
