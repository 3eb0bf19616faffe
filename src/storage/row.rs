//! Row model and its wire/disk encoding.
//!
//! A row is encoded as a sequence of length-prefixed fields:
//!
//! ```text
//! <key-len> SP <key> SP ( <name-len> SP <name> SP <value-len> SP <value> SP )*
//! ```
//!
//! Lengths are ASCII decimal byte counts, so keys, column names and values may
//! contain any bytes (spaces, newlines, NULs). A row ends at end of input, or at
//! a `\n` found where the next column would begin. Table streams rely on that:
//! every row is followed by `\n`, and the stream is closed by one extra `\n`.

use super::error::{StorageError, StorageResult};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::{BufRead, Read};

/// Upper bound for a single encoded field, guards against corrupt length prefixes.
const MAX_FIELD_LEN: usize = 1 << 30;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    key: String,
    columns: BTreeMap<String, Vec<u8>>,
}

/// Key plus content hash of the row's current encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowMeta {
    pub key: String,
    pub hash: String,
}

impl Row {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            columns: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn get(&self, column: &str) -> Option<&[u8]> {
        self.columns.get(column).map(Vec::as_slice)
    }

    /// Sets a column, replacing any previous value.
    pub fn put(&mut self, column: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.columns.insert(column.into(), value.into());
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            self.key.len()
                + 16
                + self
                    .columns
                    .iter()
                    .map(|(name, value)| name.len() + value.len() + 24)
                    .sum::<usize>(),
        );

        write_field(&mut out, self.key.as_bytes());
        for (name, value) in &self.columns {
            write_field(&mut out, name.as_bytes());
            write_field(&mut out, value);
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> StorageResult<Self> {
        let mut reader = bytes;
        Self::read_from(&mut reader)?
            .ok_or_else(|| StorageError::Corrupt("empty row encoding".to_string()))
    }

    /// Reads one row from `reader`.
    ///
    /// Returns `Ok(None)` at end of input or when a bare `\n` is found where a
    /// row would start (the stream terminator).
    pub fn read_from<R: BufRead>(reader: &mut R) -> StorageResult<Option<Self>> {
        match peek(reader)? {
            None => return Ok(None),
            Some(b'\n') => {
                reader.consume(1);
                return Ok(None);
            }
            Some(_) => {}
        }

        let key = read_string(reader)?;
        let mut row = Row::new(key);

        loop {
            match peek(reader)? {
                None => break,
                Some(b'\n') => {
                    reader.consume(1);
                    break;
                }
                Some(_) => {
                    let name = read_string(reader)?;
                    let value = read_field(reader)?;
                    row.columns.insert(name, value);
                }
            }
        }

        Ok(Some(row))
    }

    /// Lowercase hex SHA-256 of the encoded row.
    pub fn content_hash(&self) -> String {
        hex::encode(Sha256::digest(self.to_bytes()))
    }

    pub fn meta(&self) -> RowMeta {
        RowMeta {
            key: self.key.clone(),
            hash: self.content_hash(),
        }
    }
}

/// Parses a full table stream (`row \n row \n ... \n`).
pub fn read_stream<R: BufRead>(reader: &mut R) -> StorageResult<Vec<Row>> {
    let mut rows = Vec::new();
    while let Some(row) = Row::read_from(reader)? {
        rows.push(row);
    }
    Ok(rows)
}

fn write_field(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(bytes.len().to_string().as_bytes());
    out.push(b' ');
    out.extend_from_slice(bytes);
    out.push(b' ');
}

fn peek<R: BufRead>(reader: &mut R) -> StorageResult<Option<u8>> {
    let buf = reader.fill_buf()?;
    Ok(buf.first().copied())
}

fn read_field<R: BufRead>(reader: &mut R) -> StorageResult<Vec<u8>> {
    let mut len_buf = Vec::new();
    reader.read_until(b' ', &mut len_buf)?;
    if len_buf.pop() != Some(b' ') {
        return Err(StorageError::Corrupt("truncated length prefix".to_string()));
    }

    let len: usize = std::str::from_utf8(&len_buf)
        .ok()
        .and_then(|text| text.parse().ok())
        .ok_or_else(|| {
            StorageError::Corrupt(format!(
                "bad length prefix {:?}",
                String::from_utf8_lossy(&len_buf)
            ))
        })?;
    if len > MAX_FIELD_LEN {
        return Err(StorageError::Corrupt(format!("field length {} too large", len)));
    }

    // Grows with the bytes actually present, not with the declared length.
    let mut value = Vec::new();
    reader.by_ref().take(len as u64).read_to_end(&mut value)?;
    if value.len() != len {
        return Err(StorageError::Corrupt(format!(
            "truncated field: {} of {} bytes",
            value.len(),
            len
        )));
    }

    let mut separator = [0u8; 1];
    reader
        .read_exact(&mut separator)
        .map_err(|e| StorageError::Corrupt(format!("missing separator: {}", e)))?;
    if separator[0] != b' ' {
        return Err(StorageError::Corrupt("field not followed by a space".to_string()));
    }

    Ok(value)
}

fn read_string<R: BufRead>(reader: &mut R) -> StorageResult<String> {
    String::from_utf8(read_field(reader)?)
        .map_err(|_| StorageError::Corrupt("field is not valid utf-8".to_string()))
}
