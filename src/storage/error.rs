//! Error types for the table storage layer.

use thiserror::Error;

/// Result type alias for row and table operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised while reading or writing rows.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt row encoding: {0}")]
    Corrupt(String),

    #[error("row key cannot be stored: {0:?}")]
    InvalidKey(String),
}

/// Errors raised by table-level operations on the catalog.
///
/// Each variant maps onto one HTTP status at the handler boundary.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("table {0} not found")]
    NotFound(String),

    #[error("invalid table name: {0:?}")]
    InvalidName(String),

    #[error("cannot rename {from} to {to}: tables are of different kinds")]
    KindMismatch { from: String, to: String },

    #[error("table {0} already exists")]
    AlreadyExists(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::Storage(StorageError::Io(err))
    }
}
