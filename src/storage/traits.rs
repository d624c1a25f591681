//! Storage error types and the open contract

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while opening or borrowing the store
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database file not found: {}", .0.display())]
    FileNotFound(PathBuf),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Extension trait for opening stores from paths
pub trait OpenStore: Sized {
    /// Open an existing store at the given path.
    ///
    /// Stores are read-only views; a missing file is an error, never an
    /// invitation to create one.
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;
}
