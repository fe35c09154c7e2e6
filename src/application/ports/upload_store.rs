use async_trait::async_trait;
#[cfg(test)]
use mockall::{automock, predicate::*};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::value_objects::ContentHash;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not create destination directory: {0}")]
    CreateDirectory(std::io::Error),

    #[error("Could not move file into place: {0}")]
    Move(std::io::Error),

    #[error("Destination already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("Path escapes the upload root: {0}")]
    OutsideRoot(PathBuf),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// A file persisted under the upload root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    pub path: PathBuf,
    /// Path relative to the upload root
    pub relative_path: PathBuf,
    pub size: u64,
    pub checksum: ContentHash,
}

/// Port for the directory tree accepted uploads are written to
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UploadStore: Send + Sync {
    /// Move `source` to `directory/filename` below the root.
    ///
    /// An existing file is never replaced: that case is `AlreadyExists` and
    /// leaves `source` in place. A partially written destination is removed
    /// on failure.
    async fn persist(
        &self,
        source: &Path,
        directory: &Path,
        filename: &str,
    ) -> Result<StoredUpload, StorageError>;

    /// Delete a stored file; `false` when it does not exist.
    /// Paths resolving outside the root are refused.
    async fn delete(&self, path: &Path) -> Result<bool, StorageError>;

    /// Recompute the checksum of a stored file
    async fn checksum(&self, path: &Path) -> Result<ContentHash, StorageError>;
}
