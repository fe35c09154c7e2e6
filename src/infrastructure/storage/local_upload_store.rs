use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::ports::{StorageError, StoredUpload, UploadStore};
use crate::domain::value_objects::ContentHash;
use crate::infrastructure::storage::{ContentHasher, PathBuilder, TEMP_DIR};

/// Upload store over a local directory tree.
///
/// Files are copied into a staging directory under the root, hashed on the
/// way, then linked into place so readers never see a partial file and an
/// existing file is never overwritten.
pub struct LocalUploadStore {
    path_builder: PathBuilder,
    durable_writes: bool,
}

impl LocalUploadStore {
    pub fn new(root: PathBuf) -> Self {
        Self::with_durability(root, true)
    }

    pub fn with_durability(root: PathBuf, durable_writes: bool) -> Self {
        Self {
            path_builder: PathBuilder::new(root),
            durable_writes,
        }
    }

    pub fn root(&self) -> &Path {
        self.path_builder.root()
    }

    /// Create the root and its staging directory
    pub async fn init(&self) -> Result<(), StorageError> {
        fs::create_dir_all(self.root().join(TEMP_DIR)).await?;
        Ok(())
    }

    #[cfg(unix)]
    async fn set_permissions(path: &Path) -> Result<(), StorageError> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, std::fs::Permissions::from_mode(0o644)).await?;
        Ok(())
    }

    #[cfg(not(unix))]
    async fn set_permissions(_path: &Path) -> Result<(), StorageError> {
        Ok(())
    }

    /// Canonical path of `path` if it exists and lies under the root
    async fn contained(&self, path: &Path) -> Result<Option<PathBuf>, StorageError> {
        let full = self.path_builder.resolve(path);
        let canonical = match fs::canonicalize(&full).await {
            Ok(p) => p,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let root = fs::canonicalize(self.root()).await?;
        if !canonical.starts_with(&root) {
            return Err(StorageError::OutsideRoot(full));
        }
        Ok(Some(canonical))
    }
}

#[async_trait]
impl UploadStore for LocalUploadStore {
    async fn persist(
        &self,
        source: &Path,
        directory: &Path,
        filename: &str,
    ) -> Result<StoredUpload, StorageError> {
        let final_path = self.path_builder.final_path(directory, filename)?;
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(StorageError::CreateDirectory)?;
        }
        fs::create_dir_all(self.root().join(TEMP_DIR))
            .await
            .map_err(StorageError::CreateDirectory)?;

        let temp_path = self.path_builder.temp_path(Uuid::new_v4());
        debug!("Copying upload {:?} to staging file {:?}", source, temp_path);
        let (checksum, size) =
            match ContentHasher::copy_and_hash(source, &temp_path, self.durable_writes).await {
                Ok(result) => result,
                Err(e) => {
                    warn!("Failed to stage upload {:?}: {}", source, e);
                    let _ = fs::remove_file(&temp_path).await;
                    return Err(match e {
                        StorageError::Io(io) => StorageError::Move(io),
                        other => other,
                    });
                }
            };

        // link(2) fails on an existing target where rename(2) would replace it
        let linked = fs::hard_link(&temp_path, &final_path).await;
        if let Err(e) = fs::remove_file(&temp_path).await {
            warn!("Could not remove staging file {:?}: {}", temp_path, e);
        }
        match linked {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StorageError::AlreadyExists(final_path));
            }
            Err(e) => return Err(StorageError::Move(e)),
        }
        Self::set_permissions(&final_path).await?;

        if let Err(e) = fs::remove_file(source).await {
            warn!("Could not remove upload source {:?}: {}", source, e);
        }

        Ok(StoredUpload {
            relative_path: directory.join(filename),
            path: final_path,
            size,
            checksum,
        })
    }

    async fn delete(&self, path: &Path) -> Result<bool, StorageError> {
        let Some(canonical) = self.contained(path).await? else {
            return Ok(false);
        };
        if !fs::metadata(&canonical).await?.is_file() {
            return Ok(false);
        }
        fs::remove_file(&canonical).await?;
        debug!("Deleted stored upload {:?}", canonical);
        Ok(true)
    }

    async fn checksum(&self, path: &Path) -> Result<ContentHash, StorageError> {
        let canonical = self
            .contained(path)
            .await?
            .ok_or_else(|| StorageError::Io(std::io::ErrorKind::NotFound.into()))?;
        ContentHasher::hash_file(&canonical).await
    }
}
