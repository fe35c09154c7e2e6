use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};

use crate::application::ports::StorageError;
use crate::domain::value_objects::ContentHash;

const BUFFER_SIZE: usize = 256 * 1024;

/// SHA-256 checksums computed while data streams through
pub struct ContentHasher;

impl ContentHasher {
    /// Copy `source` to `dest`, hashing in the same pass.
    /// Returns the checksum and the number of bytes written.
    pub async fn copy_and_hash(
        source: &Path,
        dest: &Path,
        durable: bool,
    ) -> Result<(ContentHash, u64), StorageError> {
        let mut reader = BufReader::with_capacity(BUFFER_SIZE, File::open(source).await?);
        let mut file =
            tokio::io::BufWriter::with_capacity(BUFFER_SIZE * 2, File::create(dest).await?);

        let mut hasher = Sha256::new();
        let mut total_bytes = 0u64;
        let mut buffer = vec![0u8; BUFFER_SIZE];
        loop {
            let n = reader.read(&mut buffer).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
            file.write_all(&buffer[..n]).await?;
            total_bytes += n as u64;
        }

        file.flush().await?;
        if durable {
            file.get_mut().sync_all().await?;
        }

        Ok((Self::finish(hasher)?, total_bytes))
    }

    pub async fn hash_file(path: &Path) -> Result<ContentHash, StorageError> {
        let mut reader = BufReader::with_capacity(BUFFER_SIZE, File::open(path).await?);
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; BUFFER_SIZE];
        loop {
            let n = reader.read(&mut buffer).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }
        Self::finish(hasher)
    }

    fn finish(hasher: Sha256) -> Result<ContentHash, StorageError> {
        ContentHash::from_hex(hex::encode(hasher.finalize()))
            .map_err(|e| StorageError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_copy_and_hash() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("in");
        let dest = dir.path().join("out");
        tokio::fs::write(&source, b"hello").await.unwrap();

        let (hash, size) = ContentHasher::copy_and_hash(&source, &dest, false).await.unwrap();
        assert_eq!(size, 5);
        assert_eq!(
            hash.as_hex(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"hello");
        assert_eq!(ContentHasher::hash_file(&dest).await.unwrap(), hash);
    }
}
