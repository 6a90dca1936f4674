//! Content-addressed blob store.
//!
//! The network transport itself is out of scope; [`ContentStore`] is
//! the seam an external backend plugs into. Two local backends are
//! provided: [`MemoryStore`] for tests and [`FsStore`] for a
//! filesystem-backed node.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};

use courier_shared::constants::MAX_BLOB_SIZE;
use courier_shared::error::NetworkError;
use courier_shared::types::SwarmReference;

/// put/get by content hash. Failures are [`NetworkError`] and fatal to
/// the operation that hit them; retry policy belongs to the caller.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn put(&self, data: &[u8]) -> Result<SwarmReference, NetworkError>;
    async fn get(&self, reference: &SwarmReference) -> Result<Vec<u8>, NetworkError>;
}

fn check_blob(data: &[u8], max_size: usize) -> Result<(), NetworkError> {
    if data.is_empty() {
        return Err(NetworkError::Rejected("empty blob".to_string()));
    }
    if data.len() > max_size {
        return Err(NetworkError::Rejected(format!(
            "blob too large: {} bytes (max {})",
            data.len(),
            max_size
        )));
    }
    Ok(())
}

/// In-memory content store keyed by BLAKE3 reference.
#[derive(Clone, Default)]
pub struct MemoryStore {
    blobs: Arc<RwLock<HashMap<SwarmReference, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn put(&self, data: &[u8]) -> Result<SwarmReference, NetworkError> {
        check_blob(data, MAX_BLOB_SIZE)?;
        let reference = SwarmReference::for_content(data);
        let mut blobs = self.blobs.write().await;
        blobs.insert(reference.clone(), data.to_vec());
        debug!(reference = %reference.short(), size = data.len(), "Stored blob");
        Ok(reference)
    }

    async fn get(&self, reference: &SwarmReference) -> Result<Vec<u8>, NetworkError> {
        let blobs = self.blobs.read().await;
        blobs
            .get(reference)
            .cloned()
            .ok_or_else(|| NetworkError::NotFound(reference.to_hex()))
    }
}

/// Filesystem-backed content store. Blobs land under `base_path`, one
/// file per reference. The filename is the 64-hex reference, so no
/// path traversal is possible.
#[derive(Debug, Clone)]
pub struct FsStore {
    base_path: PathBuf,
    max_size: usize,
}

impl FsStore {
    pub async fn new(base_path: PathBuf, max_size: usize) -> Result<Self, NetworkError> {
        fs::create_dir_all(&base_path).await.map_err(|e| {
            NetworkError::Backend(format!(
                "Failed to create blob directory '{}': {}",
                base_path.display(),
                e
            ))
        })?;

        info!(path = %base_path.display(), "Content store initialized");

        Ok(Self {
            base_path,
            max_size,
        })
    }

    fn blob_path(&self, reference: &SwarmReference) -> PathBuf {
        self.base_path.join(reference.to_hex())
    }
}

#[async_trait]
impl ContentStore for FsStore {
    async fn put(&self, data: &[u8]) -> Result<SwarmReference, NetworkError> {
        check_blob(data, self.max_size)?;

        let reference = SwarmReference::for_content(data);
        let path = self.blob_path(&reference);

        fs::write(&path, data).await.map_err(|e| {
            NetworkError::Backend(format!("Failed to write blob {}: {}", reference, e))
        })?;

        debug!(reference = %reference.short(), size = data.len(), "Stored blob");
        Ok(reference)
    }

    async fn get(&self, reference: &SwarmReference) -> Result<Vec<u8>, NetworkError> {
        let path = self.blob_path(reference);

        if !path.exists() {
            return Err(NetworkError::NotFound(reference.to_hex()));
        }

        let data = fs::read(&path).await.map_err(|e| {
            NetworkError::Backend(format!("Failed to read blob {}: {}", reference, e))
        })?;

        debug!(reference = %reference.short(), size = data.len(), "Retrieved blob");
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_memory_put_get() {
        let store = MemoryStore::new();
        let data = b"encrypted-blob-data";

        let reference = store.put(data).await.unwrap();
        assert_eq!(store.get(&reference).await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_reference_is_content_hash() {
        let store = MemoryStore::new();
        let reference = store.put(b"stable bytes").await.unwrap();
        assert_eq!(reference, SwarmReference::for_content(b"stable bytes"));
        assert_eq!(reference.to_hex().len(), 64);
    }

    #[tokio::test]
    async fn test_memory_not_found() {
        let store = MemoryStore::new();
        let missing = SwarmReference::for_content(b"never stored");
        assert!(matches!(
            store.get(&missing).await,
            Err(NetworkError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_blob_rejected() {
        let store = MemoryStore::new();
        assert!(store.put(b"").await.is_err());
    }

    async fn test_fs_store() -> (FsStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = FsStore::new(dir.path().to_path_buf(), 1024 * 1024)
            .await
            .unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn test_fs_put_get() {
        let (store, _dir) = test_fs_store().await;
        let data = b"persisted-blob";

        let reference = store.put(data).await.unwrap();
        assert_eq!(store.get(&reference).await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_fs_not_found() {
        let (store, _dir) = test_fs_store().await;
        let missing = SwarmReference::for_content(b"missing");
        assert!(store.get(&missing).await.is_err());
    }

    #[tokio::test]
    async fn test_fs_size_cap() {
        let dir = TempDir::new().unwrap();
        let store = FsStore::new(dir.path().to_path_buf(), 8).await.unwrap();
        assert!(store.put(b"123456789").await.is_err());
        assert!(store.put(b"12345678").await.is_ok());
    }

    #[tokio::test]
    async fn test_fs_put_idempotent() {
        let (store, _dir) = test_fs_store().await;
        let a = store.put(b"same").await.unwrap();
        let b = store.put(b"same").await.unwrap();
        assert_eq!(a, b);
    }
}
