//! The blob-store capability and two local doubles: `MemoryBlobStore` for
//! tests and `DiskBlobStore` for the CLI demo. The real deployment target
//! is an external collaborator -- neither backend here is that store,
//! both are illustrative.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;

/// Four-operation I/O boundary the navigator consumes. IDs are lowercase
/// hex SHA3-256 strings; values are opaque byte strings.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, id: &str, data: Vec<u8>) -> std::result::Result<(), StoreError>;
    async fn download(&self, id: &str) -> std::result::Result<Vec<u8>, StoreError>;
    async fn delete(&self, id: &str) -> std::result::Result<(), StoreError>;
    async fn exists(&self, id: &str) -> std::result::Result<bool, StoreError>;
}

/// In-process `HashMap`-backed store, guarded by a single `RwLock`.
/// Used by the integration test suite and the CLI's `--store memory` mode.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, id: &str, data: Vec<u8>) -> std::result::Result<(), StoreError> {
        self.blobs.write().await.insert(id.to_string(), data);
        Ok(())
    }

    async fn download(&self, id: &str) -> std::result::Result<Vec<u8>, StoreError> {
        self.blobs
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| Box::<dyn std::error::Error + Send + Sync>::from(format!("no such blob: {id}")))
    }

    async fn delete(&self, id: &str) -> std::result::Result<(), StoreError> {
        self.blobs.write().await.remove(id);
        Ok(())
    }

    async fn exists(&self, id: &str) -> std::result::Result<bool, StoreError> {
        Ok(self.blobs.read().await.contains_key(id))
    }
}

/// One file per blob under `root`, named by id. Used by the CLI's default
/// `--store <dir>` mode.
pub struct DiskBlobStore {
    root: PathBuf,
}

impl DiskBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }
}

#[async_trait]
impl BlobStore for DiskBlobStore {
    async fn upload(&self, id: &str, data: Vec<u8>) -> std::result::Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.path_for(id), data).await?;
        Ok(())
    }

    async fn download(&self, id: &str) -> std::result::Result<Vec<u8>, StoreError> {
        Ok(tokio::fs::read(self.path_for(id)).await?)
    }

    async fn delete(&self, id: &str) -> std::result::Result<(), StoreError> {
        match tokio::fs::remove_file(self.path_for(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, id: &str) -> std::result::Result<bool, StoreError> {
        Ok(tokio::fs::try_exists(self.path_for(id)).await?)
    }
}
