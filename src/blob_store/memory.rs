/// In-memory blob storage backend
use crate::{
    blob_store::{BlobBackend, ObjectKey, StorageStats},
    error::VaultResult,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Memory storage backend
///
/// Non-durable; contents vanish with the process. Used by tests and for
/// throwaway instances.
#[derive(Clone, Default)]
pub struct MemoryBlobBackend {
    blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryBlobBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobBackend for MemoryBlobBackend {
    async fn put(&self, key: &ObjectKey, data: Vec<u8>) -> VaultResult<bool> {
        let mut blobs = self.blobs.write().await;
        if blobs.contains_key(&key.file_name()) {
            return Ok(false);
        }
        blobs.insert(key.file_name(), data);
        Ok(true)
    }

    async fn get(&self, key: &ObjectKey) -> VaultResult<Option<Vec<u8>>> {
        Ok(self.blobs.read().await.get(&key.file_name()).cloned())
    }

    async fn check(&self) -> VaultResult<()> {
        Ok(())
    }

    async fn stats(&self) -> VaultResult<StorageStats> {
        let blobs = self.blobs.read().await;
        Ok(StorageStats {
            objects: blobs.len() as u64,
            bytes: blobs.values().map(|b| b.len() as u64).sum(),
        })
    }
}
