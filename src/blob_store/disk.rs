/// Disk-based blob storage backend
use crate::{
    blob_store::{BlobBackend, ObjectKey, StorageStats},
    error::{VaultError, VaultResult},
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::{fs, io::AsyncWriteExt};

/// Prefix for in-flight writes; a leading dot can never satisfy the key format
const TEMP_PREFIX: &str = ".tmp-";

/// Disk storage backend
///
/// Stores every blob directly in one flat directory as `{digest}.{ext}`.
/// Writes land in a temporary file that is fsynced and then renamed into
/// place, so a blob is either absent or complete at its final path.
///
/// The directory must already exist; creating it is the caller's job at
/// startup.
#[derive(Clone, Debug)]
pub struct DiskBlobBackend {
    base_path: PathBuf,
}

impl DiskBlobBackend {
    /// Create a new disk storage backend
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Get the file path for a key
    fn get_blob_path(&self, key: &ObjectKey) -> PathBuf {
        self.base_path.join(key.file_name())
    }

    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(format!("{}{}", TEMP_PREFIX, uuid::Uuid::new_v4().simple()))
    }

    async fn write_durable(path: &Path, data: &[u8]) -> std::io::Result<()> {
        let mut file = fs::File::create(path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        Ok(())
    }
}

#[async_trait]
impl BlobBackend for DiskBlobBackend {
    async fn put(&self, key: &ObjectKey, data: Vec<u8>) -> VaultResult<bool> {
        let blob_path = self.get_blob_path(key);

        if fs::try_exists(&blob_path).await.unwrap_or(false) {
            tracing::debug!(key = %key, "blob already stored, skipping write");
            return Ok(false);
        }

        let temp_path = self.temp_path();

        if let Err(e) = Self::write_durable(&temp_path, &data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(VaultError::Storage(format!(
                "Failed to write blob {}: {}",
                key, e
            )));
        }

        // Concurrent writers of the same key carry identical bytes, so
        // whichever rename lands last leaves the same file behind.
        if let Err(e) = fs::rename(&temp_path, &blob_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(VaultError::Storage(format!(
                "Failed to commit blob {}: {}",
                key, e
            )));
        }

        Ok(true)
    }

    async fn get(&self, key: &ObjectKey) -> VaultResult<Option<Vec<u8>>> {
        let blob_path = self.get_blob_path(key);

        match fs::read(&blob_path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => {
                // Callers only ever learn "not found"
                tracing::warn!(key = %key, error = %e, "failed to read blob");
                Ok(None)
            }
        }
    }

    async fn check(&self) -> VaultResult<()> {
        let metadata = fs::metadata(&self.base_path).await.map_err(|e| {
            VaultError::Storage(format!(
                "Blob directory {} is unavailable: {}",
                self.base_path.display(),
                e
            ))
        })?;

        if !metadata.is_dir() {
            return Err(VaultError::Storage(format!(
                "Blob directory {} is not a directory",
                self.base_path.display()
            )));
        }

        Ok(())
    }

    async fn stats(&self) -> VaultResult<StorageStats> {
        let mut entries = fs::read_dir(&self.base_path).await.map_err(|e| {
            VaultError::Storage(format!(
                "Failed to list blob directory {}: {}",
                self.base_path.display(),
                e
            ))
        })?;

        let mut stats = StorageStats::default();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            let metadata = entry.metadata().await?;
            if metadata.is_file() {
                stats.objects += 1;
                stats.bytes += metadata.len();
            }
        }

        Ok(stats)
    }
}
