/// Application context and dependency injection
use crate::{
    blob_store::{BlobStore, BlobStoreConfig},
    config::ServerConfig,
    error::{VaultError, VaultResult},
};
use std::sync::Arc;
use std::time::Instant;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub blob_store: Arc<BlobStore>,
    pub started_at: Instant,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> VaultResult<Self> {
        config.validate()?;

        // The store never creates its own directory
        Self::ensure_directories(&config).await?;

        let blob_store = Arc::new(BlobStore::new(Self::blob_store_config(&config)));

        Ok(Self::with_store(config, blob_store))
    }

    /// Assemble a context around an already constructed store
    pub fn with_store(config: ServerConfig, blob_store: Arc<BlobStore>) -> Self {
        Self {
            config: Arc::new(config),
            blob_store,
            started_at: Instant::now(),
        }
    }

    fn blob_store_config(config: &ServerConfig) -> BlobStoreConfig {
        BlobStoreConfig {
            root: config.storage.directory.clone(),
            format: config.storage.format,
            max_upload_bytes: config.storage.max_upload_bytes,
        }
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> VaultResult<()> {
        let dir = &config.storage.directory;
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            VaultError::Internal(format!("Failed to create directory {:?}: {}", dir, e))
        })?;
        Ok(())
    }

    /// Get service address
    pub fn bind_address(&self) -> String {
        format!(
            "{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }

    pub fn uptime_seconds(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}
