/// Blob Store Manager
///
/// Runs the ingestion pipeline (validate, canonicalize, address, persist) and
/// the retrieval path (parse key, read) on top of a storage backend.
use crate::{
    blob_store::{
        disk::DiskBlobBackend, key::parse_key, validate, BlobBackend, Digest, FetchedBlob,
        ImageNormalizer, Normalizer, ObjectKey, OutputFormat, StorageStats, StoredBlob,
    },
    error::{VaultError, VaultResult},
    metrics,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Blob store configuration
#[derive(Debug, Clone)]
pub struct BlobStoreConfig {
    /// Flat directory holding `{digest}.{ext}` files
    pub root: PathBuf,

    /// Canonical output profile
    pub format: OutputFormat,

    /// Maximum decoded upload size in bytes (default: 10MB)
    pub max_upload_bytes: usize,
}

impl Default for BlobStoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./uploads"),
            format: OutputFormat::default(),
            max_upload_bytes: validate::MAX_UPLOAD_BYTES,
        }
    }
}

/// Main blob store manager
#[derive(Clone)]
pub struct BlobStore {
    config: BlobStoreConfig,
    backend: Arc<dyn BlobBackend>,
    normalizer: Arc<dyn Normalizer>,
}

impl BlobStore {
    /// Create a disk-backed store that canonicalizes with the `image` crate
    pub fn new(config: BlobStoreConfig) -> Self {
        let backend = Arc::new(DiskBlobBackend::new(config.root.clone()));
        let normalizer = Arc::new(ImageNormalizer::new(config.format));
        Self::with_parts(config, backend, normalizer)
    }

    /// Create a store from explicit collaborators
    pub fn with_parts(
        config: BlobStoreConfig,
        backend: Arc<dyn BlobBackend>,
        normalizer: Arc<dyn Normalizer>,
    ) -> Self {
        Self {
            config,
            backend,
            normalizer,
        }
    }

    pub fn config(&self) -> &BlobStoreConfig {
        &self.config
    }

    pub fn format(&self) -> OutputFormat {
        self.config.format
    }

    /// Ingest an upload in its transport form (base64, optional data URI)
    pub async fn ingest(&self, payload: &str) -> VaultResult<StoredBlob> {
        let raw = validate::decode_payload(payload)?;
        self.ingest_bytes(raw).await
    }

    /// Ingest already-decoded upload bytes
    pub async fn ingest_bytes(&self, raw: Vec<u8>) -> VaultResult<StoredBlob> {
        validate::validate_size(&raw, self.config.max_upload_bytes)?;

        let canonical = self.canonicalize(raw).await?;
        let digest = Digest::of(&canonical);
        let size = canonical.len();

        let created = self.put(&digest, canonical).await?;
        let key = ObjectKey::new(digest, self.config.format);

        if created {
            tracing::info!(key = %key, size, "stored blob");
        } else {
            tracing::info!(key = %key, size, "blob already present");
        }
        metrics::record_blob_upload(self.config.format.extension(), created, size);

        Ok(StoredBlob {
            key,
            size,
            deduplicated: !created,
        })
    }

    /// Run the normalizer off the async runtime
    pub async fn canonicalize(&self, raw: Vec<u8>) -> VaultResult<Vec<u8>> {
        let normalizer = Arc::clone(&self.normalizer);

        tokio::task::spawn_blocking(move || normalizer.normalize(&raw))
            .await
            .map_err(|e| VaultError::Internal(format!("Normalizer task failed: {}", e)))?
            .map_err(|e| {
                tracing::warn!(error = %e, "rejected upload");
                VaultError::InvalidImage(e.to_string())
            })
    }

    /// Persist canonical bytes under their digest
    ///
    /// Returns `false` when the object was already stored.
    pub async fn put(&self, digest: &Digest, data: Vec<u8>) -> VaultResult<bool> {
        let key = ObjectKey::new(digest.clone(), self.config.format);
        self.backend.put(&key, data).await
    }

    /// Fetch a blob by its raw retrieval key, e.g. `"{digest}.webp"`
    pub async fn get(&self, raw_key: &str) -> VaultResult<FetchedBlob> {
        let key = match parse_key(raw_key, self.config.format) {
            Ok(key) => key,
            Err(e) => {
                metrics::record_blob_fetch("invalid");
                return Err(e);
            }
        };

        match self.backend.get(&key).await? {
            Some(data) => {
                metrics::record_blob_fetch("hit");
                Ok(FetchedBlob { key, data })
            }
            None => {
                metrics::record_blob_fetch("miss");
                Err(VaultError::NotFound(format!("Blob not found: {}", key)))
            }
        }
    }

    /// Verify the backend is reachable without enumerating objects
    pub async fn check(&self) -> VaultResult<()> {
        self.backend.check().await
    }

    /// Object count and total size of the backend
    pub async fn stats(&self) -> VaultResult<StorageStats> {
        self.backend.stats().await
    }
}
