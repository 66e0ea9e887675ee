/// Blob Storage System
///
/// Content-addressed storage for canonicalized images. Uploads are decoded,
/// normalized into one fixed output format, hashed, and written under
/// `{digest}.{extension}` in a flat namespace.

pub mod disk;
pub mod key;
pub mod memory;
pub mod models;
pub mod normalize;
pub mod store;
pub mod validate;

pub use key::parse_key;
pub use models::*;
pub use normalize::{ImageNormalizer, NormalizeError, Normalizer, PassthroughNormalizer};
pub use store::{BlobStore, BlobStoreConfig};

use crate::error::VaultResult;
use async_trait::async_trait;

/// Blob storage backend trait
///
/// Implementations handle the actual storage and retrieval of blob data. Keys
/// reaching a backend have already been produced by the content addresser or
/// accepted by [`parse_key`].
#[async_trait]
pub trait BlobBackend: Send + Sync {
    /// Store a blob. Returns `false` if an object with this key already existed.
    async fn put(&self, key: &ObjectKey, data: Vec<u8>) -> VaultResult<bool>;

    /// Retrieve a blob by key
    async fn get(&self, key: &ObjectKey) -> VaultResult<Option<Vec<u8>>>;

    /// Cheap reachability check of the underlying storage
    async fn check(&self) -> VaultResult<()>;

    /// Summarize the stored objects
    ///
    /// May walk every object; keep it off hot paths.
    async fn stats(&self) -> VaultResult<StorageStats>;
}

/// Object count and total size of a backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct StorageStats {
    pub objects: u64,
    pub bytes: u64,
}
