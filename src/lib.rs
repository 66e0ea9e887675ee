/// hashvault - content-addressed image store
///
/// Uploaded images are decoded, re-encoded into one canonical format, and
/// stored under the SHA-256 digest of the canonical bytes. The digest is the
/// only retrieval key.

pub mod api;
pub mod blob_store;
pub mod config;
pub mod context;
pub mod error;
pub mod metrics;
pub mod server;
