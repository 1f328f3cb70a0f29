use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

mod http;
mod local;
mod memory;

pub use http::HttpObjectStore;
pub use local::LocalObjectStore;
pub use memory::InMemoryObjectStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Invalid object key: {0}")]
    InvalidKey(String),
    #[error("Backend error: {0}")]
    Backend(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Content-store capability. Keys are flat string object names; "directories"
/// are path-prefix conventions only.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Server-side copy of one object to a new key. The source must exist.
    async fn copy_object(&self, src_key: &str, dst_key: &str) -> StorageResult<()>;

    /// Fetch the full content of an object.
    async fn get_object(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Create or fully replace an object.
    async fn put_object(&self, key: &str, data: Vec<u8>, content_type: &str)
        -> StorageResult<()>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete_object(&self, key: &str) -> StorageResult<()>;

    /// List every object key under a prefix, recursively.
    async fn list_objects(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Produce a URL a client can fetch the object from for a limited time.
    async fn presigned_url(&self, key: &str, ttl: Duration) -> StorageResult<String>;
}

/// Rejects keys that could escape the store's namespace. Object keys come from
/// user-visible names (category keys, file names), so every implementation
/// funnels through this before touching its backend.
pub(crate) fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() || key.starts_with('/') {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    for part in key.split('/') {
        if part.is_empty() || part == "." || part == ".." {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
    }
    Ok(())
}
