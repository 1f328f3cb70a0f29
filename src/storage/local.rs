use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use super::{validate_key, ObjectStore, StorageError, StorageResult};

/// Filesystem-backed object store. Object keys map to relative paths under a
/// base directory; the base directory is created on construction.
pub struct LocalObjectStore {
    base_path: PathBuf,
}

impl LocalObjectStore {
    pub fn new(base_path_str: &str) -> io::Result<Self> {
        let base_path = PathBuf::from(base_path_str);
        std::fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    fn resolve(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        let path = self.base_path.join(Path::new(key));
        if !path.starts_with(&self.base_path) {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(path)
    }

    /// Recursively gather file keys under `dir`, relative to the base path.
    fn collect_keys(base: &Path, dir: &Path, out: &mut Vec<String>) -> io::Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                Self::collect_keys(base, &path, out)?;
            } else if let Ok(rel) = path.strip_prefix(base) {
                out.push(rel.to_string_lossy().replace('\\', "/"));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn copy_object(&self, src_key: &str, dst_key: &str) -> StorageResult<()> {
        let src = self.resolve(src_key)?;
        let dst = self.resolve(dst_key)?;
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent).await?;
        }
        match fs::copy(&src, &dst).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(src_key.to_string()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn get_object(&self, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.resolve(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn put_object(
        &self,
        key: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> StorageResult<()> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, data).await?;
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn list_objects(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let root = if prefix.is_empty() {
            self.base_path.clone()
        } else {
            self.resolve(prefix)?
        };
        if !root.exists() {
            return Ok(Vec::new());
        }
        let base = self.base_path.clone();
        let keys = tokio::task::spawn_blocking(move || -> io::Result<Vec<String>> {
            let mut keys = Vec::new();
            Self::collect_keys(&base, &root, &mut keys)?;
            keys.sort();
            Ok(keys)
        })
        .await
        .map_err(|e| StorageError::Backend(format!("listing task failed: {e}")))??;
        Ok(keys)
    }

    async fn presigned_url(&self, key: &str, _ttl: Duration) -> StorageResult<String> {
        let path = self.resolve(key)?;
        if !path.exists() {
            return Err(StorageError::NotFound(key.to_string()));
        }
        // No signing for a local backend; a file URL is as presigned as it gets.
        Ok(format!(
            "file://{}",
            urlencoding::encode(&path.to_string_lossy()).replace("%2F", "/")
        ))
    }
}
