//! Filesystem blob store
//!
//! Objects live at `{root}/{bucket}/{key}`. Keys are split on `/` into path
//! segments; segments that would escape the bucket directory are rejected.
//! Content type and cache directive are not persisted.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{BlobStore, StoreError};

#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an object to its path under the root.
    pub fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StoreError> {
        check_segment(bucket, bucket, "bucket")?;
        if key.is_empty() {
            return Err(StoreError::invalid_key(key, "key is empty"));
        }
        if key.starts_with('/') || key.contains('\\') {
            return Err(StoreError::invalid_key(key, "key must be a relative path"));
        }

        let mut path = self.root.join(bucket);
        for segment in key.split('/') {
            check_segment(segment, key, "key")?;
            path.push(segment);
        }
        Ok(path)
    }
}

fn check_segment(segment: &str, whole: &str, what: &str) -> Result<(), StoreError> {
    match segment {
        "" => Err(StoreError::invalid_key(whole, format!("{} has an empty segment", what))),
        "." | ".." => Err(StoreError::invalid_key(
            whole,
            format!("{} may not contain '.' or '..' segments", what),
        )),
        s if s.contains('/') || s.contains('\\') => Err(StoreError::invalid_key(
            whole,
            format!("{} may not contain path separators", what),
        )),
        _ => Ok(()),
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError> {
        let path = self.object_path(bucket, key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::not_found(bucket, key))
            }
            Err(e) => Err(StoreError::Io(format!("{}: {}", path.display(), e))),
        }
    }

    async fn store(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
        _cache_control: Option<&str>,
    ) -> Result<(), StoreError> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Io(format!("{}: {}", parent.display(), e)))?;
        }

        tokio::fs::write(&path, &body)
            .await
            .map_err(|e| StoreError::Io(format!("{}: {}", path.display(), e)))?;

        debug!(
            path = %path.display(),
            bytes = body.len(),
            content_type = %content_type,
            "Stored object on filesystem"
        );
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}
