//! Blob storage for uploaded and rendered resume documents
//!
//! Paths handed out by [`BlobStore::store`] are opaque keys relative to the
//! store root. The filesystem store covers single-node deployments; tests use
//! the in-memory store.

use crate::errors::{AppError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

/// Content-addressed blob storage
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes, returning the storage key
    async fn store(&self, prefix: &str, extension: &str, bytes: &[u8]) -> Result<String>;

    /// Read bytes back by storage key
    async fn read(&self, key: &str) -> Result<Vec<u8>>;

    /// Delete a blob; missing keys are not an error
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Filesystem-backed blob store
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf> {
        // Keys are generated by store(); reject anything path-traversal shaped
        if key.contains("..") || Path::new(key).is_absolute() {
            return Err(AppError::BlobError {
                message: format!("Invalid storage key: {}", key),
            });
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn store(&self, prefix: &str, extension: &str, bytes: &[u8]) -> Result<String> {
        let key = format!("{}/{}.{}", prefix, Uuid::new_v4(), extension);
        let path = self.resolve(&key)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::BlobError {
                    message: format!("Failed to create blob directory: {}", e),
                })?;
        }

        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::BlobError {
                message: format!("Failed to write blob {}: {}", key, e),
            })?;

        Ok(key)
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.resolve(key)?;
        tokio::fs::read(&path).await.map_err(|e| AppError::BlobError {
            message: format!("Failed to read blob {}: {}", key, e),
        })
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::BlobError {
                message: format!("Failed to delete blob {}: {}", key, e),
            }),
        }
    }
}

/// In-memory blob store for tests
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn store(&self, prefix: &str, extension: &str, bytes: &[u8]) -> Result<String> {
        let key = format!("{}/{}.{}", prefix, Uuid::new_v4(), extension);
        self.blobs.lock().unwrap().insert(key.clone(), bytes.to_vec());
        Ok(key)
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        self.blobs
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| AppError::BlobError {
                message: format!("Blob not found: {}", key),
            })
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.blobs.lock().unwrap().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryBlobStore::new();
        let key = store.store("resumes", "txt", b"hello").await.unwrap();
        assert!(key.starts_with("resumes/"));
        assert!(key.ends_with(".txt"));
        assert_eq!(store.read(&key).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_memory_store_missing_key() {
        let store = MemoryBlobStore::new();
        let err = store.read("resumes/missing.txt").await.unwrap_err();
        assert!(matches!(err, AppError::BlobError { .. }));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryBlobStore::new();
        let key = store.store("resumes", "pdf", b"data").await.unwrap();
        store.delete(&key).await.unwrap();
        store.delete(&key).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_fs_store_rejects_traversal() {
        let store = FsBlobStore::new("/tmp/pitchforge-test-blobs");
        let err = store.read("../etc/passwd").await.unwrap_err();
        assert!(matches!(err, AppError::BlobError { .. }));
    }
}
