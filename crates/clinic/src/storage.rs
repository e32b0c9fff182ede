//! Object storage for generated documents.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use medflow_config::StorageConfig;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid object key: {0}")]
    InvalidKey(String),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), StorageError>;

    /// `Ok(None)` when nothing is stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StorageError>;
}

pub type SharedStore = Arc<dyn ObjectStore>;

pub fn store_from_config(config: &StorageConfig) -> SharedStore {
    Arc::new(LocalObjectStore::new(&config.root))
}

/// Files under a root directory; keys are relative paths below it.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let mut normal = 0;
        for component in relative.components() {
            match component {
                Component::Normal(_) => normal += 1,
                Component::CurDir => {}
                _ => return Err(StorageError::InvalidKey(key.to_string())),
            }
        }

        if normal == 0 {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &body).await?;
        debug!(key, content_type, bytes = body.len(), "stored object");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, StorageError> {
        let path = self.resolve(key)?;
        match tokio::fs::read(&path).await {
            Ok(contents) => Ok(Some(Bytes::from(contents))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn put_then_get_creates_nested_directories() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path());

        store
            .put("prescriptions/a.pdf", Bytes::from_static(b"%PDF"), "application/pdf")
            .await
            .unwrap();

        assert!(dir.path().join("prescriptions/a.pdf").exists());
        let body = store.get("prescriptions/a.pdf").await.unwrap();
        assert_eq!(body.as_deref(), Some(&b"%PDF"[..]));
    }

    #[tokio::test]
    async fn missing_object_is_none() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path());
        assert!(store.get("prescriptions/none.pdf").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn keys_cannot_escape_the_root() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path().join("root"));

        for key in ["../outside.pdf", "/etc/passwd", "a/../../b", ""] {
            let err = store
                .put(key, Bytes::from_static(b"x"), "text/plain")
                .await
                .unwrap_err();
            assert!(matches!(err, StorageError::InvalidKey(_)), "{key} should be rejected");
        }
    }
}
