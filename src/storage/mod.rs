//! Artifact storage (GPX files, collection metadata)
//! Backed by the object_store crate: in-memory or a local directory

use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::{ObjectStore, path::Path as StoragePath};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage root unavailable: {0}")]
    Root(String),

    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Clone)]
pub struct UploadMetadata {
    pub key: String,
    pub size: usize,
}

/// Storage client wrapping an object_store backend
#[derive(Clone)]
pub struct StorageClient {
    store: Arc<dyn ObjectStore>,
    root: Option<PathBuf>,
}

impl StorageClient {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store, root: None }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemory::new()))
    }

    /// Files under `root`, created if missing.
    pub fn local(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root)
            .map_err(|e| StorageError::Root(format!("{}: {e}", root.display())))?;
        let store = LocalFileSystem::new_with_prefix(root)?;
        Ok(Self {
            store: Arc::new(store),
            root: Some(root.to_path_buf()),
        })
    }

    /// Where a key ends up on disk, for local storage.
    pub fn location(&self, key: &str) -> String {
        match &self.root {
            Some(root) => root.join(key).display().to_string(),
            None => format!("memory://{key}"),
        }
    }

    pub async fn upload(&self, key: &str, data: Vec<u8>) -> Result<UploadMetadata> {
        let path = StoragePath::from(key);
        let size = data.len();

        self.store.put(&path, data.into()).await?;

        tracing::debug!(key, size, "Stored artifact");

        Ok(UploadMetadata {
            key: key.to_string(),
            size,
        })
    }

    pub async fn download(&self, key: &str) -> Result<Vec<u8>> {
        let path = StoragePath::from(key);
        let bytes = self.store.get(&path).await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    pub async fn exists(&self, key: &str) -> Result<bool> {
        let path = StoragePath::from(key);

        match self.store.head(&path).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
