//! Durable storage: the cache blob and the image file directory
//!
//! The cache blob is a single opaque document per resolver variant, kept
//! behind a pluggable persistence trait so the on-disk format can be swapped
//! or versioned without touching resolution logic. The image store owns the
//! process-local directory where downloaded images land, named
//! deterministically by identifier.

use crate::errors::StorageError;
use crate::models::CacheEntry;
use crate::utils::sanitize_file_stem;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;

/// Pluggable key-value persistence for the resolution cache.
///
/// `load` distinguishes "nothing persisted yet" (empty map) from a decode
/// failure (error) so the caller can log the latter; both start the store
/// from scratch.
#[async_trait]
pub trait CachePersistence: Send + Sync {
    async fn load(&self) -> Result<HashMap<String, CacheEntry>, StorageError>;
    async fn save(&self, entries: &HashMap<String, CacheEntry>) -> Result<(), StorageError>;
}

/// JSON blob persistence at a fixed file path
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CachePersistence for JsonFilePersistence {
    async fn load(&self) -> Result<HashMap<String, CacheEntry>, StorageError> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, entries: &HashMap<String, CacheEntry>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let blob = serde_json::to_vec(entries)?;
        fs::write(&self.path, blob).await?;
        Ok(())
    }
}

/// In-memory persistence for ephemeral deployments and tests.
///
/// Tracks how many saves were issued so write-through behavior can be
/// asserted against.
#[derive(Default)]
pub struct MemoryPersistence {
    entries: RwLock<HashMap<String, CacheEntry>>,
    save_count: AtomicUsize,
}

impl MemoryPersistence {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn save_count(&self) -> usize {
        self.save_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CachePersistence for MemoryPersistence {
    async fn load(&self) -> Result<HashMap<String, CacheEntry>, StorageError> {
        Ok(self.entries.read().await.clone())
    }

    async fn save(&self, entries: &HashMap<String, CacheEntry>) -> Result<(), StorageError> {
        *self.entries.write().await = entries.clone();
        self.save_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Process-local image cache directory.
///
/// Files are named deterministically by identifier with a fixed extension,
/// so a re-download overwrites rather than accumulates.
#[derive(Clone)]
pub struct ImageStore {
    image_dir: PathBuf,
}

impl ImageStore {
    pub fn new(image_dir: PathBuf) -> Self {
        Self { image_dir }
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    /// Create the image directory if absent. Idempotent.
    pub async fn ensure_dir(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.image_dir).await?;
        Ok(())
    }

    /// Deterministic local path for an identifier
    pub fn local_path(&self, identifier: &str) -> PathBuf {
        self.image_dir
            .join(format!("{}.jpg", sanitize_file_stem(identifier)))
    }

    /// Write downloaded bytes to the identifier's local path
    pub async fn write_image(
        &self,
        identifier: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, StorageError> {
        self.ensure_dir().await?;
        let path = self.local_path(identifier);
        fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Delete the identifier's cached file if present. Idempotent.
    pub async fn remove_image(&self, identifier: &str) -> Result<(), StorageError> {
        let path = self.local_path(identifier);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove every cached file and leave an empty directory behind
    pub async fn clear(&self) -> Result<(), StorageError> {
        match fs::remove_dir_all(&self.image_dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.ensure_dir().await
    }
}
