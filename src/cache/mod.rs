//! Persistent resolution cache
//!
//! One `CacheStore` instance backs one resolver variant. Entries live in
//! memory behind an `RwLock` and are written through to the persistence
//! backend on every mutation. The in-memory view is authoritative: a failed
//! persist is logged and swallowed, never surfaced to the caller.

use crate::models::{CacheEntry, CacheLookup, CacheOutcome, ExpiryPolicy};
use crate::storage::CachePersistence;
use crate::utils::Clock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

pub struct CacheStore {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    persistence: Arc<dyn CachePersistence>,
    expiry: ExpiryPolicy,
    clock: Arc<dyn Clock>,
}

impl CacheStore {
    /// Load the persisted blob and construct the store.
    ///
    /// Missing, corrupt, or unparseable data starts the store empty; this
    /// constructor never fails the caller.
    pub async fn load(
        persistence: Arc<dyn CachePersistence>,
        expiry: ExpiryPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let entries = match persistence.load().await {
            Ok(entries) => {
                debug!("Loaded {} cached resolutions", entries.len());
                entries
            }
            Err(e) => {
                warn!("Failed to load resolution cache, starting empty: {}", e);
                HashMap::new()
            }
        };

        Self {
            entries: Arc::new(RwLock::new(entries)),
            persistence,
            expiry,
            clock,
        }
    }

    pub fn expiry(&self) -> ExpiryPolicy {
        self.expiry
    }

    /// Cache-only lookup with validity checks.
    ///
    /// An expired entry is a `Miss`. A `LocalFile` entry whose file no
    /// longer exists on disk is demoted to a `Miss` so the caller
    /// re-resolves instead of receiving a dangling path. A cached
    /// `Unresolved` answer is a `Hit(None)`.
    pub async fn lookup(&self, identifier: &str) -> CacheLookup {
        let entry = {
            let entries = self.entries.read().await;
            match entries.get(identifier) {
                Some(entry) => entry.clone(),
                None => return CacheLookup::Miss,
            }
        };

        if !entry.is_fresh(self.expiry, self.clock.now()) {
            debug!("Cache entry for '{}' expired", identifier);
            return CacheLookup::Miss;
        }

        if let CacheOutcome::LocalFile(path) = &entry.outcome {
            if !tokio::fs::try_exists(path).await.unwrap_or(false) {
                debug!(
                    "Cached file for '{}' is gone from disk, forcing re-resolution",
                    identifier
                );
                return CacheLookup::Miss;
            }
        }

        CacheLookup::Hit(entry.outcome.location())
    }

    /// Raw entry accessor, skipping validity checks
    pub async fn get(&self, identifier: &str) -> Option<CacheEntry> {
        self.entries.read().await.get(identifier).cloned()
    }

    /// Record a resolution outcome and write through to durable storage.
    ///
    /// Entries are timestamped only under a TTL policy; permanent entries
    /// persist without `fetched_at`, matching the blob schema.
    pub async fn set(&self, identifier: &str, outcome: CacheOutcome) {
        let entry = match self.expiry {
            ExpiryPolicy::Never => CacheEntry::permanent(outcome),
            ExpiryPolicy::After(_) => CacheEntry::stamped(outcome, self.clock.now()),
        };

        let mut entries = self.entries.write().await;
        entries.insert(identifier.to_string(), entry);
        self.persist(&entries).await;
    }

    /// Discard one entry, if present
    pub async fn remove(&self, identifier: &str) {
        let mut entries = self.entries.write().await;
        if entries.remove(identifier).is_some() {
            self.persist(&entries).await;
        }
    }

    /// Discard every entry
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();
        self.persist(&entries).await;
    }

    /// Copy of the current entry map, for diagnostics
    pub async fn snapshot(&self) -> HashMap<String, CacheEntry> {
        self.entries.read().await.clone()
    }

    // Callers hold the write lock, so concurrent window completions cannot
    // interleave blob writes and lose updates.
    async fn persist(&self, entries: &HashMap<String, CacheEntry>) {
        if let Err(e) = self.persistence.save(entries).await {
            warn!("Failed to persist resolution cache: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryPersistence;
    use chrono::{DateTime, Duration, Utc};
    use std::path::PathBuf;
    use std::sync::Mutex;

    struct FixedClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl FixedClock {
        fn new(now: DateTime<Utc>) -> Arc<Self> {
            Arc::new(Self {
                now: Mutex::new(now),
            })
        }

        fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap();
            *now = *now + by;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    #[tokio::test]
    async fn set_writes_through_and_lookup_hits() {
        let persistence = MemoryPersistence::new();
        let store = CacheStore::load(
            persistence.clone(),
            ExpiryPolicy::Never,
            Arc::new(crate::utils::SystemClock),
        )
        .await;

        store
            .set("squat", CacheOutcome::RemoteUrl("https://x/squat.jpg".into()))
            .await;

        assert_eq!(persistence.save_count(), 1);
        assert_eq!(
            store.lookup("squat").await,
            CacheLookup::Hit(Some(crate::models::ImageLocation::Remote(
                "https://x/squat.jpg".into()
            )))
        );
        // permanent policy leaves entries unstamped
        assert!(store.get("squat").await.unwrap().fetched_at.is_none());
    }

    #[tokio::test]
    async fn negative_entries_hit_as_none() {
        let store = CacheStore::load(
            MemoryPersistence::new(),
            ExpiryPolicy::Never,
            Arc::new(crate::utils::SystemClock),
        )
        .await;

        assert_eq!(store.lookup("unknown").await, CacheLookup::Miss);
        store.set("unknown", CacheOutcome::Unresolved).await;
        assert_eq!(store.lookup("unknown").await, CacheLookup::Hit(None));
    }

    #[tokio::test]
    async fn missing_local_file_demotes_to_miss() {
        let store = CacheStore::load(
            MemoryPersistence::new(),
            ExpiryPolicy::Never,
            Arc::new(crate::utils::SystemClock),
        )
        .await;

        store
            .set(
                "squat",
                CacheOutcome::LocalFile(PathBuf::from("/nonexistent/squat.jpg")),
            )
            .await;
        assert_eq!(store.lookup("squat").await, CacheLookup::Miss);
    }

    #[tokio::test]
    async fn ttl_expiry_demotes_to_miss() {
        let clock = FixedClock::new(Utc::now());
        let store = CacheStore::load(
            MemoryPersistence::new(),
            ExpiryPolicy::catalog_default(),
            clock.clone(),
        )
        .await;

        store.set("squat", CacheOutcome::Unresolved).await;
        assert_eq!(store.lookup("squat").await, CacheLookup::Hit(None));

        clock.advance(Duration::days(6));
        assert_eq!(store.lookup("squat").await, CacheLookup::Hit(None));

        clock.advance(Duration::days(2));
        assert_eq!(store.lookup("squat").await, CacheLookup::Miss);
    }

    #[tokio::test]
    async fn load_survives_persistence_failure_paths() {
        struct BrokenPersistence;

        #[async_trait::async_trait]
        impl CachePersistence for BrokenPersistence {
            async fn load(
                &self,
            ) -> Result<HashMap<String, CacheEntry>, crate::errors::StorageError> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "disk on fire").into())
            }

            async fn save(
                &self,
                _: &HashMap<String, CacheEntry>,
            ) -> Result<(), crate::errors::StorageError> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "disk on fire").into())
            }
        }

        let store = CacheStore::load(
            Arc::new(BrokenPersistence),
            ExpiryPolicy::Never,
            Arc::new(crate::utils::SystemClock),
        )
        .await;

        // in-memory value stays authoritative even though persists fail
        store.set("squat", CacheOutcome::Unresolved).await;
        assert_eq!(store.lookup("squat").await, CacheLookup::Hit(None));
        store.remove("squat").await;
        assert_eq!(store.lookup("squat").await, CacheLookup::Miss);
    }
}
