//! Service facade and batch coordination
//!
//! `ExerciseImageService` is the single entry point the rest of the
//! application consumes: resolve one identifier, resolve a list, force a
//! refresh, clear everything. It is an explicitly constructed instance with
//! injected dependencies, shared by handle; nothing here relies on
//! module-level state.

use crate::cache::CacheStore;
use crate::config::Config;
use crate::models::{CacheLookup, ExpiryPolicy, ImageLocation, ResolverStrategy};
use crate::resolvers::{CatalogSearchResolver, ImageResolver, StaticMappingResolver};
use crate::storage::{ImageStore, JsonFilePersistence};
use crate::transport::{HttpCatalogClient, HttpImageFetcher};
use crate::utils::{Clock, SystemClock};
use anyhow::Result;
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Fans cache-miss identifiers out to the resolver in fixed-size windows.
///
/// Windows execute strictly in submission order and a window must complete
/// before the next starts, which bounds peak outstanding remote requests to
/// the window size regardless of batch size.
pub struct BatchCoordinator {
    resolver: Arc<dyn ImageResolver>,
    window_size: usize,
}

impl BatchCoordinator {
    pub fn new(resolver: Arc<dyn ImageResolver>, window_size: usize) -> Self {
        Self {
            resolver,
            window_size: window_size.max(1),
        }
    }

    /// Resolve every identifier in the batch.
    ///
    /// Duplicates are resolved once and both appearances receive the same
    /// answer. Cache hits (including cached negative answers) are served
    /// before any remote work starts. The returned mapping has an entry for
    /// every input identifier; individual failures resolve to `None` without
    /// aborting the batch.
    pub async fn resolve_all(
        &self,
        identifiers: &[String],
    ) -> HashMap<String, Option<ImageLocation>> {
        let mut results: HashMap<String, Option<ImageLocation>> = HashMap::new();
        let mut misses: Vec<&String> = Vec::new();
        let mut seen: HashSet<&String> = HashSet::new();

        for identifier in identifiers {
            if !seen.insert(identifier) {
                continue;
            }
            match self.resolver.lookup_cached(identifier).await {
                CacheLookup::Hit(location) => {
                    results.insert(identifier.clone(), location);
                }
                CacheLookup::Miss => misses.push(identifier),
            }
        }

        if !misses.is_empty() {
            debug!(
                "Batch of {}: {} cache hits, {} to resolve in windows of {}",
                identifiers.len(),
                results.len(),
                misses.len(),
                self.window_size
            );
        }

        for window in misses.chunks(self.window_size) {
            let resolutions =
                join_all(window.iter().map(|id| self.resolver.resolve(id.as_str()))).await;
            for (identifier, location) in window.iter().zip(resolutions) {
                results.insert((*identifier).clone(), location);
            }
        }

        results
    }
}

/// Shared exercise-image resolution service.
///
/// All four operations are safe to call at any time and never raise;
/// failure is reported only as an absent result.
pub struct ExerciseImageService {
    resolver: Arc<dyn ImageResolver>,
    coordinator: BatchCoordinator,
}

impl ExerciseImageService {
    /// Build the configured resolver strategy with default (HTTP, wall
    /// clock, JSON file) dependencies.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let resolver: Arc<dyn ImageResolver> = match config.resolver.strategy {
            ResolverStrategy::StaticMapping => {
                let persistence =
                    Arc::new(JsonFilePersistence::new(config.storage.static_cache_file.clone()));
                let cache = CacheStore::load(persistence, ExpiryPolicy::Never, clock).await;
                let images = ImageStore::new(config.storage.image_dir.clone());
                let fetcher = Arc::new(HttpImageFetcher::new(config.resolver.request_timeout()));
                Arc::new(StaticMappingResolver::new(
                    cache,
                    images,
                    fetcher,
                    &config.static_source.base_url,
                ))
            }
            ResolverStrategy::CatalogSearch => {
                let persistence =
                    Arc::new(JsonFilePersistence::new(config.storage.search_cache_file.clone()));
                let cache =
                    CacheStore::load(persistence, config.resolver.catalog_expiry(), clock).await;
                let catalog = Arc::new(HttpCatalogClient::new(
                    &config.catalog.base_url,
                    config.catalog.language,
                    config.catalog.page_limit,
                    config.resolver.request_timeout(),
                )?);
                Arc::new(CatalogSearchResolver::new(cache, catalog))
            }
        };

        Ok(Self::with_resolver(resolver, config.resolver.window_size))
    }

    /// Assemble the service around an already-built resolver
    pub fn with_resolver(resolver: Arc<dyn ImageResolver>, window_size: usize) -> Self {
        let coordinator = BatchCoordinator::new(resolver.clone(), window_size);
        Self {
            resolver,
            coordinator,
        }
    }

    /// Resolve one identifier to its current image location
    pub async fn resolve(&self, identifier: &str) -> Option<ImageLocation> {
        self.resolver.resolve(identifier).await
    }

    /// Resolve a list of identifiers under the bounded-concurrency policy
    pub async fn resolve_many(
        &self,
        identifiers: &[String],
    ) -> HashMap<String, Option<ImageLocation>> {
        self.coordinator.resolve_all(identifiers).await
    }

    /// Discard cached state for one identifier and resolve it afresh
    pub async fn refresh(&self, identifier: &str) -> Option<ImageLocation> {
        self.resolver.refresh(identifier).await
    }

    /// Clear all cached entries and cached files
    pub async fn clear_cache(&self) {
        self.resolver.clear().await;
    }
}
