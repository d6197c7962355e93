//! Catalog-search resolver: search term → catalog match → image lookup
//!
//! Two-step remote lookup against the exercise catalog with TTL-bounded
//! caching of both positive and negative outcomes. A cached `Unresolved`
//! answer inside the TTL window is returned verbatim so failing searches
//! are not repeated for a week.

use crate::cache::CacheStore;
use crate::mappings;
use crate::models::{CacheLookup, CacheOutcome, ImageLocation};
use crate::resolvers::ImageResolver;
use crate::transport::CatalogApi;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct CatalogSearchResolver {
    cache: CacheStore,
    catalog: Arc<dyn CatalogApi>,
}

impl CatalogSearchResolver {
    pub fn new(cache: CacheStore, catalog: Arc<dyn CatalogApi>) -> Self {
        Self { cache, catalog }
    }

    async fn resolve_uncached(&self, identifier: &str) -> Option<ImageLocation> {
        let phrase = mappings::search_phrase(identifier);

        let exercises = match self.catalog.search_exercises(&phrase).await {
            Ok(exercises) => exercises,
            Err(e) => {
                // Policy: a transport failure is served as "no result" but
                // deliberately left uncached, so the very next call retries.
                // Only a confirmed zero-result search earns the full TTL.
                warn!("Catalog search for '{}' failed: {}", identifier, e);
                return None;
            }
        };

        let Some(first) = exercises.first() else {
            debug!(
                "Catalog search for '{}' ('{}') returned no matches",
                identifier, phrase
            );
            self.cache.set(identifier, CacheOutcome::Unresolved).await;
            return None;
        };

        let exercise_base = first.exercise_base;

        // Prefer the image marked primary, then fall back to any image.
        for main_only in [true, false] {
            if let Some(url) = self.first_image(exercise_base, main_only).await {
                self.cache
                    .set(identifier, CacheOutcome::RemoteUrl(url.clone()))
                    .await;
                return Some(ImageLocation::Remote(url));
            }
        }

        self.cache.set(identifier, CacheOutcome::Unresolved).await;
        None
    }

    async fn first_image(&self, exercise_base: i64, main_only: bool) -> Option<String> {
        match self.catalog.exercise_images(exercise_base, main_only).await {
            Ok(images) => images.into_iter().next().map(|image| image.image),
            Err(e) => {
                warn!(
                    "Image lookup for catalog exercise {} failed: {}",
                    exercise_base, e
                );
                None
            }
        }
    }
}

#[async_trait]
impl ImageResolver for CatalogSearchResolver {
    async fn lookup_cached(&self, identifier: &str) -> CacheLookup {
        self.cache.lookup(identifier).await
    }

    async fn resolve(&self, identifier: &str) -> Option<ImageLocation> {
        match self.cache.lookup(identifier).await {
            CacheLookup::Hit(location) => location,
            CacheLookup::Miss => self.resolve_uncached(identifier).await,
        }
    }

    async fn refresh(&self, identifier: &str) -> Option<ImageLocation> {
        // This variant caches remote URLs only; there is no on-disk file.
        self.cache.remove(identifier).await;
        self.resolve(identifier).await
    }

    async fn clear(&self) {
        self.cache.clear().await;
    }
}
