//! Static-mapping resolver: fixed identifier → provider folder → download
//!
//! Prefers a local cached copy of the provider image over repeated network
//! use. The remote mapping is immutable per app version, so successful
//! downloads never expire; unmapped identifiers are negative-cached so
//! repeated calls short-circuit immediately.

use crate::cache::CacheStore;
use crate::errors::ResolverResult;
use crate::mappings;
use crate::models::{CacheLookup, CacheOutcome, ImageLocation};
use crate::resolvers::ImageResolver;
use crate::storage::ImageStore;
use crate::transport::ImageFetcher;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct StaticMappingResolver {
    cache: CacheStore,
    images: ImageStore,
    fetcher: Arc<dyn ImageFetcher>,
    base_url: String,
}

impl StaticMappingResolver {
    pub fn new(
        cache: CacheStore,
        images: ImageStore,
        fetcher: Arc<dyn ImageFetcher>,
        base_url: &str,
    ) -> Self {
        Self {
            cache,
            images,
            fetcher,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Canonical remote URL for a mapped provider folder
    fn remote_url(&self, folder: &str) -> String {
        format!("{}/{}/0.jpg", self.base_url, folder)
    }

    async fn resolve_uncached(&self, identifier: &str) -> Option<ImageLocation> {
        let Some(folder) = mappings::provider_folder(identifier) else {
            debug!("No static mapping for '{}', caching negative result", identifier);
            self.cache.set(identifier, CacheOutcome::Unresolved).await;
            return None;
        };

        let url = self.remote_url(folder);
        match self.download(identifier, &url).await {
            Ok(path) => {
                debug!("Downloaded image for '{}' to {}", identifier, path.display());
                self.cache
                    .set(identifier, CacheOutcome::LocalFile(path.clone()))
                    .await;
                Some(ImageLocation::Local(path))
            }
            Err(e) => {
                // Nothing is cached here so a later call retries the
                // download; the remote URL is still a working reference.
                warn!(
                    "Download failed for '{}', serving remote URL instead: {}",
                    identifier, e
                );
                Some(ImageLocation::Remote(url))
            }
        }
    }

    async fn download(&self, identifier: &str, url: &str) -> ResolverResult<PathBuf> {
        let bytes = self.fetcher.fetch(url).await?;
        let path = self.images.write_image(identifier, &bytes).await?;
        Ok(path)
    }
}

#[async_trait]
impl ImageResolver for StaticMappingResolver {
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
        if let Err(e) = self.images.remove_image(identifier).await {
            warn!("Failed to delete cached image for '{}': {}", identifier, e);
        }
        self.cache.remove(identifier).await;
        self.resolve(identifier).await
    }

    async fn clear(&self) {
        self.cache.clear().await;
        if let Err(e) = self.images.clear().await {
            warn!("Failed to clear image directory: {}", e);
        }
    }
}
