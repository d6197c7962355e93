//! Resolver strategies
//!
//! A resolver maps one identifier to an image location using one particular
//! external provider. Deployments configure exactly one strategy; the batch
//! coordinator and service facade only speak to the trait.

use crate::models::{CacheLookup, ImageLocation};
use async_trait::async_trait;

pub mod search;
pub mod static_mapping;

pub use search::CatalogSearchResolver;
pub use static_mapping::StaticMappingResolver;

/// One identifier-to-image resolution strategy.
///
/// Every method is total: failures degrade to a defined terminal value and
/// are logged inside the implementation, never propagated.
#[async_trait]
pub trait ImageResolver: Send + Sync {
    /// Cache-only lookup. `Miss` means a full resolution is required;
    /// `Hit(None)` is a cached negative answer.
    async fn lookup_cached(&self, identifier: &str) -> CacheLookup;

    /// Full resolution chain. `None` is the definitive "no image available".
    async fn resolve(&self, identifier: &str) -> Option<ImageLocation>;

    /// Discard cached state for one identifier (including any on-disk
    /// file) and resolve it afresh.
    async fn refresh(&self, identifier: &str) -> Option<ImageLocation>;

    /// Discard all cached entries and files.
    async fn clear(&self);
}
