use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where a resolved exercise image currently lives.
///
/// This is the value callers render from: either a file already downloaded
/// into the local image cache, or a remote URL that works without a local
/// copy (at the cost of network on every render).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ImageLocation {
    Local(PathBuf),
    Remote(String),
}

impl ImageLocation {
    /// Render-ready string form (path or URL)
    pub fn as_display_string(&self) -> String {
        match self {
            Self::Local(path) => path.display().to_string(),
            Self::Remote(url) => url.clone(),
        }
    }
}

/// Tagged outcome stored in the cache for one identifier.
///
/// `Unresolved` is a deliberate negative-cache marker: the identifier was
/// looked up and definitively found nothing. It is structurally distinct
/// from "never looked up", which is simply the absence of an entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "location", rename_all = "snake_case")]
pub enum CacheOutcome {
    LocalFile(PathBuf),
    RemoteUrl(String),
    Unresolved,
}

impl CacheOutcome {
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::Unresolved)
    }

    /// The renderable location carried by this outcome, if any
    pub fn location(&self) -> Option<ImageLocation> {
        match self {
            Self::LocalFile(path) => Some(ImageLocation::Local(path.clone())),
            Self::RemoteUrl(url) => Some(ImageLocation::Remote(url.clone())),
            Self::Unresolved => None,
        }
    }
}

/// One cache record per identifier actually looked up.
///
/// `fetched_at` is present only for entries written under a TTL policy
/// (the catalog-search variant); static-mapping entries never expire, so
/// theirs is absent in the persisted blob.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    #[serde(flatten)]
    pub outcome: CacheOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    pub fn permanent(outcome: CacheOutcome) -> Self {
        Self {
            outcome,
            fetched_at: None,
        }
    }

    pub fn stamped(outcome: CacheOutcome, fetched_at: DateTime<Utc>) -> Self {
        Self {
            outcome,
            fetched_at: Some(fetched_at),
        }
    }

    /// Whether this entry is still valid under the given expiry policy.
    ///
    /// Under a TTL policy, an entry without a timestamp cannot prove its
    /// freshness and counts as expired.
    pub fn is_fresh(&self, policy: ExpiryPolicy, now: DateTime<Utc>) -> bool {
        match policy {
            ExpiryPolicy::Never => true,
            ExpiryPolicy::After(ttl) => match self.fetched_at {
                Some(fetched_at) => now.signed_duration_since(fetched_at) < ttl,
                None => false,
            },
        }
    }
}

/// Result of a cache-only lookup.
///
/// A cached `Unresolved` answer is a `Hit(None)`: the store can answer
/// without any remote work, and the answer is "no image available".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    Hit(Option<ImageLocation>),
    Miss,
}

/// Expiry policy shared by the cache store and resolvers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryPolicy {
    /// Entries are permanently valid (static mapping downloads)
    Never,
    /// Entries older than the window must be re-validated remotely
    After(Duration),
}

impl ExpiryPolicy {
    /// The 7-day window used by the catalog-search resolver
    pub fn catalog_default() -> Self {
        Self::After(Duration::days(7))
    }
}

/// Which resolver strategy a deployment uses. Never mixed per call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ResolverStrategy {
    StaticMapping,
    CatalogSearch,
}
