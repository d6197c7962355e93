//! Error handling for the exercise image resolver
//!
//! These types are internal to the resolution pipeline. The public service
//! API never surfaces them: every failure mode terminates inside the
//! subsystem as a logged, degraded result (remote URL fallback, cache miss,
//! or an unresolved answer).

pub mod types;

pub use types::{ResolverError, StorageError, TransportError};

/// Convenience result alias for internal resolver operations
pub type ResolverResult<T> = Result<T, ResolverError>;
