//! Error type definitions for the exercise image resolver
//!
//! This module defines the error hierarchy used inside the resolution
//! pipeline. It uses `thiserror` to provide automatic error trait
//! implementations and proper error chaining.

use thiserror::Error;

/// Top-level resolver error type
///
/// Every fallible internal operation funnels into this enum. Callers of the
/// public service API never see it; resolvers catch, log, and degrade.
#[derive(Error, Debug)]
pub enum ResolverError {
    /// Durable cache blob or image file storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Remote transport errors (downloads and catalog queries)
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Storage layer specific errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// Filesystem failures (directory creation, file read/write/delete)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Cache blob serialization/deserialization failures
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Remote transport specific errors
#[derive(Error, Debug)]
pub enum TransportError {
    /// Connection-level failures (DNS, refused, timeout)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Completed requests with a non-success status
    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    /// Malformed endpoint or base URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl TransportError {
    /// Create a status error from a completed response
    pub fn status<U: Into<String>>(status: u16, url: U) -> Self {
        Self::Status {
            status,
            url: url.into(),
        }
    }

    /// Whether the failure happened before any response arrived
    ///
    /// Connection-level failures are worth retrying on the next call;
    /// a definitive non-success status usually is not.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, Self::Http(_))
    }
}
