//! Sync Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A sync error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong
/// internally. Most of them never reach the caller: fetch and integrity
/// failures are recovered locally by serving the last verified data, and
/// only [`NoData`](ErrorKind::NoData) escapes when there is nothing usable
/// to fall back to.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Failed to construct the HTTP client.
    #[display("HTTP client error")]
    Http,
    /// Transport-level failure fetching a path from the artifact tree.
    #[display("fetch failed: {_0}")]
    Fetch(#[error(not(source))] String),
    /// The manifest itself could not be fetched.
    #[display("manifest fetch failed")]
    ManifestFetch,
    /// The manifest was fetched but cannot be trusted (malformed, or a
    /// schema version this client does not understand).
    #[display("manifest rejected")]
    ManifestSchema,
    /// An artifact listed in the manifest could not be fetched.
    #[display("artifact fetch failed: {_0}")]
    ArtifactFetch(#[error(not(source))] String),
    /// Downloaded bytes do not hash to the manifest-declared digest.
    /// Serving them anyway is prohibited, even under retry pressure.
    #[display("artifact failed hash verification: {_0}")]
    IntegrityMismatch(#[error(not(source))] String),
    /// Bytes verified against the manifest but do not decode as a
    /// snapshot. The published tree itself is inconsistent.
    #[display("verified artifact failed to decode: {_0}")]
    Decode(#[error(not(source))] String),
    /// Nothing to serve: the load failed and no verified cache exists.
    #[display("no usable data for category `{_0}`")]
    NoData(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Fetch(_) | Self::ManifestFetch | Self::ArtifactFetch(_) | Self::IntegrityMismatch(_)
        )
    }
}
