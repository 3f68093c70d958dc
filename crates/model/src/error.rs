//! Model Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A model error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for model operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
/// Every variant that carries an id names the offending record so shard
/// authors can find it.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Record id is empty or contains characters outside `[a-z0-9-]`.
    #[display("invalid id `{_0}`")]
    InvalidId(#[error(not(source))] String),
    /// Record has no `en` entry in its names map.
    #[display("record `{_0}` has no English (`en`) display name")]
    MissingEnglishName(#[error(not(source))] String),
    /// A variant id does not start with its parent id plus a separator.
    #[display("variant `{child}` is not prefixed by its parent id `{parent}`")]
    UnprefixedChild { parent: String, child: String },
    /// A singer carries no variants at all.
    #[display("singer `{_0}` has no variants")]
    NoVariants(#[error(not(source))] String),
    /// Neither a direct file URL nor a download page URL is present.
    #[display("variant `{_0}` carries no distribution pointer")]
    NoDistribution(#[error(not(source))] String),
    /// A software version lists no mirrors to download from.
    #[display("version `{version}` of `{id}` lists no mirrors")]
    NoMirrors { id: String, version: String },
    /// A dependency reference is malformed (bad id or empty constraint).
    #[display("dependency `{dependency}` of `{id}` is invalid")]
    Dependency { id: String, dependency: String },
    /// Not a recognised category name.
    #[display("unknown category `{_0}`")]
    UnknownCategory(#[error(not(source))] String),
    /// A manifest was parsed but its schema version is not supported.
    /// Old clients must reject newer manifests rather than misread them.
    #[display("unsupported manifest version {_0}")]
    ManifestVersion(#[error(not(source))] u32),
    /// JSON (de)serialization failed.
    #[display("malformed JSON")]
    Json,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Shape errors are in the data itself; nothing here is transient.
        false
    }
}
