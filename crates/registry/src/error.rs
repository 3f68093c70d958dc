//! Build Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;
use svs_compress::error::{Error as CompressionError, ErrorKind as CompressionErrorKind};

/// A build error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for build operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong
/// internally. Shard-level variants carry the offending file path so the
/// build summary can point authors at the exact file to fix.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A shard file is not valid JSON. Hard error for the category: a
    /// malformed shard must never be silently dropped from the snapshot.
    #[display("malformed shard JSON: {}", _0.display())]
    ShardParse(#[error(not(source))] PathBuf),
    /// A shard parsed but contains records that fail shape validation.
    #[display("invalid record in shard: {}", _0.display())]
    InvalidRecord(#[error(not(source))] PathBuf),
    /// A shard holds a record of the other category (a software entry in a
    /// singer shard, or vice versa).
    #[display("record of the wrong category in shard: {}", _0.display())]
    CategoryMismatch(#[error(not(source))] PathBuf),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// Snapshot or manifest serialization failed.
    #[display("serialization error")]
    Serialize,
    /// Compression/decompression error
    #[display("compression error: {_0}")]
    Compression(CompressionErrorKind),
}

impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Convert a compression error into a build error, preserving the
    /// compress crate's `Exn` frame (error tree) as a child in its own
    /// error tree.
    #[track_caller]
    pub fn compression(err: CompressionError) -> Error {
        let inner = (*err).clone();
        err.raise(ErrorKind::Compression(inner))
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
