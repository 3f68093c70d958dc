//! CLI Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A CLI error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Configuration could not be loaded or is invalid.
    #[display("configuration error")]
    Config,
    /// A command-line argument failed to parse.
    #[display("invalid argument")]
    Arguments,
    /// The registry build failed before producing a report.
    #[display("build error")]
    Build,
    /// Talking to a published registry failed.
    #[display("sync error")]
    Sync,
    /// Output serialization failed.
    #[display("serialization error")]
    Serialize,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Sync)
    }
}
