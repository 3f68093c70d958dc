//! Incremental sync client for published svs-index artifacts.
//!
//! Consumers see an always-consistent, always-available catalog; this
//! crate does the work behind that illusion:
//!
//! - fetch the published manifest and diff it against a local cache by
//!   `(file, hash)`, so unchanged artifacts cost zero network requests
//! - download changed artifacts concurrently, verify every download
//!   against its manifest-declared digest, and retry a corrupt transfer
//!   once before falling back to the last verified data
//! - merge verified payloads into an in-memory [`Index`] per category,
//!   keyed by id for point lookups alongside the ordered listing
//! - tag every load with a monotonically increasing generation and discard
//!   reconciliation results that were superseded while in flight, so a
//!   slow old load can never clobber a newer one
//!
//! The network edge is the [`Fetch`] trait: [`HttpFetcher`] in production,
//! [`MockFetcher`] (behind the `mock` feature) in tests. The local cache
//! is owned exclusively by the [`SyncClient`]; nothing else touches it.

mod cache;
mod client;
pub mod error;
mod fetch;
mod index;
#[cfg(any(test, feature = "mock"))]
mod mock;

pub use crate::client::{SyncClient, SyncState};
pub use crate::fetch::{Fetch, FetchHandle, HttpFetcher};
pub use crate::index::Index;
#[cfg(any(test, feature = "mock"))]
pub use crate::mock::MockFetcher;
