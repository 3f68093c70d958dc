//! Fetch abstraction over the published artifact tree.

use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use std::sync::Arc;
use std::time::Duration;

/// Read-only access to the published artifact tree.
///
/// Paths are relative to the versioned root (`manifest.json`,
/// `singers/all.json.br`, ...). Implementations decide what that root is:
/// a CDN base URL in production, a `HashMap` in tests.
// TODO: When `dyn async trait` stabilizes, migrate to native 2024 Edition async traits.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>>;
}

pub type FetchHandle = Arc<dyn Fetch>;

/// Hanging forever is not an option for the sync state machine; a fetch
/// that exceeds this window fails and takes the stale-fallback path.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP fetcher for a published registry root.
///
/// # Examples
///
/// ```no_run
/// use svs_sync::HttpFetcher;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = HttpFetcher::new("https://svs-index.example/registry/v1")?;
/// # Ok(())
/// # }
/// ```
pub struct HttpFetcher {
    client: reqwest::Client,
    base: String,
}

impl HttpFetcher {
    /// Create a fetcher rooted at the given base URL (the versioned root,
    /// without a trailing slash).
    pub fn new(base: impl Into<String>) -> Result<Self> {
        let client =
            reqwest::Client::builder().timeout(FETCH_TIMEOUT).build().or_raise(|| ErrorKind::Http)?;
        let mut base = base.into();
        while base.ends_with('/') {
            base.pop();
        }
        Ok(Self { client, base })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        let url = format!("{}/{}", self.base, path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .or_raise(|| ErrorKind::Fetch(path.to_string()))?
            .error_for_status()
            .or_raise(|| ErrorKind::Fetch(path.to_string()))?;
        let bytes = response.bytes().await.or_raise(|| ErrorKind::Fetch(path.to_string()))?;
        tracing::debug!(path, size = bytes.len(), "fetched");
        Ok(bytes.to_vec())
    }
}
