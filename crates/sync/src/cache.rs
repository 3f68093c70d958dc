//! Client-owned cache of verified artifact payloads.

use std::collections::HashMap;
use std::sync::Arc;
use svs_model::Record;
use time::UtcDateTime;
use tokio::sync::RwLock;

#[derive(Clone)]
pub(crate) struct CacheEntry {
    hash: String,
    records: Arc<Vec<Record>>,
    fetched_at: UtcDateTime,
}

/// Content-addressed cache of decoded artifact payloads, keyed by file
/// name.
///
/// Every stored payload was hash-verified before insertion, so a
/// `(file, hash)` match is proof the cached records equal what the server
/// would send. Writes replace a single key; there is no bulk clear, so a
/// reconciliation in flight for one category can never lose another
/// category's entries.
#[derive(Default)]
pub(crate) struct ShardCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ShardCache {
    /// The cached payload for `file`, only if it was verified against
    /// exactly this hash. A pure cache hit: no re-download, no re-verify.
    pub async fn lookup(&self, file: &str, hash: &str) -> Option<Arc<Vec<Record>>> {
        let entries = self.entries.read().await;
        let entry = entries.get(file).filter(|entry| entry.hash == hash)?;
        tracing::debug!(file, fetched_at = %entry.fetched_at, "cache hit");
        Some(Arc::clone(&entry.records))
    }

    pub async fn insert(&self, file: String, hash: String, records: Arc<Vec<Record>>) {
        let entry = CacheEntry { hash, records, fetched_at: UtcDateTime::now() };
        self.entries.write().await.insert(file, entry);
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
