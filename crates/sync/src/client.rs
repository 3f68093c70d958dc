//! The sync client: manifest diffing, cached reconciliation, and
//! generation-tagged merges.

use crate::cache::ShardCache;
use crate::error::{Error, ErrorKind, Result};
use crate::fetch::FetchHandle;
use crate::index::Index;
use exn::ResultExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use svs_compress::Compression;
use svs_model::{Category, MANIFEST_FILE, Manifest, ManifestEntry, Record, Snapshot};
use tokio::sync::RwLock;
use tracing::instrument;

/// Where a category currently is in its load lifecycle.
///
/// `Empty → ManifestFetched → Reconciling → Ready`, with `StaleFallback`
/// reachable from `Ready` or `Reconciling` when a refresh fails but a
/// previously verified index exists to keep serving.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    #[default]
    Empty,
    ManifestFetched,
    Reconciling,
    Ready,
    /// Serving the last verified data after a failed refresh. Not an
    /// error: consumers still get a consistent catalog, just an old one.
    StaleFallback,
}

#[derive(Default)]
struct CategoryInner {
    state: SyncState,
    index: Option<Arc<Index>>,
    /// Generation of the last reconciliation allowed to apply. Results
    /// tagged with an older generation are discarded at merge time.
    applied_generation: u64,
}

#[derive(Default)]
struct CategoryStore {
    inner: RwLock<CategoryInner>,
}

impl CategoryStore {
    /// Record a lifecycle step, unless a newer load has already applied.
    async fn transition(&self, generation: u64, state: SyncState) {
        let mut inner = self.inner.write().await;
        if generation > inner.applied_generation {
            inner.state = state;
        }
    }
}

/// Incremental sync client over a published registry root.
///
/// Owns the local cache exclusively and hands out immutable [`Index`]
/// snapshots per category. All I/O suspends at awaited fetch boundaries;
/// nothing blocks, and a finite fetch timeout (in the HTTP fetcher) keeps
/// the state machine from hanging.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use svs_model::Category;
/// use svs_sync::{HttpFetcher, SyncClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = HttpFetcher::new("https://svs-index.example/registry/v1")?;
/// let client = SyncClient::new(Arc::new(fetcher));
/// client.load_category(Category::Singers).await?;
/// if let Some(singer) = client.get_by_id(Category::Singers, "alice").await? {
///     println!("{}", singer.display_name());
/// }
/// # Ok(())
/// # }
/// ```
pub struct SyncClient {
    fetcher: FetchHandle,
    cache: ShardCache,
    singers: CategoryStore,
    softwares: CategoryStore,
    generations: AtomicU64,
    transfer: Compression,
}

impl SyncClient {
    pub fn new(fetcher: FetchHandle) -> Self {
        Self {
            fetcher,
            cache: ShardCache::default(),
            singers: CategoryStore::default(),
            softwares: CategoryStore::default(),
            generations: AtomicU64::new(0),
            transfer: Compression::None,
        }
    }

    /// Prefer downloading a compressed sibling of each artifact (the
    /// retry after any failure always falls back to the canonical file).
    /// Decompressed bytes verify against the same manifest digest.
    pub fn with_transfer_encoding(mut self, encoding: Compression) -> Self {
        self.transfer = encoding;
        self
    }

    fn store(&self, category: Category) -> &CategoryStore {
        match category {
            Category::Singers => &self.singers,
            Category::Softwares => &self.softwares,
        }
    }

    pub async fn state(&self, category: Category) -> SyncState {
        self.store(category).inner.read().await.state
    }

    /// The current index for a category, if one has ever been assembled.
    /// During a refresh this keeps returning the previous index; readers
    /// never observe a partially updated view.
    pub async fn index(&self, category: Category) -> Option<Arc<Index>> {
        self.store(category).inner.read().await.index.clone()
    }

    /// Populate or refresh a category's in-memory index.
    ///
    /// Fetches the manifest, reuses every cached artifact whose
    /// `(file, hash)` still matches, downloads the rest concurrently with
    /// per-artifact verification, and atomically swaps in the merged
    /// index. On failure the last verified index keeps serving
    /// ([`SyncState::StaleFallback`]); the error only propagates when
    /// there is nothing usable at all.
    ///
    /// Re-running against an unchanged manifest performs zero artifact
    /// fetches.
    #[instrument(skip(self), fields(category = %category, generation))]
    pub async fn load_category(&self, category: Category) -> Result<()> {
        let generation = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::Span::current().record("generation", generation);
        let store = self.store(category);

        let manifest = match self.fetch_manifest().await {
            Ok(manifest) => manifest,
            Err(err) => return self.conclude(category, generation, Vec::new(), Some(err)).await,
        };
        store.transition(generation, SyncState::ManifestFetched).await;
        store.transition(generation, SyncState::Reconciling).await;

        let entries = manifest.entries(category);
        let results =
            futures::future::join_all(entries.iter().map(|entry| self.resolve_entry(entry))).await;

        let mut shards = Vec::with_capacity(results.len());
        let mut first_error = None;
        for (entry, result) in entries.iter().zip(results) {
            match result {
                Ok(records) => shards.push(records),
                Err(err) => {
                    tracing::warn!(file = %entry.file, error = %err, "artifact unresolved after retry");
                    first_error.get_or_insert(err);
                },
            }
        }

        self.conclude(category, generation, shards, first_error).await
    }

    /// Merge step: the single synchronization point of a reconciliation.
    ///
    /// Applies only if no newer reconciliation finished first
    /// (last-request-wins by completion order, compared by generation).
    async fn conclude(
        &self,
        category: Category,
        generation: u64,
        shards: Vec<Arc<Vec<Record>>>,
        failure: Option<Error>,
    ) -> Result<()> {
        let mut inner = self.store(category).inner.write().await;
        if generation <= inner.applied_generation {
            tracing::debug!(
                generation,
                applied = inner.applied_generation,
                "reconciliation superseded, discarding result"
            );
            return Ok(());
        }
        inner.applied_generation = generation;

        match failure {
            None => {
                let index = Index::build(shards);
                tracing::info!(count = index.len(), "category ready");
                inner.index = Some(Arc::new(index));
                inner.state = SyncState::Ready;
                Ok(())
            },
            Some(err) => match inner.index.as_ref().map(|index| index.built_at()) {
                Some(built_at) => {
                    tracing::warn!(error = %err, %built_at, "refresh failed, serving stale data");
                    inner.state = SyncState::StaleFallback;
                    Ok(())
                },
                None => {
                    inner.state = SyncState::Empty;
                    Err(err).or_raise(|| ErrorKind::NoData(category.to_string()))
                },
            },
        }
    }

    async fn fetch_manifest(&self) -> Result<Manifest> {
        let bytes = self.fetcher.fetch(MANIFEST_FILE).await.or_raise(|| ErrorKind::ManifestFetch)?;
        Manifest::from_slice(&bytes).or_raise(|| ErrorKind::ManifestSchema)
    }

    /// A manifest entry's records, from cache when the hash still matches,
    /// otherwise downloaded and verified.
    async fn resolve_entry(&self, entry: &ManifestEntry) -> Result<Arc<Vec<Record>>> {
        if let Some(records) = self.cache.lookup(&entry.file, &entry.hash).await {
            return Ok(records);
        }
        let records = self.download_verified(entry).await?;
        self.cache.insert(entry.file.clone(), entry.hash.clone(), Arc::clone(&records)).await;
        Ok(records)
    }

    /// Download an artifact with one retry. The retry always asks for the
    /// canonical encoding, in case the compressed sibling itself is the
    /// problem.
    async fn download_verified(&self, entry: &ManifestEntry) -> Result<Arc<Vec<Record>>> {
        match self.fetch_and_verify(entry, self.transfer).await {
            Ok(records) => Ok(records),
            Err(err) => {
                tracing::warn!(file = %entry.file, error = %err, "download attempt failed, retrying");
                self.fetch_and_verify(entry, Compression::None).await
            },
        }
    }

    async fn fetch_and_verify(&self, entry: &ManifestEntry, encoding: Compression) -> Result<Arc<Vec<Record>>> {
        let path = encoding.sibling_name(&entry.file);
        let raw =
            self.fetcher.fetch(&path).await.or_raise(|| ErrorKind::ArtifactFetch(entry.file.clone()))?;
        let bytes = match encoding {
            Compression::None => raw,
            _ => encoding
                .decompress(&raw)
                .or_raise(|| ErrorKind::IntegrityMismatch(entry.file.clone()))?,
        };
        // The manifest digest covers canonical bytes; unverified bytes
        // are never decoded, cached, or served.
        let digest = blake3::hash(&bytes).to_hex().to_string();
        if digest != entry.hash {
            exn::bail!(ErrorKind::IntegrityMismatch(entry.file.clone()));
        }
        let snapshot =
            Snapshot::from_slice(&bytes).or_raise(|| ErrorKind::Decode(entry.file.clone()))?;
        if snapshot.count != snapshot.items.len() {
            tracing::warn!(
                file = %entry.file,
                declared = snapshot.count,
                actual = snapshot.items.len(),
                "snapshot count disagrees with its items"
            );
        }
        Ok(Arc::new(snapshot.items))
    }

    /// Point lookup by id.
    ///
    /// If no index has been assembled yet this triggers the same
    /// load/reconcile path first, so a missing record means "not in the
    /// catalog", never "not loaded yet".
    pub async fn get_by_id(&self, category: Category, id: &str) -> Result<Option<Record>> {
        if let Some(index) = self.index(category).await {
            return Ok(index.get(id).cloned());
        }
        self.load_category(category).await?;
        Ok(self.index(category).await.and_then(|index| index.get(id).cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockFetcher;
    use svs_model::{NamesMap, Singer, SingerVariant, Software, SoftwareCategory};

    fn singer(id: &str) -> Record {
        Record::Singer(Singer {
            id: id.to_string(),
            names: NamesMap::from([("en".to_string(), id.to_uppercase())]),
            owners: vec!["owner".to_string()],
            authors: vec!["author".to_string()],
            homepage_url: None,
            profile_image_url: None,
            variants: vec![SingerVariant {
                id: format!("{id}-cv"),
                names: NamesMap::new(),
                file_url: Some("https://example.test/bank.zip".to_string()),
                download_page_url: None,
                tags: None,
            }],
        })
    }

    fn software(id: &str) -> Record {
        Record::Software(Software {
            id: id.to_string(),
            names: NamesMap::from([("en".to_string(), id.to_uppercase())]),
            category: SoftwareCategory::Host,
            developers: vec!["dev".to_string()],
            homepage_url: None,
            download_page_url: Some("https://example.test/dl".to_string()),
            tags: None,
            versions: vec![],
        })
    }

    fn artifact(category: Category, items: Vec<Record>) -> (Vec<u8>, String) {
        let bytes = Snapshot::new(category, items).canonical_bytes().unwrap();
        let hash = blake3::hash(&bytes).to_hex().to_string();
        (bytes, hash)
    }

    /// Install both categories at the standard layout, with compressed
    /// siblings, and return the installed manifest.
    fn install(fetcher: &MockFetcher, singers: Vec<Record>, softwares: Vec<Record>) -> Manifest {
        let mut manifest = Manifest::default();
        for (category, items) in [(Category::Singers, singers), (Category::Softwares, softwares)] {
            let (bytes, hash) = artifact(category, items);
            let file = category.artifact_file();
            fetcher.insert(file, bytes.clone());
            for encoding in svs_compress::SIBLING_ENCODINGS {
                fetcher.insert(encoding.sibling_name(file), encoding.compress(&bytes).unwrap());
            }
            manifest.push(category, ManifestEntry { file: file.to_string(), hash });
        }
        fetcher.insert(MANIFEST_FILE, manifest.canonical_bytes().unwrap());
        manifest
    }

    fn client(fetcher: MockFetcher) -> (Arc<SyncClient>, Arc<MockFetcher>) {
        let fetcher = Arc::new(fetcher);
        let client = SyncClient::new(Arc::clone(&fetcher) as FetchHandle);
        (Arc::new(client), fetcher)
    }

    #[tokio::test]
    async fn test_load_builds_ready_index() {
        let fetcher = MockFetcher::default();
        install(&fetcher, vec![singer("alice"), singer("bob")], vec![software("openutau")]);
        let (client, _) = client(fetcher);

        client.load_category(Category::Singers).await.unwrap();
        assert_eq!(client.state(Category::Singers).await, SyncState::Ready);
        // Loading one category leaves the other untouched.
        assert_eq!(client.state(Category::Softwares).await, SyncState::Empty);

        let index = client.index(Category::Singers).await.unwrap();
        let ids: Vec<_> = index.records().iter().map(Record::id).collect();
        assert_eq!(ids, ["alice", "bob"]);
    }

    #[tokio::test]
    async fn test_get_by_id_triggers_load() {
        let fetcher = MockFetcher::default();
        install(&fetcher, vec![singer("alice")], vec![software("openutau")]);
        let (client, _) = client(fetcher);

        // No explicit load_category() first.
        let record = client.get_by_id(Category::Softwares, "openutau").await.unwrap();
        assert_eq!(record.map(|r| r.id().to_string()), Some("openutau".to_string()));
        assert_eq!(client.state(Category::Softwares).await, SyncState::Ready);

        let missing = client.get_by_id(Category::Softwares, "utau-classic").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_unchanged_manifest_costs_zero_artifact_fetches() {
        let fetcher = MockFetcher::default();
        install(&fetcher, vec![singer("alice")], vec![]);
        let (client, fetcher) = client(fetcher);

        client.load_category(Category::Singers).await.unwrap();
        client.load_category(Category::Singers).await.unwrap();

        assert_eq!(fetcher.fetches(MANIFEST_FILE), 2);
        // The artifact was downloaded exactly once; the second pass was a
        // pure cache hit.
        assert_eq!(fetcher.fetches("singers/all.json"), 1);
    }

    #[tokio::test]
    async fn test_only_the_changed_category_refetches() {
        let fetcher = MockFetcher::default();
        install(&fetcher, vec![singer("alice")], vec![software("openutau")]);
        let (client, fetcher) = client(fetcher);

        client.load_category(Category::Singers).await.unwrap();
        client.load_category(Category::Softwares).await.unwrap();

        // Singers change; softwares stay identical.
        install(&fetcher, vec![singer("alice"), singer("bob")], vec![software("openutau")]);
        client.load_category(Category::Singers).await.unwrap();
        client.load_category(Category::Softwares).await.unwrap();

        assert_eq!(fetcher.fetches("singers/all.json"), 2);
        assert_eq!(fetcher.fetches("softwares/all.json"), 1);
        assert!(client.get_by_id(Category::Singers, "bob").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_manifest_failure_without_cache_is_fatal() {
        let fetcher = MockFetcher::default();
        fetcher.fail(MANIFEST_FILE);
        let (client, _) = client(fetcher);

        let err = client.load_category(Category::Singers).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NoData(category) if category == "singers"));
        assert_eq!(client.state(Category::Singers).await, SyncState::Empty);
        assert!(client.index(Category::Singers).await.is_none());
    }

    #[tokio::test]
    async fn test_manifest_failure_with_cache_serves_stale() {
        let fetcher = MockFetcher::default();
        install(&fetcher, vec![singer("alice")], vec![]);
        let (client, fetcher) = client(fetcher);

        client.load_category(Category::Singers).await.unwrap();
        fetcher.fail(MANIFEST_FILE);

        // Refresh fails, but the previous index keeps serving.
        client.load_category(Category::Singers).await.unwrap();
        assert_eq!(client.state(Category::Singers).await, SyncState::StaleFallback);
        assert!(client.get_by_id(Category::Singers, "alice").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_future_manifest_schema_is_rejected() {
        let fetcher = MockFetcher::default();
        fetcher.insert(MANIFEST_FILE, br#"{ "version": 2, "singers": [], "softwares": [] }"#.to_vec());
        let (client, _) = client(fetcher);

        let err = client.load_category(Category::Singers).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NoData(_)));
        assert_eq!(client.state(Category::Singers).await, SyncState::Empty);
    }

    #[tokio::test]
    async fn test_corrupt_artifact_retries_once_then_fails() {
        let fetcher = MockFetcher::default();
        install(&fetcher, vec![singer("alice")], vec![]);
        // Serve bytes that do not match the manifest digest.
        fetcher.insert("singers/all.json", b"definitely not the snapshot".to_vec());
        let (client, fetcher) = client(fetcher);

        let err = client.load_category(Category::Singers).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NoData(_)));
        // First attempt plus exactly one retry, never more.
        assert_eq!(fetcher.fetches("singers/all.json"), 2);
        assert!(client.index(Category::Singers).await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_refresh_falls_back_to_stale_index() {
        let fetcher = MockFetcher::default();
        install(&fetcher, vec![singer("alice")], vec![]);
        let (client, fetcher) = client(fetcher);
        client.load_category(Category::Singers).await.unwrap();

        // New manifest, but the artifact it points at is corrupt.
        let (_, hash) = artifact(Category::Singers, vec![singer("alice"), singer("bob")]);
        let mut manifest = Manifest::default();
        manifest.push(
            Category::Singers,
            ManifestEntry { file: Category::Singers.artifact_file().to_string(), hash },
        );
        fetcher.insert(MANIFEST_FILE, manifest.canonical_bytes().unwrap());
        fetcher.insert("singers/all.json", b"garbage after the cdn ate it".to_vec());

        client.load_category(Category::Singers).await.unwrap();
        assert_eq!(client.state(Category::Singers).await, SyncState::StaleFallback);
        // Old verified data, not the corrupt download.
        let index = client.index(Category::Singers).await.unwrap();
        assert_eq!(index.len(), 1);
        assert!(index.get("bob").is_none());
    }

    #[rstest::rstest]
    #[case(Compression::None)]
    #[case(Compression::Gzip)]
    #[case(Compression::Brotli)]
    #[tokio::test]
    async fn test_every_transfer_encoding_verifies(#[case] encoding: Compression) {
        let fetcher = MockFetcher::default();
        install(&fetcher, vec![singer("alice")], vec![]);
        let fetcher = Arc::new(fetcher);
        let client =
            SyncClient::new(Arc::clone(&fetcher) as FetchHandle).with_transfer_encoding(encoding);

        client.load_category(Category::Singers).await.unwrap();
        assert_eq!(client.state(Category::Singers).await, SyncState::Ready);
        assert_eq!(fetcher.fetches(&encoding.sibling_name("singers/all.json")), 1);
    }

    #[tokio::test]
    async fn test_brotli_transfer_is_preferred() {
        let fetcher = MockFetcher::default();
        install(&fetcher, vec![singer("alice")], vec![]);
        let fetcher = Arc::new(fetcher);
        let client = SyncClient::new(Arc::clone(&fetcher) as FetchHandle)
            .with_transfer_encoding(Compression::Brotli);

        client.load_category(Category::Singers).await.unwrap();
        assert_eq!(client.state(Category::Singers).await, SyncState::Ready);
        assert_eq!(fetcher.fetches("singers/all.json.br"), 1);
        assert_eq!(fetcher.fetches("singers/all.json"), 0);
    }

    #[tokio::test]
    async fn test_missing_sibling_falls_back_to_canonical() {
        let fetcher = MockFetcher::default();
        // Canonical artifacts only; no compressed siblings published.
        let (bytes, hash) = artifact(Category::Singers, vec![singer("alice")]);
        let mut manifest = Manifest::default();
        manifest.push(
            Category::Singers,
            ManifestEntry { file: Category::Singers.artifact_file().to_string(), hash },
        );
        fetcher.insert(MANIFEST_FILE, manifest.canonical_bytes().unwrap());
        fetcher.insert("singers/all.json", bytes);

        let fetcher = Arc::new(fetcher);
        let client = SyncClient::new(Arc::clone(&fetcher) as FetchHandle)
            .with_transfer_encoding(Compression::Brotli);

        client.load_category(Category::Singers).await.unwrap();
        assert_eq!(client.state(Category::Singers).await, SyncState::Ready);
        assert_eq!(fetcher.fetches("singers/all.json.br"), 1);
        assert_eq!(fetcher.fetches("singers/all.json"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_reconciliation_is_discarded() {
        let fetcher = MockFetcher::default();

        // Old manifest points at a slow artifact holding only alice.
        let (old_bytes, old_hash) = artifact(Category::Singers, vec![singer("alice")]);
        let mut old_manifest = Manifest::default();
        old_manifest
            .push(Category::Singers, ManifestEntry { file: "singers/all.json".to_string(), hash: old_hash });
        fetcher.insert(MANIFEST_FILE, old_manifest.canonical_bytes().unwrap());
        fetcher.insert("singers/all.json", old_bytes);
        fetcher.delay("singers/all.json", std::time::Duration::from_secs(60));

        let (client, fetcher) = client(fetcher);

        // Load A (older generation) gets stuck downloading the slow artifact.
        let older = tokio::spawn({
            let client = Arc::clone(&client);
            async move { client.load_category(Category::Singers).await }
        });
        tokio::task::yield_now().await;

        // The registry republishes under a rotated file name; load B
        // (newer generation) completes immediately.
        let (new_bytes, new_hash) = artifact(Category::Singers, vec![singer("bob")]);
        let mut new_manifest = Manifest::default();
        new_manifest
            .push(Category::Singers, ManifestEntry { file: "singers/all-2.json".to_string(), hash: new_hash });
        fetcher.insert(MANIFEST_FILE, new_manifest.canonical_bytes().unwrap());
        fetcher.insert("singers/all-2.json", new_bytes);

        client.load_category(Category::Singers).await.unwrap();
        let index = client.index(Category::Singers).await.unwrap();
        assert!(index.get("bob").is_some());

        // A eventually completes with verified (but superseded) data and
        // must not roll the index back.
        older.await.unwrap().unwrap();
        assert_eq!(client.state(Category::Singers).await, SyncState::Ready);
        let index = client.index(Category::Singers).await.unwrap();
        assert!(index.get("bob").is_some());
        assert!(index.get("alice").is_none());
    }
}
