//! In-memory fetcher for testing.

use crate::error::{ErrorKind, Result};
use crate::fetch::Fetch;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// In-memory fetcher for testing.
///
/// Serves paths from a `HashMap` behind a [`Mutex`], counts every fetch
/// per path (the cache-hit tests are really fetch-count assertions), and
/// can script failures and delays to exercise the fallback and
/// generation-discard paths without a network.
#[derive(Default)]
pub struct MockFetcher {
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    files: HashMap<String, Vec<u8>>,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    hits: HashMap<String, u64>,
}

impl MockFetcher {
    /// Create a mock fetcher pre-populated with files.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<String>, impl Into<Vec<u8>>)>) -> Self {
        let fetcher = Self::default();
        for (path, data) in files {
            fetcher.insert(path, data);
        }
        fetcher
    }

    /// Create a mock fetcher serving everything under a published
    /// versioned root on disk (see `svs-registry`'s output layout).
    pub fn with_published_tree(root: impl AsRef<Path>) -> Self {
        let fetcher = Self::default();
        fetcher.load_tree(root);
        fetcher
    }

    /// (Re)load every file under a published versioned root, as if the
    /// registry had just republished.
    ///
    /// Panics on I/O errors; if test setup is wrong, the test should not
    /// pass.
    pub fn load_tree(&self, root: impl AsRef<Path>) {
        let root = root.as_ref();
        let mut stack = vec![root.to_path_buf()];
        while let Some(dir) = stack.pop() {
            for entry in std::fs::read_dir(&dir).expect("readable published tree") {
                let path = entry.expect("readable dir entry").path();
                if path.is_dir() {
                    stack.push(path);
                } else {
                    let relative = path
                        .strip_prefix(root)
                        .expect("entry under root")
                        .to_str()
                        .expect("utf-8 artifact path")
                        .replace('\\', "/");
                    self.insert(relative, std::fs::read(&path).expect("readable artifact"));
                }
            }
        }
    }

    /// Add or replace a served file.
    pub fn insert(&self, path: impl Into<String>, data: impl Into<Vec<u8>>) {
        let mut state = self.state.lock().expect("mock state lock");
        let path = path.into();
        state.failing.remove(&path);
        state.files.insert(path, data.into());
    }

    /// Make subsequent fetches of a path fail.
    pub fn fail(&self, path: impl Into<String>) {
        self.state.lock().expect("mock state lock").failing.insert(path.into());
    }

    /// Delay subsequent fetches of a path (pair with a paused Tokio clock).
    pub fn delay(&self, path: impl Into<String>, duration: Duration) {
        self.state.lock().expect("mock state lock").delays.insert(path.into(), duration);
    }

    /// Remove a scripted delay.
    pub fn clear_delay(&self, path: &str) {
        self.state.lock().expect("mock state lock").delays.remove(path);
    }

    /// How many times a path has been fetched (successfully or not).
    pub fn fetches(&self, path: &str) -> u64 {
        self.state.lock().expect("mock state lock").hits.get(path).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Fetch for MockFetcher {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        let (delay, outcome) = {
            let mut state = self.state.lock().expect("mock state lock");
            *state.hits.entry(path.to_string()).or_insert(0) += 1;
            let outcome = if state.failing.contains(path) {
                None
            } else {
                state.files.get(path).cloned()
            };
            (state.delays.get(path).copied(), outcome)
        };
        if let Some(duration) = delay {
            tokio::time::sleep(duration).await;
        }
        match outcome {
            Some(data) => Ok(data),
            None => Err(exn::Exn::from(ErrorKind::Fetch(path.to_string()))),
        }
    }
}
