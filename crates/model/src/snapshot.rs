use crate::error::{ErrorKind, Result};
use crate::{Category, Record};
use exn::ResultExt;
use serde::{Deserialize, Serialize};

/// Tag identifying artifacts produced by this registry.
pub const REGISTRY_TAG: &str = "svs-index";
/// Snapshot envelope schema version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// The deterministic, fully-sorted view of one category at build time.
///
/// Two builds over identical shard content must produce byte-identical
/// [`canonical_bytes`](Snapshot::canonical_bytes): the manifest hash is
/// computed over exactly these bytes, and the sync client's cache diffing
/// depends on the hash being stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub registry: String,
    pub kind: String,
    pub version: u32,
    pub count: usize,
    pub items: Vec<Record>,
}

impl Snapshot {
    /// Wrap already-sorted records in the published envelope.
    pub fn new(category: Category, items: Vec<Record>) -> Self {
        Self {
            registry: REGISTRY_TAG.to_string(),
            kind: category.kind().to_string(),
            version: SNAPSHOT_VERSION,
            count: items.len(),
            items,
        }
    }

    /// The snapshot of an absent shard directory.
    pub fn empty(category: Category) -> Self {
        Self::new(category, Vec::new())
    }

    /// The exact bytes that get published, hashed, and compressed:
    /// 2-space pretty-printed JSON with a trailing newline.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(self).or_raise(|| ErrorKind::Json)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).or_raise(|| ErrorKind::Json)
    }
}
