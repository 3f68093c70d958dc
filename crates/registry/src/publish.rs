//! Hashing, compression, and atomic publication of category artifacts.

use crate::aggregate::aggregate;
use crate::error::{Error, ErrorKind, Result};
use exn::ResultExt;
use std::path::{Path, PathBuf};
use svs_compress::{Compression, SIBLING_ENCODINGS};
use svs_model::{Category, MANIFEST_FILE, Manifest, ManifestEntry};
use tokio::fs;
use tracing::instrument;

/// Versioned artifact root under the output directory. Schema-breaking
/// changes get a new root (`v2`) next to this one instead of replacing it,
/// so old clients keep working against the artifacts they understand.
pub const VERSIONED_ROOT: &str = "registry/v1";

/// A fully built category, staged in memory and not yet written anywhere.
///
/// Staging everything before touching the output directory is what makes
/// publication atomic per build run: a category that fails to build never
/// gets the chance to leave half-written artifacts behind.
#[derive(Debug)]
pub struct BuiltCategory {
    pub category: Category,
    pub count: usize,
    /// Hex BLAKE3 digest of the canonical bytes, computed before
    /// compression.
    pub hash: String,
    canonical: Vec<u8>,
    encodings: Vec<(Compression, Vec<u8>)>,
}

/// Where one category's canonical artifact ended up, for the build summary.
#[derive(Debug)]
pub struct PublishedCategory {
    pub category: Category,
    pub count: usize,
    pub path: PathBuf,
}

/// Outcome of a full build run across all categories.
#[derive(Debug)]
pub struct BuildReport {
    pub published: Vec<PublishedCategory>,
    pub failures: Vec<(Category, Error)>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Aggregate, serialize, hash, and compress one category in memory.
#[instrument(skip(data_dir), fields(category = %category))]
pub async fn build_category(data_dir: &Path, category: Category) -> Result<BuiltCategory> {
    let snapshot = aggregate(data_dir, category).await?;
    let canonical = snapshot.canonical_bytes().or_raise(|| ErrorKind::Serialize)?;
    // The digest covers the exact bytes a client decodes after
    // decompressing any sibling, so it has to be taken here, pre-compression.
    let hash = blake3::hash(&canonical).to_hex().to_string();
    let mut encodings = Vec::with_capacity(SIBLING_ENCODINGS.len());
    for encoding in SIBLING_ENCODINGS {
        let bytes = encoding.compress(&canonical).map_err(ErrorKind::compression)?;
        encodings.push((encoding, bytes));
    }
    Ok(BuiltCategory { category, count: snapshot.count, hash, canonical, encodings })
}

/// Build every category and publish whatever succeeded.
///
/// Categories share no mutable state, so they build concurrently. A
/// category that hard-fails is reported in
/// [`failures`](BuildReport::failures) and contributes nothing to the
/// output; the others are still published and listed in the manifest.
pub async fn build_all(data_dir: &Path, out_dir: &Path) -> Result<BuildReport> {
    let results =
        futures::future::join_all(Category::ALL.iter().map(|category| build_category(data_dir, *category)))
            .await;

    let mut built = Vec::new();
    let mut failures = Vec::new();
    for (category, result) in Category::ALL.iter().zip(results) {
        match result {
            Ok(b) => built.push(b),
            Err(err) => {
                tracing::error!(category = %category, error = %err, "category build failed");
                failures.push((*category, err));
            },
        }
    }

    let published = publish(out_dir, &built).await?;
    Ok(BuildReport { published, failures })
}

/// Write staged artifacts to the versioned root, manifest last.
///
/// Ordering is the atomicity mechanism: every canonical artifact and both
/// of its compressed siblings land on disk before `manifest.json` is
/// replaced, so a concurrent reader can never resolve a manifest entry to
/// a missing or stale file.
#[instrument(skip_all, fields(categories = built.len()))]
pub async fn publish(out_dir: &Path, built: &[BuiltCategory]) -> Result<Vec<PublishedCategory>> {
    let root = out_dir.join(VERSIONED_ROOT);
    let mut manifest = Manifest::default();
    let mut published = Vec::new();

    for b in built {
        let canonical_path = root.join(b.category.artifact_file());
        if let Some(parent) = canonical_path.parent() {
            fs::create_dir_all(parent).await.map_err(ErrorKind::Io)?;
        }
        fs::write(&canonical_path, &b.canonical).await.map_err(ErrorKind::Io)?;
        for (encoding, bytes) in &b.encodings {
            let sibling = root.join(encoding.sibling_name(b.category.artifact_file()));
            fs::write(&sibling, bytes).await.map_err(ErrorKind::Io)?;
        }
        manifest.push(
            b.category,
            ManifestEntry { file: b.category.artifact_file().to_string(), hash: b.hash.clone() },
        );
        published.push(PublishedCategory {
            category: b.category,
            count: b.count,
            path: canonical_path,
        });
    }

    let manifest_bytes = manifest.canonical_bytes().or_raise(|| ErrorKind::Serialize)?;
    fs::write(root.join(MANIFEST_FILE), &manifest_bytes).await.map_err(ErrorKind::Io)?;
    tracing::info!(categories = published.len(), "manifest published");
    Ok(published)
}
