use crate::Category;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use serde::{Deserialize, Serialize};

/// Manifest schema version understood by this build of the toolchain.
pub const MANIFEST_VERSION: u32 = 1;
/// Manifest file name at the versioned artifact root.
pub const MANIFEST_FILE: &str = "manifest.json";

/// One published artifact and the digest its canonical bytes must hash to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Artifact file name relative to the versioned root, e.g.
    /// `singers/all.json`.
    pub file: String,
    /// Hex-encoded BLAKE3 digest of the canonical (uncompressed) bytes.
    pub hash: String,
}

/// The single source of truth for what artifacts exist and what they must
/// hash to.
///
/// Published atomically with its artifacts: the build writes every artifact
/// first and the manifest last, so a client never sees a manifest entry
/// whose artifact is not yet available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    pub singers: Vec<ManifestEntry>,
    pub softwares: Vec<ManifestEntry>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self { version: MANIFEST_VERSION, singers: Vec::new(), softwares: Vec::new() }
    }
}

impl Manifest {
    pub fn entries(&self, category: Category) -> &[ManifestEntry] {
        match category {
            Category::Singers => &self.singers,
            Category::Softwares => &self.softwares,
        }
    }

    pub fn push(&mut self, category: Category, entry: ManifestEntry) {
        match category {
            Category::Singers => self.singers.push(entry),
            Category::Softwares => self.softwares.push(entry),
        }
    }

    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(self).or_raise(|| ErrorKind::Json)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Parse a fetched manifest, rejecting schema versions this client does
    /// not understand.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let manifest: Manifest = serde_json::from_slice(bytes).or_raise(|| ErrorKind::Json)?;
        if manifest.version != MANIFEST_VERSION {
            exn::bail!(ErrorKind::ManifestVersion(manifest.version));
        }
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(file: &str) -> ManifestEntry {
        ManifestEntry { file: file.to_string(), hash: "ab".repeat(32) }
    }

    #[test]
    fn test_push_and_entries() {
        let mut manifest = Manifest::default();
        manifest.push(Category::Singers, entry("singers/all.json"));
        assert_eq!(manifest.entries(Category::Singers).len(), 1);
        assert!(manifest.entries(Category::Softwares).is_empty());
    }

    #[test]
    fn test_roundtrip() {
        let mut manifest = Manifest::default();
        manifest.push(Category::Softwares, entry("softwares/all.json"));
        let bytes = manifest.canonical_bytes().unwrap();
        assert_eq!(Manifest::from_slice(&bytes).unwrap(), manifest);
    }

    #[test]
    fn test_future_schema_version_rejected() {
        let bytes = br#"{ "version": 2, "singers": [], "softwares": [] }"#;
        let err = Manifest::from_slice(bytes).unwrap_err();
        assert_eq!(*err, ErrorKind::ManifestVersion(2));
    }

    #[test]
    fn test_malformed_manifest_rejected() {
        let err = Manifest::from_slice(b"{").unwrap_err();
        assert_eq!(*err, ErrorKind::Json);
    }
}
