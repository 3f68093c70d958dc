use crate::Compression;
use crate::error::{Error, ErrorKind};
use std::{path::Path, str::FromStr};

const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

impl FromStr for Compression {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Compression::None),
            "gz" | "gzip" => Ok(Compression::Gzip),
            "br" | "brotli" => Ok(Compression::Brotli),
            _ => exn::bail!(ErrorKind::UnsupportedFormat(s.to_string())),
        }
    }
}

impl Compression {
    /// Detect compression from a file extension.
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| match ext.to_lowercase().as_str() {
                "gz" => Compression::Gzip,
                "br" => Compression::Brotli,
                _ => Compression::None,
            })
            .unwrap_or(Compression::None)
    }

    /// Detect compression format from magic bytes.
    ///
    /// Returns the `None` variant if no magic bytes match or if the input
    /// is too short to detect any format. Brotli has no standardized magic
    /// bytes, so it is only ever detected by extension.
    #[must_use]
    pub fn from_magic_bytes(bytes: &[u8]) -> Self {
        if bytes.starts_with(&GZIP_MAGIC) {
            return Compression::Gzip;
        }
        Compression::None
    }

    /// File extension appended to a canonical artifact name to form the
    /// sibling name (`all.json` becomes `all.json.gz`).
    #[must_use]
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            Compression::None => None,
            Compression::Gzip => Some("gz"),
            Compression::Brotli => Some("br"),
        }
    }

    /// Sibling file name for a canonical artifact, or the artifact itself
    /// for the uncompressed encoding.
    #[must_use]
    pub fn sibling_name(&self, canonical: &str) -> String {
        match self.extension() {
            Some(ext) => format!("{canonical}.{ext}"),
            None => canonical.to_string(),
        }
    }
}
