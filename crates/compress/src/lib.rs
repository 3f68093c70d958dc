//! Compression and decompression for registry artifacts.
//!
//! The build pipeline publishes every canonical snapshot alongside two
//! compressed siblings: a widely-supported encoding (gzip) and a
//! higher-ratio one (brotli). This crate wraps both libraries behind a
//! unified [`Compression`] enum, providing:
//!
//! - **Format detection** from file extensions ([`Compression::from_path`])
//!   or magic bytes ([`Compression::from_magic_bytes`])
//! - **In-memory** compression/decompression ([`Compression::compress`],
//!   [`Compression::decompress`])
//!
//! Both encodings must be lossless and reproducible: the manifest digest is
//! computed over canonical bytes before compression, and hash verification
//! after decompression has to succeed on the client.
//!
//! Compression uses the highest available level for each format; artifacts
//! are built once and downloaded many times.

mod construct;
pub mod error;
mod ops;

/// A supported compression format.
///
/// Defaults to [`None`](Self::None) (uncompressed), which is the canonical
/// artifact itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, derive_more::Display)]
pub enum Compression {
    /// Uncompressed
    #[default]
    #[display("none")]
    None,
    /// Gzip compression (.gz)
    #[display("gzip")]
    Gzip,
    /// Brotli compression (.br)
    #[display("brotli")]
    Brotli,
}

/// The derived encodings published next to every canonical artifact.
pub const SIBLING_ENCODINGS: [Compression; 2] = [Compression::Gzip, Compression::Brotli];
