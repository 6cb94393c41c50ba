//! Error types shared by the core components.
//!
//! Constructors in this crate fail only for initialization problems (missing
//! or malformed resources); those errors are fatal to a run and are never
//! swallowed by the engines.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the core components.
#[derive(Error, Debug)]
pub enum Error {
    /// Filesystem I/O failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The checksum index cache file does not exist.
    #[error("checksum index not found: {0}")]
    ChecksumIndexMissing(Utf8PathBuf),

    /// The checksum index cache does not start with the expected magic.
    #[error("invalid checksum index magic: {0:#010x}")]
    InvalidIndexMagic(u32),

    /// The checksum index cache declares an unsupported format version.
    #[error("unsupported checksum index version: {0}")]
    UnsupportedIndexVersion(u16),

    /// The checksum index cache ended before its declared item count.
    #[error("checksum index truncated after {0} items")]
    IndexTruncated(usize),

    /// A checksum index key is not valid UTF-8.
    #[error("invalid checksum index key at item {0}")]
    InvalidIndexKey(usize),

    /// The baseline root directory does not exist.
    #[error("invalid baseline root: {0}")]
    InvalidBaselineRoot(Utf8PathBuf),

    /// Zstd compression or decompression failed.
    #[error("compression error: {0}")]
    Compression(String),
}
