//! Error types for archive decoding and encoding.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SarcError>;

/// Errors that can occur while decoding an archive.
#[derive(Error, Debug)]
pub enum SarcError {
    /// Underlying reader failed (only possible with truncated input).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The input does not start with the `SARC` magic.
    #[error("invalid archive magic: {0:#010x}")]
    InvalidMagic(u32),

    /// The byte-order mark is not little-endian.
    #[error("unsupported byte order mark: {0:#06x}")]
    InvalidByteOrderMark(u16),

    /// The archive declares a version this codec does not understand.
    #[error("unsupported archive version: {0:#06x}")]
    UnsupportedVersion(u16),

    /// The input is shorter than the sizes declared in its headers.
    #[error("archive truncated: need {need} bytes, have {have}")]
    Truncated { need: usize, have: usize },

    /// A node's data range lies outside the data region.
    #[error("entry data out of range for '{0}'")]
    DataOutOfRange(String),

    /// Two nodes resolve to the same entry name.
    #[error("duplicate entry name '{0}'")]
    DuplicateName(String),

    /// An entry name is not valid UTF-8 or is missing its terminator.
    #[error("invalid entry name in name table at offset {0}")]
    InvalidName(usize),
}
