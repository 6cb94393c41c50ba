//! Error types for the diff and merge engines.
//!
//! Per-asset failures never surface through these types during a run; the
//! engines catch them at the asset boundary and fall back to whole-file
//! copies. What does propagate is fatal: invalid roots, missing anchor
//! assets, malformed required resources.

use camino::Utf8PathBuf;
use packlog_core::HandlerError;
use thiserror::Error;

use crate::gdl::GdlError;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the engines.
#[derive(Error, Debug)]
pub enum Error {
    /// Filesystem I/O failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from a core component (index, compression, baseline).
    #[error(transparent)]
    Core(#[from] packlog_core::Error),

    /// Error decoding or encoding a container archive.
    #[error("archive error: {0}")]
    Sarc(#[from] packlog_sarc::SarcError),

    /// Error in a GameDataList table or changelog.
    #[error("GameDataList error: {0}")]
    Gdl(#[from] GdlError),

    /// A handler rejected its input.
    #[error("handler failed for '{key}': {source}")]
    Handler {
        key: String,
        #[source]
        source: HandlerError,
    },

    /// A mod root directory is missing or not a directory.
    #[error("invalid mod root: {0}")]
    InvalidModRoot(Utf8PathBuf),

    /// A required baseline asset has no counterpart anywhere.
    #[error("required baseline asset missing: {0}")]
    MissingAnchor(String),

    /// The dictionary pack lacks a required dictionary entry.
    #[error("missing dictionary '{0}' in dictionary pack")]
    MissingDictionary(String),
}
