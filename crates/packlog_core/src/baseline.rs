//! Read-only baseline source.
//!
//! A [`BaselineSource`] is the unmodified reference asset tree, rooted at a
//! configured dump directory and addressed by canonical path. Files may be
//! stored either plain or with a `.zs` suffix; [`open`](BaselineSource::open)
//! resolves both transparently and returns decompressed bytes.

use camino::{Utf8Path, Utf8PathBuf};
use std::sync::Arc;

use crate::canonical::{self, ZS_SUFFIX};
use crate::compress::{Category, ZstdBackend};
use crate::error::{Error, Result};

/// Read-only file tree addressable by canonical path.
pub struct BaselineSource {
    root: Utf8PathBuf,
    zstd: Arc<ZstdBackend>,
}

impl BaselineSource {
    /// Open the baseline rooted at `root`. Fails if the directory is missing.
    pub fn new(root: Utf8PathBuf, zstd: Arc<ZstdBackend>) -> Result<Self> {
        if !root.as_std_path().is_dir() {
            return Err(Error::InvalidBaselineRoot(root));
        }
        Ok(Self { root, zstd })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Resolve a canonical path to its on-disk location, if present.
    ///
    /// Tries the literal path first, then the `.zs` variant. Returns the path
    /// and whether it is compressed.
    pub fn resolve(&self, canonical: &str) -> Option<(Utf8PathBuf, bool)> {
        let plain = self.root.join(canonical);
        if plain.as_std_path().is_file() {
            return Some((plain, false));
        }
        let compressed = self.root.join(format!("{canonical}{ZS_SUFFIX}"));
        if compressed.as_std_path().is_file() {
            return Some((compressed, true));
        }
        None
    }

    /// Whether the baseline holds this asset (in either compression state).
    pub fn exists(&self, canonical: &str) -> bool {
        self.resolve(canonical).is_some()
    }

    /// Read an asset's raw on-disk bytes plus its compression state.
    ///
    /// Used when a verbatim copy of the baseline file must be staged into a
    /// destination tree.
    pub fn open_raw(&self, canonical: &str) -> Result<Option<(Vec<u8>, bool)>> {
        match self.resolve(canonical) {
            Some((path, compressed)) => {
                let bytes = std::fs::read(path.as_std_path())?;
                Ok(Some((bytes, compressed)))
            }
            None => Ok(None),
        }
    }

    /// Read an asset's decompressed bytes.
    pub fn open(&self, canonical: &str) -> Result<Option<Vec<u8>>> {
        match self.open_raw(canonical)? {
            Some((bytes, true)) => {
                let category = Category::for_name(canonical);
                Ok(Some(self.zstd.decompress(&bytes, category)?))
            }
            Some((bytes, false)) => Ok(Some(bytes)),
            None => Ok(None),
        }
    }

    /// List canonical paths of baseline files directly under `dir` whose file
    /// name starts with `name_prefix`.
    ///
    /// The returned paths are sorted. A missing directory yields an empty
    /// list rather than an error; absence handling belongs to the caller.
    pub fn list_with_prefix(&self, dir: &str, name_prefix: &str) -> Result<Vec<String>> {
        let dir_path = self.root.join(dir);
        if !dir_path.as_std_path().is_dir() {
            return Ok(Vec::new());
        }

        let mut found = Vec::new();
        for entry in std::fs::read_dir(dir_path.as_std_path())? {
            let entry = entry?;
            let path = match Utf8PathBuf::from_path_buf(entry.path()) {
                Ok(p) => p,
                Err(p) => {
                    tracing::warn!("Skipping non-UTF-8 baseline path: {}", p.display());
                    continue;
                }
            };
            if !path.as_std_path().is_file() {
                continue;
            }
            let Some(name) = path.file_name() else {
                continue;
            };
            if name.starts_with(name_prefix) {
                found.push(canonical::canonicalize(&format!("{dir}/{name}")));
            }
        }

        found.sort();
        found.dedup();
        Ok(found)
    }
}
