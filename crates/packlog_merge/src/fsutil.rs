//! Filesystem helpers shared by the engines.
//!
//! Output trees are laid out by canonical path, with the `.zs` suffix
//! restored for assets that were compressed at their source.

use camino::{Utf8Path, Utf8PathBuf};
use packlog_core::canonical::ZS_SUFFIX;
use walkdir::WalkDir;

use crate::error::Result;

/// Collect all files under `root` as `(absolute path, relative path string)`.
///
/// Non-UTF-8 paths are skipped with a warning, the way the overlay builder
/// skips them during game indexing.
pub(crate) fn walk_files(root: &Utf8Path) -> Result<Vec<(Utf8PathBuf, String)>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root.as_std_path()) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = match Utf8PathBuf::from_path_buf(entry.into_path()) {
            Ok(p) => p,
            Err(p) => {
                tracing::warn!("Skipping non-UTF-8 path: {}", p.display());
                continue;
            }
        };
        let rel = match path.strip_prefix(root) {
            Ok(r) => r.as_str().to_owned(),
            Err(_) => continue,
        };
        files.push((path, rel));
    }
    files.sort();
    Ok(files)
}

/// On-disk relative path for a canonical path in a given compression state.
pub(crate) fn disk_rel(canonical: &str, compressed: bool) -> String {
    if compressed {
        format!("{canonical}{ZS_SUFFIX}")
    } else {
        canonical.to_owned()
    }
}

/// Write `bytes` under `root/rel`, creating parent directories.
pub(crate) fn write_file(root: &Utf8Path, rel: &str, bytes: &[u8]) -> Result<Utf8PathBuf> {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent.as_std_path())?;
    }
    std::fs::write(path.as_std_path(), bytes)?;
    Ok(path)
}

/// Locate the destination file for a canonical path, in either compression
/// state. Returns the path and whether it is compressed.
pub(crate) fn find_dest(root: &Utf8Path, canonical: &str) -> Option<(Utf8PathBuf, bool)> {
    let plain = root.join(canonical);
    if plain.as_std_path().is_file() {
        return Some((plain, false));
    }
    let compressed = root.join(format!("{canonical}{ZS_SUFFIX}"));
    if compressed.as_std_path().is_file() {
        return Some((compressed, true));
    }
    None
}

/// Remove any destination file for a canonical path, in both compression states.
pub(crate) fn remove_dest(root: &Utf8Path, canonical: &str) -> Result<()> {
    for rel in [canonical.to_owned(), format!("{canonical}{ZS_SUFFIX}")] {
        let path = root.join(rel);
        if path.as_std_path().is_file() {
            std::fs::remove_file(path.as_std_path())?;
        }
    }
    Ok(())
}

/// Whole-file fallback: drop whatever the destination holds for this
/// canonical path and copy the source file verbatim.
pub(crate) fn overwrite_with_raw(
    src: &Utf8Path,
    canonical: &str,
    compressed: bool,
    root: &Utf8Path,
) -> Result<()> {
    remove_dest(root, canonical)?;
    let bytes = std::fs::read(src.as_std_path())?;
    write_file(root, &disk_rel(canonical, compressed), &bytes)?;
    Ok(())
}
