//! Canonical asset paths.
//!
//! A canonical path is the stable identity key for an asset: relative,
//! forward-slash separated, with any `romfs` segment removed and the `.zs`
//! compression suffix stripped. Two inputs describing the same logical asset
//! normalize to the same canonical path regardless of source OS or
//! compression state.

/// Suffix carried by zstd-compressed files on disk.
pub const ZS_SUFFIX: &str = ".zs";

/// Normalize a relative path into its canonical form.
///
/// Backslashes become forward slashes, empty and `.` segments are dropped,
/// any segment equal to `romfs` is removed, and a trailing `.zs` is stripped.
pub fn canonicalize(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    let joined = normalized
        .split('/')
        .filter(|seg| !seg.is_empty() && *seg != "." && *seg != "romfs")
        .collect::<Vec<_>>()
        .join("/");

    match joined.strip_suffix(ZS_SUFFIX) {
        Some(stripped) => stripped.to_owned(),
        None => joined,
    }
}

/// Whether an on-disk path carries the compression suffix.
pub fn is_compressed(path: &str) -> bool {
    path.ends_with(ZS_SUFFIX)
}

/// Final path segment of a canonical path.
pub fn file_name(canonical: &str) -> &str {
    canonical.rsplit('/').next().unwrap_or(canonical)
}

/// Lower-cased extension of a canonical path or entry key, without the dot.
///
/// Returns `None` for names with no extension.
pub fn extension(path: &str) -> Option<String> {
    let name = file_name(path);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
