//! Asset classification.
//!
//! Every discovered file is routed by its canonical path into exactly one
//! processing class. Classification is shared by both engines so a path is
//! guaranteed to take the same route during packaging and merging.

use packlog_core::{canonical, HandlerRegistry};

/// Extensions recognized as keyed container archives.
pub const CONTAINER_EXTENSIONS: &[&str] = &["pack", "sarc"];

/// Directory holding the GameDataList variant files.
pub const GDL_DIR: &str = "GameData";

/// File-name prefix shared by all GameDataList variants.
pub const GDL_NAME_PREFIX: &str = "GameDataList.Product.";

/// Canonical-path prefix shared by all GameDataList variants.
pub const GDL_PREFIX: &str = "GameData/GameDataList.Product.";

/// Canonical path of the GameDataList changelog artifact in a changelog tree.
pub const GDL_ARTIFACT: &str = "GameData/GameDataList.gdlchangelog";

/// Extension of the GameDataList changelog artifact.
pub const GDL_ARTIFACT_EXTENSION: &str = "gdlchangelog";

/// Directories whose contents are regenerated elsewhere and never diffed or merged.
const EXCLUDED_DIRS: &[&str] = &["System/Resource/"];

/// Extensions that are regenerated elsewhere and never diffed or merged.
const EXCLUDED_EXTENSIONS: &[&str] = &["rsizetable"];

/// Processing class of one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetClass {
    /// Keyed container archive, diffed and merged per entry.
    Container,
    /// Flat file whose extension has a registered handler.
    Handled(String),
    /// Flat file with no handler: identity-skipped or copied whole.
    Plain,
    /// A GameDataList variant table, routed to the dedicated merger.
    GameDataList,
    /// The GameDataList changelog artifact itself.
    ChangelogArtifact,
    /// Never processed.
    Excluded,
}

/// Whether a canonical path names a container-class asset.
pub fn is_container(path: &str) -> bool {
    matches!(
        canonical::extension(path).as_deref(),
        Some(ext) if CONTAINER_EXTENSIONS.contains(&ext)
    )
}

/// Route a canonical path to its processing class.
pub fn classify(path: &str, handlers: &HandlerRegistry) -> AssetClass {
    let ext = canonical::extension(path);

    if EXCLUDED_DIRS.iter().any(|dir| path.starts_with(dir))
        || matches!(ext.as_deref(), Some(e) if EXCLUDED_EXTENSIONS.contains(&e))
    {
        return AssetClass::Excluded;
    }
    if ext.as_deref() == Some(GDL_ARTIFACT_EXTENSION) {
        return AssetClass::ChangelogArtifact;
    }
    if path.starts_with(GDL_PREFIX) {
        return AssetClass::GameDataList;
    }
    if is_container(path) {
        return AssetClass::Container;
    }
    if let Some(ext) = ext {
        if handlers.get(&ext).is_some() {
            return AssetClass::Handled(ext);
        }
    }
    AssetClass::Plain
}
