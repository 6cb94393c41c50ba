//! Merge engine: combine ordered changelog trees and the baseline into one
//! output tree.
//!
//! # Algorithm
//!
//! 1. Clear all container-class files from the destination so no stale state
//!    from a previous run can leak into this one.
//! 2. Walk the mod list strictly in priority order (index 0 = lowest). Within
//!    one mod, independent assets fan out to the rayon pool; steps for the
//!    same asset across different mods never overlap because the outer loop
//!    is sequential.
//! 3. Per container asset: seed the destination from the baseline counterpart
//!    (or, lacking one, from the mod's changelog itself, making that mod
//!    the de facto baseline), then fold the changelog in entry by entry:
//!    additions propagate verbatim, unhandled extensions overwrite, handled
//!    extensions go through the handler's `Merge` with the accumulated
//!    destination as the priority-0 input.
//! 4. Flat files follow the same seed → dispatch-or-overwrite → write shape
//!    without the container decode.
//! 5. The GameDataList changelog artifact is applied sequentially to every
//!    destination variant after the parallel fan-out, staging baseline
//!    variants first and deleting the stray artifact afterwards.
//!
//! A corrupt container at one mod's asset is resolved by deleting the partial
//! destination file and copying the mod's raw file wholesale; a malformed
//! GameDataList artifact drops that one mod's GameDataList contribution.
//! Processing continues with the next asset and the next mod either way.

use camino::{Utf8Path, Utf8PathBuf};
use packlog_core::{canonical, Category, PriorityPair};
use packlog_sarc::Sarc;
use rayon::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::asset::{self, classify, AssetClass};
use crate::env::MergeEnv;
use crate::error::{Error, Result};
use crate::fsutil;
use crate::gdl;

/// One changelog tree in the priority list. Index 0 = lowest priority.
pub struct ModChangelog {
    /// Identifier used in logging.
    pub id: String,
    /// Root of the mod's changelog tree.
    pub root: Utf8PathBuf,
}

/// Summary returned after a merge completes.
#[derive(Debug, Default)]
pub struct MergeSummary {
    /// Mods processed.
    pub mods: usize,
    /// Destination files written or updated.
    pub written: usize,
    /// Assets resolved by the whole-file overwrite fallback.
    pub fallbacks: usize,
    /// Assets skipped (excluded classes).
    pub skipped: usize,
    /// Wall-clock time for the entire merge.
    pub build_time: Duration,
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Written,
    Fallback,
    Skipped,
}

struct ModAsset {
    abs: Utf8PathBuf,
    canonical: String,
    compressed: bool,
    class: AssetClass,
}

/// The merge engine.
pub struct Merger {
    env: Arc<MergeEnv>,
}

impl Merger {
    pub fn new(env: Arc<MergeEnv>) -> Self {
        Self { env }
    }

    /// Merge the ordered changelog trees into `out_root`.
    pub fn merge(&self, mods: &[ModChangelog], out_root: &Utf8Path) -> Result<MergeSummary> {
        let start = Instant::now();
        std::fs::create_dir_all(out_root.as_std_path())?;

        self.clear_containers(out_root)?;

        let mut summary = MergeSummary {
            mods: mods.len(),
            ..MergeSummary::default()
        };

        for mod_changelog in mods {
            if !mod_changelog.root.as_std_path().is_dir() {
                return Err(Error::InvalidModRoot(mod_changelog.root.clone()));
            }
            tracing::info!("Merging mod id={}", mod_changelog.id);

            let mut assets = Vec::new();
            let mut artifact = None;
            for (abs, rel) in fsutil::walk_files(&mod_changelog.root)? {
                let canonical_path = canonical::canonicalize(&rel);
                let compressed = canonical::is_compressed(&rel);
                let class = classify(&canonical_path, &self.env.handlers);
                if class == AssetClass::ChangelogArtifact {
                    artifact = Some(abs);
                    continue;
                }
                assets.push(ModAsset {
                    abs,
                    canonical: canonical_path,
                    compressed,
                    class,
                });
            }

            // Inner fan-out only: distinct assets within one mod.
            let outcomes: Vec<Outcome> = assets
                .par_iter()
                .map(|a| self.apply_asset(mod_changelog, a, out_root))
                .collect();
            for outcome in outcomes {
                match outcome {
                    Outcome::Written => summary.written += 1,
                    Outcome::Fallback => summary.fallbacks += 1,
                    Outcome::Skipped => summary.skipped += 1,
                }
            }

            if let Some(artifact) = artifact {
                match self.merge_gamedata(mod_changelog, &artifact, out_root) {
                    Ok(()) => summary.written += 1,
                    // No GDL candidate anywhere is an anchor failure; anything
                    // else is one mod's bad artifact and must not halt the run.
                    Err(e @ Error::MissingAnchor(_)) => return Err(e),
                    Err(e) => {
                        tracing::warn!(
                            "Failed to apply GameDataList changelog from mod '{}': {}; skipping it",
                            mod_changelog.id,
                            e
                        );
                        summary.skipped += 1;
                    }
                }
            }
        }

        summary.build_time = start.elapsed();
        tracing::info!(
            "Merged {} mods: {} written, {} fallbacks, {} skipped",
            summary.mods,
            summary.written,
            summary.fallbacks,
            summary.skipped
        );
        Ok(summary)
    }

    /// Remove every container-class file from the destination tree.
    fn clear_containers(&self, out_root: &Utf8Path) -> Result<()> {
        if !out_root.as_std_path().is_dir() {
            return Ok(());
        }
        for (abs, rel) in fsutil::walk_files(out_root)? {
            if asset::is_container(&canonical::canonicalize(&rel)) {
                std::fs::remove_file(abs.as_std_path())?;
            }
        }
        Ok(())
    }

    /// Apply one mod's asset, resolving any failure with the full-priority-wins
    /// overwrite fallback.
    fn apply_asset(&self, mod_changelog: &ModChangelog, a: &ModAsset, out_root: &Utf8Path) -> Outcome {
        let result = match &a.class {
            AssetClass::Excluded => return Outcome::Skipped,
            AssetClass::Container => self.apply_container(a, out_root),
            AssetClass::Handled(ext) => self.apply_flat(a, ext, out_root),
            // Atomic content, and full GameDataList tables shipped outside the
            // changelog format: last priority wins.
            AssetClass::Plain | AssetClass::GameDataList => self.apply_overwrite(a, out_root),
            AssetClass::ChangelogArtifact => return Outcome::Skipped,
        };

        match result {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(
                    "Failed to merge '{}' from mod '{}': {}; overwriting with raw file",
                    a.canonical,
                    mod_changelog.id,
                    e
                );
                match fsutil::overwrite_with_raw(&a.abs, &a.canonical, a.compressed, out_root) {
                    Ok(()) => Outcome::Fallback,
                    Err(copy_err) => {
                        tracing::warn!(
                            "Overwrite fallback failed for '{}': {}",
                            a.canonical,
                            copy_err
                        );
                        Outcome::Skipped
                    }
                }
            }
        }
    }

    /// Seed the destination for `canonical` if it does not exist yet.
    ///
    /// Returns the destination path and compression state, or `None` when the
    /// asset was seeded from the mod's own file, in which case the mod's
    /// contribution is complete.
    fn seed_dest(
        &self,
        a: &ModAsset,
        out_root: &Utf8Path,
    ) -> Result<Option<(Utf8PathBuf, bool)>> {
        if let Some(found) = fsutil::find_dest(out_root, &a.canonical) {
            return Ok(Some(found));
        }
        match self.env.baseline.open_raw(&a.canonical)? {
            Some((bytes, compressed)) => {
                let rel = fsutil::disk_rel(&a.canonical, compressed);
                let path = fsutil::write_file(out_root, &rel, &bytes)?;
                Ok(Some((path, compressed)))
            }
            None => {
                // No baseline: this mod's changelog becomes the de facto
                // baseline for higher-priority mods.
                fsutil::overwrite_with_raw(&a.abs, &a.canonical, a.compressed, out_root)?;
                Ok(None)
            }
        }
    }

    fn read_decompressed(&self, path: &Utf8Path, canonical: &str, compressed: bool) -> Result<Vec<u8>> {
        let raw = std::fs::read(path.as_std_path())?;
        if compressed {
            Ok(self.env.zstd.decompress(&raw, Category::for_name(canonical))?)
        } else {
            Ok(raw)
        }
    }

    fn apply_container(&self, a: &ModAsset, out_root: &Utf8Path) -> Result<Outcome> {
        let Some((dest_path, dest_compressed)) = self.seed_dest(a, out_root)? else {
            return Ok(Outcome::Written);
        };

        let incoming_data = self.read_decompressed(&a.abs, &a.canonical, a.compressed)?;
        let incoming = Sarc::decode(&incoming_data)?;
        let dest_data = self.read_decompressed(&dest_path, &a.canonical, dest_compressed)?;
        let mut current = Sarc::decode(&dest_data)?;

        merge_container_entries(&self.env, &a.canonical, &mut current, &incoming);

        let mut out = current.encode();
        if dest_compressed {
            out = self
                .env
                .zstd
                .compress(&out, Category::for_name(&a.canonical))?;
        }
        std::fs::write(dest_path.as_std_path(), out)?;
        Ok(Outcome::Written)
    }

    fn apply_flat(&self, a: &ModAsset, ext: &str, out_root: &Utf8Path) -> Result<Outcome> {
        let Some((dest_path, dest_compressed)) = self.seed_dest(a, out_root)? else {
            return Ok(Outcome::Written);
        };

        let Some(handler) = self.env.handlers.get(ext) else {
            return self.apply_overwrite(a, out_root);
        };

        let incoming = self.read_decompressed(&a.abs, &a.canonical, a.compressed)?;
        let base = self.read_decompressed(&dest_path, &a.canonical, dest_compressed)?;

        match handler.merge(
            &a.canonical,
            PriorityPair {
                base: &base,
                over: &incoming,
            },
        ) {
            Ok(merged) => {
                let out = if dest_compressed {
                    self.env
                        .zstd
                        .compress(&merged, Category::for_name(&a.canonical))?
                } else {
                    merged
                };
                std::fs::write(dest_path.as_std_path(), out)?;
            }
            Err(e) => {
                tracing::warn!(
                    "Handler failed merging '{}': {}; overwriting",
                    a.canonical,
                    e
                );
                fsutil::overwrite_with_raw(&a.abs, &a.canonical, a.compressed, out_root)?;
            }
        }
        Ok(Outcome::Written)
    }

    fn apply_overwrite(&self, a: &ModAsset, out_root: &Utf8Path) -> Result<Outcome> {
        fsutil::overwrite_with_raw(&a.abs, &a.canonical, a.compressed, out_root)?;
        Ok(Outcome::Written)
    }

    /// Apply a mod's GameDataList changelog artifact to every destination
    /// variant, staging baseline variants into the destination first.
    fn merge_gamedata(
        &self,
        mod_changelog: &ModChangelog,
        artifact: &Utf8Path,
        out_root: &Utf8Path,
    ) -> Result<()> {
        let env = &self.env;

        // Stage all baseline variants once.
        for variant in env
            .baseline
            .list_with_prefix(asset::GDL_DIR, asset::GDL_NAME_PREFIX)?
        {
            if fsutil::find_dest(out_root, &variant).is_none() {
                if let Some((bytes, compressed)) = env.baseline.open_raw(&variant)? {
                    fsutil::write_file(out_root, &fsutil::disk_rel(&variant, compressed), &bytes)?;
                }
            }
        }

        // Locate all destination candidates under the fixed prefix.
        let mut candidates = Vec::new();
        for (abs, rel) in fsutil::walk_files(out_root)? {
            let canonical_path = canonical::canonicalize(&rel);
            if canonical_path.starts_with(asset::GDL_PREFIX) {
                candidates.push((abs, canonical_path, canonical::is_compressed(&rel)));
            }
        }
        if candidates.is_empty() {
            return Err(Error::MissingAnchor(asset::GDL_PREFIX.to_owned()));
        }

        let log = std::fs::read(artifact.as_std_path())?;
        tracing::info!(
            "Applying GameDataList changelog from mod '{}' to {} variant(s)",
            mod_changelog.id,
            candidates.len()
        );

        for (abs, canonical_path, compressed) in candidates {
            let table = self.read_decompressed(&abs, &canonical_path, compressed)?;
            let merged = gdl::merge(&log, &table)?;
            let out = if compressed {
                env.zstd.compress(&merged, Category::for_name(&canonical_path))?
            } else {
                merged
            };
            std::fs::write(abs.as_std_path(), out)?;
        }

        // A stray artifact must never survive in the merged output tree.
        let stray = out_root.join(asset::GDL_ARTIFACT);
        if stray.as_std_path().is_file() {
            std::fs::remove_file(stray.as_std_path())?;
        }
        Ok(())
    }
}

/// Fold `incoming` changelog entries into the accumulated `current` archive.
///
/// Additions propagate verbatim; entries with no registered handler are
/// overwritten (last priority wins); handled entries go through `Merge` with
/// the accumulated content as the priority-0 input. Handler failures fall
/// back to overwrite.
pub(crate) fn merge_container_entries(
    env: &MergeEnv,
    container: &str,
    current: &mut Sarc,
    incoming: &Sarc,
) {
    for (name, bytes) in incoming.iter() {
        if !current.contains(name) {
            current.insert(name, bytes.to_vec());
            continue;
        }
        let handler = canonical::extension(name).and_then(|ext| env.handlers.get(&ext));
        let Some(handler) = handler else {
            current.insert(name, bytes.to_vec());
            continue;
        };

        // Owned copy: the handler result replaces this entry in place.
        let base = current.get(name).map(<[u8]>::to_vec).unwrap_or_default();
        match handler.merge(
            name,
            PriorityPair {
                base: &base,
                over: bytes,
            },
        ) {
            Ok(merged) => current.insert(name, merged),
            Err(e) => {
                tracing::warn!(
                    "Handler failed merging '{}' in '{}': {}; overwriting",
                    name,
                    container,
                    e
                );
                current.insert(name, bytes.to_vec());
            }
        }
    }
}
