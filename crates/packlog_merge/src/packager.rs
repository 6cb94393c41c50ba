//! Diff engine: reduce one mod's raw asset tree to a minimal changelog tree.
//!
//! # Algorithm
//!
//! 1. Walk the mod root and classify every file by canonical path.
//! 2. Fan out independent assets to the rayon pool. Per asset:
//!    - **Containers**: decompress, skip entirely when the whole-asset hash is
//!      baseline-identical; otherwise strip entries that are themselves
//!      baseline-identical (composite or bare key), deltify entries whose
//!      extension has a handler and whose baseline counterpart entry exists,
//!      and re-emit the reduced archive. If nothing was stripped or replaced
//!      and the container path itself is known to the index, emit nothing:
//!      the differences were sub-entry noise.
//!    - **Handled flat files**: package against the baseline counterpart via
//!      the extension's handler; with no counterpart the file is copied
//!      verbatim (no delta is possible).
//!    - **Plain files**: identity-skip or verbatim copy.
//! 3. GameDataList is a single logical asset: only the first candidate under
//!    the fixed naming prefix is diffed, through the structural changelog
//!    format; zero-length output means no changes.
//!
//! Any single-asset failure is caught at the asset boundary, logged, and
//! resolved by copying the mod's raw file into the changelog tree, so output
//! stays complete even when a handler crashes on malformed input.

use camino::Utf8Path;
use packlog_core::{canonical, content_hash, Category, PriorityPair};
use packlog_sarc::Sarc;
use rayon::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::asset::{classify, AssetClass};
use crate::env::MergeEnv;
use crate::error::{Error, Result};
use crate::fsutil;
use crate::gdl;

/// Summary returned after packaging one mod.
#[derive(Debug, Default)]
pub struct PackageSummary {
    /// Changelog files written.
    pub emitted: usize,
    /// Assets omitted as baseline-identical (or excluded).
    pub skipped: usize,
    /// Assets resolved by the whole-file fallback after a failure.
    pub raw_copies: usize,
    /// Wall-clock time for the whole pass.
    pub build_time: Duration,
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Emitted,
    Skipped,
    RawCopy,
}

struct DiscoveredAsset {
    abs: camino::Utf8PathBuf,
    canonical: String,
    compressed: bool,
    class: AssetClass,
}

/// The diff engine. Cheap to clone per mod; all state lives in the shared
/// environment.
pub struct Packager {
    env: Arc<MergeEnv>,
}

impl Packager {
    pub fn new(env: Arc<MergeEnv>) -> Self {
        Self { env }
    }

    /// Package one mod's asset tree into a changelog tree at `out_root`.
    pub fn package_mod(&self, mod_root: &Utf8Path, out_root: &Utf8Path) -> Result<PackageSummary> {
        let start = Instant::now();
        if !mod_root.as_std_path().is_dir() {
            return Err(Error::InvalidModRoot(mod_root.to_owned()));
        }

        tracing::info!("Packaging mod tree {}", mod_root);

        let mut assets = Vec::new();
        let mut gamedata = Vec::new();
        for (abs, rel) in fsutil::walk_files(mod_root)? {
            let canonical_path = canonical::canonicalize(&rel);
            let compressed = canonical::is_compressed(&rel);
            let class = classify(&canonical_path, &self.env.handlers);
            let asset = DiscoveredAsset {
                abs,
                canonical: canonical_path,
                compressed,
                class,
            };
            if asset.class == AssetClass::GameDataList {
                gamedata.push(asset);
            } else {
                assets.push(asset);
            }
        }

        let mut summary = PackageSummary::default();

        // Independent assets fan out; each one owns its own state.
        let outcomes: Vec<Outcome> = assets
            .par_iter()
            .map(|asset| self.package_asset(asset, out_root))
            .collect();
        for outcome in outcomes {
            match outcome {
                Outcome::Emitted => summary.emitted += 1,
                Outcome::Skipped => summary.skipped += 1,
                Outcome::RawCopy => summary.raw_copies += 1,
            }
        }

        // GameDataList is one logical asset: only the first candidate counts.
        gamedata.sort_by(|a, b| a.canonical.cmp(&b.canonical));
        if let Some(first) = gamedata.first() {
            match self.package_gamedata(first, out_root) {
                Ok(Outcome::Emitted) => summary.emitted += 1,
                Ok(_) => summary.skipped += 1,
                // A missing vanilla table is an anchor failure; a malformed
                // table is per-asset and resolves like any other asset.
                Err(e @ Error::MissingAnchor(_)) => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        "Failed to package GameDataList '{}': {}; copying raw file",
                        first.canonical,
                        e
                    );
                    match self.copy_raw(first, out_root) {
                        Ok(()) => summary.raw_copies += 1,
                        Err(copy_err) => {
                            tracing::warn!(
                                "Raw-copy fallback failed for '{}': {}",
                                first.canonical,
                                copy_err
                            );
                            summary.skipped += 1;
                        }
                    }
                }
            }
            summary.skipped += gamedata.len() - 1;
        }

        summary.build_time = start.elapsed();
        tracing::info!(
            "Packaged {}: {} emitted, {} skipped, {} raw copies",
            mod_root,
            summary.emitted,
            summary.skipped,
            summary.raw_copies
        );
        Ok(summary)
    }

    /// Process one asset, resolving any failure with the raw-copy fallback.
    fn package_asset(&self, asset: &DiscoveredAsset, out_root: &Utf8Path) -> Outcome {
        let result = match &asset.class {
            AssetClass::Excluded | AssetClass::ChangelogArtifact => return Outcome::Skipped,
            AssetClass::Container => self.package_container(asset, out_root),
            AssetClass::Handled(ext) => self.package_handled(asset, ext, out_root),
            AssetClass::Plain => self.package_plain(asset, out_root),
            // Filtered out before the parallel fan-out.
            AssetClass::GameDataList => return Outcome::Skipped,
        };

        match result {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(
                    "Failed to package '{}': {}; copying raw file",
                    asset.canonical,
                    e
                );
                match self.copy_raw(asset, out_root) {
                    Ok(()) => Outcome::RawCopy,
                    Err(copy_err) => {
                        tracing::warn!(
                            "Raw-copy fallback failed for '{}': {}",
                            asset.canonical,
                            copy_err
                        );
                        Outcome::Skipped
                    }
                }
            }
        }
    }

    fn copy_raw(&self, asset: &DiscoveredAsset, out_root: &Utf8Path) -> Result<()> {
        let bytes = std::fs::read(asset.abs.as_std_path())?;
        fsutil::write_file(
            out_root,
            &fsutil::disk_rel(&asset.canonical, asset.compressed),
            &bytes,
        )?;
        Ok(())
    }

    fn read_decompressed(&self, asset: &DiscoveredAsset) -> Result<Vec<u8>> {
        let raw = std::fs::read(asset.abs.as_std_path())?;
        if asset.compressed {
            let category = Category::for_name(&asset.canonical);
            Ok(self.env.zstd.decompress(&raw, category)?)
        } else {
            Ok(raw)
        }
    }

    fn package_container(&self, asset: &DiscoveredAsset, out_root: &Utf8Path) -> Result<Outcome> {
        let env = &self.env;
        let data = self.read_decompressed(asset)?;

        if env.checksums.is_baseline_file(&asset.canonical, content_hash(&data)) {
            return Ok(Outcome::Skipped);
        }

        let mut archive = Sarc::decode(&data)?;
        let baseline_archive = match env.baseline.open(&asset.canonical)? {
            Some(bytes) => match Sarc::decode(&bytes) {
                Ok(archive) => Some(archive),
                Err(e) => {
                    tracing::warn!(
                        "Baseline container '{}' failed to decode: {}; treating as absent",
                        asset.canonical,
                        e
                    );
                    None
                }
            },
            None => None,
        };

        let mut unchanged = Vec::new();
        let mut deltas = Vec::new();
        for (name, bytes) in archive.iter() {
            let entry_hash = content_hash(bytes);
            let composite = format!("{}/{}", asset.canonical, name);
            if env.checksums.is_baseline_entry(&composite, entry_hash)
                || env.checksums.is_baseline_entry(name, entry_hash)
            {
                unchanged.push(name.to_owned());
                continue;
            }

            // A baseline counterpart entry is required for deltification;
            // without one the entry is necessarily new and stays whole.
            let Some(base) = baseline_archive.as_ref().and_then(|b| b.get(name)) else {
                continue;
            };
            let Some(ext) = canonical::extension(name) else {
                continue;
            };
            match env.handlers.get(&ext) {
                Some(handler) => {
                    match handler.package(name, PriorityPair { base, over: bytes }) {
                        Ok(delta) => deltas.push((name.to_owned(), delta)),
                        Err(e) => tracing::warn!(
                            "Handler failed packaging '{}' in '{}': {}; keeping full entry",
                            name,
                            asset.canonical,
                            e
                        ),
                    }
                }
                None => tracing::debug!(
                    "No handler for '{}' in '{}'; keeping full entry",
                    name,
                    asset.canonical
                ),
            }
        }

        let removed_any = !unchanged.is_empty();
        let replaced_any = !deltas.is_empty();
        for name in &unchanged {
            archive.remove(name);
        }
        for (name, delta) in deltas {
            archive.insert(name, delta);
        }

        // Only sub-entry noise: a known baseline container whose survivors are
        // all untouched carries no information.
        if !removed_any && !replaced_any && env.checksums.knows_file(&asset.canonical) {
            return Ok(Outcome::Skipped);
        }

        let mut out = archive.encode();
        if asset.compressed {
            out = env.zstd.compress(&out, Category::for_name(&asset.canonical))?;
        }
        fsutil::write_file(
            out_root,
            &fsutil::disk_rel(&asset.canonical, asset.compressed),
            &out,
        )?;
        Ok(Outcome::Emitted)
    }

    fn package_handled(
        &self,
        asset: &DiscoveredAsset,
        ext: &str,
        out_root: &Utf8Path,
    ) -> Result<Outcome> {
        let env = &self.env;
        let data = self.read_decompressed(asset)?;

        if env.checksums.is_baseline_file(&asset.canonical, content_hash(&data)) {
            return Ok(Outcome::Skipped);
        }

        let Some(base) = env.baseline.open(&asset.canonical)? else {
            // Wholly new file: no delta possible.
            self.copy_raw(asset, out_root)?;
            return Ok(Outcome::Emitted);
        };
        let Some(handler) = env.handlers.get(ext) else {
            self.copy_raw(asset, out_root)?;
            return Ok(Outcome::Emitted);
        };

        let delta = handler
            .package(
                &asset.canonical,
                PriorityPair {
                    base: &base,
                    over: &data,
                },
            )
            .map_err(|e| Error::Handler {
                key: asset.canonical.clone(),
                source: e,
            })?;

        let out = if asset.compressed {
            env.zstd.compress(&delta, Category::for_name(&asset.canonical))?
        } else {
            delta
        };
        fsutil::write_file(
            out_root,
            &fsutil::disk_rel(&asset.canonical, asset.compressed),
            &out,
        )?;
        Ok(Outcome::Emitted)
    }

    fn package_plain(&self, asset: &DiscoveredAsset, out_root: &Utf8Path) -> Result<Outcome> {
        let data = self.read_decompressed(asset)?;
        if self
            .env
            .checksums
            .is_baseline_file(&asset.canonical, content_hash(&data))
        {
            return Ok(Outcome::Skipped);
        }
        self.copy_raw(asset, out_root)?;
        Ok(Outcome::Emitted)
    }

    /// Diff the single GameDataList logical asset through the structural
    /// changelog. The vanilla counterpart is an anchor: its absence is a hard
    /// failure for this sub-operation.
    fn package_gamedata(&self, asset: &DiscoveredAsset, out_root: &Utf8Path) -> Result<Outcome> {
        let data = self.read_decompressed(asset)?;
        let vanilla = self
            .env
            .baseline
            .open(&asset.canonical)?
            .ok_or_else(|| Error::MissingAnchor(asset.canonical.clone()))?;

        let log = gdl::changelog(&vanilla, &data)?;
        if log.is_empty() {
            return Ok(Outcome::Skipped);
        }
        fsutil::write_file(out_root, crate::asset::GDL_ARTIFACT, &log)?;
        Ok(Outcome::Emitted)
    }
}
