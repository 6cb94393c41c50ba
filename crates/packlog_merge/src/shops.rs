//! Shops post-pass.
//!
//! Shop inventories live inside a small, fixed set of actor containers that
//! most runs never touch. Instead of staging them all up front, the merger
//! fetches each entity's baseline container on demand, the first time any
//! mod touches it, through a caller-supplied callback, then folds every
//! touching mod's entries in priority order with the same
//! handler-or-overwrite rules as the main container merge.

use camino::{Utf8Path, Utf8PathBuf};
use packlog_core::{canonical, Category};
use packlog_sarc::Sarc;
use std::sync::Arc;

use crate::env::MergeEnv;
use crate::error::Result;
use crate::fsutil;
use crate::merger::{merge_container_entries, ModChangelog};

/// The fixed set of shop actor containers reconciled by the post-pass.
pub const SHOP_ACTORS: &[&str] = &[
    "Pack/Actor/Npc_ArmorShop_Gerudo.pack",
    "Pack/Actor/Npc_DyeShop_Hateno.pack",
    "Pack/Actor/Npc_GeneralShop_Hateno.pack",
    "Pack/Actor/Npc_GeneralShop_Kakariko.pack",
    "Pack/Actor/Npc_JewelryShop_Gerudo.pack",
];

/// On-demand baseline supplier: canonical path → decompressed container
/// bytes, or `None` when the baseline has no such entity.
pub type BaselineFetch<'a> = dyn Fn(&str) -> Result<Option<Vec<u8>>> + Sync + 'a;

/// Final reconciliation pass over the fixed shop entity set.
pub struct ShopsMerger {
    env: Arc<MergeEnv>,
}

impl ShopsMerger {
    pub fn new(env: Arc<MergeEnv>) -> Self {
        Self { env }
    }

    /// Merge every shop entity touched by any mod, in priority order.
    ///
    /// Returns the number of entities written. Failures at one entity/mod are
    /// isolated with the usual overwrite fallback.
    pub fn merge(
        &self,
        mods: &[ModChangelog],
        out_root: &Utf8Path,
        fetch: &BaselineFetch<'_>,
    ) -> Result<usize> {
        let mut written = 0;

        for actor in SHOP_ACTORS {
            let touching: Vec<(&ModChangelog, Utf8PathBuf, bool)> = mods
                .iter()
                .filter_map(|m| {
                    let plain = m.root.join(actor);
                    if plain.as_std_path().is_file() {
                        return Some((m, plain, false));
                    }
                    let compressed = m.root.join(format!("{actor}{}", canonical::ZS_SUFFIX));
                    if compressed.as_std_path().is_file() {
                        return Some((m, compressed, true));
                    }
                    None
                })
                .collect();
            if touching.is_empty() {
                continue;
            }

            tracing::info!("Merging shop entity '{}' across {} mod(s)", actor, touching.len());
            for (mod_changelog, abs, compressed) in touching {
                if let Err(e) = self.apply(actor, &abs, compressed, out_root, fetch) {
                    tracing::warn!(
                        "Failed to merge shop '{}' from mod '{}': {}; overwriting",
                        actor,
                        mod_changelog.id,
                        e
                    );
                    fsutil::overwrite_with_raw(&abs, actor, compressed, out_root)?;
                }
            }
            written += 1;
        }

        Ok(written)
    }

    fn apply(
        &self,
        actor: &str,
        abs: &Utf8Path,
        compressed: bool,
        out_root: &Utf8Path,
        fetch: &BaselineFetch<'_>,
    ) -> Result<()> {
        let env = &self.env;
        let category = Category::for_name(actor);

        // Stage the baseline container the first time the entity is needed.
        let dest = match fsutil::find_dest(out_root, actor) {
            Some(found) => Some(found),
            None => match fetch(actor)? {
                Some(bytes) => {
                    let path = fsutil::write_file(out_root, actor, &bytes)?;
                    Some((path, false))
                }
                None => None,
            },
        };
        let Some((dest_path, dest_compressed)) = dest else {
            // No baseline anywhere: this mod's file becomes the entity.
            fsutil::overwrite_with_raw(abs, actor, compressed, out_root)?;
            return Ok(());
        };

        let incoming_raw = std::fs::read(abs.as_std_path())?;
        let incoming_data = if compressed {
            env.zstd.decompress(&incoming_raw, category)?
        } else {
            incoming_raw
        };
        let incoming = Sarc::decode(&incoming_data)?;

        let dest_raw = std::fs::read(dest_path.as_std_path())?;
        let dest_data = if dest_compressed {
            env.zstd.decompress(&dest_raw, category)?
        } else {
            dest_raw
        };
        let mut current = Sarc::decode(&dest_data)?;

        merge_container_entries(env, actor, &mut current, &incoming);

        let mut out = current.encode();
        if dest_compressed {
            out = env.zstd.compress(&out, category)?;
        }
        std::fs::write(dest_path.as_std_path(), out)?;
        Ok(())
    }
}
