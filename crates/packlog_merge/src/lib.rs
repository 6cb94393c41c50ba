//! Changelog generation and merge reconciliation for trees of binary game
//! assets.
//!
//! Multiple independently-authored mods change overlapping files; this crate
//! reconciles them without the mods knowing about each other:
//!
//! - The [`Packager`] reduces one mod's raw asset tree to a minimal changelog
//!   relative to an unmodified baseline: whole files identical to baseline
//!   are omitted, container entries identical to baseline are stripped, and
//!   entries with a registered format handler are reduced to opaque deltas.
//! - The [`Merger`] folds an ordered list of changelog trees (index 0 =
//!   lowest priority) over the baseline into a single output tree, one mod at
//!   a time, so every handler sees the previously-accumulated result as its
//!   priority-0 input.
//! - [`ShopsMerger`] is a final post-pass over a fixed set of shop entities
//!   whose baseline containers are materialized on demand.
//!
//! Both engines share the read-only [`MergeEnv`] and isolate per-asset
//! failures: a corrupt archive or a crashing handler degrades that one asset
//! to a whole-file copy and the run continues.
//!
//! # Example
//!
//! ```no_run
//! use camino::{Utf8Path, Utf8PathBuf};
//! use packlog_core::HandlerRegistry;
//! use packlog_merge::{MergeEnv, Merger, ModChangelog, Packager};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let env = MergeEnv::load(
//!     Utf8PathBuf::from("/dump/romfs"),
//!     Utf8Path::new("/cache/checksums.bin"),
//!     vec!["121".to_owned()],
//!     HandlerRegistry::new(),
//! )?;
//!
//! let packager = Packager::new(env.clone());
//! packager.package_mod(
//!     Utf8Path::new("/mods/better-armor/romfs"),
//!     Utf8Path::new("/changelogs/better-armor"),
//! )?;
//!
//! let merger = Merger::new(env);
//! let summary = merger.merge(
//!     &[ModChangelog {
//!         id: "better-armor".to_owned(),
//!         root: Utf8PathBuf::from("/changelogs/better-armor"),
//!     }],
//!     Utf8Path::new("/output/romfs"),
//! )?;
//! println!("wrote {} files", summary.written);
//! # Ok(())
//! # }
//! ```

pub mod asset;
pub mod env;
pub mod error;
mod fsutil;
pub mod gdl;
pub mod merger;
pub mod packager;
pub mod shops;

pub use env::MergeEnv;
pub use error::{Error, Result};
pub use merger::{MergeSummary, Merger, ModChangelog};
pub use packager::{PackageSummary, Packager};
pub use shops::{BaselineFetch, ShopsMerger, SHOP_ACTORS};
