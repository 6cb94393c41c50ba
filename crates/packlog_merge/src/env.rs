//! Shared engine environment.
//!
//! A [`MergeEnv`] bundles the read-only resources every engine operation
//! needs: the checksum identity index, the handler registry, the zstd backend
//! with its dictionaries, and the baseline source. It is constructed once per
//! run, failing fatally if any required resource is absent, and shared via
//! `Arc` across parallel workers; nothing in it is mutated afterwards.

use camino::{Utf8Path, Utf8PathBuf};
use packlog_core::{
    BaselineSource, ChecksumIndex, HandlerRegistry, ZstdBackend,
};
use packlog_sarc::Sarc;
use std::sync::Arc;

use crate::error::{Error, Result};

/// Canonical path of the dictionary pack inside the baseline dump.
pub const DICTIONARY_PACK: &str = "Pack/ZsDic.pack";

/// Entry names of the per-category dictionaries inside the dictionary pack.
pub const GENERIC_DICTIONARY: &str = "zs.zsdic";
pub const PACK_DICTIONARY: &str = "pack.zsdic";
pub const MAP_DICTIONARY: &str = "bcett.byml.zsdic";

/// Read-only resources shared by the diff and merge engines.
pub struct MergeEnv {
    pub checksums: Arc<ChecksumIndex>,
    pub handlers: Arc<HandlerRegistry>,
    pub zstd: Arc<ZstdBackend>,
    pub baseline: BaselineSource,
}

impl MergeEnv {
    /// Assemble an environment from already-constructed parts.
    pub fn new(
        checksums: Arc<ChecksumIndex>,
        handlers: Arc<HandlerRegistry>,
        zstd: Arc<ZstdBackend>,
        baseline: BaselineSource,
    ) -> Arc<Self> {
        Arc::new(Self {
            checksums,
            handlers,
            zstd,
            baseline,
        })
    }

    /// Load a full environment from disk.
    ///
    /// Reads the checksum index cache, then the dictionary pack from the
    /// baseline dump (the pack itself is a plain zstd frame), and finally
    /// opens the baseline with the dictionary-backed zstd backend. Any missing
    /// resource aborts the run before output is produced.
    pub fn load(
        dump_root: Utf8PathBuf,
        checksum_path: &Utf8Path,
        versions: Vec<String>,
        handlers: HandlerRegistry,
    ) -> Result<Arc<Self>> {
        let checksums = Arc::new(ChecksumIndex::load(checksum_path, versions)?);

        // The dictionary pack must decompress without dictionaries.
        let probe = BaselineSource::new(dump_root.clone(), Arc::new(ZstdBackend::plain()))?;
        let pack_bytes = probe
            .open(DICTIONARY_PACK)?
            .ok_or_else(|| Error::MissingAnchor(DICTIONARY_PACK.to_owned()))?;
        let dictionaries = Sarc::decode(&pack_bytes)?;

        let dictionary = |name: &str| -> Result<Vec<u8>> {
            dictionaries
                .get(name)
                .map(<[u8]>::to_vec)
                .ok_or_else(|| Error::MissingDictionary(name.to_owned()))
        };
        let zstd = Arc::new(ZstdBackend::from_parts(
            dictionary(GENERIC_DICTIONARY)?,
            dictionary(PACK_DICTIONARY)?,
            dictionary(MAP_DICTIONARY)?,
            packlog_core::compress::DEFAULT_LEVEL,
        ));

        let baseline = BaselineSource::new(dump_root, Arc::clone(&zstd))?;

        tracing::info!(
            "Merge environment ready: baseline={}, handlers={}",
            baseline.root(),
            handlers.len()
        );

        Ok(Self::new(checksums, Arc::new(handlers), zstd, baseline))
    }
}
