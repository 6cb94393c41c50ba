//! Checksum identity index.
//!
//! The index answers one question: "is this content, at this canonical path,
//! identical to a known baseline?" without ever comparing bytes against the
//! baseline itself. It is built once from a baseline dump, persisted as a
//! small binary cache, and loaded read-only at the start of every run; the
//! engines share it freely across worker threads.
//!
//! Keys live in two independent namespaces: whole-file identity (keyed by
//! canonical path) and in-container-entry identity (keyed by bare entry key
//! or `containerPath/entryKey`), because the same logical content can appear
//! under either. A content hash counts as baseline-identical when it matches
//! the unversioned key or any configured version-tagged variant
//! (`key#<tag>`), tried in order.
//!
//! # Cache format
//!
//! Little-endian: `PLCS` magic, `u16` format version, `u32` item count, then
//! per item a `u8` namespace tag (0 = file, 1 = entry), a nul-terminated key
//! string and a `u64` content hash. Loading hashes each key with XXH64
//! (seed 0), so lookups never allocate.

use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use camino::Utf8Path;
use std::collections::{BTreeMap, HashMap};
use std::io::{BufRead, BufWriter, Cursor, Write};
use xxhash_rust::xxh64::xxh64;

use crate::error::{Error, Result};

/// Cache file magic.
pub const INDEX_MAGIC: u32 = u32::from_le_bytes(*b"PLCS");
/// Current cache format version.
pub const INDEX_VERSION: u16 = 2;

const NS_FILE: u8 = 0;
const NS_ENTRY: u8 = 1;

/// Content hash of raw (decompressed, uncontainerized) bytes.
pub fn content_hash(bytes: &[u8]) -> u64 {
    xxh64(bytes, 0)
}

fn key_hash(key: &str) -> u64 {
    xxh64(key.as_bytes(), 0)
}

/// Immutable baseline-identity oracle. See the module docs for semantics.
pub struct ChecksumIndex {
    files: HashMap<u64, u64>,
    entries: HashMap<u64, u64>,
    versions: Vec<String>,
}

impl ChecksumIndex {
    /// Load the cache file, hashing keys into the two lookup namespaces.
    ///
    /// `versions` is the ordered list of target version tags tried by the
    /// `key#<tag>` fallback. Fails fatally on a missing file, wrong magic or
    /// unsupported format version.
    pub fn load(path: &Utf8Path, versions: Vec<String>) -> Result<Self> {
        if !path.as_std_path().is_file() {
            return Err(Error::ChecksumIndexMissing(path.to_owned()));
        }
        let data = std::fs::read(path.as_std_path())?;
        let mut reader = Cursor::new(data.as_slice());

        let magic = reader.read_u32::<LE>()?;
        if magic != INDEX_MAGIC {
            return Err(Error::InvalidIndexMagic(magic));
        }
        let version = reader.read_u16::<LE>()?;
        if version != INDEX_VERSION {
            return Err(Error::UnsupportedIndexVersion(version));
        }
        let count = reader.read_u32::<LE>()? as usize;

        let mut files = HashMap::new();
        let mut entries = HashMap::new();
        for item in 0..count {
            let namespace = reader.read_u8().map_err(|_| Error::IndexTruncated(item))?;
            let mut key = Vec::new();
            reader
                .read_until(0, &mut key)
                .map_err(|_| Error::IndexTruncated(item))?;
            if key.pop() != Some(0) {
                return Err(Error::IndexTruncated(item));
            }
            let key = std::str::from_utf8(&key).map_err(|_| Error::InvalidIndexKey(item))?;
            let value = reader.read_u64::<LE>().map_err(|_| Error::IndexTruncated(item))?;

            let target = if namespace == NS_FILE { &mut files } else { &mut entries };
            target.insert(key_hash(key), value);
        }

        tracing::info!(
            "Checksum index loaded: {} file keys, {} entry keys, {} version tags",
            files.len(),
            entries.len(),
            versions.len()
        );

        Ok(Self {
            files,
            entries,
            versions,
        })
    }

    /// Whether a whole file at `canonical` with this content hash is baseline-identical.
    pub fn is_baseline_file(&self, canonical: &str, hash: u64) -> bool {
        self.probe(&self.files, canonical, hash)
    }

    /// Whether a container entry under `key` with this content hash is baseline-identical.
    ///
    /// Callers try both the composite `containerPath/entryKey` and the bare
    /// entry key.
    pub fn is_baseline_entry(&self, key: &str, hash: u64) -> bool {
        self.probe(&self.entries, key, hash)
    }

    /// Whether the index knows `canonical` at all, regardless of content hash.
    ///
    /// Used to classify a container as "known baseline path" even when its
    /// current bytes differ.
    pub fn knows_file(&self, canonical: &str) -> bool {
        if self.files.contains_key(&key_hash(canonical)) {
            return true;
        }
        self.versions
            .iter()
            .any(|tag| self.files.contains_key(&key_hash(&format!("{canonical}#{tag}"))))
    }

    fn probe(&self, map: &HashMap<u64, u64>, key: &str, hash: u64) -> bool {
        if map.get(&key_hash(key)) == Some(&hash) {
            return true;
        }
        self.versions
            .iter()
            .any(|tag| map.get(&key_hash(&format!("{key}#{tag}"))) == Some(&hash))
    }
}

/// Accumulates `(namespace, key, hash)` triples while scanning a baseline
/// dump, then persists them as a cache file or builds an in-memory index.
#[derive(Debug, Default)]
pub struct ChecksumIndexBuilder {
    files: BTreeMap<String, u64>,
    entries: BTreeMap<String, u64>,
}

impl ChecksumIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a whole-file key. `key` may carry a `#<tag>` version suffix.
    pub fn add_file(&mut self, key: impl Into<String>, hash: u64) -> &mut Self {
        self.files.insert(key.into(), hash);
        self
    }

    /// Record an in-container-entry key (bare or composite).
    pub fn add_entry(&mut self, key: impl Into<String>, hash: u64) -> &mut Self {
        self.entries.insert(key.into(), hash);
        self
    }

    /// Write the cache file. Items are sorted for deterministic output.
    pub fn save(&self, path: &Utf8Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent.as_std_path())?;
        }
        let file = std::fs::File::create(path.as_std_path())?;
        let mut writer = BufWriter::new(file);

        writer.write_u32::<LE>(INDEX_MAGIC)?;
        writer.write_u16::<LE>(INDEX_VERSION)?;
        writer.write_u32::<LE>((self.files.len() + self.entries.len()) as u32)?;

        for (namespace, map) in [(NS_FILE, &self.files), (NS_ENTRY, &self.entries)] {
            for (key, value) in map {
                writer.write_u8(namespace)?;
                writer.write_all(key.as_bytes())?;
                writer.write_u8(0)?;
                writer.write_u64::<LE>(*value)?;
            }
        }
        writer.flush()?;

        tracing::info!(
            "Checksum index saved: {} ({} file keys, {} entry keys)",
            path,
            self.files.len(),
            self.entries.len()
        );
        Ok(())
    }

    /// Build an in-memory index directly, without touching disk.
    pub fn build(self, versions: Vec<String>) -> ChecksumIndex {
        ChecksumIndex {
            files: self.files.iter().map(|(k, &v)| (key_hash(k), v)).collect(),
            entries: self.entries.iter().map(|(k, &v)| (key_hash(k), v)).collect(),
            versions,
        }
    }
}
