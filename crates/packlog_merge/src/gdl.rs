//! GameDataList structural tables and their changelog format.
//!
//! A GameDataList variant file is a flat `name -> u64` table (magic `GDLT`).
//! Instead of shipping whole modified tables, a mod's changelog carries only
//! the structural difference against the vanilla table: entries set to a new
//! value and entries removed (magic `GDCL`). Applying the same changelog to
//! every physically-versioned variant keeps them consistent.
//!
//! Both formats are little-endian: magic, `u16` format version, counts, then
//! nul-terminated names with `u64` values. An empty changelog is represented
//! as zero bytes, which callers read as "no changes".

use byteorder::{ReadBytesExt, LE};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{BufRead, Cursor};
use thiserror::Error;

/// Magic of a variant table file.
pub const TABLE_MAGIC: u32 = u32::from_le_bytes(*b"GDLT");
/// Magic of a changelog artifact.
pub const CHANGELOG_MAGIC: u32 = u32::from_le_bytes(*b"GDCL");
/// Current format version of both formats.
pub const FORMAT_VERSION: u16 = 1;

/// Errors for malformed tables or changelogs.
#[derive(Error, Debug)]
pub enum GdlError {
    #[error("table truncated")]
    Truncated,

    #[error("invalid magic: {0:#010x}")]
    InvalidMagic(u32),

    #[error("unsupported format version: {0}")]
    UnsupportedVersion(u16),

    #[error("invalid entry name")]
    InvalidName,
}

type Result<T> = std::result::Result<T, GdlError>;

/// A decoded variant table.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GdlTable {
    pub entries: BTreeMap<String, u64>,
}

impl GdlTable {
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut reader = Cursor::new(data);
        expect_header(&mut reader, TABLE_MAGIC)?;
        let count = reader.read_u32::<LE>().map_err(|_| GdlError::Truncated)?;

        let mut entries = BTreeMap::new();
        for _ in 0..count {
            let name = read_name(&mut reader)?;
            let value = reader.read_u64::<LE>().map_err(|_| GdlError::Truncated)?;
            entries.insert(name, value);
        }
        Ok(Self { entries })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&TABLE_MAGIC.to_le_bytes());
        out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        out.extend_from_slice(&(self.entries.len() as u32).to_le_bytes());
        for (name, value) in &self.entries {
            out.extend_from_slice(name.as_bytes());
            out.push(0);
            out.extend_from_slice(&value.to_le_bytes());
        }
        out
    }
}

/// A decoded structural changelog: entries to set, entries to remove.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GdlChangelog {
    pub set: BTreeMap<String, u64>,
    pub removed: BTreeSet<String>,
}

impl GdlChangelog {
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.removed.is_empty()
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut reader = Cursor::new(data);
        expect_header(&mut reader, CHANGELOG_MAGIC)?;
        let set_count = reader.read_u32::<LE>().map_err(|_| GdlError::Truncated)?;
        let removed_count = reader.read_u32::<LE>().map_err(|_| GdlError::Truncated)?;

        let mut set = BTreeMap::new();
        for _ in 0..set_count {
            let name = read_name(&mut reader)?;
            let value = reader.read_u64::<LE>().map_err(|_| GdlError::Truncated)?;
            set.insert(name, value);
        }
        let mut removed = BTreeSet::new();
        for _ in 0..removed_count {
            removed.insert(read_name(&mut reader)?);
        }
        Ok(Self { set, removed })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&CHANGELOG_MAGIC.to_le_bytes());
        out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        out.extend_from_slice(&(self.set.len() as u32).to_le_bytes());
        out.extend_from_slice(&(self.removed.len() as u32).to_le_bytes());
        for (name, value) in &self.set {
            out.extend_from_slice(name.as_bytes());
            out.push(0);
            out.extend_from_slice(&value.to_le_bytes());
        }
        for name in &self.removed {
            out.extend_from_slice(name.as_bytes());
            out.push(0);
        }
        out
    }
}

fn expect_header(reader: &mut Cursor<&[u8]>, expected_magic: u32) -> Result<()> {
    let magic = reader.read_u32::<LE>().map_err(|_| GdlError::Truncated)?;
    if magic != expected_magic {
        return Err(GdlError::InvalidMagic(magic));
    }
    let version = reader.read_u16::<LE>().map_err(|_| GdlError::Truncated)?;
    if version != FORMAT_VERSION {
        return Err(GdlError::UnsupportedVersion(version));
    }
    Ok(())
}

fn read_name(reader: &mut Cursor<&[u8]>) -> Result<String> {
    let mut raw = Vec::new();
    reader.read_until(0, &mut raw).map_err(|_| GdlError::Truncated)?;
    if raw.pop() != Some(0) {
        return Err(GdlError::Truncated);
    }
    String::from_utf8(raw).map_err(|_| GdlError::InvalidName)
}

/// Compute the structural changelog of `modded` against `vanilla`.
///
/// Returns zero bytes when the tables are identical.
pub fn changelog(vanilla: &[u8], modded: &[u8]) -> Result<Vec<u8>> {
    let vanilla = GdlTable::decode(vanilla)?;
    let modded = GdlTable::decode(modded)?;

    let mut log = GdlChangelog::default();
    for (name, value) in &modded.entries {
        if vanilla.entries.get(name) != Some(value) {
            log.set.insert(name.clone(), *value);
        }
    }
    for name in vanilla.entries.keys() {
        if !modded.entries.contains_key(name) {
            log.removed.insert(name.clone());
        }
    }

    if log.is_empty() {
        Ok(Vec::new())
    } else {
        Ok(log.encode())
    }
}

/// Apply a changelog to a variant table, returning the new table bytes.
///
/// Zero-byte changelogs leave the table untouched.
pub fn merge(changelog: &[u8], table: &[u8]) -> Result<Vec<u8>> {
    if changelog.is_empty() {
        return Ok(table.to_vec());
    }
    let log = GdlChangelog::decode(changelog)?;
    let mut table = GdlTable::decode(table)?;

    for (name, value) in &log.set {
        table.entries.insert(name.clone(), *value);
    }
    for name in &log.removed {
        table.entries.remove(name);
    }
    Ok(table.encode())
}
