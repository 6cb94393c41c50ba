//! SARC-style keyed archive codec.
//!
//! A [`Sarc`] is an in-memory mapping of entry name → raw bytes with a binary
//! wire form: a fixed header, a hash-sorted node table (SFAT), a name table
//! (SFNT) and an 8-aligned data region. Entry names are case-sensitive and
//! matched exactly; payloads are opaque to the codec.
//!
//! Decoding never interprets entry contents, and [`Sarc::decode`] followed by
//! [`Sarc::encode`] reproduces every entry. Enumeration order is insertion
//! order for archives built in memory, and node-table order for decoded ones.

pub mod error;
mod read;
mod write;

pub use error::{Result, SarcError};

use std::collections::HashMap;

pub(crate) const MAGIC: u32 = u32::from_le_bytes(*b"SARC");
pub(crate) const SFAT_MAGIC: u32 = u32::from_le_bytes(*b"SFAT");
pub(crate) const SFNT_MAGIC: u32 = u32::from_le_bytes(*b"SFNT");
pub(crate) const HEADER_SIZE: u16 = 0x14;
pub(crate) const SFAT_HEADER_SIZE: u16 = 0xC;
pub(crate) const SFNT_HEADER_SIZE: u16 = 0x8;
pub(crate) const NODE_SIZE: usize = 0x10;
pub(crate) const BOM_LE: u16 = 0xFEFF;
pub(crate) const VERSION: u16 = 0x0100;
pub(crate) const HASH_KEY: u32 = 0x65;
pub(crate) const DATA_ALIGN: usize = 8;

/// In-memory keyed archive.
///
/// Entries preserve their order; [`insert`](Self::insert) on an existing name
/// replaces the payload in place, [`remove`](Self::remove) shifts later
/// entries down.
#[derive(Debug, Default, Clone)]
pub struct Sarc {
    entries: Vec<(String, Vec<u8>)>,
    index: HashMap<String, usize>,
}

/// Multiplicative name hash used to sort the node table on encode.
pub(crate) fn hash_name(name: &str) -> u32 {
    name.bytes()
        .fold(0u32, |hash, byte| hash.wrapping_mul(HASH_KEY).wrapping_add(byte as u32))
}

impl Sarc {
    /// Create an empty archive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when the archive holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether an entry with this exact name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Borrow an entry's payload.
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.index.get(name).map(|&i| self.entries[i].1.as_slice())
    }

    /// Add a new entry or overwrite an existing one, preserving its position.
    pub fn insert(&mut self, name: impl Into<String>, data: Vec<u8>) {
        let name = name.into();
        match self.index.get(&name) {
            Some(&i) => self.entries[i].1 = data,
            None => {
                self.index.insert(name.clone(), self.entries.len());
                self.entries.push((name, data));
            }
        }
    }

    /// Remove an entry, returning its payload if it existed.
    pub fn remove(&mut self, name: &str) -> Option<Vec<u8>> {
        let i = self.index.remove(name)?;
        let (_, data) = self.entries.remove(i);
        for (_, slot) in self.index.iter_mut() {
            if *slot > i {
                *slot -= 1;
            }
        }
        Some(data)
    }

    /// Iterate entries as `(name, payload)` pairs in entry order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries.iter().map(|(n, d)| (n.as_str(), d.as_slice()))
    }

    /// Iterate entry names in entry order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub(crate) fn push_unchecked(&mut self, name: String, data: Vec<u8>) -> Result<()> {
        if self.index.contains_key(&name) {
            return Err(SarcError::DuplicateName(name));
        }
        self.index.insert(name.clone(), self.entries.len());
        self.entries.push((name, data));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Sarc {
        let mut sarc = Sarc::new();
        sarc.insert("Actor/A.bgyml", b"aaaa".to_vec());
        sarc.insert("Actor/B.bgyml", b"bb".to_vec());
        sarc.insert("Component/C.bin", vec![0u8, 1, 2, 3, 4, 5, 6]);
        sarc
    }

    #[test]
    fn test_insert_overwrites_in_place() {
        let mut sarc = sample();
        sarc.insert("Actor/A.bgyml", b"replaced".to_vec());

        assert_eq!(sarc.len(), 3);
        assert_eq!(sarc.get("Actor/A.bgyml"), Some(&b"replaced"[..]));
        // Position is unchanged
        assert_eq!(sarc.keys().next(), Some("Actor/A.bgyml"));
    }

    #[test]
    fn test_remove_shifts_later_entries() {
        let mut sarc = sample();
        let removed = sarc.remove("Actor/A.bgyml");

        assert_eq!(removed, Some(b"aaaa".to_vec()));
        assert_eq!(sarc.len(), 2);
        assert!(!sarc.contains("Actor/A.bgyml"));
        assert_eq!(sarc.get("Component/C.bin"), Some(&[0u8, 1, 2, 3, 4, 5, 6][..]));
    }

    #[test]
    fn test_roundtrip_reproduces_all_entries() {
        let sarc = sample();
        let encoded = sarc.encode();
        let decoded = Sarc::decode(&encoded).unwrap();

        assert_eq!(decoded.len(), sarc.len());
        for (name, data) in sarc.iter() {
            assert_eq!(decoded.get(name), Some(data), "entry '{name}' lost in round-trip");
        }
    }

    #[test]
    fn test_roundtrip_empty_archive() {
        let encoded = Sarc::new().encode();
        let decoded = Sarc::decode(&encoded).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_roundtrip_empty_payload() {
        let mut sarc = Sarc::new();
        sarc.insert("empty.bin", Vec::new());
        sarc.insert("full.bin", vec![0xFF; 13]);

        let decoded = Sarc::decode(&sarc.encode()).unwrap();
        assert_eq!(decoded.get("empty.bin"), Some(&[][..]));
        assert_eq!(decoded.get("full.bin"), Some(&[0xFF; 13][..]));
    }

    #[test]
    fn test_decode_rejects_bad_magic() {
        let mut encoded = sample().encode();
        encoded[0] = b'X';
        assert!(matches!(Sarc::decode(&encoded), Err(SarcError::InvalidMagic(_))));
    }

    #[test]
    fn test_decode_rejects_truncated_input() {
        let encoded = sample().encode();
        let err = Sarc::decode(&encoded[..encoded.len() - 4]);
        assert!(err.is_err());
    }

    #[test]
    fn test_decode_rejects_bad_version() {
        let mut encoded = sample().encode();
        // version field lives at offset 0x10
        encoded[0x10] = 0x02;
        assert!(matches!(
            Sarc::decode(&encoded),
            Err(SarcError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_hash_name_is_order_sensitive() {
        assert_ne!(hash_name("ab"), hash_name("ba"));
        assert_eq!(hash_name(""), 0);
    }
}
