//! Category-keyed zstd compression boundary.
//!
//! Assets are compressed with one of three dictionaries depending on what the
//! file is: container framing ([`Category::Pack`]), map units
//! ([`Category::Map`], triggered by the `bcett` filename substring) or
//! everything else ([`Category::Generic`]). The category must be symmetric
//! between compress and decompress for round-trip correctness, so both sides
//! derive it from the same name via [`Category::for_name`].

use std::io::{Read, Write};

use crate::canonical;
use crate::error::{Error, Result};

/// Default compression level used when writing changelog and merge output.
pub const DEFAULT_LEVEL: i32 = 16;

/// Dictionary category for a compressed asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Default dictionary for flat assets.
    Generic,
    /// Container framing dictionary (`pack`/`sarc` archives).
    Pack,
    /// Map-unit dictionary, selected by the `bcett` filename substring.
    Map,
}

impl Category {
    /// Pick the category for an asset name (canonical path or file name).
    ///
    /// The `.zs` suffix is ignored, so compressed and decompressed names
    /// resolve identically.
    pub fn for_name(name: &str) -> Self {
        let file_name = canonical::file_name(name);
        let stem = file_name.strip_suffix(canonical::ZS_SUFFIX).unwrap_or(file_name);

        if stem.contains("bcett") {
            return Category::Map;
        }
        match canonical::extension(stem).as_deref() {
            Some("pack") | Some("sarc") => Category::Pack,
            _ => Category::Generic,
        }
    }
}

/// Zstd backend holding one raw dictionary per category.
///
/// Immutable after construction; shared across worker threads without
/// synchronization. An empty dictionary produces plain zstd frames, which is
/// what [`plain`](Self::plain) relies on.
pub struct ZstdBackend {
    level: i32,
    generic: Vec<u8>,
    pack: Vec<u8>,
    map: Vec<u8>,
}

impl ZstdBackend {
    /// Backend with the given per-category dictionaries.
    pub fn from_parts(generic: Vec<u8>, pack: Vec<u8>, map: Vec<u8>, level: i32) -> Self {
        Self {
            level,
            generic,
            pack,
            map,
        }
    }

    /// Dictionary-less backend. Frames it produces are plain zstd.
    pub fn plain() -> Self {
        Self::from_parts(Vec::new(), Vec::new(), Vec::new(), DEFAULT_LEVEL)
    }

    fn dictionary(&self, category: Category) -> &[u8] {
        match category {
            Category::Generic => &self.generic,
            Category::Pack => &self.pack,
            Category::Map => &self.map,
        }
    }

    /// Compress `data` with the dictionary for `category`.
    pub fn compress(&self, data: &[u8], category: Category) -> Result<Vec<u8>> {
        let mut encoder =
            zstd::stream::write::Encoder::with_dictionary(Vec::new(), self.level, self.dictionary(category))
                .map_err(|e| Error::Compression(e.to_string()))?;
        encoder
            .write_all(data)
            .map_err(|e| Error::Compression(e.to_string()))?;
        encoder.finish().map_err(|e| Error::Compression(e.to_string()))
    }

    /// Decompress `data` with the dictionary for `category`.
    pub fn decompress(&self, data: &[u8], category: Category) -> Result<Vec<u8>> {
        let mut decoder = zstd::stream::read::Decoder::with_dictionary(data, self.dictionary(category))
            .map_err(|e| Error::Compression(e.to_string()))?;
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|e| Error::Compression(e.to_string()))?;
        Ok(out)
    }
}
