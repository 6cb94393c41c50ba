//! Archive decoding.

use byteorder::{ReadBytesExt, LE};
use std::io::Cursor;

use crate::error::{Result, SarcError};
use crate::{Sarc, BOM_LE, MAGIC, SFAT_MAGIC, SFNT_MAGIC, VERSION};

struct RawNode {
    attrs: u32,
    data_start: u32,
    data_end: u32,
}

impl Sarc {
    /// Decode an archive from its binary wire form.
    ///
    /// Validates the header magic, byte-order mark and version, then resolves
    /// every node's name through the name table and slices its payload out of
    /// the data region. Payload bytes are copied; the input can be dropped
    /// afterwards.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut reader = Cursor::new(data);

        let magic = reader.read_u32::<LE>()?;
        if magic != MAGIC {
            return Err(SarcError::InvalidMagic(magic));
        }
        let _header_size = reader.read_u16::<LE>()?;
        let bom = reader.read_u16::<LE>()?;
        if bom != BOM_LE {
            return Err(SarcError::InvalidByteOrderMark(bom));
        }
        let file_size = reader.read_u32::<LE>()? as usize;
        let data_offset = reader.read_u32::<LE>()? as usize;
        let version = reader.read_u16::<LE>()?;
        if version != VERSION {
            return Err(SarcError::UnsupportedVersion(version));
        }
        let _reserved = reader.read_u16::<LE>()?;

        if file_size > data.len() {
            return Err(SarcError::Truncated {
                need: file_size,
                have: data.len(),
            });
        }

        let sfat_magic = reader.read_u32::<LE>()?;
        if sfat_magic != SFAT_MAGIC {
            return Err(SarcError::InvalidMagic(sfat_magic));
        }
        let _sfat_header = reader.read_u16::<LE>()?;
        let node_count = reader.read_u16::<LE>()?;
        let _hash_key = reader.read_u32::<LE>()?;

        let mut nodes = Vec::with_capacity(node_count as usize);
        for _ in 0..node_count {
            let _name_hash = reader.read_u32::<LE>()?;
            let attrs = reader.read_u32::<LE>()?;
            let data_start = reader.read_u32::<LE>()?;
            let data_end = reader.read_u32::<LE>()?;
            nodes.push(RawNode {
                attrs,
                data_start,
                data_end,
            });
        }

        let sfnt_magic = reader.read_u32::<LE>()?;
        if sfnt_magic != SFNT_MAGIC {
            return Err(SarcError::InvalidMagic(sfnt_magic));
        }
        let _sfnt_header = reader.read_u16::<LE>()?;
        let _sfnt_reserved = reader.read_u16::<LE>()?;

        let names_start = reader.position() as usize;
        if data_offset > data.len() || names_start > data_offset {
            return Err(SarcError::Truncated {
                need: data_offset.max(names_start),
                have: data.len(),
            });
        }
        let names = &data[names_start..data_offset];

        let mut sarc = Sarc::new();
        for node in &nodes {
            let name_offset = ((node.attrs & 0x00FF_FFFF) as usize) * 4;
            let name = read_name(names, name_offset)?;

            let start = data_offset + node.data_start as usize;
            let end = data_offset + node.data_end as usize;
            if node.data_start > node.data_end || end > data.len() {
                return Err(SarcError::DataOutOfRange(name));
            }

            sarc.push_unchecked(name, data[start..end].to_vec())?;
        }

        Ok(sarc)
    }
}

/// Read a nul-terminated UTF-8 name at `offset` within the name table.
fn read_name(names: &[u8], offset: usize) -> Result<String> {
    let slice = names
        .get(offset..)
        .ok_or(SarcError::InvalidName(offset))?;
    let end = slice
        .iter()
        .position(|&b| b == 0)
        .ok_or(SarcError::InvalidName(offset))?;
    std::str::from_utf8(&slice[..end])
        .map(str::to_owned)
        .map_err(|_| SarcError::InvalidName(offset))
}
