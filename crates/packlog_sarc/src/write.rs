//! Archive encoding.

use crate::{
    hash_name, Sarc, BOM_LE, DATA_ALIGN, HASH_KEY, HEADER_SIZE, MAGIC, NODE_SIZE,
    SFAT_HEADER_SIZE, SFAT_MAGIC, SFNT_HEADER_SIZE, SFNT_MAGIC, VERSION,
};

fn align_up(value: usize, alignment: usize) -> usize {
    value.div_ceil(alignment) * alignment
}

impl Sarc {
    /// Encode the archive into its binary wire form.
    ///
    /// Nodes are written sorted by name hash (ties broken by name), names are
    /// 4-aligned in the name table and payloads are 8-aligned in the data
    /// region. Encoding cannot fail.
    pub fn encode(&self) -> Vec<u8> {
        // Node table order is hash-sorted regardless of entry order.
        let mut order: Vec<usize> = (0..self.entries.len()).collect();
        order.sort_by(|&a, &b| {
            let (na, nb) = (&self.entries[a].0, &self.entries[b].0);
            hash_name(na).cmp(&hash_name(nb)).then_with(|| na.cmp(nb))
        });

        // Name table: nul-terminated, each name padded to a 4-byte boundary.
        let mut name_offsets = Vec::with_capacity(order.len());
        let mut names = Vec::new();
        for &i in &order {
            name_offsets.push(names.len());
            names.extend_from_slice(self.entries[i].0.as_bytes());
            names.push(0);
            while names.len() % 4 != 0 {
                names.push(0);
            }
        }

        let fixed = HEADER_SIZE as usize
            + SFAT_HEADER_SIZE as usize
            + order.len() * NODE_SIZE
            + SFNT_HEADER_SIZE as usize;
        let data_offset = align_up(fixed + names.len(), DATA_ALIGN);

        // Data region: payloads in node order, each 8-aligned.
        let mut ranges = Vec::with_capacity(order.len());
        let mut data = Vec::new();
        for &i in &order {
            let start = align_up(data.len(), DATA_ALIGN);
            data.resize(start, 0);
            data.extend_from_slice(&self.entries[i].1);
            ranges.push((start as u32, data.len() as u32));
        }

        let file_size = data_offset + data.len();
        let mut out = Vec::with_capacity(file_size);

        out.extend_from_slice(&MAGIC.to_le_bytes());
        out.extend_from_slice(&HEADER_SIZE.to_le_bytes());
        out.extend_from_slice(&BOM_LE.to_le_bytes());
        out.extend_from_slice(&(file_size as u32).to_le_bytes());
        out.extend_from_slice(&(data_offset as u32).to_le_bytes());
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());

        out.extend_from_slice(&SFAT_MAGIC.to_le_bytes());
        out.extend_from_slice(&SFAT_HEADER_SIZE.to_le_bytes());
        out.extend_from_slice(&(order.len() as u16).to_le_bytes());
        out.extend_from_slice(&HASH_KEY.to_le_bytes());

        for (slot, &i) in order.iter().enumerate() {
            let (start, end) = ranges[slot];
            out.extend_from_slice(&hash_name(&self.entries[i].0).to_le_bytes());
            let attrs = 0x0100_0000 | (name_offsets[slot] / 4) as u32;
            out.extend_from_slice(&attrs.to_le_bytes());
            out.extend_from_slice(&start.to_le_bytes());
            out.extend_from_slice(&end.to_le_bytes());
        }

        out.extend_from_slice(&SFNT_MAGIC.to_le_bytes());
        out.extend_from_slice(&SFNT_HEADER_SIZE.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&names);

        out.resize(data_offset, 0);
        out.extend_from_slice(&data);

        out
    }
}
