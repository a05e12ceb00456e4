//! The File Allocation Table, cached in memory as one `u32` per cluster.

pub mod constants {
    /// Entry value of an unallocated cluster.
    pub const FAT32_CLUSTER_FREE: u32 = 0x0000_0000;
    /// Entry value of a cluster marked bad by the formatter.
    pub const FAT32_CLUSTER_BAD: u32 = 0x0FFF_FFF7;
    /// FAT32 entries are 28 bits; the top nibble is reserved and must be
    /// ignored when reading.
    pub const FAT32_ENTRY_MASK: u32 = 0x0FFF_FFFF;
    /// First cluster index that maps into the data region. Entries 0 and 1
    /// hold the media descriptor and the end-of-chain mirror.
    pub const MIN_DATA_CLUSTER: u32 = 2;
}

/// One FAT copy, parsed from its on-disk little-endian form.
#[derive(Debug, Clone)]
pub struct Fat32 {
    entries: Vec<u32>,
}

impl Fat32 {
    /// Parses the raw FAT region. Trailing bytes that do not fill a whole
    /// entry are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let entries = bytes
            .chunks_exact(size_of::<u32>())
            .map(|chunk| {
                u32::from_le_bytes(chunk.try_into().unwrap()) & constants::FAT32_ENTRY_MASK
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The masked entry for `cluster`. Panics if `cluster` is outside the
    /// table.
    pub fn entry(&self, cluster: u32) -> u32 {
        self.entries[cluster as usize]
    }

    pub fn last(&self) -> Option<u32> {
        self.entries.last().copied()
    }
}
