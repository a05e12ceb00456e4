//! The FAT32 boot sector.
//!
//! Only the fields needed to locate the FAT and the data region are
//! interpreted; everything else is carried as opaque bytes. Field names
//! follow the FAT specification (`BPB_*` / `BS_*`).

use crate::structures::fat::constants::MIN_DATA_CLUSTER;

/// A FAT32 boot sector exactly as it appears on disk.
///
/// FAT12/FAT16 volumes share the first 36 bytes but diverge afterwards;
/// this struct uses the FAT32 extended layout and [`BootSectorInfo`]
/// rejects anything else.
#[repr(C, packed)]
#[derive(Clone, Copy, bytemuck::NoUninit, bytemuck::AnyBitPattern)]
pub struct RawBootSector {
    /// BS_jmpBoot
    pub jump: [u8; 3],
    /// BS_OEMName
    ///
    /// The name of the program that formatted the volume
    pub oem_name: [u8; 8],
    /// BPB_BytsPerSec
    ///
    /// Must be 512, 1024, 2048 or 4096
    pub bytes_per_sector: [u8; 2],
    /// BPB_SecPerClus
    ///
    /// Must be a power of two between 1 and 128
    pub sectors_per_cluster: u8,
    /// BPB_RsvdSecCnt
    ///
    /// Sectors before the first FAT, must be nonzero
    pub reserved_sector_count: [u8; 2],
    /// BPB_NumFATs
    ///
    /// 1 is acceptable, 2 is the norm
    pub fat_count: u8,
    /// BPB_RootEntCnt
    ///
    /// Root directory entries for FAT12/16, zero on FAT32
    pub root_entry_count: [u8; 2],
    /// BPB_TotSec16
    ///
    /// Zero on FAT32
    pub total_sectors_16: [u8; 2],
    /// BPB_Media
    pub media_type: u8,
    /// BPB_FATSz16
    ///
    /// Zero on FAT32, which uses the 32-bit field below
    pub sectors_per_fat_16: [u8; 2],
    /// BPB_SecPerTrk
    pub sectors_per_track: [u8; 2],
    /// BPB_NumHeads
    pub num_heads: [u8; 2],
    /// BPB_HiddSec
    pub hidden_sector_count: [u8; 4],
    /// BPB_TotSec32
    pub total_sectors_32: [u8; 4],
    /// BPB_FATSz32
    pub sectors_per_fat_32: [u8; 4],
    /// BPB_ExtFlags
    pub ext_flags: [u8; 2],
    /// BPB_FSVer
    pub version: [u8; 2],
    /// BPB_RootClus
    ///
    /// Cluster number of the root directory, normally 2
    pub root_cluster: [u8; 4],
    /// BPB_FSInfo
    pub fs_info_sector: [u8; 2],
    /// BPB_BkBootSec
    pub backup_boot_sector: [u8; 2],
    /// BPB_Reserved
    pub reserved: [u8; 12],
    /// BS_DrvNum
    pub drive_number: u8,
    /// BS_Reserved1
    pub reserved1: u8,
    /// BS_BootSig
    pub ext_boot_signature: u8,
    /// BS_VolID
    pub volume_id: [u8; 4],
    /// BS_VolLab
    pub volume_label: [u8; 11],
    /// BS_FilSysType
    pub fs_type: [u8; 8],
    /// Boot code, 420 bytes split so every field stays bytemuck-friendly
    pub boot_code_1: [u8; 256],
    pub boot_code_2: [u8; 128],
    pub boot_code_3: [u8; 32],
    pub boot_code_4: [u8; 4],
    /// Signature_word, 0xAA55
    pub signature_word: [u8; 2],
}

impl RawBootSector {
    /// Reinterprets a 512-byte sector. Panics if `bytes` is not exactly
    /// 512 bytes long.
    pub fn from_bytes(bytes: &[u8]) -> &RawBootSector {
        bytemuck::from_bytes(bytes)
    }

    pub fn from_bytes_mut(bytes: &mut [u8]) -> &mut RawBootSector {
        bytemuck::from_bytes_mut(bytes)
    }
}

/// Reasons a sector is rejected by [`BootSectorInfo::try_from`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BootSectorError {
    #[error("missing 0xAA55 signature word (found {0:#06x})")]
    MissingSignature(u16),
    #[error("unsupported bytes per sector {0}")]
    UnsupportedBytesPerSector(u16),
    #[error("unsupported sectors per cluster {0}")]
    UnsupportedSectorsPerCluster(u8),
    #[error("reserved sector count is zero")]
    NoReservedSectors,
    #[error("unsupported FAT count {0}")]
    UnsupportedFatCount(u8),
    #[error("volume is FAT12/FAT16, not FAT32")]
    NotFat32,
    #[error("total sector count is zero")]
    NoSectors,
}

/// The validated subset of the boot sector plus the derived geometry the
/// rest of the crate works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootSectorInfo {
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub reserved_sector_count: u16,
    pub fat_count: u8,
    pub sectors_per_fat: u32,
    pub total_sectors: u32,
    pub root_cluster: u32,
}

impl TryFrom<&RawBootSector> for BootSectorInfo {
    type Error = BootSectorError;

    fn try_from(raw: &RawBootSector) -> Result<Self, Self::Error> {
        let signature = u16::from_le_bytes(raw.signature_word);
        if signature != 0xAA55 {
            return Err(BootSectorError::MissingSignature(signature));
        }

        let bytes_per_sector = u16::from_le_bytes(raw.bytes_per_sector);
        if !matches!(bytes_per_sector, 512 | 1024 | 2048 | 4096) {
            return Err(BootSectorError::UnsupportedBytesPerSector(bytes_per_sector));
        }
        if !matches!(raw.sectors_per_cluster, 1 | 2 | 4 | 8 | 16 | 32 | 64 | 128) {
            return Err(BootSectorError::UnsupportedSectorsPerCluster(
                raw.sectors_per_cluster,
            ));
        }
        let reserved_sector_count = u16::from_le_bytes(raw.reserved_sector_count);
        if reserved_sector_count == 0 {
            return Err(BootSectorError::NoReservedSectors);
        }
        if !matches!(raw.fat_count, 1 | 2) {
            return Err(BootSectorError::UnsupportedFatCount(raw.fat_count));
        }

        // FAT-type determination per the FAT spec: a FAT32 volume has no
        // fixed root directory and keeps its FAT size in the 32-bit field.
        let sectors_per_fat = u32::from_le_bytes(raw.sectors_per_fat_32);
        if u16::from_le_bytes(raw.root_entry_count) != 0
            || u16::from_le_bytes(raw.sectors_per_fat_16) != 0
            || sectors_per_fat == 0
        {
            return Err(BootSectorError::NotFat32);
        }

        let total_sectors = u32::from_le_bytes(raw.total_sectors_32);
        if total_sectors == 0 {
            return Err(BootSectorError::NoSectors);
        }

        Ok(Self {
            bytes_per_sector,
            sectors_per_cluster: raw.sectors_per_cluster,
            reserved_sector_count,
            fat_count: raw.fat_count,
            sectors_per_fat,
            total_sectors,
            root_cluster: u32::from_le_bytes(raw.root_cluster),
        })
    }
}

impl BootSectorInfo {
    pub fn bytes_per_cluster(&self) -> usize {
        self.bytes_per_sector as usize * self.sectors_per_cluster as usize
    }

    /// Byte offset of the first (active) FAT.
    pub fn fat_byte_offset(&self) -> u64 {
        self.reserved_sector_count as u64 * self.bytes_per_sector as u64
    }

    /// Size in bytes of one FAT copy.
    pub fn fat_byte_len(&self) -> usize {
        self.sectors_per_fat as usize * self.bytes_per_sector as usize
    }

    /// Number of 32-bit entries in one FAT copy.
    pub fn fat_entry_count(&self) -> usize {
        self.fat_byte_len() / size_of::<u32>()
    }

    /// Byte offset of cluster 2, the start of the data region.
    pub fn first_data_byte_offset(&self) -> u64 {
        let data_sector = self.reserved_sector_count as u64
            + self.fat_count as u64 * self.sectors_per_fat as u64;
        data_sector * self.bytes_per_sector as u64
    }

    /// Number of clusters in the data region.
    pub fn data_cluster_count(&self) -> u32 {
        let data_sectors = self.total_sectors as u64
            - (self.reserved_sector_count as u64
                + self.fat_count as u64 * self.sectors_per_fat as u64);
        (data_sectors / self.sectors_per_cluster as u64) as u32
    }

    /// Highest cluster index that maps inside the data region.
    pub fn max_data_cluster(&self) -> u32 {
        MIN_DATA_CLUSTER + self.data_cluster_count() - 1
    }

    /// Byte offset of data cluster `n`.
    ///
    /// The caller must pass `n >= 2`; clusters 0 and 1 have no data.
    pub fn cluster_byte_offset(&self, n: u32) -> u64 {
        self.first_data_byte_offset()
            + (n as u64 - MIN_DATA_CLUSTER as u64) * self.bytes_per_cluster() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem::{align_of, offset_of};
    use static_assertions::const_assert_eq;

    const_assert_eq!(size_of::<RawBootSector>(), 512);
    const_assert_eq!(align_of::<RawBootSector>(), 1);

    // Field offsets pinned to the FAT specification
    const_assert_eq!(offset_of!(RawBootSector, jump), 0);
    const_assert_eq!(offset_of!(RawBootSector, oem_name), 3);
    const_assert_eq!(offset_of!(RawBootSector, bytes_per_sector), 11);
    const_assert_eq!(offset_of!(RawBootSector, sectors_per_cluster), 13);
    const_assert_eq!(offset_of!(RawBootSector, reserved_sector_count), 14);
    const_assert_eq!(offset_of!(RawBootSector, fat_count), 16);
    const_assert_eq!(offset_of!(RawBootSector, root_entry_count), 17);
    const_assert_eq!(offset_of!(RawBootSector, total_sectors_16), 19);
    const_assert_eq!(offset_of!(RawBootSector, media_type), 21);
    const_assert_eq!(offset_of!(RawBootSector, sectors_per_fat_16), 22);
    const_assert_eq!(offset_of!(RawBootSector, sectors_per_track), 24);
    const_assert_eq!(offset_of!(RawBootSector, num_heads), 26);
    const_assert_eq!(offset_of!(RawBootSector, hidden_sector_count), 28);
    const_assert_eq!(offset_of!(RawBootSector, total_sectors_32), 32);
    const_assert_eq!(offset_of!(RawBootSector, sectors_per_fat_32), 36);
    const_assert_eq!(offset_of!(RawBootSector, ext_flags), 40);
    const_assert_eq!(offset_of!(RawBootSector, version), 42);
    const_assert_eq!(offset_of!(RawBootSector, root_cluster), 44);
    const_assert_eq!(offset_of!(RawBootSector, fs_info_sector), 48);
    const_assert_eq!(offset_of!(RawBootSector, backup_boot_sector), 50);
    const_assert_eq!(offset_of!(RawBootSector, reserved), 52);
    const_assert_eq!(offset_of!(RawBootSector, drive_number), 64);
    const_assert_eq!(offset_of!(RawBootSector, reserved1), 65);
    const_assert_eq!(offset_of!(RawBootSector, ext_boot_signature), 66);
    const_assert_eq!(offset_of!(RawBootSector, volume_id), 67);
    const_assert_eq!(offset_of!(RawBootSector, volume_label), 71);
    const_assert_eq!(offset_of!(RawBootSector, fs_type), 82);
    const_assert_eq!(offset_of!(RawBootSector, boot_code_1), 90);
    const_assert_eq!(offset_of!(RawBootSector, signature_word), 510);

    /// Builds the boot sector a formatter would write for a small volume:
    /// 512-byte sectors, 8 sectors per cluster, 32 reserved sectors, two
    /// FATs of 16 sectors each, 16384 total sectors (8 MiB).
    fn sample_sector() -> [u8; 512] {
        let mut bytes = [0u8; 512];
        let raw = RawBootSector::from_bytes_mut(&mut bytes);
        raw.jump = [0xEB, 0x58, 0x90];
        raw.oem_name = *b"mkfs.fat";
        raw.bytes_per_sector = 512u16.to_le_bytes();
        raw.sectors_per_cluster = 8;
        raw.reserved_sector_count = 32u16.to_le_bytes();
        raw.fat_count = 2;
        raw.media_type = 0xF8;
        raw.total_sectors_32 = 16384u32.to_le_bytes();
        raw.sectors_per_fat_32 = 16u32.to_le_bytes();
        raw.root_cluster = 2u32.to_le_bytes();
        raw.fs_info_sector = 1u16.to_le_bytes();
        raw.backup_boot_sector = 6u16.to_le_bytes();
        raw.drive_number = 0x80;
        raw.ext_boot_signature = 0x29;
        raw.volume_label = *b"NO NAME    ";
        raw.fs_type = *b"FAT32   ";
        raw.signature_word = 0xAA55u16.to_le_bytes();
        bytes
    }

    #[test]
    fn parse_fat32_sector() {
        let bytes = sample_sector();
        let info = BootSectorInfo::try_from(RawBootSector::from_bytes(&bytes)).unwrap();
        assert_eq!(info.bytes_per_sector, 512);
        assert_eq!(info.sectors_per_cluster, 8);
        assert_eq!(info.bytes_per_cluster(), 4096);
        assert_eq!(info.fat_byte_offset(), 32 * 512);
        assert_eq!(info.fat_byte_len(), 16 * 512);
        assert_eq!(info.fat_entry_count(), 2048);
        assert_eq!(info.first_data_byte_offset(), (32 + 2 * 16) * 512);
        assert_eq!(info.data_cluster_count(), (16384 - 64) / 8);
        assert_eq!(info.root_cluster, 2);
    }

    #[test]
    fn cluster_byte_offsets() {
        let bytes = sample_sector();
        let info = BootSectorInfo::try_from(RawBootSector::from_bytes(&bytes)).unwrap();
        assert_eq!(info.cluster_byte_offset(2), info.first_data_byte_offset());
        assert_eq!(
            info.cluster_byte_offset(5),
            info.first_data_byte_offset() + 3 * 4096
        );
    }

    #[test]
    fn reject_missing_signature() {
        let mut bytes = sample_sector();
        bytes[510] = 0;
        assert_eq!(
            BootSectorInfo::try_from(RawBootSector::from_bytes(&bytes)),
            Err(BootSectorError::MissingSignature(0xAA00))
        );
    }

    #[test]
    fn reject_fat16_layout() {
        let mut bytes = sample_sector();
        {
            let raw = RawBootSector::from_bytes_mut(&mut bytes);
            raw.root_entry_count = 512u16.to_le_bytes();
            raw.sectors_per_fat_16 = 16u16.to_le_bytes();
            raw.sectors_per_fat_32 = 0u32.to_le_bytes();
        }
        assert_eq!(
            BootSectorInfo::try_from(RawBootSector::from_bytes(&bytes)),
            Err(BootSectorError::NotFat32)
        );
    }

    #[test]
    fn reject_bad_geometry() {
        let mut bytes = sample_sector();
        RawBootSector::from_bytes_mut(&mut bytes).sectors_per_cluster = 3;
        assert_eq!(
            BootSectorInfo::try_from(RawBootSector::from_bytes(&bytes)),
            Err(BootSectorError::UnsupportedSectorsPerCluster(3))
        );

        let mut bytes = sample_sector();
        RawBootSector::from_bytes_mut(&mut bytes).reserved_sector_count = [0, 0];
        assert_eq!(
            BootSectorInfo::try_from(RawBootSector::from_bytes(&bytes)),
            Err(BootSectorError::NoReservedSectors)
        );
    }
}
