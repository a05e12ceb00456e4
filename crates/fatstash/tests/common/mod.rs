//! Shared test fixtures: a minimal in-process FAT32 formatter.
//!
//! Tests need blank FAT32 images with known geometry; shelling out to a
//! platform formatter would make them environment-dependent. This writes
//! just enough of a volume for the crate to operate on: a valid boot
//! sector (plus backup), and FAT copies with clusters 0, 1 and the root
//! directory cluster marked allocated.

// Not every test binary uses every fixture
#![allow(dead_code)]

use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use fatstash::structures::boot_sector::RawBootSector;

pub const BYTES_PER_SECTOR: u16 = 512;
pub const RESERVED_SECTORS: u16 = 32;
pub const FAT_COUNT: u8 = 2;

/// Byte offset of the first FAT in images built by [`format_fat32`].
pub const FAT_BYTE_OFFSET: u64 = RESERVED_SECTORS as u64 * BYTES_PER_SECTOR as u64;

/// Formats `path` as a blank FAT32 volume of `total_bytes`.
pub fn format_fat32(path: &Path, total_bytes: u64, sectors_per_cluster: u8) {
    let total_sectors = (total_bytes / BYTES_PER_SECTOR as u64) as u32;

    // FAT sizing per the FAT spec pseudocode, always a slight overestimate
    let tmp1 = total_sectors - RESERVED_SECTORS as u32;
    let tmp2 = (256 * sectors_per_cluster as u32 + FAT_COUNT as u32) / 2;
    let sectors_per_fat = (tmp1 + tmp2 - 1) / tmp2;

    let mut sector = [0u8; 512];
    {
        let raw = RawBootSector::from_bytes_mut(&mut sector);
        raw.jump = [0xEB, 0x58, 0x90];
        raw.oem_name = *b"fatstash";
        raw.bytes_per_sector = BYTES_PER_SECTOR.to_le_bytes();
        raw.sectors_per_cluster = sectors_per_cluster;
        raw.reserved_sector_count = RESERVED_SECTORS.to_le_bytes();
        raw.fat_count = FAT_COUNT;
        raw.media_type = 0xF8;
        raw.total_sectors_32 = total_sectors.to_le_bytes();
        raw.sectors_per_fat_32 = sectors_per_fat.to_le_bytes();
        raw.root_cluster = 2u32.to_le_bytes();
        raw.fs_info_sector = 1u16.to_le_bytes();
        raw.backup_boot_sector = 6u16.to_le_bytes();
        raw.drive_number = 0x80;
        raw.ext_boot_signature = 0x29;
        raw.volume_label = *b"NO NAME    ";
        raw.fs_type = *b"FAT32   ";
        raw.signature_word = 0xAA55u16.to_le_bytes();
    }

    // Reserved entries 0 and 1, then the root directory as a one-cluster
    // end-of-chain; everything past that stays free
    let mut fat_head = [0u8; 12];
    fat_head[0..4].copy_from_slice(&0x0FFF_FFF8u32.to_le_bytes());
    fat_head[4..8].copy_from_slice(&0x0FFF_FFFFu32.to_le_bytes());
    fat_head[8..12].copy_from_slice(&0x0FFF_FFFFu32.to_le_bytes());

    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .unwrap();
    file.set_len(total_bytes).unwrap();

    file.seek(SeekFrom::Start(0)).unwrap();
    file.write_all(&sector).unwrap();
    file.seek(SeekFrom::Start(6 * BYTES_PER_SECTOR as u64)).unwrap();
    file.write_all(&sector).unwrap();

    for copy in 0..FAT_COUNT as u64 {
        let offset = FAT_BYTE_OFFSET
            + copy * sectors_per_fat as u64 * BYTES_PER_SECTOR as u64;
        file.seek(SeekFrom::Start(offset)).unwrap();
        file.write_all(&fat_head).unwrap();
    }
    file.flush().unwrap();
}

/// Marks `cluster` allocated in the first FAT copy, simulating the host
/// filesystem grabbing it for a file.
pub fn allocate_cluster(path: &Path, cluster: u32) {
    let mut file = OpenOptions::new().read(true).write(true).open(path).unwrap();
    file.seek(SeekFrom::Start(
        FAT_BYTE_OFFSET + cluster as u64 * size_of::<u32>() as u64,
    ))
    .unwrap();
    file.write_all(&0x0FFF_FFFFu32.to_le_bytes()).unwrap();
}

/// Flips one bit of the image at `offset`.
pub fn corrupt_byte(path: &Path, offset: u64) {
    use std::io::Read;
    let mut file = OpenOptions::new().read(true).write(true).open(path).unwrap();
    let mut byte = [0u8; 1];
    file.seek(SeekFrom::Start(offset)).unwrap();
    file.read_exact(&mut byte).unwrap();
    byte[0] ^= 0x01;
    file.seek(SeekFrom::Start(offset)).unwrap();
    file.write_all(&byte).unwrap();
}

/// A scratch file holding `len` random bytes; returns the file and its
/// contents.
pub fn random_payload(dir: &Path, len: usize) -> (std::path::PathBuf, Vec<u8>) {
    let data = fatstash::crypto::random_bytes(len);
    let path = dir.join(format!("payload-{len}"));
    std::fs::write(&path, &data).unwrap();
    (path, data)
}
