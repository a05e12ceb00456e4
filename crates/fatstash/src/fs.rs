//! Read and write access to a FAT32 image.
//!
//! [`FatVolume`] parses the boot sector, caches the whole active FAT in
//! memory, and addresses raw data clusters by number. It never touches
//! directory entries and never writes the FAT: the filesystem's own view
//! of the volume stays untouched.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::structures::boot_sector::{BootSectorInfo, RawBootSector};
use crate::structures::fat::constants::{
    FAT32_CLUSTER_BAD, FAT32_CLUSTER_FREE, MIN_DATA_CLUSTER,
};
use crate::structures::fat::Fat32;
use crate::StashError;

/// An open FAT32 image.
#[derive(Debug)]
pub struct FatVolume {
    file: File,
    info: BootSectorInfo,
    fat: Fat32,
    image_len: u64,
}

impl FatVolume {
    /// Opens an image read-only, for `get`, `check` and `info`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StashError> {
        Self::open_with(path.as_ref(), false)
    }

    /// Opens an image read-write, for `put` and `bleach`.
    pub fn open_rw<P: AsRef<Path>>(path: P) -> Result<Self, StashError> {
        Self::open_with(path.as_ref(), true)
    }

    fn open_with(path: &Path, writable: bool) -> Result<Self, StashError> {
        if !path.exists() {
            return Err(StashError::ImageMissing(path.to_path_buf()));
        }
        let mut file = OpenOptions::new().read(true).write(writable).open(path)?;
        let image_len = file.seek(SeekFrom::End(0))?;

        let mut sector = [0u8; 512];
        file.seek(SeekFrom::Start(0))?;
        file.read_exact(&mut sector)?;
        let info = BootSectorInfo::try_from(RawBootSector::from_bytes(&sector))?;

        let mut fat_bytes = vec![0u8; info.fat_byte_len()];
        file.seek(SeekFrom::Start(info.fat_byte_offset()))?;
        file.read_exact(&mut fat_bytes)?;
        let fat = Fat32::from_bytes(&fat_bytes);

        tracing::trace!(
            path = %path.display(),
            bytes_per_cluster = info.bytes_per_cluster(),
            fat_entries = fat.len(),
            writable,
            "opened FAT32 image"
        );
        Ok(Self {
            file,
            info,
            fat,
            image_len,
        })
    }

    pub fn info(&self) -> &BootSectorInfo {
        &self.info
    }

    pub fn fat(&self) -> &Fat32 {
        &self.fat
    }

    /// The masked FAT entry for `cluster`.
    pub fn fat_entry(&self, cluster: u32) -> u32 {
        self.fat.entry(cluster)
    }

    pub fn bytes_per_cluster(&self) -> usize {
        self.info.bytes_per_cluster()
    }

    pub fn image_len(&self) -> u64 {
        self.image_len
    }

    pub fn cluster_byte_offset(&self, cluster: u32) -> u64 {
        self.info.cluster_byte_offset(cluster)
    }

    /// Reads one whole cluster.
    pub fn read_cluster(&mut self, cluster: u32) -> Result<Vec<u8>, StashError> {
        let mut data = vec![0u8; self.bytes_per_cluster()];
        self.file
            .seek(SeekFrom::Start(self.cluster_byte_offset(cluster)))?;
        self.file.read_exact(&mut data)?;
        Ok(data)
    }

    /// Writes one whole cluster. `data` must be exactly one cluster long.
    ///
    /// I/O failures come back as [`StashError::ClusterWriteFailed`];
    /// `put` aborts on them while `bleach` logs and keeps going.
    pub fn write_cluster(&mut self, cluster: u32, data: &[u8]) -> Result<(), StashError> {
        assert_eq!(data.len(), self.bytes_per_cluster());
        let offset = self.cluster_byte_offset(cluster);
        self.file
            .seek(SeekFrom::Start(offset))
            .and_then(|_| self.file.write_all(data))
            .map_err(|source| StashError::ClusterWriteFailed { cluster, source })
    }

    /// Enumerates free data clusters in the canonical placement order.
    ///
    /// The base order is an ascending FAT scan that keeps a cluster when
    /// its entry is free, its index lies in the valid data range and is
    /// not the bad-cluster sentinel, and the whole cluster fits below the
    /// end of the image; the scan stops outright at the first cluster
    /// whose bytes would reach past the last safe byte. A negative
    /// `offset` reverses the order; a magnitude above one drops that many
    /// leading entries (minus one) from the result.
    ///
    /// The order is stable for as long as the FAT itself is unchanged,
    /// which is what lets `put` and `get` agree on placement without any
    /// on-disk index.
    pub fn free_clusters(&self, offset: i64) -> Vec<u32> {
        let last_safe_byte = self.image_len.saturating_sub(self.bytes_per_cluster() as u64);
        let max_data_cluster = self.info.max_data_cluster();

        let mut clusters = Vec::new();
        for i in 0..self.fat.len() as u32 {
            if i < MIN_DATA_CLUSTER || i > max_data_cluster {
                continue;
            }
            if self.cluster_byte_offset(i) >= last_safe_byte {
                break;
            }
            if self.fat_entry(i) != FAT32_CLUSTER_FREE {
                continue;
            }
            if i == FAT32_CLUSTER_BAD {
                continue;
            }
            clusters.push(i);
        }

        if offset < 0 {
            clusters.reverse();
        }
        let skip = offset.unsigned_abs() as usize;
        if skip > 1 {
            clusters.drain(..(skip - 1).min(clusters.len()));
        }
        clusters
    }
}
