//! A library for hiding a single encrypted payload in the unallocated
//! clusters of a FAT32 image.
//!
//! The host filesystem never sees a file: the payload is packed into a
//! self-describing, cluster-aligned container (a *slug*), encrypted with a
//! passphrase-derived key, and written directly into whatever data clusters
//! the FAT currently marks as free. Recovery only needs the image, the
//! passphrase, and the placement offset used at write time — the order of
//! free clusters in the FAT is the only index.
//!
//! The four user-visible operations live in [`ops`]:
//!
//! - [`ops::put`] embeds a file
//! - [`ops::get`] recovers it
//! - [`ops::check`] verifies that it is recoverable
//! - [`ops::bleach`] overwrites every free cluster with random bytes
//!
//! The free-cluster order is stable only while the FAT is unchanged. Any
//! write to the host filesystem between `put` and `get` may shift the
//! sequence and silently destroy the payload; the volume must not be
//! mounted elsewhere while an operation runs.

use std::path::PathBuf;

pub mod crypto;
pub mod fs;
pub mod ops;
pub mod place;
pub mod structures;

pub use fs::FatVolume;
pub use ops::{bleach, check, get, info, put, VolumeInfo};
pub use structures::boot_sector::BootSectorError;

/// Errors that can occur while embedding or recovering a payload
#[derive(Debug, thiserror::Error)]
pub enum StashError {
    /// The image path does not exist
    #[error("image {} does not exist", .0.display())]
    ImageMissing(PathBuf),

    /// The boot sector could not be parsed as FAT32
    #[error("failed to parse image as FAT32")]
    ImageParse(#[from] BootSectorError),

    /// The file to embed does not exist
    #[error("source file {} does not exist", .0.display())]
    SourceMissing(PathBuf),

    /// The slug needs more clusters than the enumeration yields
    #[error("slug needs {needed} clusters but only {available} are free")]
    InsufficientFreeSpace { needed: usize, available: usize },

    /// The decrypted first cluster holds no parseable header, which
    /// usually means a wrong passphrase or no stored slug at all
    #[error("no valid slug header (wrong passphrase or nothing stored)")]
    InvalidHeader,

    /// The header parsed but the payload hash does not match
    #[error("payload hash does not match slug header")]
    IntegrityFailed,

    /// An I/O error on a single cluster write
    #[error("failed to write cluster {cluster}")]
    ClusterWriteFailed {
        cluster: u32,
        #[source]
        source: std::io::Error,
    },

    /// The slug claims more clusters than the free list can supply
    #[error("slug spans {needed} clusters but only {available} are readable")]
    Truncated { needed: usize, available: usize },

    /// Any other I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
