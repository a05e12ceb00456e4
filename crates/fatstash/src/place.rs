//! Mapping a slug onto the free-cluster list.
//!
//! A slug of `K` cluster-sized blocks lands on the first `K` entries of
//! the enumeration from [`FatVolume::free_clusters`]; reading walks the
//! same entries in the same order. Nothing on the volume records the
//! placement, so both sides must enumerate over an unchanged FAT.

use crate::crypto;
use crate::fs::FatVolume;
use crate::structures::slug;
use crate::StashError;

/// Writes an encrypted slug block-by-block onto the free list.
pub fn write_slug(
    vol: &mut FatVolume,
    free_list: &[u32],
    slug_bytes: &[u8],
) -> Result<(), StashError> {
    let bytes_per_cluster = vol.bytes_per_cluster();
    debug_assert_eq!(slug_bytes.len() % bytes_per_cluster, 0);

    let blocks = slug_bytes.chunks(bytes_per_cluster);
    if blocks.len() > free_list.len() {
        return Err(StashError::InsufficientFreeSpace {
            needed: blocks.len(),
            available: free_list.len(),
        });
    }
    for (i, block) in blocks.enumerate() {
        tracing::trace!(cluster = free_list[i], index = i, "writing slug block");
        vol.write_cluster(free_list[i], block)?;
    }
    Ok(())
}

/// Reads the first `clusters` entries of the free list back as one
/// contiguous byte stream.
pub fn read_slug(
    vol: &mut FatVolume,
    clusters: usize,
    free_list: &[u32],
) -> Result<Vec<u8>, StashError> {
    if clusters > free_list.len() {
        return Err(StashError::Truncated {
            needed: clusters,
            available: free_list.len(),
        });
    }
    let mut slug_bytes = Vec::with_capacity(clusters * vol.bytes_per_cluster());
    for &cluster in &free_list[..clusters] {
        slug_bytes.extend_from_slice(&vol.read_cluster(cluster)?);
    }
    Ok(slug_bytes)
}

/// The two-phase read behind `get` and `check`.
///
/// The span of a slug is not known up front, so the first free cluster is
/// read and decrypted alone; its header names the full cluster count, and
/// the whole span is then re-read and re-decrypted. Decrypting a prefix
/// is sound because CBC decryption of a prefix equals the prefix of the
/// decryption.
pub fn read_full_slug(
    vol: &mut FatVolume,
    key: &[u8; crypto::KEY_BYTES],
    offset: i64,
) -> Result<Vec<u8>, StashError> {
    let free_list = vol.free_clusters(offset);

    let first_cipher = read_slug(vol, 1, &free_list)?;
    let first_clear = crypto::decrypt(&first_cipher, key);
    let header = slug::extract_header(&first_clear)?;
    tracing::debug!(
        clusters = header.clusters,
        length = header.length,
        "recovered slug header"
    );

    let cipher = if header.clusters > 1 {
        read_slug(vol, header.clusters as usize, &free_list)?
    } else {
        first_cipher
    };
    Ok(crypto::decrypt(&cipher, key))
}
