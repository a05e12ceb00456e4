//! The user-visible operations: `put`, `get`, `check`, `bleach`, `info`.

use std::path::Path;

use crate::crypto;
use crate::fs::FatVolume;
use crate::place;
use crate::structures::slug;
use crate::StashError;

/// Embeds `src` into the free clusters of `image`, starting at the given
/// placement offset.
pub fn put<P: AsRef<Path>, Q: AsRef<Path>>(
    image: P,
    src: Q,
    passphrase: &str,
    offset: i64,
) -> Result<(), StashError> {
    let key = crypto::derive_key(passphrase);
    let mut vol = FatVolume::open_rw(image)?;

    let free_list = vol.free_clusters(offset);
    let slug_bytes = slug::make_slug(src.as_ref(), vol.bytes_per_cluster())?;
    tracing::debug!(
        bytes = slug_bytes.len(),
        clusters = slug_bytes.len() / vol.bytes_per_cluster(),
        offset,
        "built slug"
    );

    let cipher = crypto::encrypt(&slug_bytes, &key);
    place::write_slug(&mut vol, &free_list, &cipher)
}

/// Recovers the payload stored in `image` into `dst`.
///
/// Succeeds whenever the header parses; the payload hash is deliberately
/// not checked here so that a partially clobbered payload can still be
/// pulled out. Run [`check`] first for assurance.
pub fn get<P: AsRef<Path>, Q: AsRef<Path>>(
    image: P,
    dst: Q,
    passphrase: &str,
    offset: i64,
) -> Result<(), StashError> {
    let key = crypto::derive_key(passphrase);
    let mut vol = FatVolume::open(image)?;
    let full_slug = place::read_full_slug(&mut vol, &key, offset)?;
    slug::extract_payload(&full_slug, dst.as_ref())
}

/// Verifies that the payload in `image` is recoverable and intact.
///
/// `Ok(false)` covers both a failed header parse (wrong passphrase, or
/// nothing stored) and a payload hash mismatch; environmental failures
/// (missing image, bad boot sector, I/O errors) stay errors.
pub fn check<P: AsRef<Path>>(image: P, passphrase: &str, offset: i64) -> Result<bool, StashError> {
    let key = crypto::derive_key(passphrase);
    let mut vol = FatVolume::open(image)?;
    let full_slug = match place::read_full_slug(&mut vol, &key, offset) {
        Ok(slug_bytes) => slug_bytes,
        Err(StashError::InvalidHeader) => return Ok(false),
        Err(e) => return Err(e),
    };
    match slug::verify(&full_slug) {
        Ok(()) => Ok(true),
        Err(StashError::InvalidHeader) | Err(StashError::IntegrityFailed) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Overwrites every free cluster with fresh random bytes, erasing any
/// stored slug and any stale plaintext the host filesystem left behind.
///
/// Best-effort: a cluster that fails to write is logged and skipped.
/// `on_progress` is called before each cluster with `(done, total)`.
/// Returns the number of clusters processed.
pub fn bleach<P: AsRef<Path>>(
    image: P,
    mut on_progress: impl FnMut(usize, usize),
) -> Result<usize, StashError> {
    let mut vol = FatVolume::open_rw(image)?;
    let free_list = vol.free_clusters(1);
    let bytes_per_cluster = vol.bytes_per_cluster();

    let total = free_list.len();
    for (done, &cluster) in free_list.iter().enumerate() {
        on_progress(done, total);
        if let Err(e) = vol.write_cluster(cluster, &crypto::random_bytes(bytes_per_cluster)) {
            tracing::warn!(cluster, error = %e, "skipping unwritable cluster");
        }
    }
    tracing::debug!(clusters = total, "bleached free clusters");
    Ok(total)
}

/// A geometry and free-space summary of an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeInfo {
    pub bytes_per_cluster: usize,
    pub fat_entries: usize,
    pub last_fat_entry: Option<u32>,
    pub data_clusters: u32,
    pub free_clusters: usize,
    pub image_len: u64,
}

/// Collects [`VolumeInfo`] for `image`.
pub fn info<P: AsRef<Path>>(image: P) -> Result<VolumeInfo, StashError> {
    let vol = FatVolume::open(image)?;
    Ok(VolumeInfo {
        bytes_per_cluster: vol.bytes_per_cluster(),
        fat_entries: vol.fat().len(),
        last_fat_entry: vol.fat().last(),
        data_clusters: vol.info().data_cluster_count(),
        free_clusters: vol.free_clusters(1).len(),
        image_len: vol.image_len(),
    })
}
