//! The slug: a self-describing, cluster-aligned payload container.
//!
//! Layout of a slug before encryption:
//!
//! ```text
//! offset  length               content
//! 0       17                   random prefix, ignored on read
//! 17      up to 1007           ASCII JSON header, sorted keys
//! 1024    header.length        payload, verbatim
//! ...     pad to cluster end   random bytes
//! ```
//!
//! The header's `argle`/`zargle` nonces sit at the alphabetical extremes so
//! sorted-key serialization frames the object with them, and `zzpadding` is
//! sized so prefix plus JSON fill the first 1024 bytes exactly. Random
//! prefix and random tail padding make two slugs of the same payload
//! bit-different and hide the payload boundary inside the ciphertext.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::crypto;
use crate::StashError;

/// Size of the header region, random prefix included.
pub const SLUG_HEADER_BYTES: usize = 1024;
/// Size of the opaque random prefix ahead of the JSON.
pub const RANDOM_PREFIX_BYTES: usize = 17;
/// Length of the `argle` / `zargle` framing nonces.
pub const NONCE_CHARS: usize = 64;

/// The slug header.
///
/// Field order is the serialization order, so it must stay alphabetical;
/// serde writes struct fields in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlugHeader {
    /// Random nonce sorting ahead of every real key.
    pub argle: String,
    /// Total number of clusters the slug occupies.
    pub clusters: u32,
    /// Exact payload length in bytes.
    pub length: u64,
    /// Lowercase hex SHA-256 of the payload.
    pub sha256hash: String,
    /// Random nonce sorting behind every real key.
    pub zargle: String,
    /// Filler sized so prefix + JSON is exactly [`SLUG_HEADER_BYTES`].
    pub zzpadding: String,
}

impl SlugHeader {
    /// A header with fresh nonces and zeroed counts.
    pub fn blank() -> Self {
        Self {
            argle: crypto::token_urlsafe(NONCE_CHARS),
            clusters: 0,
            length: 0,
            sha256hash: String::new(),
            zargle: crypto::token_urlsafe(NONCE_CHARS),
            zzpadding: String::new(),
        }
    }

    /// Serializes the header into the fixed 1024-byte region, sizing
    /// `zzpadding` (in place, so a later parse compares equal to `self`)
    /// to land on the boundary exactly.
    pub fn header_bytes(&mut self) -> Vec<u8> {
        self.zzpadding = String::new();
        let bare_len = serde_json::to_string(self)
            .expect("header serialization cannot fail")
            .len();
        assert!(
            bare_len + RANDOM_PREFIX_BYTES <= SLUG_HEADER_BYTES,
            "slug header does not fit its region"
        );
        self.zzpadding = crypto::token_urlsafe(SLUG_HEADER_BYTES - RANDOM_PREFIX_BYTES - bare_len);

        let json = serde_json::to_string(self).expect("header serialization cannot fail");
        let mut bytes = crypto::random_bytes(RANDOM_PREFIX_BYTES);
        bytes.extend_from_slice(json.as_bytes());
        debug_assert_eq!(bytes.len(), SLUG_HEADER_BYTES);
        bytes
    }
}

/// Parses the header out of the fixed region of a decrypted slug.
///
/// Any JSON failure maps to [`StashError::InvalidHeader`]: with a wrong
/// passphrase the decrypted region is uniform noise and this is the point
/// where that surfaces.
pub fn extract_header(slug: &[u8]) -> Result<SlugHeader, StashError> {
    if slug.len() < SLUG_HEADER_BYTES {
        return Err(StashError::InvalidHeader);
    }
    serde_json::from_slice(&slug[RANDOM_PREFIX_BYTES..SLUG_HEADER_BYTES])
        .map_err(|_| StashError::InvalidHeader)
}

/// Builds a slug around the contents of `src`, padded out to a multiple of
/// `cluster_size`.
pub fn make_slug(src: &Path, cluster_size: usize) -> Result<Vec<u8>, StashError> {
    if !src.exists() {
        return Err(StashError::SourceMissing(src.to_path_buf()));
    }
    let data = std::fs::read(src)?;

    let mut header = SlugHeader::blank();
    header.clusters = (SLUG_HEADER_BYTES + data.len()).div_ceil(cluster_size) as u32;
    header.length = data.len() as u64;
    header.sha256hash = crypto::sha256_hex(&data);

    let mut slug = header.header_bytes();
    slug.extend_from_slice(&data);
    Ok(pad_slug(slug, cluster_size))
}

/// Writes the payload region to `dst`.
///
/// Deliberately does not check the payload hash, so a payload whose tail
/// clusters were clobbered can still be partially recovered; run
/// [`verify`] first when assurance matters.
pub fn extract_payload(slug: &[u8], dst: &Path) -> Result<(), StashError> {
    let header = extract_header(slug)?;
    let end = (SLUG_HEADER_BYTES as u64 + header.length).min(slug.len() as u64) as usize;
    std::fs::write(dst, &slug[SLUG_HEADER_BYTES..end])?;
    Ok(())
}

/// Checks that the header parses and the payload hash matches.
pub fn verify(slug: &[u8]) -> Result<(), StashError> {
    let header = extract_header(slug)?;
    let end = (SLUG_HEADER_BYTES as u64 + header.length).min(slug.len() as u64) as usize;
    if header.sha256hash != crypto::sha256_hex(&slug[SLUG_HEADER_BYTES..end]) {
        return Err(StashError::IntegrityFailed);
    }
    Ok(())
}

/// Pads with random bytes up to the next `cluster_size` boundary.
fn pad_slug(mut slug: Vec<u8>, cluster_size: usize) -> Vec<u8> {
    let excess = slug.len() % cluster_size;
    if excess != 0 {
        slug.extend_from_slice(&crypto::random_bytes(cluster_size - excess));
    }
    slug
}
