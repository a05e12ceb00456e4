//! The crypto envelope around a slug, plus the random material the codec
//! and `bleach` consume.
//!
//! The primitives are fixed by the on-disk format and deliberately plain:
//! AES-256-CBC with an all-zero IV and a key that is the bare SHA-256 of
//! the passphrase. The slug's 17-byte random prefix keeps equal payloads
//! from producing equal ciphertexts despite the fixed IV. Changing any of
//! this breaks every image written by earlier builds.

use aes::cipher::{block_padding::NoPadding, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::{Rng, RngCore};
use sha2::{Digest, Sha256};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

pub const KEY_BYTES: usize = 32;
const BLOCK_BYTES: usize = 16;
const ZERO_IV: [u8; BLOCK_BYTES] = [0u8; BLOCK_BYTES];

/// Characters of `token_urlsafe` output, the URL-safe base64 alphabet.
const URLSAFE_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// Derives the AES key as SHA-256 of the UTF-8 passphrase. No salt, no
/// stretching; see the module docs.
pub fn derive_key(passphrase: &str) -> [u8; KEY_BYTES] {
    Sha256::digest(passphrase.as_bytes()).into()
}

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Encrypts a slug in one shot.
///
/// `data` must be a multiple of the AES block size, which every slug is:
/// slugs are cluster aligned and cluster sizes are multiples of 16.
pub fn encrypt(data: &[u8], key: &[u8; KEY_BYTES]) -> Vec<u8> {
    assert_eq!(data.len() % BLOCK_BYTES, 0, "slug must be block aligned");
    Aes256CbcEnc::new(key.into(), (&ZERO_IV).into())
        .encrypt_padded_vec_mut::<NoPadding>(data)
}

/// Inverse of [`encrypt`]. Also decrypts any cluster-aligned prefix of a
/// ciphertext to the matching plaintext prefix, which the two-phase read
/// relies on.
pub fn decrypt(data: &[u8], key: &[u8; KEY_BYTES]) -> Vec<u8> {
    assert_eq!(data.len() % BLOCK_BYTES, 0, "slug must be block aligned");
    Aes256CbcDec::new(key.into(), (&ZERO_IV).into())
        .decrypt_padded_vec_mut::<NoPadding>(data)
        .expect("length is block aligned")
}

/// `len` bytes from the process CSPRNG.
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rand::rng().fill_bytes(&mut bytes);
    bytes
}

/// A random URL-safe string of exactly `len` characters.
pub fn token_urlsafe(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| URLSAFE_ALPHABET[rng.random_range(0..URLSAFE_ALPHABET.len())] as char)
        .collect()
}
