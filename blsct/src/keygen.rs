//! Hierarchical derivation of BLS12-381 private keys from a seed (EIP-2333).
//!
//! Every function is pure: identical inputs yield identical outputs across implementations, so a
//! wallet restored from the same seed reproduces the same key tree.
//!
//! # Example
//!
//! ```rust
//! use blsct::keygen::{derive_child_sk, derive_master_sk};
//!
//! let seed = [7u8; 32];
//! let master = derive_master_sk(&seed).unwrap();
//! let child = derive_child_sk(&master, 0);
//! assert_eq!(child, derive_child_sk(&master, 0));
//! ```

use crate::Error;
use blsct_primitives::{group::Scalar, sha256::DIGEST_LENGTH, Sha256};
use hkdf::Hkdf;
use sha2::Sha256 as HkdfHash;

/// Number of chunks in a lamport secret set.
pub const LAMPORT_CHUNKS: usize = 255;

/// Length of each lamport chunk.
pub const CHUNK_SIZE: usize = DIGEST_LENGTH;

/// Length of a lamport secret set before splitting.
pub const LAMPORT_LENGTH: usize = LAMPORT_CHUNKS * CHUNK_SIZE;

/// Minimum seed length accepted by [derive_master_sk].
pub const MIN_SEED_LENGTH: usize = 32;

/// Bytes of output keying material reduced to a scalar (`ceil((3 * ceil(log2(r))) / 16)`).
const HKDF_MOD_R_LENGTH: usize = 48;

/// Initial salt of [hkdf_mod_r].
const KEYGEN_SALT: &[u8] = b"BLS-SIG-KEYGEN-SALT-";

/// Encodes `value` as a big-endian string of exactly `length` bytes.
///
/// Fails with [Error::OutOfRange] if `length` is zero or `value >= 256^length`.
pub fn i2osp(value: &Scalar, length: usize) -> Result<Vec<u8>, Error> {
    if length == 0 {
        return Err(Error::OutOfRange);
    }
    let bytes = value.to_bytes();
    if length >= bytes.len() {
        let mut out = vec![0u8; length - bytes.len()];
        out.extend_from_slice(&bytes);
        return Ok(out);
    }
    let (high, low) = bytes.split_at(bytes.len() - length);
    if high.iter().any(|b| *b != 0) {
        return Err(Error::OutOfRange);
    }
    Ok(low.to_vec())
}

/// Interprets `bytes` as a big-endian integer reduced modulo the group order.
pub fn os2ip(bytes: &[u8]) -> Scalar {
    Scalar::map(bytes)
}

/// HKDF-Extract with SHA-256.
pub fn hkdf_extract(salt: &[u8], ikm: &[u8]) -> [u8; DIGEST_LENGTH] {
    let (prk, _) = Hkdf::<HkdfHash>::extract(Some(salt), ikm);
    prk.into()
}

/// HKDF-Expand with SHA-256, producing `N` bytes.
///
/// # Panics
///
/// Panics if `N` exceeds `255 * 32`.
pub fn hkdf_expand<const N: usize>(prk: &[u8; DIGEST_LENGTH], info: &[u8]) -> [u8; N] {
    let hk = Hkdf::<HkdfHash>::from_prk(prk).expect("PRK is exactly one digest");
    let mut okm = [0u8; N];
    hk.expand(info, &mut okm)
        .expect("HKDF output too long");
    okm
}

/// Byte-wise one's complement.
pub fn flip_bits(buffer: &[u8; DIGEST_LENGTH]) -> [u8; DIGEST_LENGTH] {
    let mut out = *buffer;
    for b in out.iter_mut() {
        *b ^= 0xff;
    }
    out
}

/// Splits a lamport secret set into its chunks.
///
/// Fails with [Error::OutOfRange] unless `buffer` is exactly `255 * 32` bytes.
pub fn bytes_split(buffer: &[u8]) -> Result<Vec<[u8; CHUNK_SIZE]>, Error> {
    if buffer.len() != LAMPORT_LENGTH {
        return Err(Error::OutOfRange);
    }
    Ok(buffer
        .chunks_exact(CHUNK_SIZE)
        .map(|chunk| {
            let mut out = [0u8; CHUNK_SIZE];
            out.copy_from_slice(chunk);
            out
        })
        .collect())
}

/// Derives a non-zero scalar from keying material.
fn hkdf_mod_r(ikm: &[u8], key_info: &[u8]) -> Scalar {
    // IKM || I2OSP(0, 1)
    let mut material = Vec::with_capacity(ikm.len() + 1);
    material.extend_from_slice(ikm);
    material.push(0);

    // key_info || I2OSP(L, 2)
    let mut info = Vec::with_capacity(key_info.len() + 2);
    info.extend_from_slice(key_info);
    info.extend_from_slice(&(HKDF_MOD_R_LENGTH as u16).to_be_bytes());

    let mut salt = KEYGEN_SALT.to_vec();
    loop {
        salt = Sha256::new().update(&salt).finalize().to_vec();
        let prk = hkdf_extract(&salt, &material);
        let okm = hkdf_expand::<HKDF_MOD_R_LENGTH>(&prk, &info);
        let sk = os2ip(&okm);
        if !sk.is_zero() {
            return sk;
        }
    }
}

/// Derives a lamport secret set from `ikm`, salted by the child index.
fn ikm_to_lamport_sk(ikm: &[u8; DIGEST_LENGTH], salt: &[u8]) -> Vec<[u8; CHUNK_SIZE]> {
    let prk = hkdf_extract(salt, ikm);
    let okm = hkdf_expand::<LAMPORT_LENGTH>(&prk, b"");
    bytes_split(&okm).expect("lamport output has a fixed length")
}

/// Compresses the lamport public key derived from `parent` for child `index`.
pub fn parent_sk_to_lamport_pk(parent: &Scalar, index: u32) -> [u8; DIGEST_LENGTH] {
    let salt = index.to_be_bytes();
    let ikm = parent.to_bytes();
    let lamport_0 = ikm_to_lamport_sk(&ikm, &salt);
    let lamport_1 = ikm_to_lamport_sk(&flip_bits(&ikm), &salt);

    let mut hasher = Sha256::new();
    let mut chunk_hasher = Sha256::new();
    for chunk in lamport_0.iter().chain(lamport_1.iter()) {
        hasher.update(&chunk_hasher.update(chunk).finalize());
    }
    let mut compressed = [0u8; DIGEST_LENGTH];
    compressed.copy_from_slice(&hasher.finalize());
    compressed
}

/// Derives child `index` of `parent`.
pub fn derive_child_sk(parent: &Scalar, index: u32) -> Scalar {
    let compressed = parent_sk_to_lamport_pk(parent, index);
    hkdf_mod_r(&compressed, b"")
}

/// Derives the root of the key tree from `seed`.
///
/// Fails with [Error::SeedTooShort] if `seed` is shorter than 32 bytes.
pub fn derive_master_sk(seed: &[u8]) -> Result<Scalar, Error> {
    if seed.len() < MIN_SEED_LENGTH {
        return Err(Error::SeedTooShort(seed.len()));
    }
    Ok(hkdf_mod_r(seed, b""))
}
