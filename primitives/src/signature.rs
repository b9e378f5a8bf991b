//! BLS signatures with G1 public keys (48 bytes) and G2 signatures (96 bytes).
//!
//! # Domain Separation Tag (DST)
//!
//! Messages are hashed to G2 with the basic scheme tag `BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_NUL_`.
//! No proof of possession is required by callers of [verify_batch]: every public key it checks is
//! either a one-time key bound to the message it signs or a commitment sum bound to a fixed message.

use crate::group::{pairing_product_is_one, Scalar, DST_G2, G1, G2};
use rayon::{prelude::*, ThreadPoolBuilder};
use thiserror::Error;

/// An aggregate-able BLS signature.
pub type Signature = G2;

/// Errors that can occur when verifying signatures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("identity public key")]
    IdentityPublicKey,
}

/// Computes the public key from the private key.
pub fn compute_public(private: &Scalar) -> G1 {
    G1::generator() * *private
}

/// Hashes the provided message to G2.
pub fn hash_message(message: &[u8]) -> G2 {
    G2::hash(DST_G2, message)
}

/// Signs the provided message with the private key.
pub fn sign(private: &Scalar, message: &[u8]) -> Signature {
    hash_message(message) * *private
}

/// Verifies a single signature.
pub fn verify(public: &G1, message: &[u8], signature: &Signature) -> Result<(), Error> {
    if public.is_zero() {
        return Err(Error::IdentityPublicKey);
    }
    let hm = hash_message(message);
    if !pairing_product_is_one(&[(-G1::generator(), *signature), (*public, hm)]) {
        return Err(Error::InvalidSignature);
    }
    Ok(())
}

/// Aggregates multiple signatures.
///
/// Aggregation is associative and commutative, so signatures may be combined in any order and
/// any grouping.
pub fn aggregate<'a, I>(signatures: I) -> Signature
where
    I: IntoIterator<Item = &'a Signature>,
{
    let mut s = Signature::zero();
    for sig in signatures {
        s += *sig;
    }
    s
}

/// Verifies an aggregate signature over a set of `(public key, message)` pairs with a single
/// multi-pairing.
///
/// Hashing messages to the curve dominates the cost of this function and is spread over
/// `concurrency` threads.
///
/// # Warning
///
/// Public keys are not required to be distinct, but the caller must ensure no public key is
/// attacker-chosen as a function of another key in the same set unless it is bound to a
/// message only its owner could sign.
pub fn verify_batch(
    pairs: &[(G1, Vec<u8>)],
    signature: &Signature,
    concurrency: usize,
) -> Result<(), Error> {
    let hash = |(public, message): &(G1, Vec<u8>)| (*public, hash_message(message));
    let mut hashed: Vec<(G1, G2)> = if concurrency <= 1 {
        // Avoid pool overhead when concurrency is 1
        pairs.iter().map(hash).collect()
    } else {
        // Build a thread pool with the specified concurrency
        let pool = ThreadPoolBuilder::new()
            .num_threads(concurrency)
            .build()
            .expect("Unable to build thread pool");

        // Perform hashing to curve in parallel
        pool.install(|| pairs.par_iter().map(hash).collect())
    };
    hashed.push((-G1::generator(), *signature));

    if !pairing_product_is_one(&hashed) {
        return Err(Error::InvalidSignature);
    }
    Ok(())
}
