//! Protocol constants and nonce hashing shared by every participant.

use blsct_primitives::{
    group::{Scalar, G1},
    hash, Sha256,
};

/// Message signed by every balance signature. Used verbatim, byte-for-byte, by all implementations.
pub const BALANCE_MESSAGE: &[u8] = b"BLSCTBALANCE";

/// Domain separation prefix for sub-address derivation.
pub const SUB_ADDRESS_HEADER: &[u8] = b"SubAddress\0";

/// Transaction version marking a confidential transaction.
pub const BLSCT_MARKER: u32 = 1 << 5;

/// Base units per coin.
pub const COIN: u64 = 100_000_000;

/// Largest amount valid anywhere on the ledger.
pub const MAX_MONEY: u64 = 250_000_000 * COIN;

/// Salt of the one-time spend key offset.
pub const SALT_SPENDING: u64 = 0;

/// Salt of the first value commitment blinding factor. Value `j` uses `SALT_GAMMA + j`.
pub const SALT_GAMMA: u64 = 100;

/// Returns whether `value` is a valid ledger amount under `max`.
pub fn money_range(value: u64, max: u64) -> bool {
    value <= max
}

/// Derives a scalar from a shared secret point and a salt: `SHA256(P || salt_le) mod r`.
pub fn hash_with_salt(point: &G1, salt: u64) -> Scalar {
    let digest = Sha256::new()
        .update(&point.to_bytes())
        .update(&salt.to_le_bytes())
        .finalize();
    Scalar::map(&digest)
}

/// Short scanning hint derived from the shared secret.
pub fn view_tag(nonce: &G1) -> u16 {
    (hash(&nonce.to_bytes()).low_u64() & 0xffff) as u16
}
