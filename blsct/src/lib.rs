//! Confidential transactions over BLS12-381.
//!
//! Amounts are hidden in Pedersen commitments proven in range with Bulletproofs, recipients are
//! hidden behind one-time stealth keys, and value conservation rides on BLS signature aggregation:
//! every output signs a fixed balance message with its negated blinding factor, so a transaction
//! balances exactly when the sum of its commitments is a valid public key for that message.
//!
//! # Overview
//!
//! - [keygen]: EIP-2333 hierarchical derivation of private scalars from a seed.
//! - [keys]: private keys, public keys, and view/spend key pairs.
//! - [address]: stealth sub-address derivation and the destination text codec.
//! - [range_proof]: aggregated, rewindable Bulletproofs range proofs.
//! - [output]: one-time confidential output construction.
//! - [aggregate]: merging independently built transactions.
//! - [verification]: the balance and ownership predicate.
//! - [wallet]: key management, output recovery, and transaction building.
//!
//! # Status
//!
//! `blsct` is **ALPHA** software and is not yet recommended for production use. Developers should
//! expect breaking changes and occasional instability.

use blsct_primitives::codec::Error as CodecError;
use thiserror::Error;

pub mod address;
pub mod aggregate;
pub mod common;
pub mod keygen;
pub mod keys;
pub mod ledger;
pub mod output;
pub mod range_proof;
pub mod transaction;
pub mod verification;
pub mod wallet;

pub use address::{Destination, SubAddress, SubAddressIdentifier};
pub use keys::{DoublePublicKey, PrivateKey, PublicKey};
pub use output::{create_output, UnsignedOutput};
pub use transaction::{OutPoint, TokenId, Transaction, TxIn, TxOut};
pub use verification::verify_tx;

/// Errors that can occur when building or checking confidential transactions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid encoding: {0}")]
    InvalidEncoding(#[from] CodecError),
    #[error("invalid key")]
    InvalidKey,
    #[error("out of range")]
    OutOfRange,
    #[error("missing input")]
    MissingInput,
    #[error("duplicate input")]
    DuplicateInput,
    #[error("multiple fee outputs")]
    MultipleFees,
    #[error("range proof failure")]
    ProofFailure,
    #[error("signature failure")]
    SignatureFailure,
    #[error("arithmetic invariant violated: {0}")]
    ArithmeticInvariantViolation(&'static str),
    #[error("seed too short: {0} < 32 bytes")]
    SeedTooShort(usize),
    #[error("memo too long: {0} bytes")]
    MemoTooLong(usize),
    #[error("too many values: {0}")]
    TooManyValues(usize),
    #[error("spendable plain output with nonzero value")]
    SpendablePlainOutput,
    #[error("confidential output with nonzero plain value")]
    ConfidentialValue,
    #[error("mismatched fee tokens")]
    MismatchedFeeTokens,
    #[error("insufficient funds: need {need}, have {have}")]
    InsufficientFunds { need: u64, have: u64 },
    #[error("output not owned by wallet")]
    UnknownOutput,
}
