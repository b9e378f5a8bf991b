//! The balance and ownership predicate.
//!
//! A transaction is valid when one aggregate signature verifies over:
//!
//! - each spent coin's one-time spending key, on the hash of the input spending it,
//! - each confidential output's ephemeral key, on the hash of that output,
//! - the balance key, on [BALANCE_MESSAGE],
//!
//! and every confidential output's range proof verifies. The balance key is
//!
//! ```text
//! reward*H + sum(V_in) - sum(V_out) - fee*H_fee
//! ```
//!
//! which is `(sum(gamma_in) - sum(gamma_out))*G` exactly when values balance. Only then can the
//! signers, who know the gammas, have produced a valid balance signature.

use crate::{
    common::{money_range, BALANCE_MESSAGE, MAX_MONEY},
    ledger::CoinsView,
    range_proof::{self, value_generator, RangeProof},
    transaction::{TokenId, Transaction},
    Error,
};
use blsct_primitives::{
    group::{Scalar, G1},
    signature,
};
use rand::{CryptoRng, RngCore};
use std::collections::HashSet;
use tracing::debug;

/// Configuration for [verify_tx].
#[derive(Clone, Debug)]
pub struct Config {
    /// Largest valid plain amount (fees and rewards).
    pub max_money: u64,

    /// Number of threads used to hash signed messages.
    pub concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_money: MAX_MONEY,
            concurrency: 1,
        }
    }
}

/// Returns whether `tx` is valid against `view`, optionally minting `block_reward` of the
/// native token.
///
/// The reason for a rejection is logged at `debug` and otherwise not exposed; use [check_tx]
/// to obtain it.
pub fn verify_tx<R: RngCore + CryptoRng, V: CoinsView>(
    rng: &mut R,
    cfg: &Config,
    tx: &Transaction,
    view: &V,
    block_reward: u64,
) -> bool {
    match check_tx(rng, cfg, tx, view, block_reward) {
        Ok(()) => true,
        Err(err) => {
            debug!(?err, tx = %tx.hash(), "rejected transaction");
            false
        }
    }
}

/// Like [verify_tx], but returns the first reason for rejection.
///
/// A transaction listing the same outpoint twice fails with [Error::DuplicateInput]. Confidential
/// outputs carry their value in the commitment and must leave the plain value at zero.
pub fn check_tx<R: RngCore + CryptoRng, V: CoinsView>(
    rng: &mut R,
    cfg: &Config,
    tx: &Transaction,
    view: &V,
    block_reward: u64,
) -> Result<(), Error> {
    if !view.have_inputs(tx) {
        return Err(Error::MissingInput);
    }
    if !money_range(block_reward, cfg.max_money) {
        return Err(Error::OutOfRange);
    }
    let mut spent = HashSet::with_capacity(tx.inputs.len());
    if !tx.inputs.iter().all(|input| spent.insert(input.prevout)) {
        return Err(Error::DuplicateInput);
    }

    let mut pairs: Vec<(G1, Vec<u8>)> = Vec::with_capacity(tx.inputs.len() + tx.outputs.len() + 1);
    let mut proofs: Vec<(&RangeProof, TokenId)> = Vec::with_capacity(tx.outputs.len());
    let mut balance = G1::zero();
    if block_reward > 0 {
        balance = value_generator(&TokenId::default()) * Scalar::from_u64(block_reward);
    }

    // Inputs prove ownership of the spent coin and contribute its commitment
    if !tx.is_coinbase() {
        for input in &tx.inputs {
            let coin = view.coin(&input.prevout).ok_or(Error::MissingInput)?;
            let data = coin.out.blsct_data.as_ref().ok_or(Error::InvalidKey)?;
            pairs.push((data.spending_key.point()?, input.hash().to_vec()));
            balance += data.commitment().ok_or(Error::ProofFailure)?;
        }
    }

    // Outputs commit to their content and subtract their value
    let mut fee = 0;
    for out in &tx.outputs {
        if let Some(data) = &out.blsct_data {
            if out.value != 0 {
                return Err(Error::ConfidentialValue);
            }
            pairs.push((data.ephemeral_key.point()?, out.hash().to_vec()));
            balance -= data.commitment().ok_or(Error::ProofFailure)?;
            proofs.push((&data.range_proof, out.token_id));
            continue;
        }
        if !out.script_pubkey.is_unspendable() && out.value > 0 {
            return Err(Error::SpendablePlainOutput);
        }
        if !money_range(out.value, cfg.max_money) {
            return Err(Error::OutOfRange);
        }
        if out.value == 0 {
            continue;
        }
        if fee > 0 {
            return Err(Error::MultipleFees);
        }
        fee = out.value;
        balance -= value_generator(&out.token_id) * Scalar::from_u64(fee);
    }
    pairs.push((balance, BALANCE_MESSAGE.to_vec()));

    signature::verify_batch(&pairs, &tx.signature, cfg.concurrency)
        .map_err(|_| Error::SignatureFailure)?;
    range_proof::verify(rng, &proofs)
}
