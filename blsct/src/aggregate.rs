//! Merging independently built transactions.

use crate::{
    common::BLSCT_MARKER,
    transaction::{TokenId, Transaction, TxOut, TX_VERSION},
    Error,
};
use blsct_primitives::signature;
use tracing::debug;

/// Merges `txs` into one transaction.
///
/// Inputs and non-fee outputs are concatenated in order, fee outputs are summed into a single
/// fee output appended last, and signatures are aggregated. Nothing is re-signed: every component
/// keeps the message it was signed over, and balance signatures add up because they all sign the
/// same message.
///
/// Fails with [Error::MismatchedFeeTokens] if fee outputs pay different tokens and with
/// [Error::OutOfRange] if the fee total overflows.
pub fn aggregate_transactions(txs: &[Transaction]) -> Result<Transaction, Error> {
    let mut inputs = Vec::new();
    let mut outputs = Vec::new();
    let mut fee: u64 = 0;
    let mut fee_token: Option<TokenId> = None;
    for tx in txs {
        inputs.extend(tx.inputs.iter().cloned());
        for out in &tx.outputs {
            if !out.is_fee() {
                outputs.push(out.clone());
                continue;
            }
            match fee_token {
                Some(token) if token != out.token_id => return Err(Error::MismatchedFeeTokens),
                _ => fee_token = Some(out.token_id),
            }
            fee = fee.checked_add(out.value).ok_or(Error::OutOfRange)?;
        }
    }
    outputs.push(TxOut::fee(fee, fee_token.unwrap_or_default()));

    let signature = signature::aggregate(txs.iter().map(|tx| &tx.signature));
    debug!(
        txs = txs.len(),
        inputs = inputs.len(),
        outputs = outputs.len(),
        fee,
        "aggregated transactions"
    );
    Ok(Transaction {
        version: TX_VERSION | BLSCT_MARKER,
        inputs,
        outputs,
        signature,
    })
}
