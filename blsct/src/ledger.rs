//! Read access to unspent outputs.

use crate::transaction::{OutPoint, Transaction, TxOut};
use std::collections::HashMap;

/// An unspent output and the height of the block that created it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Coin {
    pub out: TxOut,
    pub height: u32,
}

/// A consistent snapshot of the unspent output set.
pub trait CoinsView {
    /// Returns the unspent output at `outpoint`, if any.
    fn coin(&self, outpoint: &OutPoint) -> Option<Coin>;

    /// Returns whether every input of `tx` refers to an unspent output.
    ///
    /// Coinbase transactions spend nothing and always have their inputs.
    fn have_inputs(&self, tx: &Transaction) -> bool {
        tx.is_coinbase()
            || tx
                .inputs
                .iter()
                .all(|input| self.coin(&input.prevout).is_some())
    }
}

/// An in-memory [CoinsView].
#[derive(Clone, Debug, Default)]
pub struct MemoryCoins {
    coins: HashMap<OutPoint, Coin>,
}

impl MemoryCoins {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, outpoint: OutPoint, coin: Coin) {
        self.coins.insert(outpoint, coin);
    }

    /// Adds every spendable output of `tx`, created at `height`.
    pub fn add_transaction(&mut self, tx: &Transaction, height: u32) {
        let hash = tx.hash();
        for (n, out) in tx.outputs.iter().enumerate() {
            if out.script_pubkey.is_unspendable() {
                continue;
            }
            self.coins.insert(
                OutPoint::new(hash, n as u32),
                Coin {
                    out: out.clone(),
                    height,
                },
            );
        }
    }

    /// Removes the coins spent by `tx`.
    pub fn spend_inputs(&mut self, tx: &Transaction) {
        if tx.is_coinbase() {
            return;
        }
        for input in &tx.inputs {
            self.coins.remove(&input.prevout);
        }
    }

    pub fn len(&self) -> usize {
        self.coins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }
}

impl CoinsView for MemoryCoins {
    fn coin(&self, outpoint: &OutPoint) -> Option<Coin> {
        self.coins.get(outpoint).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{Script, TokenId, TxIn};
    use blsct_primitives::Digest;

    fn plain(value: u64) -> TxOut {
        TxOut {
            blsct_data: None,
            script_pubkey: Script::op_true(),
            value,
            token_id: TokenId::default(),
        }
    }

    #[test]
    fn test_add_and_spend() {
        let mut coins = MemoryCoins::new();
        let funding = Transaction {
            outputs: vec![plain(5), TxOut::fee(1, TokenId::default()), plain(7)],
            ..Default::default()
        };
        coins.add_transaction(&funding, 10);

        // Fee outputs are never spendable
        assert_eq!(coins.len(), 2);
        let hash = funding.hash();
        assert_eq!(coins.coin(&OutPoint::new(hash, 0)).unwrap().out.value, 5);
        assert!(coins.coin(&OutPoint::new(hash, 1)).is_none());
        assert_eq!(coins.coin(&OutPoint::new(hash, 2)).unwrap().height, 10);

        let spend = Transaction {
            inputs: vec![
                TxIn::new(OutPoint::new(hash, 0)),
                TxIn::new(OutPoint::new(hash, 2)),
            ],
            ..Default::default()
        };
        assert!(coins.have_inputs(&spend));
        coins.spend_inputs(&spend);
        assert!(coins.is_empty());
        assert!(!coins.have_inputs(&spend));
    }

    #[test]
    fn test_have_inputs_missing() {
        let coins = MemoryCoins::new();
        let tx = Transaction {
            inputs: vec![TxIn::new(OutPoint::new(Digest::from([1; 32]), 0))],
            ..Default::default()
        };
        assert!(!coins.have_inputs(&tx));
        assert!(coins.have_inputs(&Transaction::default()));
    }
}
