use super::{Config, KeyMan};
use crate::{
    common::{BALANCE_MESSAGE, BLSCT_MARKER},
    keys::{DoublePublicKey, PrivateKey},
    ledger::CoinsView,
    output::create_output,
    range_proof,
    transaction::{OutPoint, TokenId, Transaction, TxIn, TxOut, TX_VERSION},
    Error,
};
use blsct_primitives::{group::Scalar, signature, Signature};
use rand::{CryptoRng, RngCore};
use tracing::debug;

/// A coin the wallet can spend.
struct Input {
    input: TxIn,
    key: PrivateKey,
    amount: u64,
    gamma: Scalar,
}

struct Payment {
    destination: DoublePublicKey,
    amount: u64,
    memo: Vec<u8>,
}

/// Builds a transaction spending coins owned by one [KeyMan].
///
/// Everything is denominated in the native token, which also pays the fee.
pub struct TxFactory<'a> {
    cfg: Config,
    keyman: &'a KeyMan,
    inputs: Vec<Input>,
    payments: Vec<Payment>,
}

impl<'a> TxFactory<'a> {
    pub fn new(cfg: Config, keyman: &'a KeyMan) -> Self {
        Self {
            cfg,
            keyman,
            inputs: Vec::new(),
            payments: Vec::new(),
        }
    }

    /// Spends the coin at `outpoint`.
    ///
    /// Fails with [Error::DuplicateInput] if it was already added, with [Error::MissingInput] if
    /// `view` does not hold it, with [Error::UnknownOutput] if the wallet cannot open it, and
    /// with [Error::MismatchedFeeTokens] if it is not of the native token.
    pub fn add_input<V: CoinsView>(&mut self, view: &V, outpoint: OutPoint) -> Result<(), Error> {
        if self.inputs.iter().any(|input| input.input.prevout == outpoint) {
            return Err(Error::DuplicateInput);
        }
        let coin = view.coin(&outpoint).ok_or(Error::MissingInput)?;
        if coin.out.token_id != TokenId::default() {
            return Err(Error::MismatchedFeeTokens);
        }
        let data = coin.out.blsct_data.as_ref().ok_or(Error::UnknownOutput)?;
        let key = self.keyman.spending_key(&coin.out)?;
        let nonce = self.keyman.nonce(&coin.out).ok_or(Error::UnknownOutput)?;
        let opened = range_proof::recover(&data.range_proof, &nonce, &coin.out.token_id)
            .ok_or(Error::UnknownOutput)?;
        self.inputs.push(Input {
            input: TxIn::new(outpoint),
            key,
            amount: opened.amount,
            gamma: opened.gamma,
        });
        Ok(())
    }

    /// Pays `amount` to `destination`.
    pub fn add_output(&mut self, destination: DoublePublicKey, amount: u64, memo: &[u8]) {
        self.payments.push(Payment {
            destination,
            amount,
            memo: memo.to_vec(),
        });
    }

    /// Returns the fee for the current inputs and payments plus one change output.
    pub fn fee(&self) -> Result<u64, Error> {
        let components = (self.inputs.len() + self.payments.len() + 1) as u64;
        self.cfg
            .fee_per_component
            .checked_mul(components)
            .ok_or(Error::OutOfRange)
    }

    /// Creates every output (payments, then change, then fee), signs every input, and returns
    /// the signed transaction.
    ///
    /// Fails with [Error::InsufficientFunds] if inputs do not cover payments and fee.
    pub fn build<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Result<Transaction, Error> {
        let fee = self.fee()?;
        let have = self
            .inputs
            .iter()
            .try_fold(0u64, |sum, input| sum.checked_add(input.amount))
            .ok_or(Error::OutOfRange)?;
        let need = self
            .payments
            .iter()
            .try_fold(fee, |sum, payment| sum.checked_add(payment.amount))
            .ok_or(Error::OutOfRange)?;
        if have < need {
            return Err(Error::InsufficientFunds { need, have });
        }

        let token = TokenId::default();
        let mut outputs = Vec::with_capacity(self.payments.len() + 2);
        let mut signatures: Vec<Signature> =
            Vec::with_capacity(2 * self.inputs.len() + self.payments.len() + 1);
        for payment in &self.payments {
            let unsigned = create_output(
                rng,
                &payment.destination,
                payment.amount,
                &payment.memo,
                token,
                None,
                &[],
            )?;
            signatures.push(unsigned.signature());
            outputs.push(unsigned.out);
        }
        let change = self.keyman.change_address()?;
        let unsigned = create_output(
            rng,
            change.keys(),
            have - need,
            &self.cfg.change_memo,
            token,
            None,
            &[],
        )?;
        signatures.push(unsigned.signature());
        outputs.push(unsigned.out);
        outputs.push(TxOut::fee(fee, token));

        let mut inputs = Vec::with_capacity(self.inputs.len());
        for input in &self.inputs {
            signatures.push(input.key.sign(&input.input.hash()));
            signatures.push(signature::sign(&input.gamma, BALANCE_MESSAGE));
            inputs.push(input.input.clone());
        }
        debug!(
            inputs = inputs.len(),
            outputs = outputs.len(),
            fee,
            change = have - need,
            "built transaction"
        );
        Ok(Transaction {
            version: TX_VERSION | BLSCT_MARKER,
            inputs,
            outputs,
            signature: signature::aggregate(&signatures),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        address::SubAddressIdentifier,
        aggregate::aggregate_transactions,
        common::COIN,
        ledger::{Coin, MemoryCoins},
        verification::{self, verify_tx},
    };
    use blsct_primitives::Digest;
    use rand::{rngs::StdRng, SeedableRng};

    /// Pays `amount` to `keyman` at a fresh outpoint.
    fn fund(
        rng: &mut StdRng,
        coins: &mut MemoryCoins,
        keyman: &KeyMan,
        amount: u64,
        seed: u8,
    ) -> OutPoint {
        let address = keyman
            .sub_address(&SubAddressIdentifier::new(0, 0))
            .unwrap();
        let out = create_output(
            rng,
            address.keys(),
            amount,
            b"test",
            TokenId::default(),
            None,
            &[],
        )
        .unwrap();
        let outpoint = OutPoint::new(Digest::from([seed; 32]), 0);
        coins.insert(
            outpoint,
            Coin {
                out: out.out,
                height: 1,
            },
        );
        outpoint
    }

    #[test]
    fn test_build() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut coins = MemoryCoins::new();
        let keyman = KeyMan::from_seed(&[1; 32]).unwrap();
        let outpoint = fund(&mut rng, &mut coins, &keyman, 1000 * COIN, 1);
        let recipient = keyman
            .sub_address(&SubAddressIdentifier::new(0, 1))
            .unwrap();

        let mut factory = TxFactory::new(Config::default(), &keyman);
        factory.add_input(&coins, outpoint).unwrap();
        factory.add_output(*recipient.keys(), 900 * COIN, b"test");
        assert_eq!(factory.fee().unwrap(), 600_000);
        let tx = factory.build(&mut rng).unwrap();
        assert!(tx.is_blsct());
        assert!(verify_tx(
            &mut rng,
            &verification::Config::default(),
            &tx,
            &coins,
            0
        ));

        // Payment, change, fee
        assert_eq!(tx.outputs.len(), 3);
        assert_eq!(tx.outputs[2], TxOut::fee(600_000, TokenId::default()));
        let recovered = keyman.recover_outputs(&tx.outputs);
        assert_eq!(recovered.len(), 2);
        assert_eq!(recovered[0].amount, 900 * COIN);
        assert_eq!(recovered[0].memo, b"test");
        assert_eq!(recovered[1].id, SubAddressIdentifier::change(0));
        assert_eq!(recovered[1].amount, 100 * COIN - 600_000);
        assert_eq!(recovered[1].memo, b"Change");
    }

    #[test]
    fn test_build_spends_change() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut coins = MemoryCoins::new();
        let keyman = KeyMan::from_seed(&[1; 32]).unwrap();
        let outpoint = fund(&mut rng, &mut coins, &keyman, 10 * COIN, 1);
        let other = KeyMan::from_seed(&[2; 32]).unwrap();
        let to = other.sub_address(&SubAddressIdentifier::new(0, 0)).unwrap();

        let mut factory = TxFactory::new(Config::default(), &keyman);
        factory.add_input(&coins, outpoint).unwrap();
        factory.add_output(*to.keys(), COIN, b"");
        let first = factory.build(&mut rng).unwrap();
        assert!(other.is_mine(&first.outputs[0]));
        assert!(!keyman.is_mine(&first.outputs[0]));
        coins.spend_inputs(&first);
        coins.add_transaction(&first, 2);

        // Spend the change onward
        let change = OutPoint::new(first.hash(), 1);
        let mut factory = TxFactory::new(Config::default(), &keyman);
        factory.add_input(&coins, change).unwrap();
        factory.add_output(*to.keys(), COIN, b"");
        let second = factory.build(&mut rng).unwrap();
        assert!(verify_tx(
            &mut rng,
            &verification::Config::default(),
            &second,
            &coins,
            0
        ));
    }

    #[test]
    fn test_aggregated_builds() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut coins = MemoryCoins::new();
        let alice = KeyMan::from_seed(&[1; 32]).unwrap();
        let bob = KeyMan::from_seed(&[2; 32]).unwrap();
        let a = fund(&mut rng, &mut coins, &alice, 5 * COIN, 1);
        let b = fund(&mut rng, &mut coins, &bob, 7 * COIN, 2);

        let mut txs = Vec::new();
        for (keyman, outpoint, to) in [(&alice, a, &bob), (&bob, b, &alice)] {
            let to = to.sub_address(&SubAddressIdentifier::new(0, 3)).unwrap();
            let mut factory = TxFactory::new(Config::default(), keyman);
            factory.add_input(&coins, outpoint).unwrap();
            factory.add_output(*to.keys(), COIN, b"swap");
            txs.push(factory.build(&mut rng).unwrap());
        }
        let merged = aggregate_transactions(&txs).unwrap();
        assert_eq!(merged.outputs.last().unwrap().value, 2 * 600_000);
        assert!(verify_tx(
            &mut rng,
            &verification::Config::default(),
            &merged,
            &coins,
            0
        ));
    }

    #[test]
    fn test_insufficient_funds() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut coins = MemoryCoins::new();
        let keyman = KeyMan::from_seed(&[1; 32]).unwrap();
        let outpoint = fund(&mut rng, &mut coins, &keyman, COIN, 1);
        let to = keyman.change_address().unwrap();

        let mut factory = TxFactory::new(Config::default(), &keyman);
        factory.add_input(&coins, outpoint).unwrap();
        factory.add_output(*to.keys(), COIN, b"");
        assert_eq!(
            factory.build(&mut rng),
            Err(Error::InsufficientFunds {
                need: COIN + 600_000,
                have: COIN,
            })
        );
    }

    #[test]
    fn test_add_input_twice() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut coins = MemoryCoins::new();
        let keyman = KeyMan::from_seed(&[1; 32]).unwrap();
        let outpoint = fund(&mut rng, &mut coins, &keyman, 10 * COIN, 1);
        let to = keyman.change_address().unwrap();

        let mut factory = TxFactory::new(Config::default(), &keyman);
        factory.add_input(&coins, outpoint).unwrap();
        assert_eq!(
            factory.add_input(&coins, outpoint),
            Err(Error::DuplicateInput)
        );
        assert_eq!(factory.fee().unwrap(), 400_000);

        // The coin can only fund its own value
        factory.add_output(*to.keys(), 15 * COIN, b"");
        assert_eq!(
            factory.build(&mut rng),
            Err(Error::InsufficientFunds {
                need: 15 * COIN + 600_000,
                have: 10 * COIN,
            })
        );
    }

    #[test]
    fn test_add_input_errors() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut coins = MemoryCoins::new();
        let keyman = KeyMan::from_seed(&[1; 32]).unwrap();
        let other = KeyMan::from_seed(&[2; 32]).unwrap();
        let theirs = fund(&mut rng, &mut coins, &other, COIN, 1);

        let mut factory = TxFactory::new(Config::default(), &keyman);
        assert_eq!(
            factory.add_input(&coins, OutPoint::new(Digest::from([9; 32]), 0)),
            Err(Error::MissingInput)
        );
        assert_eq!(
            factory.add_input(&coins, theirs),
            Err(Error::UnknownOutput)
        );
        assert_eq!(factory.fee().unwrap(), 200_000);
    }
}
