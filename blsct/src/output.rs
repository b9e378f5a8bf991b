//! One-time confidential output construction.
//!
//! For a destination `(C, D)` and a fresh blinding scalar `r`:
//!
//! ```text
//! nonce        = r*C
//! gamma        = H(nonce, 100)
//! V            = amount*H_token + gamma*G        (inside the range proof)
//! ephemeralKey = r*G
//! blindingKey  = r*D
//! spendingKey  = D + H(nonce, 0)*G
//! viewTag      = H(nonce) & 0xffff
//! ```
//!
//! The recipient recomputes `nonce = a*blindingKey = a*r*D = r*C` with its view key `a`.

use crate::{
    common::{hash_with_salt, view_tag, BALANCE_MESSAGE, MAX_MONEY, SALT_GAMMA, SALT_SPENDING},
    keys::{DoublePublicKey, PrivateKey, PublicKey},
    range_proof,
    transaction::{BlsctData, Script, TokenId, TxOut},
    Error,
};
use blsct_primitives::{
    group::{Scalar, G1},
    signature, Signature,
};
use rand::{CryptoRng, RngCore};
use tracing::trace;

/// An output together with the secrets its sender needs to sign it and account for it.
#[derive(Clone, Debug)]
pub struct UnsignedOutput {
    pub out: TxOut,
    /// The blinding scalar `r`.
    pub blinding_key: PrivateKey,
    pub gamma: Scalar,
    pub amount: u64,
    pub memo: Vec<u8>,
}

impl UnsignedOutput {
    /// Signs the output hash with `r` and the balance message with `-gamma`, aggregated.
    pub fn signature(&self) -> Signature {
        let ownership = self.blinding_key.sign(&self.out.hash());
        let balance = signature::sign(&-self.gamma, BALANCE_MESSAGE);
        signature::aggregate(&[ownership, balance])
    }
}

/// Builds a confidential output paying `amount` of `token_id` to `destination`.
///
/// `blinding_key` overrides the random `r`; `output_nonce`, if not empty, is pushed after
/// `OP_TRUE` in the output script. Fails before any proving work if either destination key is
/// invalid.
pub fn create_output<R: RngCore + CryptoRng>(
    rng: &mut R,
    destination: &DoublePublicKey,
    amount: u64,
    memo: &[u8],
    token_id: TokenId,
    blinding_key: Option<PrivateKey>,
    output_nonce: &[u8],
) -> Result<UnsignedOutput, Error> {
    let view = destination.view_key()?;
    let spend = destination.spend_key()?;
    if amount > MAX_MONEY {
        return Err(Error::OutOfRange);
    }
    if memo.len() > range_proof::MAX_MEMO_LENGTH {
        return Err(Error::MemoTooLong(memo.len()));
    }
    let mut script_pubkey = Script::op_true();
    if !output_nonce.is_empty() {
        script_pubkey.push_data(output_nonce)?;
    }

    let r = blinding_key.unwrap_or_else(|| PrivateKey::rand(rng));
    let nonce = view * *r.scalar();
    let gamma = hash_with_salt(&nonce, SALT_GAMMA);
    if gamma.is_zero() {
        return Err(Error::ArithmeticInvariantViolation("zero blinding factor"));
    }
    let range_proof = range_proof::prove(rng, &[amount], &nonce, memo, &token_id)?;

    let spending_key = spend + G1::generator() * hash_with_salt(&nonce, SALT_SPENDING);
    let blsct_data = BlsctData {
        ephemeral_key: r.public_key(),
        blinding_key: PublicKey::new(spend * *r.scalar()),
        spending_key: PublicKey::new(spending_key),
        view_tag: view_tag(&nonce),
        range_proof,
    };
    trace!(amount, memo = memo.len(), view_tag = blsct_data.view_tag, "created output");

    Ok(UnsignedOutput {
        out: TxOut {
            blsct_data: Some(blsct_data),
            script_pubkey,
            value: 0,
            token_id,
        },
        blinding_key: r,
        gamma,
        amount,
        memo: memo.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        address::{sub_address_scalar, SubAddress, SubAddressIdentifier},
        range_proof::{recover, value_generator},
        transaction::OP_TRUE,
    };
    use rand::{rngs::StdRng, SeedableRng};

    struct Recipient {
        view: PrivateKey,
        spend: PrivateKey,
        id: SubAddressIdentifier,
        address: SubAddress,
    }

    fn recipient(rng: &mut StdRng) -> Recipient {
        let view = PrivateKey::rand(rng);
        let spend = PrivateKey::rand(rng);
        let id = SubAddressIdentifier::new(0, 1);
        let address = SubAddress::new(&view, &spend.public_key(), &id).unwrap();
        Recipient {
            view,
            spend,
            id,
            address,
        }
    }

    #[test]
    fn test_recipient_recovers_output() {
        let mut rng = StdRng::seed_from_u64(0);
        let to = recipient(&mut rng);
        let token = TokenId::default();
        let unsigned = create_output(
            &mut rng,
            to.address.keys(),
            1000,
            b"test",
            token,
            None,
            &[],
        )
        .unwrap();
        let data = unsigned.out.blsct_data.as_ref().unwrap();
        assert_eq!(unsigned.out.value, 0);
        assert_eq!(unsigned.out.script_pubkey, Script::op_true());

        // Shared secret from the recipient's side
        let nonce = data.blinding_key.point().unwrap() * *to.view.scalar();
        assert_eq!(data.view_tag, view_tag(&nonce));
        let recovered = recover(&data.range_proof, &nonce, &token).unwrap();
        assert_eq!(recovered.amount, 1000);
        assert_eq!(recovered.memo, b"test");
        assert_eq!(recovered.gamma, unsigned.gamma);

        // One-time spend key is (b + m + H(nonce, 0))*G
        let m = sub_address_scalar(&to.view, &to.id);
        let private = *to.spend.scalar() + m + hash_with_salt(&nonce, SALT_SPENDING);
        assert_eq!(
            data.spending_key.point().unwrap(),
            G1::generator() * private
        );
    }

    #[test]
    fn test_signature_covers_output_and_balance() {
        let mut rng = StdRng::seed_from_u64(1);
        let to = recipient(&mut rng);
        let token = TokenId::default();
        let unsigned =
            create_output(&mut rng, to.address.keys(), 5, b"", token, None, &[]).unwrap();
        let data = unsigned.out.blsct_data.as_ref().unwrap();

        // The balance key of a lone output paying `amount` as reward is -gamma*G
        let commitment = data.commitment().unwrap();
        let balance = value_generator(&token) * Scalar::from_u64(5) - commitment;
        let pairs = vec![
            (
                data.ephemeral_key.point().unwrap(),
                unsigned.out.hash().to_vec(),
            ),
            (balance, BALANCE_MESSAGE.to_vec()),
        ];
        signature::verify_batch(&pairs, &unsigned.signature(), 1).unwrap();
    }

    #[test]
    fn test_supplied_blinding_key_and_nonce() {
        let mut rng = StdRng::seed_from_u64(2);
        let to = recipient(&mut rng);
        let r = PrivateKey::rand(&mut rng);
        let a = create_output(
            &mut rng,
            to.address.keys(),
            7,
            b"",
            TokenId::default(),
            Some(r.clone()),
            &[1, 2, 3],
        )
        .unwrap();
        let b = create_output(
            &mut rng,
            to.address.keys(),
            7,
            b"",
            TokenId::default(),
            Some(r.clone()),
            &[],
        )
        .unwrap();
        assert_eq!(a.blinding_key, r);
        assert_eq!(a.gamma, b.gamma);
        let (da, db) = (a.out.blsct_data.unwrap(), b.out.blsct_data.unwrap());
        assert_eq!(da.ephemeral_key, r.public_key());
        assert_eq!(da.spending_key, db.spending_key);
        assert_eq!(a.out.script_pubkey.as_bytes(), &[OP_TRUE, 3, 1, 2, 3]);
    }

    #[test]
    fn test_invalid_destination() {
        let mut rng = StdRng::seed_from_u64(3);
        let to = recipient(&mut rng);
        let half = DoublePublicKey::new(to.view.public_key(), PublicKey::default());
        assert_eq!(
            create_output(&mut rng, &half, 1, b"", TokenId::default(), None, &[]).unwrap_err(),
            Error::InvalidKey
        );
        assert_eq!(
            create_output(
                &mut rng,
                &DoublePublicKey::default(),
                1,
                b"",
                TokenId::default(),
                None,
                &[]
            )
            .unwrap_err(),
            Error::InvalidKey
        );
    }

    #[test]
    fn test_limits() {
        let mut rng = StdRng::seed_from_u64(4);
        let to = recipient(&mut rng);
        let keys = to.address.keys();
        assert_eq!(
            create_output(&mut rng, keys, MAX_MONEY + 1, b"", TokenId::default(), None, &[])
                .unwrap_err(),
            Error::OutOfRange
        );
        let memo = [0u8; range_proof::MAX_MEMO_LENGTH + 1];
        assert_eq!(
            create_output(&mut rng, keys, 1, &memo, TokenId::default(), None, &[]).unwrap_err(),
            Error::MemoTooLong(memo.len())
        );
    }
}
