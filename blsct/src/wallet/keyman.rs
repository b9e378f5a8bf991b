use crate::{
    address::{sub_address_scalar, SubAddress, SubAddressIdentifier},
    common::{hash_with_salt, view_tag, SALT_SPENDING},
    keygen::{derive_child_sk, derive_master_sk},
    keys::{PrivateKey, PublicKey},
    range_proof,
    transaction::TxOut,
    Error,
};
use blsct_primitives::{
    group::{Scalar, G1},
    Digest,
};
use std::collections::HashMap;
use tracing::{debug, trace};

/// Number of sub-addresses registered per account on creation.
pub const LOOKAHEAD: u64 = 100;

/// Children of the master key.
const CHILD_BLSCT: u32 = 130;
const CHILD_TRANSACTION: u32 = 0;
const CHILD_BLINDING: u32 = 1;
const CHILD_TOKEN: u32 = 2;

/// Children of the transaction key.
const CHILD_VIEW: u32 = 0;
const CHILD_SPEND: u32 = 1;

/// An output owned by the wallet, opened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecoveredOutput {
    /// Position in the slice passed to [KeyMan::recover_outputs].
    pub index: usize,
    pub id: SubAddressIdentifier,
    pub amount: u64,
    pub memo: Vec<u8>,
    pub gamma: Scalar,
}

/// Holds a wallet's long-term keys and the sub-addresses it watches.
pub struct KeyMan {
    view: PrivateKey,
    spend: PrivateKey,
    spend_public: PublicKey,
    blinding: PrivateKey,
    token: PrivateKey,

    /// Sub spend key id -> identifier, for every registered sub-address.
    sub_addresses: HashMap<Digest, SubAddressIdentifier>,
}

impl KeyMan {
    /// Derives the wallet from `seed` and registers the first [LOOKAHEAD] sub-addresses of
    /// account 0 and of the change account.
    ///
    /// ```text
    /// master
    /// └── 130
    ///     ├── 0 (transaction)
    ///     │   ├── 0 (view)
    ///     │   └── 1 (spend)
    ///     ├── 1 (blinding)
    ///     └── 2 (token)
    /// ```
    pub fn from_seed(seed: &[u8]) -> Result<Self, Error> {
        let master = derive_master_sk(seed)?;
        let child = derive_child_sk(&master, CHILD_BLSCT);
        let transaction = derive_child_sk(&child, CHILD_TRANSACTION);
        let view = PrivateKey::new(derive_child_sk(&transaction, CHILD_VIEW))?;
        let spend = PrivateKey::new(derive_child_sk(&transaction, CHILD_SPEND))?;
        let blinding = PrivateKey::new(derive_child_sk(&child, CHILD_BLINDING))?;
        let token = PrivateKey::new(derive_child_sk(&child, CHILD_TOKEN))?;

        let mut keyman = Self {
            spend_public: spend.public_key(),
            view,
            spend,
            blinding,
            token,
            sub_addresses: HashMap::new(),
        };
        for address in 0..LOOKAHEAD {
            keyman.register(SubAddressIdentifier::new(0, address))?;
            keyman.register(SubAddressIdentifier::change(address))?;
        }
        debug!(
            sub_addresses = keyman.sub_addresses.len(),
            "derived wallet keys"
        );
        Ok(keyman)
    }

    pub fn view_key(&self) -> &PrivateKey {
        &self.view
    }

    pub fn spend_public_key(&self) -> &PublicKey {
        &self.spend_public
    }

    /// Key reserved for blinding outputs the wallet creates for itself.
    pub fn blinding_key(&self) -> &PrivateKey {
        &self.blinding
    }

    /// Key reserved for issuing tokens.
    pub fn token_key(&self) -> &PrivateKey {
        &self.token
    }

    /// Derives the sub-address for `id`. Outputs paid to it are only recognized once `id` is
    /// registered.
    pub fn sub_address(&self, id: &SubAddressIdentifier) -> Result<SubAddress, Error> {
        SubAddress::new(&self.view, &self.spend_public, id)
    }

    /// Returns the sub-address change is paid to.
    pub fn change_address(&self) -> Result<SubAddress, Error> {
        self.sub_address(&SubAddressIdentifier::change(0))
    }

    /// Starts watching the sub-address for `id` and returns it.
    pub fn register(&mut self, id: SubAddressIdentifier) -> Result<SubAddress, Error> {
        let address = self.sub_address(&id)?;
        let spend = PublicKey::new(address.keys().spend_key()?);
        self.sub_addresses.insert(spend.id(), id);
        Ok(address)
    }

    /// Recomputes the shared secret of `out`: `a*blindingKey`.
    pub fn nonce(&self, out: &TxOut) -> Option<G1> {
        let data = out.blsct_data.as_ref()?;
        let blinding_key = data.blinding_key.point().ok()?;
        Some(blinding_key * *self.view.scalar())
    }

    /// Returns the registered sub-address `out` pays, if any.
    ///
    /// Outputs whose view tag does not match are rejected before any further work.
    pub fn sub_address_id(&self, out: &TxOut) -> Option<SubAddressIdentifier> {
        let data = out.blsct_data.as_ref()?;
        let nonce = self.nonce(out)?;
        if view_tag(&nonce) != data.view_tag {
            return None;
        }
        let spending_key = data.spending_key.point().ok()?;
        let d = spending_key - G1::generator() * hash_with_salt(&nonce, SALT_SPENDING);
        self.sub_addresses.get(&PublicKey::new(d).id()).copied()
    }

    /// Returns whether `out` pays one of the wallet's registered sub-addresses.
    pub fn is_mine(&self, out: &TxOut) -> bool {
        self.sub_address_id(out).is_some()
    }

    /// Opens every output in `outs` owned by the wallet. Outputs that are not owned, or whose
    /// proofs do not rewind, are skipped.
    pub fn recover_outputs(&self, outs: &[TxOut]) -> Vec<RecoveredOutput> {
        let mut recovered = Vec::new();
        for (index, out) in outs.iter().enumerate() {
            let Some(id) = self.sub_address_id(out) else {
                continue;
            };
            let (Some(data), Some(nonce)) = (out.blsct_data.as_ref(), self.nonce(out)) else {
                continue;
            };
            let Some(opened) = range_proof::recover(&data.range_proof, &nonce, &out.token_id)
            else {
                trace!(index, "owned output did not rewind");
                continue;
            };
            recovered.push(RecoveredOutput {
                index,
                id,
                amount: opened.amount,
                memo: opened.memo,
                gamma: opened.gamma,
            });
        }
        recovered
    }

    /// Returns the one-time private key spending `out`: `b + m + H(nonce, 0)`.
    ///
    /// Fails with [Error::UnknownOutput] if `out` does not pay a registered sub-address.
    pub fn spending_key(&self, out: &TxOut) -> Result<PrivateKey, Error> {
        let id = self.sub_address_id(out).ok_or(Error::UnknownOutput)?;
        let nonce = self.nonce(out).ok_or(Error::UnknownOutput)?;
        let key = *self.spend.scalar()
            + sub_address_scalar(&self.view, &id)
            + hash_with_salt(&nonce, SALT_SPENDING);
        PrivateKey::new(key)
    }
}
