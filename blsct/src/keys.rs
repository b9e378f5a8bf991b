//! Private keys, public keys, and view/spend key pairs.
//!
//! A [PrivateKey] can only be built from raw bytes inside this crate (the wallet key manager);
//! everything else goes through [PrivateKey::new], which rejects the zero scalar, or
//! [PrivateKey::rand].

use crate::{common::BALANCE_MESSAGE, Error};
use blsct_primitives::{
    codec::{Error as CodecError, FixedSize, Read, ReadExt, Write},
    group::{Scalar, G1, G1_ELEMENT_BYTE_LENGTH, SCALAR_LENGTH},
    hash, hex, signature, Digest, Signature,
};
use bytes::{Buf, BufMut};
use rand::{CryptoRng, RngCore};
use std::{
    cmp::Ordering,
    fmt::{Debug, Display},
    hash::{Hash, Hasher},
};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of an encoded [PublicKey].
pub const PUBLIC_KEY_LENGTH: usize = G1_ELEMENT_BYTE_LENGTH;

/// Length of an encoded [DoublePublicKey].
pub const DOUBLE_PUBLIC_KEY_LENGTH: usize = 2 * PUBLIC_KEY_LENGTH;

/// Length of an encoded [PrivateKey].
pub const PRIVATE_KEY_LENGTH: usize = SCALAR_LENGTH;

/// A non-zero scalar.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey(Scalar);

impl PrivateKey {
    /// Wraps a scalar, rejecting zero.
    pub fn new(scalar: Scalar) -> Result<Self, Error> {
        if scalar.is_zero() {
            return Err(Error::InvalidKey);
        }
        Ok(Self(scalar))
    }

    /// Generates a random private key.
    pub fn rand<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self(Scalar::rand(rng))
    }

    /// Decodes a private key from its canonical big-endian encoding.
    pub(crate) fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let scalar = Scalar::from_bytes(bytes).ok_or(Error::InvalidKey)?;
        Self::new(scalar)
    }

    /// Returns the canonical big-endian encoding.
    pub(crate) fn to_bytes(&self) -> [u8; PRIVATE_KEY_LENGTH] {
        self.0.to_bytes()
    }

    /// Returns the underlying scalar.
    pub fn scalar(&self) -> &Scalar {
        &self.0
    }

    /// Returns `scalar * G`.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(signature::compute_public(&self.0))
    }

    /// Signs `message`.
    pub fn sign(&self, message: &[u8]) -> Signature {
        signature::sign(&self.0, message)
    }

    /// Signs the balance message. The message is fixed; callers cannot choose it.
    pub fn sign_balance(&self) -> Signature {
        self.sign(BALANCE_MESSAGE)
    }
}

impl Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PrivateKey(..)")
    }
}

/// A point in G1 used as a key.
///
/// The default value is the identity, which is never a valid key.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(G1);

impl PublicKey {
    /// Wraps a point. Use [PublicKey::is_valid] or [PublicKey::point] before relying on it.
    pub fn new(point: G1) -> Self {
        Self(point)
    }

    /// Decodes and validates a compressed point.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        G1::from_bytes(bytes).map(Self).ok_or(Error::InvalidKey)
    }

    /// Returns whether the key is usable: on the curve, in G1, and not the identity.
    pub fn is_valid(&self) -> bool {
        !self.0.is_zero()
    }

    /// Returns the point, or [Error::InvalidKey] if the key is not valid.
    pub fn point(&self) -> Result<G1, Error> {
        if !self.is_valid() {
            return Err(Error::InvalidKey);
        }
        Ok(self.0)
    }

    /// Compressed encoding.
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        self.0.to_bytes()
    }

    /// Hash of the encoded key, usable as a short destination identifier.
    pub fn id(&self) -> Digest {
        hash(&self.to_bytes())
    }

    /// Verifies a signature over `message`.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), Error> {
        signature::verify(&self.point()?, message, signature).map_err(|_| Error::SignatureFailure)
    }
}

impl Default for PublicKey {
    fn default() -> Self {
        Self(G1::zero())
    }
}

impl From<G1> for PublicKey {
    fn from(point: G1) -> Self {
        Self(point)
    }
}

impl Ord for PublicKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_bytes().cmp(&other.to_bytes())
    }
}

impl PartialOrd for PublicKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for PublicKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_bytes().hash(state);
    }
}

impl Write for PublicKey {
    fn write(&self, buf: &mut impl BufMut) {
        self.0.write(buf);
    }
}

impl Read for PublicKey {
    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        G1::read(buf).map(Self)
    }
}

impl FixedSize for PublicKey {
    const SIZE: usize = PUBLIC_KEY_LENGTH;
}

impl Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex(&self.to_bytes()))
    }
}

impl Display for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex(&self.to_bytes()))
    }
}

/// A `(view, spend)` key pair published as a destination.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DoublePublicKey {
    view: PublicKey,
    spend: PublicKey,
}

impl DoublePublicKey {
    pub fn new(view: PublicKey, spend: PublicKey) -> Self {
        Self { view, spend }
    }

    /// Decodes and validates both components.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != DOUBLE_PUBLIC_KEY_LENGTH {
            return Err(Error::InvalidKey);
        }
        let (view, spend) = bytes.split_at(PUBLIC_KEY_LENGTH);
        Ok(Self {
            view: PublicKey::from_bytes(view)?,
            spend: PublicKey::from_bytes(spend)?,
        })
    }

    /// Returns the view key, or [Error::InvalidKey] if it is not valid.
    pub fn view_key(&self) -> Result<G1, Error> {
        self.view.point()
    }

    /// Returns the spend key, or [Error::InvalidKey] if it is not valid.
    pub fn spend_key(&self) -> Result<G1, Error> {
        self.spend.point()
    }

    /// Returns whether both components are valid.
    pub fn is_valid(&self) -> bool {
        self.view.is_valid() && self.spend.is_valid()
    }

    /// View key followed by spend key.
    pub fn to_bytes(&self) -> [u8; DOUBLE_PUBLIC_KEY_LENGTH] {
        let mut bytes = [0u8; DOUBLE_PUBLIC_KEY_LENGTH];
        bytes[..PUBLIC_KEY_LENGTH].copy_from_slice(&self.view.to_bytes());
        bytes[PUBLIC_KEY_LENGTH..].copy_from_slice(&self.spend.to_bytes());
        bytes
    }

    /// Hash of the encoded pair.
    pub fn id(&self) -> Digest {
        hash(&self.to_bytes())
    }
}

impl Write for DoublePublicKey {
    fn write(&self, buf: &mut impl BufMut) {
        self.view.write(buf);
        self.spend.write(buf);
    }
}

impl Read for DoublePublicKey {
    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        let view = PublicKey::read(buf)?;
        let spend = PublicKey::read(buf)?;
        Ok(Self { view, spend })
    }
}

impl FixedSize for DoublePublicKey {
    const SIZE: usize = DOUBLE_PUBLIC_KEY_LENGTH;
}

impl Debug for DoublePublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex(&self.to_bytes()))
    }
}
