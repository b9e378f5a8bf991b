//! Stealth sub-addresses and the destination text codec.
//!
//! A wallet with view key `a` and spend key `B` publishes, for each identifier `(account, address)`,
//! the pair `(C, D)` where:
//!
//! ```text
//! m = HashToScalar("SubAddress\0" || a || account || address)
//! D = B + m*G
//! C = a*D
//! ```
//!
//! Sub-addresses of the same wallet are unlinkable without `a`.

use crate::{
    common::SUB_ADDRESS_HEADER,
    keys::{DoublePublicKey, PrivateKey, PublicKey, DOUBLE_PUBLIC_KEY_LENGTH, PUBLIC_KEY_LENGTH},
    Error,
};
use blsct_primitives::{
    codec::{Error as CodecError, FixedSize, Read, ReadExt, Write},
    from_hex_formatted,
    group::{Scalar, G1},
    hash, hex, Sha256,
};
use bytes::{Buf, BufMut};
use std::{
    cmp::Ordering,
    fmt::{Debug, Display},
    str::FromStr,
};

/// Account reserved for change outputs.
pub const CHANGE_ACCOUNT: u64 = u64::MAX;

/// Length of the checksum appended to encoded destinations.
const CHECKSUM_LENGTH: usize = 4;

/// Selects one sub-address of a wallet. Not secret.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubAddressIdentifier {
    pub account: u64,
    pub address: u64,
}

impl SubAddressIdentifier {
    pub fn new(account: u64, address: u64) -> Self {
        Self { account, address }
    }

    /// Identifier of the `address`-th change sub-address.
    pub fn change(address: u64) -> Self {
        Self {
            account: CHANGE_ACCOUNT,
            address,
        }
    }
}

impl Write for SubAddressIdentifier {
    fn write(&self, buf: &mut impl BufMut) {
        self.account.write(buf);
        self.address.write(buf);
    }
}

impl Read for SubAddressIdentifier {
    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        let account = u64::read(buf)?;
        let address = u64::read(buf)?;
        Ok(Self { account, address })
    }
}

impl FixedSize for SubAddressIdentifier {
    const SIZE: usize = u64::SIZE * 2;
}

/// Computes the sub-address offset `m` for `id` under view key `view`.
pub fn sub_address_scalar(view: &PrivateKey, id: &SubAddressIdentifier) -> Scalar {
    let digest = Sha256::new()
        .update(SUB_ADDRESS_HEADER)
        .update(&view.to_bytes())
        .update(&id.account.to_le_bytes())
        .update(&id.address.to_le_bytes())
        .finalize();
    Scalar::map(&digest)
}

/// A derived `(view, spend)` key pair.
///
/// Equality and ordering compare the encoded keys, never the identifier they were derived from.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SubAddress(DoublePublicKey);

impl SubAddress {
    /// Derives the sub-address for `id`.
    ///
    /// Fails with [Error::InvalidKey] if `spend` is not a valid key.
    pub fn new(view: &PrivateKey, spend: &PublicKey, id: &SubAddressIdentifier) -> Result<Self, Error> {
        let b = spend.point()?;
        let m = sub_address_scalar(view, id);
        let d = b + G1::generator() * m;
        let c = d * *view.scalar();
        Ok(Self(DoublePublicKey::new(c.into(), d.into())))
    }

    /// Wraps keys decoded elsewhere, without re-deriving them.
    pub fn from_keys(keys: DoublePublicKey) -> Self {
        Self(keys)
    }

    pub fn keys(&self) -> &DoublePublicKey {
        &self.0
    }

    pub fn is_valid(&self) -> bool {
        self.0.is_valid()
    }

    /// Returns the destination for this sub-address, or [Destination::None] if it is invalid.
    pub fn destination(&self) -> Destination {
        if !self.is_valid() {
            return Destination::None;
        }
        Destination::Double(self.0)
    }
}

impl From<DoublePublicKey> for SubAddress {
    fn from(keys: DoublePublicKey) -> Self {
        Self(keys)
    }
}

impl Ord for SubAddress {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.to_bytes().cmp(&other.0.to_bytes())
    }
}

impl PartialOrd for SubAddress {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Debug for SubAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SubAddress({:?})", self.0)
    }
}

impl Display for SubAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.destination().encode())
    }
}

impl FromStr for SubAddress {
    type Err = Error;

    /// Decodes a text-encoded destination and extracts its key pair.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Destination::decode(s)? {
            Destination::Double(keys) => Ok(Self(keys)),
            _ => Err(Error::InvalidKey),
        }
    }
}

/// Where funds may be sent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Destination {
    #[default]
    None,
    Single(PublicKey),
    Double(DoublePublicKey),
}

impl Destination {
    const TAG_NONE: u8 = 0;
    const TAG_SINGLE: u8 = 1;
    const TAG_DOUBLE: u8 = 2;

    /// Encodes the destination as hex: `tag || keys || checksum`.
    pub fn encode(&self) -> String {
        let mut payload = Vec::with_capacity(1 + self.key_length() + CHECKSUM_LENGTH);
        match self {
            Self::None => payload.push(Self::TAG_NONE),
            Self::Single(key) => {
                payload.push(Self::TAG_SINGLE);
                payload.extend_from_slice(&key.to_bytes());
            }
            Self::Double(keys) => {
                payload.push(Self::TAG_DOUBLE);
                payload.extend_from_slice(&keys.to_bytes());
            }
        }
        let checksum = hash(&payload);
        payload.extend_from_slice(&checksum[..CHECKSUM_LENGTH]);
        hex(&payload)
    }

    /// Decodes a destination produced by [Destination::encode]. Whitespace and a `0x` prefix
    /// are ignored.
    pub fn decode(s: &str) -> Result<Self, Error> {
        let invalid = |msg| Error::InvalidEncoding(CodecError::Invalid("Destination", msg));
        let bytes = from_hex_formatted(s).ok_or(invalid("not hex"))?;
        if bytes.len() < 1 + CHECKSUM_LENGTH {
            return Err(invalid("too short"));
        }
        let (payload, checksum) = bytes.split_at(bytes.len() - CHECKSUM_LENGTH);
        if hash(payload)[..CHECKSUM_LENGTH] != *checksum {
            return Err(invalid("bad checksum"));
        }
        let mut buf = &payload[1..];
        let destination = match payload[0] {
            Self::TAG_NONE => Self::None,
            Self::TAG_SINGLE => Self::Single(PublicKey::read(&mut buf)?),
            Self::TAG_DOUBLE => Self::Double(DoublePublicKey::read(&mut buf)?),
            _ => return Err(invalid("unknown tag")),
        };
        if buf.has_remaining() {
            return Err(CodecError::ExtraData(buf.remaining()).into());
        }
        Ok(destination)
    }

    /// Returns the encoded key length carried by this destination.
    pub fn key_length(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Single(_) => PUBLIC_KEY_LENGTH,
            Self::Double(_) => DOUBLE_PUBLIC_KEY_LENGTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn wallet(seed: u64) -> (PrivateKey, PrivateKey) {
        let mut rng = StdRng::seed_from_u64(seed);
        (PrivateKey::rand(&mut rng), PrivateKey::rand(&mut rng))
    }

    #[test]
    fn test_derivation_relation() {
        let (view, spend) = wallet(0);
        let id = SubAddressIdentifier::new(0, 0);
        let sub = SubAddress::new(&view, &spend.public_key(), &id).unwrap();

        // D = (b + m)G and C = aD
        let m = sub_address_scalar(&view, &id);
        let d = G1::generator() * (*spend.scalar() + m);
        assert_eq!(sub.keys().spend_key().unwrap(), d);
        assert_eq!(sub.keys().view_key().unwrap(), d * *view.scalar());
    }

    #[test]
    fn test_derivation_deterministic() {
        let (view, spend) = wallet(1);
        let id = SubAddressIdentifier::new(3, 7);
        let a = SubAddress::new(&view, &spend.public_key(), &id).unwrap();
        let b = SubAddress::new(&view, &spend.public_key(), &id).unwrap();
        assert_eq!(a, b);

        // Changing either identifier component changes the keys
        let other_account =
            SubAddress::new(&view, &spend.public_key(), &SubAddressIdentifier::new(4, 7)).unwrap();
        let other_address =
            SubAddress::new(&view, &spend.public_key(), &SubAddressIdentifier::new(3, 8)).unwrap();
        assert_ne!(a, other_account);
        assert_ne!(a, other_address);
        assert_ne!(other_account, other_address);
    }

    #[test]
    fn test_invalid_spend_key() {
        let (view, _) = wallet(2);
        assert_eq!(
            SubAddress::new(&view, &PublicKey::default(), &SubAddressIdentifier::default()),
            Err(Error::InvalidKey)
        );
    }

    #[test]
    fn test_ordering_by_key_bytes() {
        let (view, spend) = wallet(3);
        let mut subs: Vec<SubAddress> = (0..8)
            .map(|i| {
                SubAddress::new(&view, &spend.public_key(), &SubAddressIdentifier::new(0, i))
                    .unwrap()
            })
            .collect();
        subs.sort();
        for pair in subs.windows(2) {
            assert!(pair[0].keys().to_bytes() < pair[1].keys().to_bytes());
            assert_eq!(pair[0].cmp(&pair[1]), Ordering::Less);
            assert_eq!(pair[1].cmp(&pair[0]), Ordering::Greater);
        }
        assert_eq!(subs[0].cmp(&subs[0]), Ordering::Equal);
    }

    #[test]
    fn test_text_codec() {
        let (view, spend) = wallet(4);
        let sub =
            SubAddress::new(&view, &spend.public_key(), &SubAddressIdentifier::new(1, 2)).unwrap();
        let encoded = sub.to_string();
        let decoded: SubAddress = encoded.parse().unwrap();
        assert_eq!(decoded, sub);

        let single = Destination::Single(spend.public_key());
        assert_eq!(Destination::decode(&single.encode()).unwrap(), single);
        assert!(matches!(
            single.encode().parse::<SubAddress>(),
            Err(Error::InvalidKey)
        ));
        assert_eq!(
            Destination::decode(&Destination::None.encode()).unwrap(),
            Destination::None
        );
        assert_eq!(SubAddress::default().destination(), Destination::None);
    }

    #[test]
    fn test_text_codec_rejects_corruption() {
        let (view, spend) = wallet(5);
        let sub =
            SubAddress::new(&view, &spend.public_key(), &SubAddressIdentifier::new(0, 0)).unwrap();
        let mut encoded = sub.to_string().into_bytes();
        encoded[10] = if encoded[10] == b'0' { b'1' } else { b'0' };
        let corrupted = String::from_utf8(encoded).unwrap();
        assert!(matches!(
            Destination::decode(&corrupted),
            Err(Error::InvalidEncoding(_))
        ));
        assert!(Destination::decode("zz").is_err());

        // Formatting noise is tolerated
        let spaced = format!("0x{}\n", sub);
        assert_eq!(Destination::decode(&spaced).unwrap(), sub.destination());
        assert!(Destination::decode("").is_err());
    }
}
