//! SHA-256 hashing and the digest type used to identify outputs, inputs, and transactions.
//!
//! This implementation uses the `sha2` crate to generate SHA-256 digests.
//!
//! # Example
//! ```rust
//! use blsct_primitives::sha256::{hash, Sha256};
//!
//! // Create a new SHA-256 hasher
//! let mut hasher = Sha256::new();
//!
//! // Update the hasher with some messages
//! hasher.update(b"hello ");
//! hasher.update(b"world");
//!
//! // Finalize the hasher to get the digest
//! assert_eq!(hasher.finalize(), hash(b"hello world"));
//! ```

use crate::{
    codec::{at_least, Error as CodecError, FixedSize, Read, Write},
    hex,
};
use bytes::{Buf, BufMut};
use sha2::{Digest as _, Sha256 as ISha256};
use std::{
    fmt::{Debug, Display},
    ops::Deref,
};

/// Length of a SHA-256 digest.
pub const DIGEST_LENGTH: usize = 32;

/// Generate a SHA-256 digest from a message.
pub fn hash(message: &[u8]) -> Digest {
    let array: [u8; DIGEST_LENGTH] = ISha256::digest(message).into();
    Digest::from(array)
}

/// SHA-256 hasher.
#[derive(Debug, Default)]
pub struct Sha256 {
    hasher: ISha256,
}

impl Sha256 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, message: &[u8]) -> &mut Self {
        self.hasher.update(message);
        self
    }

    /// Returns the digest and resets the hasher.
    pub fn finalize(&mut self) -> Digest {
        let array: [u8; DIGEST_LENGTH] = self.hasher.finalize_reset().into();
        Digest::from(array)
    }
}

/// Digest of a SHA-256 hashing operation.
#[derive(Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Digest([u8; DIGEST_LENGTH]);

impl Digest {
    /// Reads the first eight bytes as a little-endian integer.
    pub fn low_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.0[..8]);
        u64::from_le_bytes(bytes)
    }
}

impl Write for Digest {
    fn write(&self, buf: &mut impl BufMut) {
        self.0.write(buf);
    }
}

impl Read for Digest {
    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        at_least(buf, DIGEST_LENGTH)?;
        let mut array = [0u8; DIGEST_LENGTH];
        buf.copy_to_slice(&mut array);
        Ok(Self(array))
    }
}

impl FixedSize for Digest {
    const SIZE: usize = DIGEST_LENGTH;
}

impl From<[u8; DIGEST_LENGTH]> for Digest {
    fn from(value: [u8; DIGEST_LENGTH]) -> Self {
        Self(value)
    }
}

impl TryFrom<&[u8]> for Digest {
    type Error = CodecError;
    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let array: [u8; DIGEST_LENGTH] = value
            .try_into()
            .map_err(|_| CodecError::InvalidLength(value.len()))?;
        Ok(Self(array))
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Deref for Digest {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl Debug for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex(&self.0))
    }
}

impl Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{DecodeExt, Encode};

    const HELLO_DIGEST: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[test]
    fn test_sha256() {
        let msg = b"hello world";

        // Generate initial hash
        let mut hasher = Sha256::new();
        hasher.update(msg);
        let digest = hasher.finalize();
        assert_eq!(hex(digest.as_ref()), HELLO_DIGEST);

        // Reuse hasher
        hasher.update(msg);
        let digest = hasher.finalize();
        assert_eq!(hex(digest.as_ref()), HELLO_DIGEST);

        // Test simple hasher
        assert_eq!(hex(hash(msg).as_ref()), HELLO_DIGEST);
    }

    #[test]
    fn test_codec() {
        let digest = hash(b"hello world");
        let encoded = digest.encode();
        assert_eq!(encoded.len(), DIGEST_LENGTH);
        assert_eq!(encoded, digest.as_ref());
        assert_eq!(Digest::decode(encoded).unwrap(), digest);
        assert!(Digest::try_from(&[0u8; 31][..]).is_err());
    }

    #[test]
    fn test_low_u64() {
        let mut bytes = [0u8; DIGEST_LENGTH];
        bytes[0] = 0x34;
        bytes[1] = 0x12;
        bytes[8] = 0xff;
        assert_eq!(Digest::from(bytes).low_u64(), 0x1234);
    }
}
