//! Canonical byte encoding for protocol types.
//!
//! Every type that crosses a trust boundary (keys, commitments, proofs, transactions) is
//! written with [Write] and read back with [Read]. Decoding untrusted data takes a
//! configuration (`Cfg`) that bounds any allocation the reader may perform.

use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;

/// Error type for codec operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("unexpected end of buffer")]
    EndOfBuffer,
    #[error("extra data found: {0} bytes")]
    ExtraData(usize),
    #[error("invalid data in {0}: {1}")]
    Invalid(&'static str, &'static str), // context, message
    #[error("invalid length: {0}")]
    InvalidLength(usize),
    #[error("invalid varint")]
    InvalidVarint,
    #[error("invalid bool")]
    InvalidBool,
}

/// Trait for types that can be written (encoded) to a buffer.
pub trait Write {
    /// Encodes this value by writing to a buffer.
    ///
    /// Implementations should panic if the buffer doesn't have enough capacity.
    fn write(&self, buf: &mut impl BufMut);
}

/// Trait for types that know their encoded length.
pub trait EncodeSize {
    /// Returns the encoded length of this value.
    ///
    /// This method MUST return the exact number of bytes that will be written by `write()`.
    fn encode_size(&self) -> usize;
}

/// Trait for types with a known, fixed encoded length.
pub trait FixedSize {
    /// The length of the encoded value.
    const SIZE: usize;
}

impl<T: FixedSize> EncodeSize for T {
    fn encode_size(&self) -> usize {
        T::SIZE
    }
}

/// Trait for types that can be encoded to a buffer.
pub trait Encode: Write + EncodeSize {
    /// Encodes a value to a `BytesMut` buffer.
    ///
    /// Panics if the `write` implementation does not write the expected number of bytes.
    fn encode(&self) -> BytesMut {
        let len = self.encode_size();
        let mut buffer = BytesMut::with_capacity(len);
        self.write(&mut buffer);
        assert_eq!(buffer.len(), len, "write() did not write expected bytes");
        buffer
    }
}

impl<T: Write + EncodeSize> Encode for T {}

/// Trait for types that can be read/decoded from a buffer.
///
/// The `Cfg` type parameter bounds what the reader may allocate. Use `()` for types that
/// do not require configuration.
pub trait Read<Cfg = ()>: Sized {
    /// Reads a value from the buffer using the provided configuration, consuming the
    /// necessary bytes.
    fn read_cfg(buf: &mut impl Buf, cfg: &Cfg) -> Result<Self, Error>;
}

/// Trait for types that can be decoded from a buffer, ensuring the entire buffer is consumed.
pub trait Decode<Cfg = ()>: Read<Cfg> {
    /// Decodes a value from a buffer, ensuring the buffer is fully consumed.
    fn decode_cfg(mut buf: impl Buf, cfg: &Cfg) -> Result<Self, Error> {
        let result = Self::read_cfg(&mut buf, cfg)?;

        // Check that the buffer is fully consumed.
        let remaining = buf.remaining();
        if remaining > 0 {
            return Err(Error::ExtraData(remaining));
        }
        Ok(result)
    }
}

impl<Cfg, T: Read<Cfg>> Decode<Cfg> for T {}

/// Extension trait providing an ergonomic read method for types requiring no configuration.
pub trait ReadExt: Read<()> {
    /// Reads a value using the default `()` config.
    fn read(buf: &mut impl Buf) -> Result<Self, Error> {
        <Self as Read<()>>::read_cfg(buf, &())
    }
}

impl<T: Read<()>> ReadExt for T {}

/// Extension trait providing ergonomic decode method for types requiring no configuration.
pub trait DecodeExt: Decode<()> {
    /// Decodes a value using the default `()` config.
    fn decode(buf: impl Buf) -> Result<Self, Error> {
        <Self as Decode<()>>::decode_cfg(buf, &())
    }
}

impl<T: Decode<()>> DecodeExt for T {}

/// Checks that at least `len` bytes remain in the buffer.
#[inline]
pub fn at_least<B: Buf>(buf: &mut B, len: usize) -> Result<(), Error> {
    let rem = buf.remaining();
    if rem < len {
        return Err(Error::EndOfBuffer);
    }
    Ok(())
}

/// Protocol Buffers style variable-length encoding of lengths.
pub mod varint {
    use super::Error;
    use bytes::{Buf, BufMut};

    const DATA_BITS_MASK: u8 = 0x7F;
    const CONTINUATION_BIT_MASK: u8 = 0x80;

    /// Encodes a `u32` as a varint.
    pub fn write(value: u32, buf: &mut impl BufMut) {
        let mut val = value;
        while val >= CONTINUATION_BIT_MASK as u32 {
            buf.put_u8((val as u8) | CONTINUATION_BIT_MASK);
            val >>= 7;
        }
        buf.put_u8(val as u8);
    }

    /// Decodes a `u32` from a varint.
    pub fn read(buf: &mut impl Buf) -> Result<u32, Error> {
        let mut result: u32 = 0;
        let mut shift = 0u32;
        loop {
            if !buf.has_remaining() {
                return Err(Error::EndOfBuffer);
            }
            let byte = buf.get_u8();

            // The fifth byte may only carry the top four bits.
            if shift == 28 && byte > 0x0F {
                return Err(Error::InvalidVarint);
            }
            result |= ((byte & DATA_BITS_MASK) as u32) << shift;
            if byte & CONTINUATION_BIT_MASK == 0 {
                // Reject non-canonical (zero-padded) encodings.
                if byte == 0 && shift > 0 {
                    return Err(Error::InvalidVarint);
                }
                return Ok(result);
            }
            shift += 7;
        }
    }

    /// Returns the number of bytes needed to encode `value`.
    pub fn size(value: u32) -> usize {
        let bits = 32 - value.leading_zeros() as usize;
        bits.div_ceil(7).max(1)
    }
}

macro_rules! impl_uint {
    ($type:ty, $put:ident, $get:ident) => {
        impl Write for $type {
            #[inline]
            fn write(&self, buf: &mut impl BufMut) {
                buf.$put(*self);
            }
        }

        impl FixedSize for $type {
            const SIZE: usize = std::mem::size_of::<$type>();
        }

        impl Read for $type {
            #[inline]
            fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, Error> {
                at_least(buf, std::mem::size_of::<$type>())?;
                Ok(buf.$get())
            }
        }
    };
}
impl_uint!(u8, put_u8, get_u8);
impl_uint!(u16, put_u16, get_u16);
impl_uint!(u32, put_u32, get_u32);
impl_uint!(u64, put_u64, get_u64);

impl Write for bool {
    #[inline]
    fn write(&self, buf: &mut impl BufMut) {
        buf.put_u8(u8::from(*self));
    }
}

impl FixedSize for bool {
    const SIZE: usize = 1;
}

impl Read for bool {
    #[inline]
    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, Error> {
        match u8::read(buf)? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(Error::InvalidBool),
        }
    }
}

impl<const N: usize> Write for [u8; N] {
    #[inline]
    fn write(&self, buf: &mut impl BufMut) {
        buf.put_slice(self);
    }
}

impl<const N: usize> FixedSize for [u8; N] {
    const SIZE: usize = N;
}

impl<const N: usize> Read for [u8; N] {
    #[inline]
    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, Error> {
        at_least(buf, N)?;
        let mut dst = [0; N];
        buf.copy_to_slice(&mut dst);
        Ok(dst)
    }
}

impl<T: Write> Write for Vec<T> {
    #[inline]
    fn write(&self, buf: &mut impl BufMut) {
        let len = u32::try_from(self.len()).expect("Vec length exceeds u32");
        varint::write(len, buf);
        for item in self {
            item.write(buf);
        }
    }
}

impl<T: Write + EncodeSize> EncodeSize for Vec<T> {
    #[inline]
    fn encode_size(&self) -> usize {
        let len = u32::try_from(self.len()).expect("Vec length exceeds u32");
        varint::size(len) + self.iter().map(EncodeSize::encode_size).sum::<usize>()
    }
}

/// Vectors are read with a maximum item count and the item configuration.
impl<Cfg, T: Read<Cfg>> Read<(usize, Cfg)> for Vec<T> {
    #[inline]
    fn read_cfg(buf: &mut impl Buf, (max, cfg): &(usize, Cfg)) -> Result<Self, Error> {
        let len = varint::read(buf)? as usize;
        if len > *max {
            return Err(Error::InvalidLength(len));
        }
        let mut vec = Vec::with_capacity(len);
        for _ in 0..len {
            vec.push(T::read_cfg(buf, cfg)?);
        }
        Ok(vec)
    }
}

impl<T: Write> Write for Option<T> {
    #[inline]
    fn write(&self, buf: &mut impl BufMut) {
        self.is_some().write(buf);
        if let Some(inner) = self {
            inner.write(buf);
        }
    }
}

impl<T: EncodeSize> EncodeSize for Option<T> {
    #[inline]
    fn encode_size(&self) -> usize {
        1 + self.as_ref().map_or(0, EncodeSize::encode_size)
    }
}

impl<Cfg, T: Read<Cfg>> Read<Cfg> for Option<T> {
    #[inline]
    fn read_cfg(buf: &mut impl Buf, cfg: &Cfg) -> Result<Self, Error> {
        if bool::read(buf)? {
            Ok(Some(T::read_cfg(buf, cfg)?))
        } else {
            Ok(None)
        }
    }
}
