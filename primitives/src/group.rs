//! Group operations over BLS12-381.
//!
//! This module wraps `blst` to provide the scalar field, G1 (keys and commitments),
//! G2 (signatures), multi-scalar multiplication, and a pairing product check.
//!
//! Arithmetic leans on [`std::ops`] so the familiar `+`, `-`, `*` operators can be used.
//!
//! # Warning
//!
//! Ensure that points are checked to belong to the correct subgroup
//! (G1 or G2) to prevent small subgroup attacks. This is particularly important
//! when handling deserialized points or points received from untrusted sources. This
//! is already taken care of for you if you use the provided `from_bytes` and `Read`
//! implementations.

use crate::codec::{at_least, Error as CodecError, FixedSize, Read, Write};
use blst::{
    blst_bendian_from_scalar, blst_final_exp, blst_fp12, blst_fp12_is_one, blst_fp12_mul, blst_fr,
    blst_fr_add, blst_fr_cneg, blst_fr_from_scalar, blst_fr_from_uint64, blst_fr_inverse,
    blst_fr_mul, blst_fr_sub, blst_hash_to_g1, blst_hash_to_g2, blst_keygen_v3,
    blst_lendian_from_scalar, blst_miller_loop, blst_p1, blst_p1_add_or_double, blst_p1_affine,
    blst_p1_cneg, blst_p1_compress, blst_p1_from_affine, blst_p1_in_g1, blst_p1_is_inf,
    blst_p1_mult, blst_p1_to_affine, blst_p1_uncompress, blst_p2, blst_p2_add_or_double,
    blst_p2_affine, blst_p2_cneg, blst_p2_compress, blst_p2_from_affine, blst_p2_in_g2,
    blst_p2_is_inf, blst_p2_mult, blst_p2_to_affine, blst_p2_uncompress, blst_scalar,
    blst_scalar_from_be_bytes, blst_scalar_from_bendian, blst_scalar_fr_check,
    blst_scalar_from_fr, p1_affines, BLS12_381_G1, BLS12_381_G2, BLST_ERROR,
};
use bytes::{Buf, BufMut};
use rand::RngCore;
use std::{
    iter::Sum,
    ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign},
    ptr,
};
use zeroize::Zeroize;

/// Length of a canonically encoded scalar.
pub const SCALAR_LENGTH: usize = 32;

/// Length of a compressed G1 element.
pub const G1_ELEMENT_BYTE_LENGTH: usize = 48;

/// Length of a compressed G2 element.
pub const G2_ELEMENT_BYTE_LENGTH: usize = 96;

/// Domain separation tag for hashing a message to G2 (basic scheme).
pub const DST_G2: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_NUL_";

/// An element of the scalar field (integers modulo the group order `r`).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
#[repr(transparent)]
pub struct Scalar(blst_fr);

/// `R = 2^256 mod q` in little-endian Montgomery form which is equivalent to 1 in little-endian
/// non-Montgomery form.
///
/// mod(2^256, 0x73eda753299d7d483339d80809a1d80553bda402fffe5bfeffffffff00000001) = 0x1824b159acc5056f998c4fefecbc4ff55884b7fa0003480200000001fffffffe
// Reference: https://github.com/filecoin-project/blstrs/blob/ffbb41d1495d84e40a712583346439924603b49a/src/scalar.rs#L77-L89
const BLST_FR_ONE: Scalar = Scalar(blst_fr {
    l: [
        0x0000_0001_ffff_fffe,
        0x5884_b7fa_0003_4802,
        0x998c_4fef_ecbc_4ff5,
        0x1824_b159_acc5_056f,
    ],
});

/// A point in G1.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[repr(transparent)]
pub struct G1(blst_p1);

/// A point in G2.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[repr(transparent)]
pub struct G2(blst_p2);

/// Returns the size in bits of a given blst_scalar (represented in little-endian).
fn bits(scalar: &blst_scalar) -> usize {
    let mut bits: usize = SCALAR_LENGTH * 8;
    for i in scalar.b.iter().rev() {
        let leading = i.leading_zeros();
        bits -= leading as usize;
        if leading < 8 {
            break;
        }
    }
    bits
}

impl Scalar {
    /// Returns the additive identity.
    pub const fn zero() -> Self {
        Self(blst_fr { l: [0; 4] })
    }

    /// Returns the multiplicative identity.
    pub const fn one() -> Self {
        BLST_FR_ONE
    }

    /// Generates a random, non-zero scalar using the provided RNG.
    pub fn rand<R: RngCore>(rng: &mut R) -> Self {
        // Generate a random 64 byte buffer
        let mut ikm = [0u8; 64];
        rng.fill_bytes(&mut ikm);

        // Generate a scalar from the randomly populated buffer (KeyGen never returns zero)
        let mut ret = blst_fr::default();
        unsafe {
            let mut sc = blst_scalar::default();
            blst_keygen_v3(&mut sc, ikm.as_ptr(), ikm.len(), ptr::null(), 0);
            blst_fr_from_scalar(&mut ret, &sc);
        }
        ikm.zeroize();
        Self(ret)
    }

    /// Returns the scalar corresponding to the provided integer.
    pub fn from_u64(i: u64) -> Self {
        // blst requires a buffer of 4 uint64 values. Failure to provide one will
        // result in unexpected behavior (will read past the provided buffer).
        //
        // Reference: https://github.com/supranational/blst/blob/415d4f0e2347a794091836a3065206edfd9c72f3/bindings/blst.h#L102
        let buffer = [i, 0, 0, 0];
        let mut ret = blst_fr::default();
        unsafe { blst_fr_from_uint64(&mut ret, buffer.as_ptr()) };
        Self(ret)
    }

    /// Interprets arbitrary bytes as a big-endian integer and reduces it modulo the group order.
    pub fn map(bytes: &[u8]) -> Self {
        let mut ret = blst_fr::default();
        unsafe {
            let mut scalar = blst_scalar::default();
            blst_scalar_from_be_bytes(&mut scalar, bytes.as_ptr(), bytes.len());
            blst_fr_from_scalar(&mut ret, &scalar);
        }
        Self(ret)
    }

    /// Returns whether the scalar is zero.
    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }

    /// Computes the inverse of the scalar.
    pub fn inverse(&self) -> Option<Self> {
        if self.is_zero() {
            return None;
        }
        let mut ret = blst_fr::default();
        unsafe { blst_fr_inverse(&mut ret, &self.0) };
        Some(Self(ret))
    }

    /// Returns `[1, self, self^2, ..., self^(n-1)]`.
    pub fn powers(&self, n: usize) -> Vec<Self> {
        let mut ret = Vec::with_capacity(n);
        let mut current = Self::one();
        for _ in 0..n {
            ret.push(current);
            current *= *self;
        }
        ret
    }

    /// Canonical big-endian encoding.
    pub fn to_bytes(&self) -> [u8; SCALAR_LENGTH] {
        let mut bytes = [0u8; SCALAR_LENGTH];
        unsafe {
            let mut scalar = blst_scalar::default();
            blst_scalar_from_fr(&mut scalar, &self.0);
            blst_bendian_from_scalar(bytes.as_mut_ptr(), &scalar);
        }
        bytes
    }

    /// Little-endian encoding (the layout expected by multi-scalar multiplication).
    pub fn to_le_bytes(&self) -> [u8; SCALAR_LENGTH] {
        let mut bytes = [0u8; SCALAR_LENGTH];
        unsafe {
            let mut scalar = blst_scalar::default();
            blst_scalar_from_fr(&mut scalar, &self.0);
            blst_lendian_from_scalar(bytes.as_mut_ptr(), &scalar);
        }
        bytes
    }

    /// Decodes a canonical big-endian encoding, rejecting values not less than the group order.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != SCALAR_LENGTH {
            return None;
        }
        let mut ret = blst_fr::default();
        unsafe {
            let mut scalar = blst_scalar::default();
            blst_scalar_from_bendian(&mut scalar, bytes.as_ptr());
            if !blst_scalar_fr_check(&scalar) {
                return None;
            }
            blst_fr_from_scalar(&mut ret, &scalar);
        }
        Some(Self(ret))
    }

    fn to_blst(self) -> blst_scalar {
        let mut scalar = blst_scalar::default();
        unsafe { blst_scalar_from_fr(&mut scalar, &self.0) };
        scalar
    }
}

impl Zeroize for Scalar {
    fn zeroize(&mut self) {
        self.0.l.zeroize();
    }
}

impl AddAssign for Scalar {
    fn add_assign(&mut self, rhs: Self) {
        unsafe { blst_fr_add(&mut self.0, &self.0, &rhs.0) };
    }
}

impl Add for Scalar {
    type Output = Self;
    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl SubAssign for Scalar {
    fn sub_assign(&mut self, rhs: Self) {
        unsafe { blst_fr_sub(&mut self.0, &self.0, &rhs.0) };
    }
}

impl Sub for Scalar {
    type Output = Self;
    fn sub(mut self, rhs: Self) -> Self {
        self -= rhs;
        self
    }
}

impl MulAssign for Scalar {
    fn mul_assign(&mut self, rhs: Self) {
        unsafe { blst_fr_mul(&mut self.0, &self.0, &rhs.0) };
    }
}

impl Mul for Scalar {
    type Output = Self;
    fn mul(mut self, rhs: Self) -> Self {
        self *= rhs;
        self
    }
}

impl Neg for Scalar {
    type Output = Self;
    fn neg(self) -> Self {
        let mut ret = blst_fr::default();
        unsafe { blst_fr_cneg(&mut ret, &self.0, true) };
        Self(ret)
    }
}

impl Sum for Scalar {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, s| acc + s)
    }
}

impl Write for Scalar {
    fn write(&self, buf: &mut impl BufMut) {
        buf.put_slice(&self.to_bytes());
    }
}

impl Read for Scalar {
    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        at_least(buf, SCALAR_LENGTH)?;
        let mut bytes = [0u8; SCALAR_LENGTH];
        buf.copy_to_slice(&mut bytes);
        Self::from_bytes(&bytes).ok_or(CodecError::Invalid("Scalar", "not canonical"))
    }
}

impl FixedSize for Scalar {
    const SIZE: usize = SCALAR_LENGTH;
}

impl G1 {
    /// Returns the identity.
    pub fn zero() -> Self {
        Self(blst_p1::default())
    }

    /// Returns the standard generator.
    pub fn generator() -> Self {
        let mut ret = blst_p1::default();
        unsafe {
            blst_p1_from_affine(&mut ret, &BLS12_381_G1);
        }
        Self(ret)
    }

    /// Maps the provided data to a group element using the given domain separation tag.
    pub fn hash(dst: &[u8], message: &[u8]) -> Self {
        let mut ret = blst_p1::default();
        unsafe {
            blst_hash_to_g1(
                &mut ret,
                message.as_ptr(),
                message.len(),
                dst.as_ptr(),
                dst.len(),
                ptr::null(),
                0,
            );
        }
        Self(ret)
    }

    /// Returns whether the point is the identity.
    pub fn is_zero(&self) -> bool {
        unsafe { blst_p1_is_inf(&self.0) }
    }

    /// Compressed encoding.
    pub fn to_bytes(&self) -> [u8; G1_ELEMENT_BYTE_LENGTH] {
        let mut bytes = [0u8; G1_ELEMENT_BYTE_LENGTH];
        unsafe {
            blst_p1_compress(bytes.as_mut_ptr(), &self.0);
        }
        bytes
    }

    /// Decodes a compressed point, rejecting the identity and points outside of G1.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != G1_ELEMENT_BYTE_LENGTH {
            return None;
        }
        let mut ret = blst_p1::default();
        unsafe {
            let mut affine = blst_p1_affine::default();
            if blst_p1_uncompress(&mut affine, bytes.as_ptr()) != BLST_ERROR::BLST_SUCCESS {
                return None;
            }
            blst_p1_from_affine(&mut ret, &affine);

            // Verify that deserialized element isn't infinite
            if blst_p1_is_inf(&ret) {
                return None;
            }

            // Verify that the deserialized element is in G1
            if !blst_p1_in_g1(&ret) {
                return None;
            }
        }
        Some(Self(ret))
    }

    /// Computes `sum(points[i] * scalars[i])` with a single multi-scalar multiplication.
    ///
    /// Pairs with an identity point or a zero scalar contribute nothing and are skipped.
    pub fn msm(points: &[G1], scalars: &[Scalar]) -> Self {
        assert_eq!(points.len(), scalars.len(), "mismatched lengths");
        let mut filtered = Vec::with_capacity(points.len());
        let mut bytes = Vec::with_capacity(points.len() * SCALAR_LENGTH);
        for (point, scalar) in points.iter().zip(scalars) {
            if point.is_zero() || scalar.is_zero() {
                continue;
            }
            filtered.push(point.0);
            bytes.extend_from_slice(&scalar.to_le_bytes());
        }
        if filtered.is_empty() {
            return Self::zero();
        }
        let affines = p1_affines::from(&filtered);
        Self(affines.mult(&bytes, 255))
    }
}

impl AddAssign for G1 {
    fn add_assign(&mut self, rhs: Self) {
        unsafe { blst_p1_add_or_double(&mut self.0, &self.0, &rhs.0) };
    }
}

impl Add for G1 {
    type Output = Self;
    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl Neg for G1 {
    type Output = Self;
    fn neg(mut self) -> Self {
        unsafe { blst_p1_cneg(&mut self.0, true) };
        self
    }
}

impl SubAssign for G1 {
    fn sub_assign(&mut self, rhs: Self) {
        *self += -rhs;
    }
}

impl Sub for G1 {
    type Output = Self;
    fn sub(mut self, rhs: Self) -> Self {
        self -= rhs;
        self
    }
}

impl MulAssign<Scalar> for G1 {
    fn mul_assign(&mut self, rhs: Scalar) {
        if rhs.is_zero() {
            *self = Self::zero();
            return;
        }
        let scalar = rhs.to_blst();
        unsafe { blst_p1_mult(&mut self.0, &self.0, scalar.b.as_ptr(), bits(&scalar)) };
    }
}

impl Mul<Scalar> for G1 {
    type Output = Self;
    fn mul(mut self, rhs: Scalar) -> Self {
        self *= rhs;
        self
    }
}

impl Sum for G1 {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, p| acc + p)
    }
}

impl Write for G1 {
    fn write(&self, buf: &mut impl BufMut) {
        buf.put_slice(&self.to_bytes());
    }
}

impl Read for G1 {
    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        at_least(buf, G1_ELEMENT_BYTE_LENGTH)?;
        let mut bytes = [0u8; G1_ELEMENT_BYTE_LENGTH];
        buf.copy_to_slice(&mut bytes);
        Self::from_bytes(&bytes).ok_or(CodecError::Invalid("G1", "invalid point"))
    }
}

impl FixedSize for G1 {
    const SIZE: usize = G1_ELEMENT_BYTE_LENGTH;
}

impl G2 {
    /// Returns the identity.
    pub fn zero() -> Self {
        Self(blst_p2::default())
    }

    /// Returns the standard generator.
    pub fn generator() -> Self {
        let mut ret = blst_p2::default();
        unsafe {
            blst_p2_from_affine(&mut ret, &BLS12_381_G2);
        }
        Self(ret)
    }

    /// Maps the provided data to a group element using the given domain separation tag.
    pub fn hash(dst: &[u8], message: &[u8]) -> Self {
        let mut ret = blst_p2::default();
        unsafe {
            blst_hash_to_g2(
                &mut ret,
                message.as_ptr(),
                message.len(),
                dst.as_ptr(),
                dst.len(),
                ptr::null(),
                0,
            );
        }
        Self(ret)
    }

    /// Returns whether the point is the identity.
    pub fn is_zero(&self) -> bool {
        unsafe { blst_p2_is_inf(&self.0) }
    }

    /// Compressed encoding.
    pub fn to_bytes(&self) -> [u8; G2_ELEMENT_BYTE_LENGTH] {
        let mut bytes = [0u8; G2_ELEMENT_BYTE_LENGTH];
        unsafe {
            blst_p2_compress(bytes.as_mut_ptr(), &self.0);
        }
        bytes
    }

    /// Decodes a compressed point, rejecting points outside of G2.
    ///
    /// Unlike G1, the identity is accepted: it is the aggregate of an empty set of signatures.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != G2_ELEMENT_BYTE_LENGTH {
            return None;
        }
        let mut ret = blst_p2::default();
        unsafe {
            let mut affine = blst_p2_affine::default();
            if blst_p2_uncompress(&mut affine, bytes.as_ptr()) != BLST_ERROR::BLST_SUCCESS {
                return None;
            }
            blst_p2_from_affine(&mut ret, &affine);

            // Verify that the deserialized element is in G2
            if !blst_p2_is_inf(&ret) && !blst_p2_in_g2(&ret) {
                return None;
            }
        }
        Some(Self(ret))
    }
}

impl AddAssign for G2 {
    fn add_assign(&mut self, rhs: Self) {
        unsafe { blst_p2_add_or_double(&mut self.0, &self.0, &rhs.0) };
    }
}

impl Add for G2 {
    type Output = Self;
    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl Neg for G2 {
    type Output = Self;
    fn neg(mut self) -> Self {
        unsafe { blst_p2_cneg(&mut self.0, true) };
        self
    }
}

impl MulAssign<Scalar> for G2 {
    fn mul_assign(&mut self, rhs: Scalar) {
        if rhs.is_zero() {
            *self = Self::zero();
            return;
        }
        let scalar = rhs.to_blst();
        unsafe { blst_p2_mult(&mut self.0, &self.0, scalar.b.as_ptr(), bits(&scalar)) };
    }
}

impl Mul<Scalar> for G2 {
    type Output = Self;
    fn mul(mut self, rhs: Scalar) -> Self {
        self *= rhs;
        self
    }
}

impl Sum for G2 {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, p| acc + p)
    }
}

impl Write for G2 {
    fn write(&self, buf: &mut impl BufMut) {
        buf.put_slice(&self.to_bytes());
    }
}

impl Read for G2 {
    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        at_least(buf, G2_ELEMENT_BYTE_LENGTH)?;
        let mut bytes = [0u8; G2_ELEMENT_BYTE_LENGTH];
        buf.copy_to_slice(&mut bytes);
        Self::from_bytes(&bytes).ok_or(CodecError::Invalid("G2", "invalid point"))
    }
}

impl FixedSize for G2 {
    const SIZE: usize = G2_ELEMENT_BYTE_LENGTH;
}

/// Returns whether `prod(e(p_i, q_i)) == 1`.
///
/// Pairs where either side is the identity contribute one and are skipped.
// Reference: https://github.com/MystenLabs/fastcrypto/blob/bd4999bd3e901eab34ae3dd96dbe38b86ac646a7/fastcrypto/src/groups/bls12381.rs#L223-L234
pub fn pairing_product_is_one(pairs: &[(G1, G2)]) -> bool {
    let mut acc = blst_fp12::default();
    for (p, q) in pairs {
        if p.is_zero() || q.is_zero() {
            continue;
        }
        let mut pa = blst_p1_affine::default();
        let mut qa = blst_p2_affine::default();
        let mut res = blst_fp12::default();
        unsafe {
            blst_p1_to_affine(&mut pa, &p.0);
            blst_p2_to_affine(&mut qa, &q.0);
            blst_miller_loop(&mut res, &qa, &pa);
            blst_fp12_mul(&mut acc, &acc, &res);
        }
    }
    unsafe {
        blst_final_exp(&mut acc, &acc);
        blst_fp12_is_one(&acc)
    }
}
