//! Aggregated, rewindable Bulletproofs range proofs over G1.
//!
//! A proof shows that each of up to [MAX_VALUES] commitments `V_j = v_j*H + gamma_j*G` opens to a
//! value in `[0, 2^64)`, where `H` is the value generator of the proof's token and `G` is the
//! blinding generator.
//!
//! # Rewinding
//!
//! Every blinding factor a proof depends on is derived from a shared `nonce` point:
//!
//! ```text
//! gamma_j = H(nonce, 100 + j)
//! alpha   = H(nonce, 1) + msg1
//! rho     = H(nonce, 2)
//! tau1    = H(nonce, 3) + msg2
//! tau2    = H(nonce, 4)
//! ```
//!
//! `msg1` carries the first value and the start of the memo, `msg2` the rest of the memo. Anyone
//! who knows `nonce` can solve `mu = alpha + rho*x` and `tau_x = tau2*x^2 + tau1*x + sum(z^(2+j) *
//! gamma_j)` for `msg1` and `msg2`, then confirm the result against `V_0` (see [recover]).
//!
//! # Batching
//!
//! [verify] checks any number of proofs (over any mix of tokens) with one multi-scalar
//! multiplication. Each proof's equations are scaled by fresh random weights, so a single invalid
//! proof fails the whole batch with overwhelming probability.

use blsct_primitives::{
    codec::{Error as CodecError, EncodeSize, FixedSize, Read, ReadExt, Write},
    group::{Scalar, G1},
};
use bytes::{Buf, BufMut};

mod generators;
mod inner_product;
mod prove;
mod recover;
mod transcript;
mod verify;

pub use generators::{blinding_generator, value_generator};
pub use prove::prove;
pub use recover::{recover, Recovered};
pub use verify::verify;

use transcript::Transcript;

/// Bit width of every proven value.
pub const BITS: usize = 64;

/// Maximum number of values in one proof.
pub const MAX_VALUES: usize = 16;

/// Memo bytes carried in `msg1`.
const MEMO_FIRST_LENGTH: usize = 22;

/// Memo bytes carried in `msg2`.
const MEMO_SECOND_LENGTH: usize = 31;

/// Maximum memo length that can be embedded in a proof.
pub const MAX_MEMO_LENGTH: usize = MEMO_FIRST_LENGTH + MEMO_SECOND_LENGTH;

/// Salts of the nonce-derived blinding factors.
const SALT_ALPHA: u64 = 1;
const SALT_RHO: u64 = 2;
const SALT_TAU1: u64 = 3;
const SALT_TAU2: u64 = 4;

const DOMAIN: &[u8] = b"range_proof";

/// Returns the padded number of values and the number of inner-product rounds for `values`
/// commitments.
fn dimensions(values: usize) -> (usize, usize) {
    let m = values.next_power_of_two();
    let rounds = (BITS * m).trailing_zeros() as usize;
    (m, rounds)
}

/// An aggregated range proof.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RangeProof {
    /// Value commitments, one per proven value.
    pub vs: Vec<G1>,
    pub a_commit: G1,
    pub s_commit: G1,
    pub t1: G1,
    pub t2: G1,
    pub tau_x: Scalar,
    pub mu: Scalar,
    pub t_hat: Scalar,
    pub ls: Vec<G1>,
    pub rs: Vec<G1>,
    pub a: Scalar,
    pub b: Scalar,
}

/// Fiat-Shamir challenges of one proof.
struct Challenges {
    y: Scalar,
    z: Scalar,
    x: Scalar,
    w: Scalar,
}

impl RangeProof {
    /// Returns the value commitments.
    pub fn commitments(&self) -> &[G1] {
        &self.vs
    }

    /// Replays the transcript up to (and including) `w`, leaving it ready for the inner-product
    /// rounds.
    fn replay(&self) -> (Transcript, Challenges) {
        let (m, _) = dimensions(self.vs.len());
        let mut transcript = Transcript::new(DOMAIN);
        transcript.append_u64(b"n", BITS as u64);
        transcript.append_u64(b"m", m as u64);
        for v in &self.vs {
            transcript.append_point(b"V", v);
        }
        transcript.append_point(b"A", &self.a_commit);
        transcript.append_point(b"S", &self.s_commit);
        let y = transcript.challenge_scalar(b"y");
        let z = transcript.challenge_scalar(b"z");
        transcript.append_point(b"T1", &self.t1);
        transcript.append_point(b"T2", &self.t2);
        let x = transcript.challenge_scalar(b"x");
        transcript.append_scalar(b"t_x", &self.t_hat);
        transcript.append_scalar(b"t_x_blinding", &self.tau_x);
        transcript.append_scalar(b"e_blinding", &self.mu);
        let w = transcript.challenge_scalar(b"w");
        (transcript, Challenges { y, z, x, w })
    }
}

/// Packs the first value and the memo into the two embedded messages.
///
/// `msg1 = 0 || len || memo[..22] || amount_be`, `msg2 = 0 || memo[22..]`. The leading zero byte
/// keeps both below the group order.
fn embed(amount: u64, memo: &[u8]) -> (Scalar, Scalar) {
    let first = memo.len().min(MEMO_FIRST_LENGTH);
    let mut msg1 = [0u8; 32];
    msg1[1] = memo.len() as u8;
    msg1[2..2 + first].copy_from_slice(&memo[..first]);
    msg1[24..].copy_from_slice(&amount.to_be_bytes());

    let mut msg2 = [0u8; 32];
    msg2[1..1 + memo.len() - first].copy_from_slice(&memo[first..]);
    (Scalar::map(&msg1), Scalar::map(&msg2))
}

/// Inverse of [embed]. Returns `None` if either message is not a valid packing.
fn extract(msg1: &Scalar, msg2: &Scalar) -> Option<(u64, Vec<u8>)> {
    let msg1 = msg1.to_bytes();
    let msg2 = msg2.to_bytes();
    if msg1[0] != 0 || msg2[0] != 0 {
        return None;
    }
    let len = msg1[1] as usize;
    if len > MAX_MEMO_LENGTH {
        return None;
    }

    let mut memo = Vec::with_capacity(MAX_MEMO_LENGTH);
    memo.extend_from_slice(&msg1[2..2 + MEMO_FIRST_LENGTH]);
    memo.extend_from_slice(&msg2[1..]);
    if memo[len..].iter().any(|b| *b != 0) {
        return None;
    }
    memo.truncate(len);

    let mut amount = [0u8; 8];
    amount.copy_from_slice(&msg1[24..]);
    Some((u64::from_be_bytes(amount), memo))
}

impl Write for RangeProof {
    fn write(&self, buf: &mut impl BufMut) {
        self.vs.write(buf);
        self.a_commit.write(buf);
        self.s_commit.write(buf);
        self.t1.write(buf);
        self.t2.write(buf);
        self.tau_x.write(buf);
        self.mu.write(buf);
        self.t_hat.write(buf);
        self.ls.write(buf);
        self.rs.write(buf);
        self.a.write(buf);
        self.b.write(buf);
    }
}

impl EncodeSize for RangeProof {
    fn encode_size(&self) -> usize {
        self.vs.encode_size()
            + 4 * G1::SIZE
            + 5 * Scalar::SIZE
            + self.ls.encode_size()
            + self.rs.encode_size()
    }
}

impl Read for RangeProof {
    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, CodecError> {
        let vs = Vec::<G1>::read_cfg(buf, &(MAX_VALUES, ()))?;
        if vs.is_empty() {
            return Err(CodecError::Invalid("RangeProof", "no commitments"));
        }
        let (_, rounds) = dimensions(vs.len());
        let a_commit = G1::read(buf)?;
        let s_commit = G1::read(buf)?;
        let t1 = G1::read(buf)?;
        let t2 = G1::read(buf)?;
        let tau_x = Scalar::read(buf)?;
        let mu = Scalar::read(buf)?;
        let t_hat = Scalar::read(buf)?;
        let ls = Vec::<G1>::read_cfg(buf, &(rounds, ()))?;
        let rs = Vec::<G1>::read_cfg(buf, &(rounds, ()))?;
        if ls.len() != rounds || rs.len() != rounds {
            return Err(CodecError::Invalid("RangeProof", "wrong number of rounds"));
        }
        let a = Scalar::read(buf)?;
        let b = Scalar::read(buf)?;
        Ok(Self {
            vs,
            a_commit,
            s_commit,
            t1,
            t2,
            tau_x,
            mu,
            t_hat,
            ls,
            rs,
            a,
            b,
        })
    }
}
