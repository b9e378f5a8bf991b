//! Fiat-Shamir transcript for range proofs.
//!
//! Every append is framed as `tag || len(label) || label || data` so distinct sequences of
//! appends never produce the same state.

use blsct_primitives::{
    group::{Scalar, G1},
    Sha256,
};

const DST_RANGE_PROOF: &[u8] = b"BLSCT_RANGE_PROOF_V1";
const DST_CHALLENGE: &[u8] = b"challenge";
const DST_POINT: &[u8] = b"point";
const DST_SCALAR: &[u8] = b"scalar";
const DST_U64: &[u8] = b"u64";

/// A transcript accumulating public proof data.
#[derive(Clone)]
pub struct Transcript {
    state: Vec<u8>,
}

impl Transcript {
    /// Creates a new transcript with the given domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut state = Vec::new();
        state.extend_from_slice(DST_RANGE_PROOF);
        state.extend_from_slice(&(domain.len() as u32).to_le_bytes());
        state.extend_from_slice(domain);
        Self { state }
    }

    fn label(&mut self, tag: &[u8], label: &[u8]) {
        self.state.extend_from_slice(tag);
        self.state.extend_from_slice(&(label.len() as u32).to_le_bytes());
        self.state.extend_from_slice(label);
    }

    pub fn append_point(&mut self, label: &[u8], point: &G1) {
        self.label(DST_POINT, label);
        self.state.extend_from_slice(&point.to_bytes());
    }

    pub fn append_scalar(&mut self, label: &[u8], scalar: &Scalar) {
        self.label(DST_SCALAR, label);
        self.state.extend_from_slice(&scalar.to_bytes());
    }

    pub fn append_u64(&mut self, label: &[u8], value: u64) {
        self.label(DST_U64, label);
        self.state.extend_from_slice(&value.to_le_bytes());
    }

    /// Derives a challenge from everything appended so far.
    ///
    /// The challenge is folded back into the state, so consecutive challenges differ even with
    /// no appends in between. Never returns zero.
    pub fn challenge_scalar(&mut self, label: &[u8]) -> Scalar {
        self.label(DST_CHALLENGE, label);
        let mut hasher = Sha256::new();
        loop {
            let digest = hasher.update(&self.state).finalize();
            self.state.extend_from_slice(&digest);
            let challenge = Scalar::map(&digest);
            if !challenge.is_zero() {
                return challenge;
            }
        }
    }
}
