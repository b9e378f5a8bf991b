//! Nothing-up-my-sleeve generators for range proofs.
//!
//! Vector generators are hashed to G1 once per process and shared by every proof. The value
//! generator depends on the token being proven; the blinding generator is the standard G1
//! generator.

use super::{BITS, MAX_VALUES};
use crate::transaction::TokenId;
use blsct_primitives::{codec::Encode, group::G1};
use std::sync::OnceLock;

const DST_VECTOR: &[u8] = b"BLSCT_RANGE_PROOF_VECTOR_G1_XMD:SHA-256_SSWU_RO_";
const DST_TOKEN: &[u8] = b"BLSCT_TOKEN_G1_XMD:SHA-256_SSWU_RO_";

/// Inner-product vector generators.
pub struct Generators {
    pub g: Vec<G1>,
    pub h: Vec<G1>,
}

static GENERATORS: OnceLock<Generators> = OnceLock::new();

impl Generators {
    fn new(size: usize) -> Self {
        let derive = |label: &[u8], i: usize| {
            let mut message = label.to_vec();
            message.extend_from_slice(&(i as u32).to_le_bytes());
            G1::hash(DST_VECTOR, &message)
        };
        Self {
            g: (0..size).map(|i| derive(b"G", i)).collect(),
            h: (0..size).map(|i| derive(b"H", i)).collect(),
        }
    }

    /// Returns the shared generators, sized for the largest aggregated proof.
    pub fn get() -> &'static Self {
        GENERATORS.get_or_init(|| Self::new(BITS * MAX_VALUES))
    }
}

/// Base committing to the amount of `token`.
pub fn value_generator(token: &TokenId) -> G1 {
    G1::hash(DST_TOKEN, &token.encode())
}

/// Base committing to the blinding factor.
pub fn blinding_generator() -> G1 {
    G1::generator()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generators_distinct() {
        let gens = Generators::get();
        assert_eq!(gens.g.len(), BITS * MAX_VALUES);
        assert_eq!(gens.h.len(), BITS * MAX_VALUES);
        let unique: HashSet<_> = gens.g.iter().chain(&gens.h).map(|p| p.to_bytes()).collect();
        assert_eq!(unique.len(), 2 * BITS * MAX_VALUES);
        assert!(!unique.contains(&blinding_generator().to_bytes()));
    }

    #[test]
    fn test_value_generator_per_token() {
        let default = value_generator(&TokenId::default());
        assert_eq!(default, value_generator(&TokenId::default()));
        assert_ne!(default, value_generator(&TokenId::new(Default::default(), 1)));
        assert_ne!(default, blinding_generator());
    }
}
