use super::{
    extract,
    generators::{blinding_generator, value_generator},
    RangeProof, SALT_ALPHA, SALT_RHO, SALT_TAU1, SALT_TAU2,
};
use crate::{
    common::{hash_with_salt, SALT_GAMMA},
    transaction::TokenId,
};
use blsct_primitives::group::{Scalar, G1};

/// The opening of a proof's first commitment, recovered from its nonce.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recovered {
    pub amount: u64,
    pub memo: Vec<u8>,
    pub gamma: Scalar,
}

/// Rewinds `proof` with `nonce`.
///
/// Returns `None` if the proof was not built with `nonce` (or for `token`): the candidate
/// opening must reproduce the first commitment exactly.
pub fn recover(proof: &RangeProof, nonce: &G1, token: &TokenId) -> Option<Recovered> {
    let first = proof.vs.first()?;
    let (_, challenges) = proof.replay();
    let (z, x) = (challenges.z, challenges.x);

    // mu = alpha + rho*x
    let rho = hash_with_salt(nonce, SALT_RHO);
    let msg1 = proof.mu - rho * x - hash_with_salt(nonce, SALT_ALPHA);

    // tau_x = tau2*x^2 + tau1*x + sum(z^(2+j) * gamma_j)
    let gammas: Vec<Scalar> = (0..proof.vs.len())
        .map(|j| hash_with_salt(nonce, SALT_GAMMA + j as u64))
        .collect();
    let z_powers = z.powers(gammas.len() + 2);
    let blinding: Scalar = gammas
        .iter()
        .enumerate()
        .map(|(j, gamma)| z_powers[2 + j] * *gamma)
        .sum();
    let tau2 = hash_with_salt(nonce, SALT_TAU2);
    let tau1 = (proof.tau_x - tau2 * x * x - blinding) * x.inverse()?;
    let msg2 = tau1 - hash_with_salt(nonce, SALT_TAU1);

    let (amount, memo) = extract(&msg1, &msg2)?;
    let gamma = gammas[0];
    let expected = G1::msm(
        &[value_generator(token), blinding_generator()],
        &[Scalar::from_u64(amount), gamma],
    );
    if expected != *first {
        return None;
    }
    Some(Recovered {
        amount,
        memo,
        gamma,
    })
}
