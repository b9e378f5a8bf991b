use super::{
    dimensions,
    generators::{blinding_generator, value_generator, Generators},
    inner_product, RangeProof, BITS, MAX_VALUES,
};
use crate::{transaction::TokenId, Error};
use blsct_primitives::group::{Scalar, G1};
use rand::{CryptoRng, RngCore};
use tracing::debug;

/// Computes `delta(y, z) = (z - z^2) * <1, y^nm> - sum_j z^(j+3) * <1, 2^n>`.
fn delta(y_powers: &[Scalar], z: &Scalar, m: usize) -> Scalar {
    let sum_y: Scalar = y_powers.iter().copied().sum();
    let sum_2 = Scalar::from_u64(u64::MAX);
    let z_powers = z.powers(m + 3);
    let sum_z: Scalar = z_powers[3..].iter().copied().sum();
    (*z - *z * *z) * sum_y - sum_z * sum_2
}

/// Verifies every `(proof, token)` pair with a single multi-scalar multiplication.
///
/// Returns [Error::ProofFailure] if any proof is invalid. An empty batch is valid.
pub fn verify<R: RngCore + CryptoRng>(
    rng: &mut R,
    proofs: &[(&RangeProof, TokenId)],
) -> Result<(), Error> {
    if proofs.is_empty() {
        return Ok(());
    }
    let mut max_nm = 0;
    for (proof, _) in proofs {
        if proof.vs.is_empty() || proof.vs.len() > MAX_VALUES {
            return Err(Error::ProofFailure);
        }
        max_nm = max_nm.max(BITS * dimensions(proof.vs.len()).0);
    }

    // Generator scalars are shared by all proofs, everything else is per proof
    let mut g_scalars = vec![Scalar::zero(); max_nm];
    let mut h_scalars = vec![Scalar::zero(); max_nm];
    let mut blinding_scalar = Scalar::zero();
    let mut points = Vec::new();
    let mut scalars = Vec::new();
    let two_powers = Scalar::from_u64(2).powers(BITS);
    for (proof, token) in proofs {
        let (m, _) = dimensions(proof.vs.len());
        let nm = BITS * m;
        let (mut transcript, challenges) = proof.replay();
        let ipa = inner_product::verification_scalars(&mut transcript, nm, &proof.ls, &proof.rs)?;
        let (y, z, x, w) = (challenges.y, challenges.z, challenges.x, challenges.w);
        let y_inv = y.inverse().ok_or(Error::ProofFailure)?;

        // Random weights: one for the whole proof, one separating its two equations
        let weight = Scalar::rand(rng);
        let c = Scalar::rand(rng);

        let y_powers = y.powers(nm);
        let y_inv_powers = y_inv.powers(nm);
        let z_powers = z.powers(m);
        let zz = z * z;
        for i in 0..nm {
            let s = ipa.s[i];
            let s_inv = ipa.s[nm - 1 - i];
            g_scalars[i] += weight * (-z - proof.a * s);
            let z_and_2 = zz * z_powers[i / BITS] * two_powers[i % BITS];
            h_scalars[i] += weight * (z + y_inv_powers[i] * (z_and_2 - proof.b * s_inv));
        }

        points.push(proof.a_commit);
        scalars.push(weight);
        points.push(proof.s_commit);
        scalars.push(weight * x);
        points.push(proof.t1);
        scalars.push(weight * c * x);
        points.push(proof.t2);
        scalars.push(weight * c * x * x);
        for (l, u_sq) in proof.ls.iter().zip(&ipa.u_sq) {
            points.push(*l);
            scalars.push(weight * *u_sq);
        }
        for (r, u_inv_sq) in proof.rs.iter().zip(&ipa.u_inv_sq) {
            points.push(*r);
            scalars.push(weight * *u_inv_sq);
        }
        for (v, z_j) in proof.vs.iter().zip(&z_powers) {
            points.push(*v);
            scalars.push(weight * c * zz * *z_j);
        }
        blinding_scalar += weight * (-proof.mu - c * proof.tau_x);
        points.push(value_generator(token));
        scalars.push(
            weight
                * (w * (proof.t_hat - proof.a * proof.b)
                    + c * (delta(&y_powers, &z, m) - proof.t_hat)),
        );
    }

    let gens = Generators::get();
    points.extend_from_slice(&gens.g[..max_nm]);
    scalars.extend(g_scalars);
    points.extend_from_slice(&gens.h[..max_nm]);
    scalars.extend(h_scalars);
    points.push(blinding_generator());
    scalars.push(blinding_scalar);

    if !G1::msm(&points, &scalars).is_zero() {
        debug!(proofs = proofs.len(), "range proof batch failed");
        return Err(Error::ProofFailure);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range_proof::prove;
    use blsct_primitives::Digest;
    use rand::{rngs::StdRng, SeedableRng};

    fn nonce(rng: &mut StdRng) -> G1 {
        G1::generator() * Scalar::rand(rng)
    }

    #[test]
    fn test_single_proof() {
        let mut rng = StdRng::seed_from_u64(0);
        let token = TokenId::default();
        let n = nonce(&mut rng);
        let proof = prove(&mut rng, &[42], &n, b"memo", &token).unwrap();
        verify(&mut rng, &[(&proof, token)]).unwrap();
    }

    #[test]
    fn test_extreme_values() {
        let mut rng = StdRng::seed_from_u64(1);
        let token = TokenId::default();
        let n = nonce(&mut rng);
        let proof = prove(&mut rng, &[0, u64::MAX, 1], &n, b"", &token).unwrap();
        verify(&mut rng, &[(&proof, token)]).unwrap();
    }

    #[test]
    fn test_batch_mixed_sizes_and_tokens() {
        let mut rng = StdRng::seed_from_u64(2);
        let default = TokenId::default();
        let other = TokenId::new(Digest::from([7u8; 32]), 0);
        let n1 = nonce(&mut rng);
        let n2 = nonce(&mut rng);
        let n3 = nonce(&mut rng);
        let p1 = prove(&mut rng, &[1], &n1, b"", &default).unwrap();
        let p2 = prove(&mut rng, &[5, 6, 7, 8, 9], &n2, b"", &other).unwrap();
        let p3 = prove(&mut rng, &[1000, 2000], &n3, b"x", &default).unwrap();
        verify(&mut rng, &[(&p1, default), (&p2, other), (&p3, default)]).unwrap();

        // The token is part of the statement
        assert_eq!(
            verify(&mut rng, &[(&p2, default)]),
            Err(Error::ProofFailure)
        );
    }

    #[test]
    fn test_one_bad_proof_fails_batch() {
        let mut rng = StdRng::seed_from_u64(3);
        let token = TokenId::default();
        let proofs: Vec<RangeProof> = (0..4u64)
            .map(|i| {
                let n = nonce(&mut rng);
                prove(&mut rng, &[i * 100], &n, b"", &token).unwrap()
            })
            .collect();
        let batch: Vec<(&RangeProof, TokenId)> = proofs.iter().map(|p| (p, token)).collect();
        verify(&mut rng, &batch).unwrap();

        // Tamper with one proof's inner product, which isolated verification also rejects
        let mut bad = proofs[2].clone();
        bad.t_hat += Scalar::one();
        assert_eq!(
            verify(&mut rng, &[(&bad, token)]),
            Err(Error::ProofFailure)
        );
        let mut batch: Vec<(&RangeProof, TokenId)> = proofs.iter().map(|p| (p, token)).collect();
        batch[2] = (&bad, token);
        assert_eq!(verify(&mut rng, &batch), Err(Error::ProofFailure));
    }

    #[test]
    fn test_tampered_commitment_fails() {
        let mut rng = StdRng::seed_from_u64(4);
        let token = TokenId::default();
        let n = nonce(&mut rng);
        let mut proof = prove(&mut rng, &[10], &n, b"", &token).unwrap();
        proof.vs[0] += value_generator(&token);
        assert_eq!(
            verify(&mut rng, &[(&proof, token)]),
            Err(Error::ProofFailure)
        );
    }

    #[test]
    fn test_wrong_round_count_fails() {
        let mut rng = StdRng::seed_from_u64(5);
        let token = TokenId::default();
        let n = nonce(&mut rng);
        let mut proof = prove(&mut rng, &[10], &n, b"", &token).unwrap();
        proof.ls.pop();
        assert_eq!(
            verify(&mut rng, &[(&proof, token)]),
            Err(Error::ProofFailure)
        );
    }

    #[test]
    fn test_empty_batch() {
        let mut rng = StdRng::seed_from_u64(6);
        verify(&mut rng, &[]).unwrap();
    }
}
