//! Inner-product argument.
//!
//! Proves knowledge of `a`, `b` such that `P = <a, G> + <b, H'> + <a, b>*Q`, where
//! `H'_i = h_factors[i] * H_i`, in `log2(n)` rounds of folding.

use super::transcript::Transcript;
use crate::Error;
use blsct_primitives::group::{Scalar, G1};

/// The `(L, R)` pairs and final scalars of an inner-product argument.
pub(super) struct Proof {
    pub ls: Vec<G1>,
    pub rs: Vec<G1>,
    pub a: Scalar,
    pub b: Scalar,
}

/// Returns `<a, b>`.
pub(super) fn inner_product(a: &[Scalar], b: &[Scalar]) -> Scalar {
    a.iter().zip(b).map(|(a, b)| *a * *b).sum()
}

/// Runs the prover.
///
/// # Panics
///
/// Panics if the inputs have different lengths or the length is not a power of two.
pub(super) fn prove(
    transcript: &mut Transcript,
    q: &G1,
    h_factors: &[Scalar],
    mut g: Vec<G1>,
    mut h: Vec<G1>,
    mut a: Vec<Scalar>,
    mut b: Vec<Scalar>,
) -> Proof {
    let mut n = g.len();
    assert!(n.is_power_of_two(), "length must be a power of two");
    assert!(
        h.len() == n && a.len() == n && b.len() == n && h_factors.len() == n,
        "mismatched lengths"
    );
    transcript.append_u64(b"ipa_n", n as u64);

    // Only the first round sees the factors, later rounds fold them into H
    let mut factors = h_factors.to_vec();
    let rounds = n.trailing_zeros() as usize;
    let mut ls = Vec::with_capacity(rounds);
    let mut rs = Vec::with_capacity(rounds);
    while n > 1 {
        n /= 2;
        let (a_l, a_r) = a.split_at(n);
        let (b_l, b_r) = b.split_at(n);
        let (g_l, g_r) = g.split_at(n);
        let (h_l, h_r) = h.split_at(n);
        let (f_l, f_r) = factors.split_at(n);

        let c_l = inner_product(a_l, b_r);
        let c_r = inner_product(a_r, b_l);

        let points_l: Vec<G1> = g_r.iter().chain(h_l).chain([q]).copied().collect();
        let scalars_l: Vec<Scalar> = a_l
            .iter()
            .copied()
            .chain(b_r.iter().zip(f_l).map(|(b, f)| *b * *f))
            .chain([c_l])
            .collect();
        let l = G1::msm(&points_l, &scalars_l);

        let points_r: Vec<G1> = g_l.iter().chain(h_r).chain([q]).copied().collect();
        let scalars_r: Vec<Scalar> = a_r
            .iter()
            .copied()
            .chain(b_l.iter().zip(f_r).map(|(b, f)| *b * *f))
            .chain([c_r])
            .collect();
        let r = G1::msm(&points_r, &scalars_r);

        transcript.append_point(b"L", &l);
        transcript.append_point(b"R", &r);
        let u = transcript.challenge_scalar(b"u");
        let u_inv = u.inverse().expect("challenges are never zero");

        let a_next = (0..n).map(|i| a_l[i] * u + a_r[i] * u_inv).collect();
        let b_next = (0..n).map(|i| b_l[i] * u_inv + b_r[i] * u).collect();
        let g_next = (0..n).map(|i| g_l[i] * u_inv + g_r[i] * u).collect();
        let h_next = (0..n)
            .map(|i| h_l[i] * (u * f_l[i]) + h_r[i] * (u_inv * f_r[i]))
            .collect();
        a = a_next;
        b = b_next;
        g = g_next;
        h = h_next;
        factors = vec![Scalar::one(); n];

        ls.push(l);
        rs.push(r);
    }

    Proof {
        ls,
        rs,
        a: a[0],
        b: b[0],
    }
}

/// Challenges replayed by the verifier.
pub(super) struct VerificationScalars {
    /// `u_i^2` for each round.
    pub u_sq: Vec<Scalar>,
    /// `u_i^-2` for each round.
    pub u_inv_sq: Vec<Scalar>,
    /// Coefficient of `G_i` after all folds (the coefficient of `H_i` is `s[n - 1 - i]`).
    pub s: Vec<Scalar>,
}

/// Replays the rounds of a proof of length `n` and computes the folded generator coefficients.
pub(super) fn verification_scalars(
    transcript: &mut Transcript,
    n: usize,
    ls: &[G1],
    rs: &[G1],
) -> Result<VerificationScalars, Error> {
    let rounds = ls.len();
    if rs.len() != rounds || !n.is_power_of_two() || n.trailing_zeros() as usize != rounds {
        return Err(Error::ProofFailure);
    }
    transcript.append_u64(b"ipa_n", n as u64);

    let mut u = Vec::with_capacity(rounds);
    for (l, r) in ls.iter().zip(rs) {
        transcript.append_point(b"L", l);
        transcript.append_point(b"R", r);
        u.push(transcript.challenge_scalar(b"u"));
    }
    let u_inv = u
        .iter()
        .map(Scalar::inverse)
        .collect::<Option<Vec<_>>>()
        .ok_or(Error::ProofFailure)?;
    let u_sq: Vec<Scalar> = u.iter().map(|u| *u * *u).collect();
    let u_inv_sq: Vec<Scalar> = u_inv.iter().map(|u| *u * *u).collect();

    // s_0 is the product of all inverses, every other s_i flips the bits of i one at a time
    let mut s = Vec::with_capacity(n);
    s.push(u_inv.iter().copied().fold(Scalar::one(), |acc, u| acc * u));
    for i in 1..n {
        let lg_i = (usize::BITS - 1 - i.leading_zeros()) as usize;
        let k = 1 << lg_i;
        s.push(s[i - k] * u_sq[rounds - 1 - lg_i]);
    }

    Ok(VerificationScalars { u_sq, u_inv_sq, s })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn random_points(rng: &mut StdRng, n: usize) -> Vec<G1> {
        (0..n)
            .map(|_| G1::generator() * Scalar::rand(rng))
            .collect()
    }

    fn random_scalars(rng: &mut StdRng, n: usize) -> Vec<Scalar> {
        (0..n).map(|_| Scalar::rand(rng)).collect()
    }

    fn check(n: usize, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        let g = random_points(&mut rng, n);
        let h = random_points(&mut rng, n);
        let q = G1::generator() * Scalar::rand(&mut rng);
        let a = random_scalars(&mut rng, n);
        let b = random_scalars(&mut rng, n);
        let y_inv = Scalar::rand(&mut rng);
        let factors = y_inv.powers(n);

        // P = <a, G> + <b, H'> + <a, b>Q
        let c = inner_product(&a, &b);
        let scaled_b: Vec<Scalar> = b.iter().zip(&factors).map(|(b, f)| *b * *f).collect();
        let p = G1::msm(&g, &a) + G1::msm(&h, &scaled_b) + q * c;

        let mut prover = Transcript::new(b"test");
        let proof = prove(
            &mut prover,
            &q,
            &factors,
            g.clone(),
            h.clone(),
            a,
            b,
        );
        assert_eq!(proof.ls.len(), n.trailing_zeros() as usize);

        let mut verifier = Transcript::new(b"test");
        let scalars = verification_scalars(&mut verifier, n, &proof.ls, &proof.rs).unwrap();

        // <a*s, G> + <b*s^-1 * factors, H> + ab*Q == P + sum(u^2 L + u^-2 R)
        let g_scalars: Vec<Scalar> = scalars.s.iter().map(|s| proof.a * *s).collect();
        let h_scalars: Vec<Scalar> = (0..n)
            .map(|i| proof.b * scalars.s[n - 1 - i] * factors[i])
            .collect();
        let lhs = G1::msm(&g, &g_scalars) + G1::msm(&h, &h_scalars) + q * (proof.a * proof.b);
        let rhs = p
            + G1::msm(&proof.ls, &scalars.u_sq)
            + G1::msm(&proof.rs, &scalars.u_inv_sq);
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn test_inner_product_argument() {
        check(1, 0);
        check(2, 1);
        check(8, 2);
        check(64, 3);
    }

    #[test]
    fn test_verification_scalars_rejects_mismatch() {
        let mut transcript = Transcript::new(b"test");
        let points = vec![G1::generator(); 3];
        assert!(verification_scalars(&mut transcript, 16, &points, &points).is_err());
        assert!(verification_scalars(&mut transcript, 8, &points, &points[..2]).is_err());
    }
}
