use super::{
    dimensions, embed,
    generators::{blinding_generator, value_generator, Generators},
    inner_product::{self, inner_product},
    RangeProof, Transcript, BITS, DOMAIN, MAX_MEMO_LENGTH, MAX_VALUES, SALT_ALPHA, SALT_RHO,
    SALT_TAU1, SALT_TAU2,
};
use crate::{
    common::{hash_with_salt, SALT_GAMMA},
    transaction::TokenId,
    Error,
};
use blsct_primitives::group::{Scalar, G1};
use rand::{CryptoRng, RngCore};
use tracing::trace;

/// Proves that every entry of `values` is a 64-bit amount of `token`.
///
/// Blinding factors are derived from `nonce`, and the first value plus `memo` are embedded so
/// the holder of `nonce` can [recover](super::recover) them. Only the inner-product blinding
/// vectors are drawn from `rng`.
pub fn prove<R: RngCore + CryptoRng>(
    rng: &mut R,
    values: &[u64],
    nonce: &G1,
    memo: &[u8],
    token: &TokenId,
) -> Result<RangeProof, Error> {
    if values.is_empty() || values.len() > MAX_VALUES {
        return Err(Error::TooManyValues(values.len()));
    }
    if memo.len() > MAX_MEMO_LENGTH {
        return Err(Error::MemoTooLong(memo.len()));
    }
    let (m, _) = dimensions(values.len());
    let nm = BITS * m;
    let gens = Generators::get();
    let g = &gens.g[..nm];
    let h = &gens.h[..nm];
    let value_base = value_generator(token);
    let blinding_base = blinding_generator();

    // Commit to each value
    let gammas = (0..values.len())
        .map(|j| {
            let gamma = hash_with_salt(nonce, SALT_GAMMA + j as u64);
            if gamma.is_zero() {
                return Err(Error::ArithmeticInvariantViolation("zero blinding factor"));
            }
            Ok(gamma)
        })
        .collect::<Result<Vec<_>, _>>()?;
    let vs: Vec<G1> = values
        .iter()
        .zip(&gammas)
        .map(|(v, gamma)| G1::msm(&[value_base, blinding_base], &[Scalar::from_u64(*v), *gamma]))
        .collect();

    let mut transcript = Transcript::new(DOMAIN);
    transcript.append_u64(b"n", BITS as u64);
    transcript.append_u64(b"m", m as u64);
    for v in &vs {
        transcript.append_point(b"V", v);
    }

    // Blinding factors recoverable from the nonce
    let (msg1, msg2) = embed(values[0], memo);
    let alpha = hash_with_salt(nonce, SALT_ALPHA) + msg1;
    let rho = hash_with_salt(nonce, SALT_RHO);
    let tau1 = hash_with_salt(nonce, SALT_TAU1) + msg2;
    let tau2 = hash_with_salt(nonce, SALT_TAU2);

    // Bit decomposition, padded with zero values
    let mut a_l = Vec::with_capacity(nm);
    for j in 0..m {
        let v = values.get(j).copied().unwrap_or(0);
        for i in 0..BITS {
            a_l.push(Scalar::from_u64((v >> i) & 1));
        }
    }
    let a_r: Vec<Scalar> = a_l.iter().map(|bit| *bit - Scalar::one()).collect();
    let s_l: Vec<Scalar> = (0..nm).map(|_| Scalar::rand(rng)).collect();
    let s_r: Vec<Scalar> = (0..nm).map(|_| Scalar::rand(rng)).collect();

    // A = alpha*G + <a_L, G_vec> + <a_R, H_vec>, S = rho*G + <s_L, G_vec> + <s_R, H_vec>
    let bases: Vec<G1> = [blinding_base]
        .iter()
        .chain(g)
        .chain(h)
        .copied()
        .collect();
    let a_scalars: Vec<Scalar> = [alpha]
        .into_iter()
        .chain(a_l.iter().copied())
        .chain(a_r.iter().copied())
        .collect();
    let s_scalars: Vec<Scalar> = [rho]
        .into_iter()
        .chain(s_l.iter().copied())
        .chain(s_r.iter().copied())
        .collect();
    let a_commit = G1::msm(&bases, &a_scalars);
    let s_commit = G1::msm(&bases, &s_scalars);
    transcript.append_point(b"A", &a_commit);
    transcript.append_point(b"S", &s_commit);
    let y = transcript.challenge_scalar(b"y");
    let z = transcript.challenge_scalar(b"z");

    // l(X) = (a_L - z) + s_L*X, r(X) = y^i * (a_R + z + s_R*X) + z^(2+j) * 2^k
    let y_powers = y.powers(nm);
    let z_powers = z.powers(m + 2);
    let two_powers = Scalar::from_u64(2).powers(BITS);
    let l0: Vec<Scalar> = a_l.iter().map(|a| *a - z).collect();
    let r0: Vec<Scalar> = (0..nm)
        .map(|i| y_powers[i] * (a_r[i] + z) + z_powers[2 + i / BITS] * two_powers[i % BITS])
        .collect();
    let r1: Vec<Scalar> = (0..nm).map(|i| y_powers[i] * s_r[i]).collect();

    // t(X) = t0 + t1*X + t2*X^2
    let t1 = inner_product(&l0, &r1) + inner_product(&s_l, &r0);
    let t2 = inner_product(&s_l, &r1);
    let t1_commit = G1::msm(&[value_base, blinding_base], &[t1, tau1]);
    let t2_commit = G1::msm(&[value_base, blinding_base], &[t2, tau2]);
    transcript.append_point(b"T1", &t1_commit);
    transcript.append_point(b"T2", &t2_commit);
    let x = transcript.challenge_scalar(b"x");

    let l: Vec<Scalar> = (0..nm).map(|i| l0[i] + s_l[i] * x).collect();
    let r: Vec<Scalar> = (0..nm).map(|i| r0[i] + r1[i] * x).collect();
    let t_hat = inner_product(&l, &r);
    let tau_x = tau2 * x * x
        + tau1 * x
        + gammas
            .iter()
            .enumerate()
            .map(|(j, gamma)| z_powers[2 + j] * *gamma)
            .sum::<Scalar>();
    let mu = alpha + rho * x;
    transcript.append_scalar(b"t_x", &t_hat);
    transcript.append_scalar(b"t_x_blinding", &tau_x);
    transcript.append_scalar(b"e_blinding", &mu);
    let w = transcript.challenge_scalar(b"w");

    // Fold into a single inner-product argument over H'_i = y^-i * H_i
    let y_inv = y.inverse().ok_or(Error::ArithmeticInvariantViolation("zero challenge"))?;
    let ipa = inner_product::prove(
        &mut transcript,
        &(value_base * w),
        &y_inv.powers(nm),
        g.to_vec(),
        h.to_vec(),
        l,
        r,
    );
    trace!(values = values.len(), rounds = ipa.ls.len(), "proved range");

    Ok(RangeProof {
        vs,
        a_commit,
        s_commit,
        t1: t1_commit,
        t2: t2_commit,
        tau_x,
        mu,
        t_hat,
        ls: ipa.ls,
        rs: ipa.rs,
        a: ipa.a,
        b: ipa.b,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_prove_rejects_bad_inputs() {
        let mut rng = StdRng::seed_from_u64(0);
        let nonce = G1::generator();
        let token = TokenId::default();
        assert_eq!(
            prove(&mut rng, &[], &nonce, b"", &token),
            Err(Error::TooManyValues(0))
        );
        assert_eq!(
            prove(&mut rng, &[1; MAX_VALUES + 1], &nonce, b"", &token),
            Err(Error::TooManyValues(MAX_VALUES + 1))
        );
        assert_eq!(
            prove(&mut rng, &[1], &nonce, &[0; MAX_MEMO_LENGTH + 1], &token),
            Err(Error::MemoTooLong(MAX_MEMO_LENGTH + 1))
        );
    }

    #[test]
    fn test_commitments_bound_to_nonce() {
        let mut rng = StdRng::seed_from_u64(1);
        let nonce = G1::generator() * Scalar::rand(&mut rng);
        let token = TokenId::default();
        let proof = prove(&mut rng, &[7, 9], &nonce, b"", &token).unwrap();
        assert_eq!(proof.commitments().len(), 2);
        for (j, (v, value)) in proof.commitments().iter().zip([7u64, 9]).enumerate() {
            let gamma = hash_with_salt(&nonce, SALT_GAMMA + j as u64);
            let expected = value_generator(&token) * Scalar::from_u64(value)
                + blinding_generator() * gamma;
            assert_eq!(*v, expected);
        }
    }
}
