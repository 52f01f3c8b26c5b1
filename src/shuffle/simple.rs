//! Neff's simple k-shuffle: proves that `Y_i = G·y_i` is a permutation of
//! `γ·X_i = γ·G·x_i` for a known `γ`, given `Γ = G·γ`.

use std::marker::PhantomData;

use ark_ec::CurveGroup;
use ark_ff::{Field, Zero};

use super::error::ShuffleError;
use crate::proof::{ProverContext, ProverContextExt, VerifierContext, VerifierContextExt};

const LOG_TARGET: &str = "zk_mix::shuffle::simple";

/// Simple k-shuffle of a fixed size `k`.
#[derive(Clone, Copy, Debug)]
pub struct SimpleShuffle<C: CurveGroup> {
    k: usize,
    _group: PhantomData<C>,
}

/// Checks `A·a - B·b == T`.
fn thver<C: CurveGroup>(a_pt: C, b_pt: C, t: C, a: C::ScalarField, b: C::ScalarField) -> bool {
    a_pt * a - b_pt * b == t
}

impl<C: CurveGroup> SimpleShuffle<C> {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            _group: PhantomData,
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Proves the shuffle of `x` into `y`.
    ///
    /// # Panics
    ///
    /// Panics unless `x` and `y` both hold exactly `k > 1` elements.
    pub fn prove(
        &self,
        g: C,
        gamma: C::ScalarField,
        x: &[C::ScalarField],
        y: &[C::ScalarField],
        ctx: &mut dyn ProverContext<C>,
    ) -> Result<(), ShuffleError> {
        let k = self.k;
        assert!(k > 1, "can't shuffle length 1 vector");
        assert!(x.len() == k && y.len() == k, "mismatched vector lengths");

        let big_x: Vec<C> = x.iter().map(|xi| g * *xi).collect();
        let big_y: Vec<C> = y.iter().map(|yi| g * *yi).collect();
        ctx.put_points(&big_x)?;
        ctx.put_points(&big_y)?;

        let t = ctx.pub_rand_scalar()?;
        let gamma_t = gamma * t;
        let xhat: Vec<C::ScalarField> = x.iter().map(|xi| *xi - t).collect();
        let yhat: Vec<C::ScalarField> = y.iter().map(|yi| *yi - gamma_t).collect();

        let thlen = 2 * k - 1;
        let theta = ctx.pri_rand(thlen);
        let mut big_theta = Vec::with_capacity(thlen + 1);
        big_theta.push(g * (-(theta[0] * yhat[0])));
        for i in 1..k {
            big_theta.push(g * (theta[i - 1] * xhat[i] - theta[i] * yhat[i]));
        }
        for i in k..thlen {
            big_theta.push(g * (theta[i - 1] * gamma - theta[i]));
        }
        big_theta.push(g * (theta[thlen - 1] * gamma));
        ctx.put_points(&big_theta)?;

        let c = ctx.pub_rand_scalar()?;
        let mut alpha = vec![C::ScalarField::zero(); thlen];
        let mut runprod = c;
        for i in 0..k {
            let yhat_inv = yhat[i]
                .inverse()
                .ok_or(ShuffleError::Degenerate("zero shifted output exponent"))?;
            runprod *= xhat[i] * yhat_inv;
            alpha[i] = theta[i] + runprod;
        }
        let gamma_inv = gamma
            .inverse()
            .ok_or(ShuffleError::Degenerate("zero common factor"))?;
        let mut rungamma = c;
        for i in 1..k {
            rungamma *= gamma_inv;
            alpha[thlen - i] = theta[thlen - i] + rungamma;
        }
        ctx.put_scalars(&alpha)?;
        Ok(())
    }

    /// Verifies a simple shuffle against `Γ = G·γ` and returns the proven
    /// `(X, Y)` vectors, which the caller must bind to its own statement.
    pub fn verify(
        &self,
        g: C,
        big_gamma: C,
        ctx: &mut dyn VerifierContext<C>,
    ) -> Result<(Vec<C>, Vec<C>), ShuffleError> {
        let k = self.k;
        if k <= 1 {
            return Err(ShuffleError::MalformedProof(format!(
                "simple shuffle of size {k}"
            )));
        }

        let big_x = ctx.get_points(k)?;
        let big_y = ctx.get_points(k)?;
        let t = ctx.pub_rand_scalar()?;
        let thlen = 2 * k - 1;
        let theta = ctx.get_points(thlen + 1)?;
        let c = ctx.pub_rand_scalar()?;
        let alpha = ctx.get_scalars(thlen)?;

        let u = g * (-t);
        let w = big_gamma * (-t);
        let xhat: Vec<C> = big_x.iter().map(|p| *p + u).collect();
        let yhat: Vec<C> = big_y.iter().map(|p| *p + w).collect();

        let mut good = thver(xhat[0], yhat[0], theta[0], c, alpha[0]);
        for i in 1..k {
            good &= thver(xhat[i], yhat[i], theta[i], alpha[i - 1], alpha[i]);
        }
        for i in k..thlen {
            good &= thver(big_gamma, g, theta[i], alpha[i - 1], alpha[i]);
        }
        good &= thver(big_gamma, g, theta[thlen], alpha[thlen - 1], c);

        if !good {
            tracing::debug!(target: LOG_TARGET, k, "simple shuffle check failed");
            return Err(ShuffleError::InvalidShuffle);
        }
        Ok((big_x, big_y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proof::{hash_prove, hash_verify};
    use crate::shuffle::random_permutation;
    use ark_bn254::{Fr, G1Projective};
    use ark_ec::PrimeGroup;
    use ark_ff::UniformRand;
    use ark_std::rand::{rngs::StdRng, SeedableRng};

    const PROTOCOL: &[u8] = b"simple shuffle test";

    fn instance(k: usize, rng: &mut StdRng) -> (Fr, Vec<Fr>, Vec<Fr>) {
        let gamma = Fr::rand(rng);
        let x: Vec<Fr> = (0..k).map(|_| Fr::rand(rng)).collect();
        let pi = random_permutation(k, rng);
        let y = pi.iter().map(|&p| gamma * x[p]).collect();
        (gamma, x, y)
    }

    fn prove(gamma: Fr, x: &[Fr], y: &[Fr], rng: &mut StdRng) -> Vec<u8> {
        let g = G1Projective::generator();
        let ss = SimpleShuffle::<G1Projective>::new(x.len());
        hash_prove(PROTOCOL, rng, |ctx: &mut dyn ProverContext<G1Projective>| {
            ss.prove(g, gamma, x, y, ctx)
        })
        .unwrap()
    }

    fn verify(k: usize, gamma: Fr, proof: &[u8]) -> Result<(Vec<G1Projective>, Vec<G1Projective>), ShuffleError> {
        let g = G1Projective::generator();
        let ss = SimpleShuffle::<G1Projective>::new(k);
        let mut out = None;
        hash_verify(PROTOCOL, proof, |ctx: &mut dyn VerifierContext<G1Projective>| {
            out = Some(ss.verify(g, g * gamma, ctx)?);
            Ok::<(), ShuffleError>(())
        })?;
        out.ok_or(ShuffleError::InvalidShuffle)
    }

    #[test]
    fn test_valid_shuffle_verifies() {
        let mut rng = StdRng::seed_from_u64(1);
        let g = G1Projective::generator();
        let (gamma, x, y) = instance(6, &mut rng);
        let proof = prove(gamma, &x, &y, &mut rng);

        let (big_x, big_y) = verify(6, gamma, &proof).unwrap();
        assert_eq!(big_x, x.iter().map(|xi| g * xi).collect::<Vec<_>>());
        assert_eq!(big_y, y.iter().map(|yi| g * yi).collect::<Vec<_>>());
    }

    #[test]
    fn test_non_permutation_is_rejected() {
        let mut rng = StdRng::seed_from_u64(2);
        let (gamma, x, mut y) = instance(5, &mut rng);
        y[3] += Fr::from(1u64);
        let proof = prove(gamma, &x, &y, &mut rng);
        assert_eq!(verify(5, gamma, &proof).unwrap_err(), ShuffleError::InvalidShuffle);
    }

    #[test]
    fn test_wrong_common_factor_is_rejected() {
        let mut rng = StdRng::seed_from_u64(3);
        let (gamma, x, y) = instance(4, &mut rng);
        let proof = prove(gamma, &x, &y, &mut rng);
        assert_eq!(
            verify(4, gamma + Fr::from(1u64), &proof).unwrap_err(),
            ShuffleError::InvalidShuffle
        );
    }

    #[test]
    #[should_panic(expected = "can't shuffle length 1 vector")]
    fn test_single_element_panics() {
        let mut rng = StdRng::seed_from_u64(4);
        let (gamma, x, y) = instance(1, &mut rng);
        prove(gamma, &x, &y, &mut rng);
    }
}
