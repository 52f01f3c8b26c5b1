//! Neff's verifiable shuffle of ElGamal pairs.
//!
//! Given pairs `(X_i, Y_i)` under bases `(g, h)`, the shuffle outputs
//! `X̄_i = β_{π(i)}·g + X_{π(i)}` and `Ȳ_i = β_{π(i)}·h + Y_{π(i)}` and
//! proves it with five rounds followed by an embedded simple k-shuffle.
//!
//! Transcript order: `Γ, A[], C[], U[], W[], Λ1, Λ2`, challenge `ρ[]`,
//! `D[]`, challenge `λ`, `σ[], τ`, then the simple shuffle.

use std::marker::PhantomData;

use ark_ec::CurveGroup;
use ark_ff::{UniformRand, Zero};
use ark_std::rand::Rng;

use super::error::ShuffleError;
use super::simple::SimpleShuffle;
use super::{invert_permutation, random_permutation};
use crate::proof::{
    Prover, ProverContext, ProverContextExt, Verifier, VerifierContext, VerifierContextExt,
};

const LOG_TARGET: &str = "zk_mix::shuffle::pair";

/// First prover message.
struct Commitments<C> {
    gamma: C,
    a: Vec<C>,
    c: Vec<C>,
    u: Vec<C>,
    w: Vec<C>,
    lambda1: C,
    lambda2: C,
}

impl<C: CurveGroup> Commitments<C> {
    fn put(&self, ctx: &mut dyn ProverContext<C>) -> Result<(), ShuffleError> {
        ctx.put_point(self.gamma)?;
        ctx.put_points(&self.a)?;
        ctx.put_points(&self.c)?;
        ctx.put_points(&self.u)?;
        ctx.put_points(&self.w)?;
        ctx.put_points(&[self.lambda1, self.lambda2])?;
        Ok(())
    }

    fn get(k: usize, ctx: &mut dyn VerifierContext<C>) -> Result<Self, ShuffleError> {
        let gamma = ctx.get_point()?;
        let a = ctx.get_points(k)?;
        let c = ctx.get_points(k)?;
        let u = ctx.get_points(k)?;
        let w = ctx.get_points(k)?;
        let lambda1 = ctx.get_point()?;
        let lambda2 = ctx.get_point()?;
        Ok(Self {
            gamma,
            a,
            c,
            u,
            w,
            lambda1,
            lambda2,
        })
    }
}

/// Pair shuffle of a fixed size `k`.
#[derive(Clone, Copy, Debug)]
pub struct PairShuffle<C: CurveGroup> {
    k: usize,
    _group: PhantomData<C>,
}

impl<C: CurveGroup> PairShuffle<C> {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            _group: PhantomData,
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Proves that the outputs were produced from `(x, y)` with permutation
    /// `pi` and blinding factors `beta`.
    ///
    /// # Panics
    ///
    /// Panics if `k <= 1` or any input does not hold exactly `k` elements.
    #[allow(clippy::too_many_arguments)]
    pub fn prove(
        &self,
        pi: &[usize],
        g: C,
        h: C,
        beta: &[C::ScalarField],
        x: &[C],
        y: &[C],
        ctx: &mut dyn ProverContext<C>,
    ) -> Result<(), ShuffleError> {
        let k = self.k;
        assert!(k > 1, "can't shuffle permutation of size <= 1");
        assert!(
            pi.len() == k && beta.len() == k && x.len() == k && y.len() == k,
            "mismatched vector lengths"
        );
        let piinv = invert_permutation(pi);

        let mut rand = ctx.pri_rand(3 * k + 2).into_iter();
        let mut take = |n: usize| -> Vec<C::ScalarField> { rand.by_ref().take(n).collect() };
        let u = take(k);
        let w = take(k);
        let a = take(k);
        let tail = take(2);
        let (tau0, gamma) = (tail[0], tail[1]);

        let mut wbetasum = tau0;
        let mut lambda1 = C::zero();
        let mut lambda2 = C::zero();
        for i in 0..k {
            wbetasum += w[i] * beta[pi[i]];
            let wu = w[piinv[i]] - u[i];
            lambda1 += x[i] * wu;
            lambda2 += y[i] * wu;
        }
        lambda1 += g * wbetasum;
        lambda2 += h * wbetasum;

        let p1 = Commitments {
            gamma: g * gamma,
            a: a.iter().map(|ai| g * *ai).collect(),
            c: (0..k).map(|i| g * (gamma * a[pi[i]])).collect(),
            u: u.iter().map(|ui| g * *ui).collect(),
            w: w.iter().map(|wi| g * (gamma * wi)).collect(),
            lambda1,
            lambda2,
        };
        p1.put(ctx)?;

        let rho = ctx.pub_rand(k)?;
        let b: Vec<C::ScalarField> = rho.iter().zip(&u).map(|(r, u)| *r - u).collect();
        let d: Vec<C> = (0..k).map(|i| g * (gamma * b[pi[i]])).collect();
        ctx.put_points(&d)?;

        let lambda = ctx.pub_rand_scalar()?;
        let r: Vec<C::ScalarField> = a.iter().zip(&b).map(|(a, b)| *a + lambda * b).collect();
        let s: Vec<C::ScalarField> = (0..k).map(|i| gamma * r[pi[i]]).collect();
        let sigma: Vec<C::ScalarField> = (0..k).map(|i| w[i] + b[pi[i]]).collect();
        let tau = b
            .iter()
            .zip(beta)
            .fold(-tau0, |acc, (b, beta)| acc + *b * beta);
        ctx.put_scalars(&sigma)?;
        ctx.put_scalar(tau)?;

        SimpleShuffle::new(k).prove(g, gamma, &r, &s, ctx)
    }

    /// Verifies a pair shuffle of `(x, y)` into `(xbar, ybar)`.
    #[allow(clippy::too_many_arguments)]
    pub fn verify(
        &self,
        g: C,
        h: C,
        x: &[C],
        y: &[C],
        xbar: &[C],
        ybar: &[C],
        ctx: &mut dyn VerifierContext<C>,
    ) -> Result<(), ShuffleError> {
        let k = self.k;
        if x.len() != k || y.len() != k || xbar.len() != k || ybar.len() != k {
            return Err(ShuffleError::Dimension(format!(
                "pair shuffle of size {k} got inputs of size {}/{}/{}/{}",
                x.len(),
                y.len(),
                xbar.len(),
                ybar.len()
            )));
        }

        let p1 = Commitments::get(k, ctx)?;
        let rho = ctx.pub_rand(k)?;
        let b: Vec<C> = rho.iter().zip(&p1.u).map(|(r, u)| g * *r - u).collect();
        let d = ctx.get_points(k)?;
        let lambda = ctx.pub_rand_scalar()?;
        let sigma = ctx.get_scalars(k)?;
        let tau = ctx.get_scalar()?;

        let (r_pts, s_pts) = SimpleShuffle::new(k).verify(g, p1.gamma, ctx)?;

        // The simple shuffle must run on the committed (r, s) exponents.
        for i in 0..k {
            if r_pts[i] != p1.a[i] + b[i] * lambda || s_pts[i] != p1.c[i] + d[i] * lambda {
                tracing::debug!(target: LOG_TARGET, i, "simple shuffle not bound to commitments");
                return Err(ShuffleError::InvalidShuffle);
            }
        }

        let mut phi1 = C::zero();
        let mut phi2 = C::zero();
        for i in 0..k {
            phi1 += xbar[i] * sigma[i] - x[i] * rho[i];
            phi2 += ybar[i] * sigma[i] - y[i] * rho[i];
            if p1.gamma * sigma[i] != p1.w[i] + d[i] {
                tracing::debug!(target: LOG_TARGET, i, "sigma check failed");
                return Err(ShuffleError::InvalidShuffle);
            }
        }
        if p1.lambda1 + g * tau != phi1 || p1.lambda2 + h * tau != phi2 {
            tracing::debug!(target: LOG_TARGET, "lambda check failed");
            return Err(ShuffleError::InvalidShuffle);
        }
        Ok(())
    }
}

fn apply<C: CurveGroup>(pi: &[usize], base: C, beta: &[C::ScalarField], input: &[C]) -> Vec<C> {
    pi.iter().map(|&p| base * beta[p] + input[p]).collect()
}

/// Shuffles `(x, y)` under a fresh random permutation and blinding factors.
///
/// Returns the shuffled pairs and a prover for them.
///
/// # Panics
///
/// Panics if `x` and `y` differ in length.
#[tracing::instrument(target = LOG_TARGET, skip_all, fields(k = x.len()))]
pub fn shuffle<C, R>(
    g: C,
    h: C,
    x: &[C],
    y: &[C],
    rng: &mut R,
) -> (Vec<C>, Vec<C>, Prover<C, ShuffleError>)
where
    C: CurveGroup,
    R: Rng + ?Sized,
{
    assert_eq!(x.len(), y.len(), "X,Y vectors have inconsistent length");
    let k = x.len();
    let pi = random_permutation(k, rng);
    let beta: Vec<C::ScalarField> = (0..k).map(|_| C::ScalarField::rand(rng)).collect();
    shuffle_with(pi, beta, g, h, x.to_vec(), y.to_vec())
}

/// Shuffles `(x, y)` with a caller-chosen permutation and blinding factors.
pub fn shuffle_with<C: CurveGroup>(
    pi: Vec<usize>,
    beta: Vec<C::ScalarField>,
    g: C,
    h: C,
    x: Vec<C>,
    y: Vec<C>,
) -> (Vec<C>, Vec<C>, Prover<C, ShuffleError>) {
    let xbar = apply(&pi, g, &beta, &x);
    let ybar = apply(&pi, h, &beta, &y);
    let prover: Prover<C, ShuffleError> = Box::new(move |ctx: &mut dyn ProverContext<C>| {
        PairShuffle::new(x.len()).prove(&pi, g, h, &beta, &x, &y, ctx)
    });
    (xbar, ybar, prover)
}

/// Builds a verifier for a pair shuffle of `(x, y)` into `(xbar, ybar)`.
pub fn verifier<C: CurveGroup>(
    g: C,
    h: C,
    x: Vec<C>,
    y: Vec<C>,
    xbar: Vec<C>,
    ybar: Vec<C>,
) -> Verifier<C, ShuffleError> {
    Box::new(move |ctx: &mut dyn VerifierContext<C>| {
        PairShuffle::new(x.len()).verify(g, h, &x, &y, &xbar, &ybar, ctx)
    })
}
