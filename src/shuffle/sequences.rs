//! Shuffles of several parallel ElGamal sequences under one permutation.
//!
//! Each column `j` holds pairs `(x[j][i], y[j][i])`. All columns are permuted
//! the same way and re-randomized independently. The proof folds the columns
//! into one pair list with verifier-chosen weights `e` and proves that list
//! with [`PairShuffle`].

use ark_ec::CurveGroup;
use ark_ff::{UniformRand, Zero};
use ark_std::rand::Rng;

use super::error::ShuffleError;
use super::pair::{self, PairShuffle};
use super::random_permutation;
use crate::proof::{Prover, ProverContext, Verifier};

const LOG_TARGET: &str = "zk_mix::shuffle::sequences";

/// Checks that `x` and `y` form a non-empty rectangle of the same shape.
fn assert_xy<C>(x: &[Vec<C>], y: &[Vec<C>]) -> Result<(), ShuffleError> {
    if x.is_empty() || y.is_empty() {
        return Err(ShuffleError::Dimension("no sequences to shuffle".into()));
    }
    if x.len() != y.len() {
        return Err(ShuffleError::Dimension(format!(
            "X has {} sequences but Y has {}",
            x.len(),
            y.len()
        )));
    }
    let k = x[0].len();
    if k == 0 {
        return Err(ShuffleError::Dimension("sequences are empty".into()));
    }
    for (j, (xs, ys)) in x.iter().zip(y).enumerate() {
        if xs.len() != k || ys.len() != k {
            return Err(ShuffleError::Dimension(format!(
                "sequence {j} has lengths ({}, {}), expected {k}",
                xs.len(),
                ys.len()
            )));
        }
    }
    Ok(())
}

/// `Σ_j e[j] * columns[j][i]` for every row `i`.
fn fold<C: CurveGroup>(columns: &[Vec<C>], e: &[C::ScalarField]) -> Vec<C> {
    let k = columns.first().map_or(0, Vec::len);
    (0..k)
        .map(|i| {
            columns
                .iter()
                .zip(e)
                .fold(C::zero(), |acc, (column, ej)| acc + column[i] * ej)
        })
        .collect()
}

/// Secret state of a sequences shuffle, able to produce a prover once the
/// folding weights are known.
pub struct SequenceProver<C: CurveGroup> {
    g: C,
    h: C,
    x: Vec<Vec<C>>,
    y: Vec<Vec<C>>,
    pi: Vec<usize>,
    beta: Vec<Vec<C::ScalarField>>,
}

impl<C: CurveGroup> SequenceProver<C> {
    /// Builds the pair shuffle prover for the columns folded with `e`.
    pub fn get_prover(&self, e: &[C::ScalarField]) -> Result<Prover<C, ShuffleError>, ShuffleError> {
        if e.len() != self.x.len() {
            return Err(ShuffleError::Dimension(format!(
                "{} weights for {} sequences",
                e.len(),
                self.x.len()
            )));
        }
        let k = self.pi.len();
        let beta: Vec<C::ScalarField> = (0..k)
            .map(|i| {
                self.beta
                    .iter()
                    .zip(e)
                    .fold(C::ScalarField::zero(), |acc, (column, ej)| acc + column[i] * ej)
            })
            .collect();
        let x_up = fold(&self.x, e);
        let y_up = fold(&self.y, e);
        let (pi, g, h) = (self.pi.clone(), self.g, self.h);
        Ok(Box::new(move |ctx: &mut dyn ProverContext<C>| {
            PairShuffle::new(k).prove(&pi, g, h, &beta, &x_up, &y_up, ctx)
        }))
    }
}

/// Shuffles every column of `(x, y)` under one random permutation.
#[tracing::instrument(target = LOG_TARGET, skip_all, fields(columns = x.len()))]
pub fn sequences_shuffle<C, R>(
    g: C,
    h: C,
    x: &[Vec<C>],
    y: &[Vec<C>],
    rng: &mut R,
) -> Result<(Vec<Vec<C>>, Vec<Vec<C>>, SequenceProver<C>), ShuffleError>
where
    C: CurveGroup,
    R: Rng + ?Sized,
{
    assert_xy(x, y)?;
    let k = x[0].len();
    let pi = random_permutation(k, rng);
    let beta: Vec<Vec<C::ScalarField>> = x
        .iter()
        .map(|_| (0..k).map(|_| C::ScalarField::rand(rng)).collect())
        .collect();

    let permute = |base: C, columns: &[Vec<C>]| -> Vec<Vec<C>> {
        columns
            .iter()
            .zip(&beta)
            .map(|(column, b)| pi.iter().map(|&p| column[p] + base * b[p]).collect())
            .collect()
    };
    let xbar = permute(g, x);
    let ybar = permute(h, y);
    tracing::debug!(target: LOG_TARGET, k, "sequences shuffled");

    let prover = SequenceProver {
        g,
        h,
        x: x.to_vec(),
        y: y.to_vec(),
        pi,
        beta,
    };
    Ok((xbar, ybar, prover))
}

/// Folds inputs and outputs with `e`, returning `(X, Y, Xbar, Ybar)` for a
/// pair shuffle check.
#[allow(clippy::type_complexity)]
pub fn sequence_verifiable<C: CurveGroup>(
    x: &[Vec<C>],
    y: &[Vec<C>],
    xbar: &[Vec<C>],
    ybar: &[Vec<C>],
    e: &[C::ScalarField],
) -> Result<(Vec<C>, Vec<C>, Vec<C>, Vec<C>), ShuffleError> {
    assert_xy(x, y)?;
    assert_xy(xbar, ybar)?;
    if xbar.len() != x.len() || xbar[0].len() != x[0].len() {
        return Err(ShuffleError::Dimension(
            "shuffled sequences differ in shape from the inputs".into(),
        ));
    }
    if e.len() != x.len() {
        return Err(ShuffleError::Dimension(format!(
            "{} weights for {} sequences",
            e.len(),
            x.len()
        )));
    }
    Ok((fold(x, e), fold(y, e), fold(xbar, e), fold(ybar, e)))
}

/// Builds a verifier for a sequences shuffle folded with `e`.
pub fn sequences_verifier<C: CurveGroup>(
    g: C,
    h: C,
    x: &[Vec<C>],
    y: &[Vec<C>],
    xbar: &[Vec<C>],
    ybar: &[Vec<C>],
    e: &[C::ScalarField],
) -> Result<Verifier<C, ShuffleError>, ShuffleError> {
    let (x_up, y_up, xbar_up, ybar_up) = sequence_verifiable(x, y, xbar, ybar, e)?;
    Ok(pair::verifier(g, h, x_up, y_up, xbar_up, ybar_up))
}
