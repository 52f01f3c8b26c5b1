//! Verifiable shuffles of ElGamal pairs after Neff.
//!
//! [`pair::shuffle`] re-randomizes and permutes a list of ElGamal pairs and
//! returns a prover for the result, built on the simple k-shuffle of
//! [`simple`]. [`biffle`] handles the two-element case through a disjunctive
//! sigma proof, and [`sequences`] shuffles several parallel lists under one
//! permutation. All provers and verifiers run against the transcript
//! contexts of [`crate::proof`].

pub mod biffle;
pub mod elgamal;
pub mod error;
pub mod pair;
pub mod sequences;
pub mod simple;

use ark_std::rand::Rng;

pub use elgamal::{ElGamalCiphertext, ElGamalKeys};
pub use error::ShuffleError;
pub use pair::{shuffle, shuffle_with, verifier, PairShuffle};
pub use simple::SimpleShuffle;

/// Draws a uniform permutation of `0..k` with Fisher-Yates swaps.
pub fn random_permutation<R: Rng + ?Sized>(k: usize, rng: &mut R) -> Vec<usize> {
    let mut pi: Vec<usize> = (0..k).collect();
    for i in (1..k).rev() {
        let j = rng.gen_range(0..=i);
        pi.swap(i, j);
    }
    pi
}

/// Inverse of a permutation given as `pi[i] = image of i`.
pub(crate) fn invert_permutation(pi: &[usize]) -> Vec<usize> {
    let mut inverse = vec![0; pi.len()];
    for (i, &p) in pi.iter().enumerate() {
        inverse[p] = i;
    }
    inverse
}
