//! Sigma-protocol proofs of knowledge over discrete-log representations.
//!
//! A [`Predicate`] states knowledge of secrets in Camenisch–Stadler notation,
//! e.g. `X=x*B && Y=x*H`. It compiles into a [`Prover`] and a [`Verifier`],
//! which are run against a transcript context: [`hash_prove`]/[`hash_verify`]
//! for Fiat-Shamir proofs, or [`deniable::deniable_prover`] for interactive
//! multi-party proofs whose challenges come from every participant.
//!
//! The same contexts drive other protocols built on this module, such as the
//! shuffles in [`crate::shuffle`].

pub mod clique;
pub mod deniable;
pub mod dleq;
pub mod error;
pub mod hash;
pub mod predicate;
mod prover;
mod verifier;

use ark_ec::CurveGroup;

pub use error::{InvalidProofKind, ProofError};
pub use hash::{hash_prove, hash_verify, HashProver, HashVerifier};
pub use predicate::{Predicate, PointVar, PublicValues, SecretValues, SecretVar, Term, VarTable};

/// Transcript as seen by a prover.
///
/// Messages are sent with the `put_*` methods; [`ProverContext::pub_rand`]
/// ends the current message and returns challenge material that depends on
/// everything sent so far.
pub trait ProverContext<C: CurveGroup> {
    fn put_points(&mut self, points: &[C]) -> Result<(), ProofError>;

    fn put_scalars(&mut self, scalars: &[C::ScalarField]) -> Result<(), ProofError>;

    /// Public randomness shared with the verifier.
    fn pub_rand(&mut self, n: usize) -> Result<Vec<C::ScalarField>, ProofError>;

    /// Private randomness, never revealed.
    fn pri_rand(&mut self, n: usize) -> Vec<C::ScalarField>;
}

/// Transcript as seen by a verifier. Reads must mirror the prover's writes.
pub trait VerifierContext<C: CurveGroup> {
    fn get_points(&mut self, n: usize) -> Result<Vec<C>, ProofError>;

    fn get_scalars(&mut self, n: usize) -> Result<Vec<C::ScalarField>, ProofError>;

    fn pub_rand(&mut self, n: usize) -> Result<Vec<C::ScalarField>, ProofError>;
}

/// Convenience readers for single elements.
pub trait VerifierContextExt<C: CurveGroup>: VerifierContext<C> {
    fn get_point(&mut self) -> Result<C, ProofError> {
        Ok(self.get_points(1)?.remove(0))
    }

    fn get_scalar(&mut self) -> Result<C::ScalarField, ProofError> {
        Ok(self.get_scalars(1)?.remove(0))
    }

    fn pub_rand_scalar(&mut self) -> Result<C::ScalarField, ProofError> {
        Ok(self.pub_rand(1)?.remove(0))
    }
}

impl<C: CurveGroup, V: VerifierContext<C> + ?Sized> VerifierContextExt<C> for V {}

/// Convenience helpers for single elements on the prover side.
pub trait ProverContextExt<C: CurveGroup>: ProverContext<C> {
    fn put_point(&mut self, point: C) -> Result<(), ProofError> {
        self.put_points(&[point])
    }

    fn put_scalar(&mut self, scalar: C::ScalarField) -> Result<(), ProofError> {
        self.put_scalars(&[scalar])
    }

    fn pub_rand_scalar(&mut self) -> Result<C::ScalarField, ProofError> {
        Ok(self.pub_rand(1)?.remove(0))
    }

    fn pri_rand_scalar(&mut self) -> C::ScalarField {
        self.pri_rand(1).remove(0)
    }
}

impl<C: CurveGroup, P: ProverContext<C> + ?Sized> ProverContextExt<C> for P {}

/// A prover, consumed by a single run against a transcript.
pub type Prover<C, E = ProofError> =
    Box<dyn FnOnce(&mut dyn ProverContext<C>) -> Result<(), E> + Send>;

/// A verifier, consumed by a single run against a transcript.
pub type Verifier<C, E = ProofError> =
    Box<dyn FnOnce(&mut dyn VerifierContext<C>) -> Result<(), E> + Send>;
