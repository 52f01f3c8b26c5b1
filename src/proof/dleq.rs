//! Non-interactive proofs of discrete-log equality.
//!
//! A [`DleqProof`] shows that `xG = x·G` and `xH = x·H` share the exponent `x`
//! without revealing it. Batches can share one collective challenge computed
//! over every proof in the batch.

use ark_ec::CurveGroup;
use ark_ff::{UniformRand, Zero};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_std::rand::Rng;
use serde::{Deserialize, Serialize};
use sha3::digest::{ExtendableOutput, Update};
use sha3::Shake256;

use super::error::ProofError;
use crate::group;

const LOG_TARGET: &str = "zk_mix::proof::dleq";

const DLEQ_DOMAIN: &[u8] = b"zk_mix/dleq/v1";

#[derive(
    Clone, Debug, PartialEq, Eq, Serialize, Deserialize, CanonicalSerialize, CanonicalDeserialize,
)]
#[serde(bound(
    serialize = "C: CanonicalSerialize",
    deserialize = "C: CanonicalDeserialize"
))]
pub struct DleqProof<C: CurveGroup> {
    /// Challenge.
    #[serde(with = "crate::crypto_serde::field")]
    pub c: C::ScalarField,
    /// Response `r = v - c·x`.
    #[serde(with = "crate::crypto_serde::field")]
    pub r: C::ScalarField,
    /// Commitment `v·G`.
    #[serde(with = "crate::crypto_serde::curve")]
    pub v_g: C,
    /// Commitment `v·H`.
    #[serde(with = "crate::crypto_serde::curve")]
    pub v_h: C,
}

/// Hashes every point group in order into a challenge scalar.
fn challenge<C: CurveGroup>(groups: &[&[C]]) -> Result<C::ScalarField, ProofError> {
    let mut hasher = Shake256::default();
    hasher.update(DLEQ_DOMAIN);
    let mut buf = Vec::new();
    for points in groups {
        for point in points.iter() {
            buf.clear();
            group::encode_point(point, &mut buf)?;
            hasher.update(&buf);
        }
    }
    Ok(group::scalar_from_xof(&mut hasher.finalize_xof()))
}

fn check_equations<C: CurveGroup>(
    proof: &DleqProof<C>,
    c: C::ScalarField,
    g: C,
    h: C,
    x_g: C,
    x_h: C,
) -> bool {
    if x_g.is_zero() || x_h.is_zero() {
        return false;
    }
    proof.c == c && proof.v_g == g * proof.r + x_g * c && proof.v_h == h * proof.r + x_h * c
}

impl<C: CurveGroup> DleqProof<C> {
    /// Proves knowledge of `x` for `(x·g, x·h)` and returns the proof together
    /// with both public values.
    pub fn new<R: Rng + ?Sized>(
        g: C,
        h: C,
        x: C::ScalarField,
        rng: &mut R,
    ) -> Result<(Self, C, C), ProofError> {
        let x_g = g * x;
        let x_h = h * x;
        let v = C::ScalarField::rand(rng);
        let v_g = g * v;
        let v_h = h * v;
        let c = challenge::<C>(&[&[x_g, x_h, v_g, v_h]])?;
        Ok((
            Self {
                c,
                r: v - c * x,
                v_g,
                v_h,
            },
            x_g,
            x_h,
        ))
    }

    /// Proves a batch of statements under one challenge computed over all of
    /// them.
    pub fn new_batch<R: Rng + ?Sized>(
        g: &[C],
        h: &[C],
        secrets: &[C::ScalarField],
        rng: &mut R,
    ) -> Result<(Vec<Self>, Vec<C>, Vec<C>), ProofError> {
        if g.len() != h.len() || h.len() != secrets.len() {
            return Err(ProofError::LengthMismatch);
        }

        let x_g: Vec<C> = g.iter().zip(secrets).map(|(g, x)| *g * *x).collect();
        let x_h: Vec<C> = h.iter().zip(secrets).map(|(h, x)| *h * *x).collect();
        let v: Vec<C::ScalarField> = (0..secrets.len())
            .map(|_| C::ScalarField::rand(rng))
            .collect();
        let v_g: Vec<C> = g.iter().zip(&v).map(|(g, v)| *g * *v).collect();
        let v_h: Vec<C> = h.iter().zip(&v).map(|(h, v)| *h * *v).collect();

        let c = challenge::<C>(&[&x_g, &x_h, &v_g, &v_h])?;
        let proofs = secrets
            .iter()
            .zip(v)
            .zip(v_g.into_iter().zip(v_h))
            .map(|((x, v), (v_g, v_h))| Self {
                c,
                r: v - c * x,
                v_g,
                v_h,
            })
            .collect();
        Ok((proofs, x_g, x_h))
    }

    /// Checks a proof produced by [`DleqProof::new`].
    pub fn verify(&self, g: C, h: C, x_g: C, x_h: C) -> Result<(), ProofError> {
        let c = challenge::<C>(&[&[x_g, x_h, self.v_g, self.v_h]])?;
        if check_equations(self, c, g, h, x_g, x_h) {
            Ok(())
        } else {
            tracing::debug!(target: LOG_TARGET, "dleq proof rejected");
            Err(ProofError::commit_mismatch())
        }
    }
}

/// Checks a batch produced by [`DleqProof::new_batch`].
///
/// Returns the indices of the proofs that verify and of those that do not.
pub fn verify_batch<C: CurveGroup>(
    proofs: &[DleqProof<C>],
    g: &[C],
    h: &[C],
    x_g: &[C],
    x_h: &[C],
) -> Result<(Vec<usize>, Vec<usize>), ProofError> {
    let n = proofs.len();
    if g.len() != n || h.len() != n || x_g.len() != n || x_h.len() != n {
        return Err(ProofError::LengthMismatch);
    }

    let v_g: Vec<C> = proofs.iter().map(|p| p.v_g).collect();
    let v_h: Vec<C> = proofs.iter().map(|p| p.v_h).collect();
    let c = challenge::<C>(&[x_g, x_h, &v_g, &v_h])?;

    let (good, bad): (Vec<usize>, Vec<usize>) = (0..n)
        .partition(|&i| check_equations(&proofs[i], c, g[i], h[i], x_g[i], x_h[i]));
    tracing::debug!(target: LOG_TARGET, good = good.len(), bad = bad.len(), "dleq batch verified");
    Ok((good, bad))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ec::PrimeGroup;
    use ark_grumpkin::{Fr, Projective};
    use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
    use ark_std::test_rng;

    #[test]
    fn test_single_proof() {
        let mut rng = test_rng();
        let g = Projective::generator();
        let h = g * Fr::rand(&mut rng);
        let x = Fr::rand(&mut rng);

        let (proof, x_g, x_h) = DleqProof::new(g, h, x, &mut rng).unwrap();
        assert_eq!(x_g, g * x);
        assert!(proof.verify(g, h, x_g, x_h).is_ok());

        // A different exponent on one side breaks the proof.
        let other = h * (x + Fr::from(1u64));
        assert!(proof.verify(g, h, x_g, other).is_err());
    }

    #[test]
    fn test_forged_challenge_is_rejected() {
        let mut rng = test_rng();
        let g = Projective::generator();
        let h = g * Fr::rand(&mut rng);
        let x_g = g * Fr::rand(&mut rng);
        let x_h = h * Fr::rand(&mut rng);

        // Pick c and r freely and solve for the commitments.
        let c = Fr::rand(&mut rng);
        let r = Fr::rand(&mut rng);
        let forged = DleqProof {
            c,
            r,
            v_g: g * r + x_g * c,
            v_h: h * r + x_h * c,
        };
        assert!(forged.verify(g, h, x_g, x_h).is_err());
    }

    #[test]
    fn test_batch_reports_good_and_bad_indices() {
        let mut rng = test_rng();
        let n = 6;
        let g: Vec<Projective> = (0..n).map(|_| Projective::rand(&mut rng)).collect();
        let mut h: Vec<Projective> = (0..n).map(|_| Projective::rand(&mut rng)).collect();
        let secrets: Vec<Fr> = (0..n).map(|_| Fr::rand(&mut rng)).collect();
        // An identity base yields an identity public value, which never verifies.
        h[1] = Projective::zero();

        let (mut proofs, mut x_g, x_h) = DleqProof::new_batch(&g, &h, &secrets, &mut rng).unwrap();
        let (good, bad) = verify_batch(&proofs, &g, &h, &x_g, &x_h).unwrap();
        assert_eq!(good, vec![0, 2, 3, 4, 5]);
        assert_eq!(bad, vec![1]);

        // A tampered response only spoils its own proof.
        proofs[4].r += Fr::from(1u64);
        let (good, bad) = verify_batch(&proofs, &g, &h, &x_g, &x_h).unwrap();
        assert_eq!(good, vec![0, 2, 3, 5]);
        assert_eq!(bad, vec![1, 4]);

        // Hashed values feed the shared challenge, so changing one spoils all.
        x_g[0] = x_g[0] + g[0];
        let (good, bad) = verify_batch(&proofs, &g, &h, &x_g, &x_h).unwrap();
        assert!(good.is_empty());
        assert_eq!(bad.len(), n);
    }

    #[test]
    fn test_batch_rejects_mismatched_lengths() {
        let mut rng = test_rng();
        let g = vec![Projective::generator(); 2];
        let result = DleqProof::new_batch(&g, &g[..1], &[Fr::from(3u64); 2], &mut rng);
        assert_eq!(result.unwrap_err(), ProofError::LengthMismatch);
    }

    #[test]
    fn test_proof_serialization() {
        let mut rng = test_rng();
        let g = Projective::generator();
        let h = g * Fr::from(9u64);
        let (proof, _, _) = DleqProof::new(g, h, Fr::from(4u64), &mut rng).unwrap();

        let mut bytes = Vec::new();
        proof.serialize_compressed(&mut bytes).unwrap();
        let decoded = DleqProof::<Projective>::deserialize_compressed(&bytes[..]).unwrap();
        assert_eq!(decoded, proof);

        crate::test_utils::serde::assert_round_trip_eq(&proof);
        let json = serde_json::to_value(&proof).unwrap();
        assert!(json["c"].as_str().unwrap().starts_with("0x"));
    }
}
