//! Non-interactive proofs via the Fiat-Shamir transform.
//!
//! Public randomness is a SHAKE256 stream seeded with the protocol name.
//! Before each challenge the messages sent since the previous challenge are
//! appended to the proof and stirred into the stream: the new stream is
//! seeded with key material squeezed from the old one followed by those
//! message bytes. Every byte of the proof therefore influences every later
//! challenge.

use std::marker::PhantomData;

use ark_ec::CurveGroup;
use ark_ff::UniformRand;
use ark_std::rand::RngCore;
use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::{Shake256, Shake256Reader};

use super::error::ProofError;
use super::{ProverContext, VerifierContext};
use crate::group::{self, EncodingError};

const LOG_TARGET: &str = "zk_mix::proof::hash";

/// Bytes squeezed from the old stream when reseeding.
const RESEED_LEN: usize = 32;

pub(crate) fn xof(seed: &[u8]) -> Shake256Reader {
    let mut hasher = Shake256::default();
    hasher.update(seed);
    hasher.finalize_xof()
}

fn reseed(stream: &mut Shake256Reader, message: &[u8]) -> Shake256Reader {
    let mut key = [0u8; RESEED_LEN];
    stream.read(&mut key);
    let mut hasher = Shake256::default();
    hasher.update(&key);
    hasher.update(message);
    hasher.finalize_xof()
}

/// Prover side of a Fiat-Shamir transcript.
pub struct HashProver<'r, C: CurveGroup> {
    proof: Vec<u8>,
    msg: Vec<u8>,
    pubrand: Shake256Reader,
    prirand: &'r mut dyn RngCore,
    _group: PhantomData<C>,
}

impl<'r, C: CurveGroup> HashProver<'r, C> {
    pub fn new(protocol: &[u8], prirand: &'r mut dyn RngCore) -> Self {
        Self {
            proof: Vec::new(),
            msg: Vec::new(),
            pubrand: xof(protocol),
            prirand,
            _group: PhantomData,
        }
    }

    fn consume_msg(&mut self) {
        if self.msg.is_empty() {
            return;
        }
        self.pubrand = reseed(&mut self.pubrand, &self.msg);
        self.proof.append(&mut self.msg);
    }

    /// Finishes the transcript and returns the proof bytes.
    pub fn into_proof(mut self) -> Vec<u8> {
        self.consume_msg();
        self.proof
    }
}

impl<C: CurveGroup> ProverContext<C> for HashProver<'_, C> {
    fn put_points(&mut self, points: &[C]) -> Result<(), ProofError> {
        for point in points {
            group::encode_point(point, &mut self.msg)?;
        }
        Ok(())
    }

    fn put_scalars(&mut self, scalars: &[C::ScalarField]) -> Result<(), ProofError> {
        for scalar in scalars {
            group::encode_scalar(scalar, &mut self.msg)?;
        }
        Ok(())
    }

    fn pub_rand(&mut self, n: usize) -> Result<Vec<C::ScalarField>, ProofError> {
        self.consume_msg();
        Ok(group::scalars_from_xof(&mut self.pubrand, n))
    }

    fn pri_rand(&mut self, n: usize) -> Vec<C::ScalarField> {
        (0..n)
            .map(|_| C::ScalarField::rand(&mut self.prirand))
            .collect()
    }
}

/// Verifier side of a Fiat-Shamir transcript.
pub struct HashVerifier<'p, C: CurveGroup> {
    proof: &'p [u8],
    /// Read position.
    pos: usize,
    /// Start of the bytes not yet stirred into `pubrand`.
    consumed: usize,
    pubrand: Shake256Reader,
    _group: PhantomData<C>,
}

impl<'p, C: CurveGroup> HashVerifier<'p, C> {
    pub fn new(protocol: &[u8], proof: &'p [u8]) -> Self {
        Self {
            proof,
            pos: 0,
            consumed: 0,
            pubrand: xof(protocol),
            _group: PhantomData,
        }
    }

    fn consume_msg(&mut self) {
        if self.pos > self.consumed {
            self.pubrand = reseed(&mut self.pubrand, &self.proof[self.consumed..self.pos]);
            self.consumed = self.pos;
        }
    }

    /// Bytes of the proof not read by the verifier.
    pub fn remaining(&self) -> usize {
        self.proof.len() - self.pos
    }

    fn read<T>(
        &mut self,
        n: usize,
        decode: impl Fn(&mut &[u8]) -> Result<T, EncodingError>,
    ) -> Result<Vec<T>, ProofError> {
        let mut cursor = &self.proof[self.pos..];
        let before = cursor.len();
        let items = (0..n)
            .map(|_| decode(&mut cursor))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| {
                tracing::debug!(target: LOG_TARGET, %err, "transcript parse failure");
                ProofError::malformed_transcript()
            })?;
        self.pos += before - cursor.len();
        Ok(items)
    }
}

impl<C: CurveGroup> VerifierContext<C> for HashVerifier<'_, C> {
    fn get_points(&mut self, n: usize) -> Result<Vec<C>, ProofError> {
        self.read(n, group::decode_point::<C>)
    }

    fn get_scalars(&mut self, n: usize) -> Result<Vec<C::ScalarField>, ProofError> {
        self.read(n, group::decode_scalar::<C::ScalarField>)
    }

    fn pub_rand(&mut self, n: usize) -> Result<Vec<C::ScalarField>, ProofError> {
        self.consume_msg();
        Ok(group::scalars_from_xof(&mut self.pubrand, n))
    }
}

/// Runs `prover` non-interactively and returns the proof bytes.
pub fn hash_prove<C, E, R>(
    protocol: &[u8],
    rng: &mut R,
    prover: impl FnOnce(&mut dyn ProverContext<C>) -> Result<(), E>,
) -> Result<Vec<u8>, E>
where
    C: CurveGroup,
    R: RngCore,
{
    let mut ctx = HashProver::<C>::new(protocol, rng);
    prover(&mut ctx)?;
    let proof = ctx.into_proof();
    tracing::debug!(target: LOG_TARGET, len = proof.len(), "proof generated");
    Ok(proof)
}

/// Checks `proof` with `verifier`. The verifier must consume the whole proof.
pub fn hash_verify<C, E>(
    protocol: &[u8],
    proof: &[u8],
    verifier: impl FnOnce(&mut dyn VerifierContext<C>) -> Result<(), E>,
) -> Result<(), E>
where
    C: CurveGroup,
    E: From<ProofError>,
{
    let mut ctx = HashVerifier::<C>::new(protocol, proof);
    verifier(&mut ctx)?;
    if ctx.remaining() != 0 {
        tracing::debug!(
            target: LOG_TARGET,
            trailing = ctx.remaining(),
            "proof has unread trailing bytes"
        );
        return Err(ProofError::malformed_transcript().into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proof::{Predicate, PublicValues, SecretValues, VarTable};
    use crate::proof::{InvalidProofKind, ProverContextExt, VerifierContextExt};
    use crate::test_utils::setup_test_tracing;
    use ark_bn254::{Fr, G1Projective};
    use ark_ec::PrimeGroup;
    use ark_ff::PrimeField;
    use ark_std::rand::{rngs::StdRng, SeedableRng};
    use ark_std::test_rng;
    use sha2::{Digest, Sha256};

    type Ed25519 = ark_ed25519::EdwardsProjective;

    /// Deterministic secret derived from a seed and a label.
    fn prf<F: PrimeField>(seed: &[u8], label: &[u8]) -> F {
        let digest = Sha256::new().chain_update(seed).chain_update(label).finalize();
        F::from_le_bytes_mod_order(&digest)
    }

    /// Schnorr signature on `message`: the message is the protocol name.
    fn sign<C: CurveGroup>(message: &[u8], x: C::ScalarField, rng: &mut StdRng) -> Vec<u8> {
        let mut vars = VarTable::new();
        let (sx, px, pb) = (vars.secret("x"), vars.point("X"), vars.point("B"));
        let pred = Predicate::log(px, sx, pb);
        let b = C::generator();
        let points = PublicValues::new().with(px, b * x).with(pb, b);
        let prover = pred
            .prover(&vars, SecretValues::new().with(sx, x), points)
            .unwrap();
        hash_prove(message, rng, prover).unwrap()
    }

    fn check_signature<C: CurveGroup>(
        message: &[u8],
        public: C,
        signature: &[u8],
    ) -> Result<(), ProofError> {
        let mut vars = VarTable::new();
        let (sx, px, pb) = (vars.secret("x"), vars.point("X"), vars.point("B"));
        let pred = Predicate::log(px, sx, pb);
        let points = PublicValues::new().with(px, public).with(pb, C::generator());
        hash_verify(message, signature, pred.verifier(&vars, points)?)
    }

    fn schnorr_round<C: CurveGroup>() {
        let _guard = setup_test_tracing();
        let x: C::ScalarField = prf(b"example", b"x");
        let public = C::generator() * x;

        let mut rng = StdRng::seed_from_u64(0xdeadbeef);
        let signature = sign::<C>(b"Hello World!", x, &mut rng);
        assert_eq!(
            signature.len(),
            group::point_len::<C>() + group::scalar_len::<C::ScalarField>()
        );

        let mut rng = StdRng::seed_from_u64(0xdeadbeef);
        assert_eq!(signature, sign::<C>(b"Hello World!", x, &mut rng));

        check_signature(b"Hello World!", public, &signature).unwrap();
        assert_eq!(
            check_signature(b"Goodbye World!", public, &signature),
            Err(ProofError::commit_mismatch())
        );
    }

    #[test]
    fn test_schnorr_signature_bn254() {
        schnorr_round::<G1Projective>();
    }

    #[test]
    fn test_schnorr_signature_ed25519() {
        schnorr_round::<Ed25519>();
    }

    fn prove_composite(
        pred: &Predicate,
        vars: &VarTable,
        secrets: SecretValues<Fr>,
        points: &PublicValues<G1Projective>,
        seed: u64,
    ) -> Result<Vec<u8>, ProofError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let prover = pred.prover(vars, secrets, points.clone())?;
        hash_prove(b"composite", &mut rng, prover)
    }

    fn verify_composite(
        pred: &Predicate,
        vars: &VarTable,
        points: &PublicValues<G1Projective>,
        proof: &[u8],
    ) -> Result<(), ProofError> {
        hash_verify(b"composite", proof, pred.verifier(vars, points.clone())?)
    }

    /// Adds `delta` to the scalar encoded at `offset`.
    fn shift_scalar(proof: &mut [u8], offset: usize, delta: Fr) {
        let len = group::scalar_len::<Fr>();
        let mut input = &proof[offset..offset + len];
        let value: Fr = group::decode_scalar(&mut input).unwrap();
        let mut out = Vec::new();
        group::encode_scalar(&(value + delta), &mut out).unwrap();
        proof[offset..offset + len].copy_from_slice(&out);
    }

    #[test]
    fn test_and_of_representations() {
        let _guard = setup_test_tracing();
        let mut rng = test_rng();
        let mut vars = VarTable::new();
        let (sx, sy) = (vars.secret("x"), vars.secret("y"));
        let (pb, px, pr) = (vars.point("B"), vars.point("X"), vars.point("R"));
        // X=x*B && R=x*B+y*X
        let pred = Predicate::and([
            Predicate::log(px, sx, pb),
            Predicate::rep(pr, [(sx, pb), (sy, px)]),
        ]);

        let (x, y) = (Fr::rand(&mut rng), Fr::rand(&mut rng));
        let b = G1Projective::generator();
        let big_x = b * x;
        let secrets = SecretValues::new().with(sx, x).with(sy, y);

        let points = PublicValues::new()
            .with(pb, b)
            .with(px, big_x)
            .with(pr, big_x + big_x * y);
        let proof = prove_composite(&pred, &vars, secrets.clone(), &points, 5).unwrap();
        verify_composite(&pred, &vars, &points, &proof).unwrap();

        // With Y = y*B instead of y*X the second representation is false.
        let points = PublicValues::new()
            .with(pb, b)
            .with(px, big_x)
            .with(pr, big_x + b * y);
        let proof = prove_composite(&pred, &vars, secrets, &points, 5).unwrap();
        assert_eq!(
            verify_composite(&pred, &vars, &points, &proof),
            Err(ProofError::commit_mismatch())
        );
    }

    #[test]
    fn test_single_branch_or_matches_its_branch() {
        let mut rng = test_rng();
        let mut vars = VarTable::new();
        let (sx, px, pb) = (vars.secret("x"), vars.point("X"), vars.point("B"));
        let x = Fr::rand(&mut rng);
        let b = G1Projective::generator();
        let points = PublicValues::new().with(px, b * x).with(pb, b);
        let secrets = SecretValues::new().with(sx, x);

        let pred = Predicate::or([Predicate::log(px, sx, pb)]).choose(0);
        let proof = prove_composite(&pred, &vars, secrets.clone(), &points, 6).unwrap();
        // A lone branch needs no sub-challenges.
        assert_eq!(
            proof.len(),
            group::point_len::<G1Projective>() + group::scalar_len::<Fr>()
        );
        verify_composite(&pred, &vars, &points, &proof).unwrap();

        let unchosen = Predicate::or([Predicate::log(px, sx, pb)]);
        assert!(matches!(
            prove_composite(&unchosen, &vars, secrets, &points, 6),
            Err(ProofError::MalformedPredicate(_))
        ));
    }

    #[test]
    fn test_nested_or_needs_only_the_chosen_secret() {
        let _guard = setup_test_tracing();
        let mut rng = test_rng();
        let mut vars = VarTable::new();
        let pg = vars.point("G");
        let names = ["a", "b", "c", "d", "e"];
        let secrets: Vec<_> = names.iter().map(|n| vars.secret(n)).collect();
        let publics: Vec<_> = names
            .iter()
            .map(|n| vars.point(&n.to_uppercase()))
            .collect();
        let leaf = |i: usize| Predicate::log(publics[i], secrets[i], pg);

        // (A=a*G || B=b*G || C=c*G) || (D=d*G || E=e*G), knowing only c.
        let pred = Predicate::or([
            Predicate::or([leaf(0), leaf(1), leaf(2)]).choose(2),
            Predicate::or([leaf(3), leaf(4)]),
        ])
        .choose(0);

        let g = G1Projective::generator();
        let c = Fr::rand(&mut rng);
        let mut points = PublicValues::new().with(pg, g);
        for (i, var) in publics.iter().enumerate() {
            let value = if i == 2 { g * c } else { g * Fr::rand(&mut rng) };
            points.insert(*var, value);
        }
        let known = SecretValues::new().with(secrets[2], c);

        let proof = prove_composite(&pred, &vars, known.clone(), &points, 7).unwrap();
        verify_composite(&pred, &vars, &points, &proof).unwrap();

        // Choosing a branch whose secret is unknown fails at proving time.
        let wrong = Predicate::or([
            Predicate::or([leaf(0), leaf(1), leaf(2)]).choose(0),
            Predicate::or([leaf(3), leaf(4)]),
        ])
        .choose(0);
        assert!(matches!(
            prove_composite(&wrong, &vars, known, &points, 7),
            Err(ProofError::MissingSecret(name)) if name == "a"
        ));
    }

    #[test]
    fn test_sub_challenges_must_sum_to_the_challenge() {
        let mut rng = test_rng();
        let mut vars = VarTable::new();
        let (sx, sy) = (vars.secret("x"), vars.secret("y"));
        let (px, py, pb) = (vars.point("X"), vars.point("Y"), vars.point("B"));
        let pred = Predicate::or([Predicate::log(px, sx, pb), Predicate::log(py, sy, pb)]).choose(1);

        let b = G1Projective::generator();
        let y = Fr::rand(&mut rng);
        let points = PublicValues::new()
            .with(px, b * Fr::rand(&mut rng))
            .with(py, b * y)
            .with(pb, b);
        let proof = prove_composite(&pred, &vars, SecretValues::new().with(sy, y), &points, 8).unwrap();
        verify_composite(&pred, &vars, &points, &proof).unwrap();

        // Two commitments, then the two sub-challenges.
        let first = 2 * group::point_len::<G1Projective>();
        let second = first + group::scalar_len::<Fr>();
        let one = Fr::from(1u64);

        let mut unbalanced = proof.clone();
        shift_scalar(&mut unbalanced, first, one);
        assert_eq!(
            verify_composite(&pred, &vars, &points, &unbalanced)
                .unwrap_err()
                .invalid_kind(),
            Some(InvalidProofKind::BadSubChallenges)
        );

        let mut rebalanced = unbalanced;
        shift_scalar(&mut rebalanced, second, -one);
        assert_eq!(
            verify_composite(&pred, &vars, &points, &rebalanced)
                .unwrap_err()
                .invalid_kind(),
            Some(InvalidProofKind::CommitMismatch)
        );
    }

    #[test]
    fn test_or_of_and_hides_the_chosen_branch() {
        let mut rng = test_rng();
        let mut vars = VarTable::new();
        let (sx, sy) = (vars.secret("x"), vars.secret("y"));
        let (pb, ph) = (vars.point("B"), vars.point("H"));
        let (px, pxh) = (vars.point("X"), vars.point("XH"));
        let (py, pyh) = (vars.point("Y"), vars.point("YH"));
        let pred = Predicate::or([
            Predicate::and([Predicate::log(px, sx, pb), Predicate::log(pxh, sx, ph)]),
            Predicate::and([Predicate::log(py, sy, pb), Predicate::log(pyh, sy, ph)]),
        ]);

        let b = G1Projective::generator();
        let h = b * Fr::rand(&mut rng);
        let (x, y) = (Fr::rand(&mut rng), Fr::rand(&mut rng));
        let points = PublicValues::new()
            .with(pb, b)
            .with(ph, h)
            .with(px, b * x)
            .with(pxh, h * x)
            .with(py, b * y)
            .with(pyh, h * y);
        let secrets = SecretValues::new().with(sx, x).with(sy, y);

        let proofs: Vec<Vec<u8>> = [0, 1]
            .into_iter()
            .map(|branch| {
                let chosen = pred.clone().choose(branch);
                prove_composite(&chosen, &vars, secrets.clone(), &points, 9).unwrap()
            })
            .collect();
        for proof in &proofs {
            verify_composite(&pred, &vars, &points, proof).unwrap();
        }
        assert_eq!(proofs[0].len(), proofs[1].len());
        assert_ne!(proofs[0], proofs[1]);
    }

    #[test]
    fn test_any_flipped_byte_is_rejected() {
        let mut rng = test_rng();
        let x = Fr::rand(&mut rng);
        let public = G1Projective::generator() * x;
        let mut srng = StdRng::seed_from_u64(1);
        let signature = sign::<G1Projective>(b"msg", x, &mut srng);

        for i in 0..signature.len() {
            let mut tampered = signature.clone();
            tampered[i] ^= 0x01;
            assert!(check_signature(b"msg", public, &tampered).is_err(), "byte {i}");
        }
    }

    #[test]
    fn test_truncated_and_padded_proofs_are_malformed() {
        let mut rng = test_rng();
        let x = Fr::rand(&mut rng);
        let public = G1Projective::generator() * x;
        let mut srng = StdRng::seed_from_u64(2);
        let signature = sign::<G1Projective>(b"msg", x, &mut srng);

        let truncated = &signature[..signature.len() - 1];
        assert_eq!(
            check_signature(b"msg", public, truncated)
                .unwrap_err()
                .invalid_kind(),
            Some(InvalidProofKind::MalformedTranscript)
        );

        let mut padded = signature.clone();
        padded.push(0);
        assert_eq!(
            check_signature(b"msg", public, &padded)
                .unwrap_err()
                .invalid_kind(),
            Some(InvalidProofKind::MalformedTranscript)
        );
    }

    #[test]
    fn test_challenges_depend_on_prior_messages() {
        let mut rng = test_rng();
        let point = G1Projective::generator() * Fr::rand(&mut rng);

        let mut challenges = Vec::new();
        for sent in [Some(point), None] {
            let mut srng = StdRng::seed_from_u64(3);
            let mut ctx = HashProver::<G1Projective>::new(b"proto", &mut srng);
            if let Some(p) = sent {
                ctx.put_point(p).unwrap();
            }
            challenges.push(ProverContextExt::pub_rand_scalar(&mut ctx).unwrap());
        }
        assert_ne!(challenges[0], challenges[1]);
    }

    #[test]
    fn test_verifier_replays_prover_randomness() {
        let mut rng = test_rng();
        let point = G1Projective::generator() * Fr::rand(&mut rng);
        let scalar = Fr::rand(&mut rng);

        let mut srng = StdRng::seed_from_u64(4);
        let mut prover = HashProver::<G1Projective>::new(b"replay", &mut srng);
        prover.put_point(point).unwrap();
        let c1 = ProverContextExt::pub_rand_scalar(&mut prover).unwrap();
        prover.put_scalar(scalar).unwrap();
        let c2 = ProverContextExt::pub_rand_scalar(&mut prover).unwrap();
        let proof = prover.into_proof();

        let mut verifier = HashVerifier::<G1Projective>::new(b"replay", &proof);
        assert_eq!(verifier.get_point().unwrap(), point);
        assert_eq!(VerifierContextExt::pub_rand_scalar(&mut verifier).unwrap(), c1);
        assert_eq!(verifier.get_scalar().unwrap(), scalar);
        assert_eq!(VerifierContextExt::pub_rand_scalar(&mut verifier).unwrap(), c2);
        assert_eq!(verifier.remaining(), 0);
    }
}
