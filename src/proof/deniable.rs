//! Interactive multi-party proofs with jointly generated challenges.
//!
//! Every participant runs one protocol instance that proves its own predicate
//! and, optionally, verifies the proofs of any other participants. The
//! instances exchange messages in lockstep rounds through a [`StepContext`].
//!
//! Each proof step carries a commitment to a fresh random key in front of the
//! prover's message. In the following challenge step every participant
//! reveals its key; the keys are checked against the commitments and XORed
//! into the seed of that round's challenge. Since each prover's own key is
//! part of the mix, a transcript could have been produced by any single
//! participant alone, which keeps the proofs deniable.

use std::marker::PhantomData;
use std::thread::JoinHandle;

use ark_ec::CurveGroup;
use ark_ff::UniformRand;
use ark_std::rand::RngCore;
use sha3::digest::XofReader;
use sha3::Shake256Reader;
use tokio::sync::mpsc;

use super::error::ProofError;
use super::hash::xof;
use super::{Prover, ProverContext, Verifier, VerifierContext};
use crate::group;

const LOG_TARGET: &str = "zk_mix::proof::deniable";

/// Length of the per-step random key and of its commitment.
pub const KEY_SIZE: usize = 128;

/// One synchronous round of a broadcast protocol.
///
/// `step` sends this participant's message and returns the messages of all
/// participants for the round, indexed by participant. A participant that has
/// left contributes an empty message.
pub trait StepContext {
    fn step(&mut self, msg: Vec<u8>) -> Result<Vec<Vec<u8>>, ProofError>;
}

/// A participant's side of a multi-party protocol.
///
/// Returns one result per participant: the outcome of this node's own proof
/// at its own index, and the verification outcome for every other node.
pub type Protocol = Box<
    dyn FnOnce(&mut dyn StepContext, &mut dyn RngCore) -> Vec<Result<(), ProofError>> + Send,
>;

/// Builds the protocol run by participant `self_index`.
///
/// `verifiers[i]` checks participant `i`'s proof; `None` leaves that
/// participant unverified and its result stays [`ProofError::NotRun`]. Any
/// verifier supplied for `self_index` itself is ignored.
pub fn deniable_prover<C: CurveGroup>(
    self_index: usize,
    prover: Prover<C>,
    verifiers: Vec<Option<Verifier<C>>>,
) -> Protocol {
    Box::new(move |ctx: &mut dyn StepContext, rng: &mut dyn RngCore| {
        let count = verifiers.len();
        if self_index >= count {
            return vec![Err(ProofError::ParticipantOutOfRange {
                index: self_index,
                count,
            })];
        }
        DeniableProver::<C>::new(self_index, ctx, rng, verifiers).run(prover)
    })
}

enum Signal {
    /// The verifier is blocked on the next challenge.
    NeedChallenge,
    Finished(Result<(), ProofError>),
}

/// Prover-side handle to a verifier running on its own thread.
struct VerifierHandle {
    inbox: mpsc::UnboundedSender<Vec<u8>>,
    signals: mpsc::UnboundedReceiver<Signal>,
    thread: JoinHandle<()>,
}

impl VerifierHandle {
    fn spawn<C: CurveGroup>(verifier: Verifier<C>) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let thread = std::thread::spawn(move || {
            let mut ctx = DeniableVerifier::<C> {
                inbox: inbox_rx,
                signals: signal_tx,
                proof: Vec::new(),
                pos: 0,
                _group: PhantomData,
            };
            let result = ctx
                .next_proof()
                .and_then(|()| verifier(&mut ctx))
                .and_then(|()| ctx.ensure_consumed());
            // The prover may already have given up on us.
            let _ = ctx.signals.send(Signal::Finished(result));
        });
        Self {
            inbox: inbox_tx,
            signals: signal_rx,
            thread,
        }
    }

    /// Closes the inbox, which unblocks the verifier, and waits for its thread.
    fn close(self) {
        let Self {
            inbox,
            signals,
            thread,
        } = self;
        drop(inbox);
        drop(signals);
        if thread.join().is_err() {
            tracing::warn!(target: LOG_TARGET, "verifier thread panicked");
        }
    }
}

struct DeniableProver<'a, C: CurveGroup> {
    self_index: usize,
    ctx: &'a mut dyn StepContext,
    rng: &'a mut dyn RngCore,
    verifiers: Vec<Option<VerifierHandle>>,
    /// Key committed to in the current proof step.
    key: Vec<u8>,
    /// Commitment followed by the prover's message for the current step.
    msg: Vec<u8>,
    /// Every participant's message from the last proof step.
    msgs: Vec<Vec<u8>>,
    pubrand: Option<Shake256Reader>,
    results: Vec<Result<(), ProofError>>,
    _group: PhantomData<C>,
}

impl<'a, C: CurveGroup> DeniableProver<'a, C> {
    fn new(
        self_index: usize,
        ctx: &'a mut dyn StepContext,
        rng: &'a mut dyn RngCore,
        verifiers: Vec<Option<Verifier<C>>>,
    ) -> Self {
        let results = (0..verifiers.len())
            .map(|i| {
                if i == self_index {
                    Ok(())
                } else {
                    Err(ProofError::NotRun)
                }
            })
            .collect();
        let verifiers = verifiers
            .into_iter()
            .enumerate()
            .map(|(i, verifier)| {
                verifier
                    .filter(|_| i != self_index)
                    .map(VerifierHandle::spawn)
            })
            .collect();
        Self {
            self_index,
            ctx,
            rng,
            verifiers,
            key: Vec::new(),
            msg: Vec::new(),
            msgs: Vec::new(),
            pubrand: None,
            results,
            _group: PhantomData,
        }
    }

    fn run(mut self, prover: Prover<C>) -> Vec<Result<(), ProofError>> {
        self.init_step();
        if let Err(err) = prover(&mut self) {
            tracing::debug!(target: LOG_TARGET, node = self.self_index, %err, "own proof failed");
            self.results[self.self_index] = Err(err);
        }

        // Keep stepping until every verifier we run has finished.
        loop {
            match self.proof_step() {
                Ok(true) => {}
                Ok(false) => break,
                Err(err) => {
                    self.results[self.self_index] = Err(err);
                    break;
                }
            }
            if let Err(err) = self.challenge_step() {
                self.results[self.self_index] = Err(err);
                break;
            }
        }

        for handle in self.verifiers.iter_mut().filter_map(Option::take) {
            handle.close();
        }
        tracing::debug!(target: LOG_TARGET, node = self.self_index, "protocol finished");
        self.results
    }

    /// Draws this step's key and starts the message with its commitment.
    fn init_step(&mut self) {
        let mut key = vec![0u8; KEY_SIZE];
        self.rng.fill_bytes(&mut key);
        let mut msg = vec![0u8; KEY_SIZE];
        xof(&key).read(&mut msg);
        self.key = key;
        self.msg = msg;
    }

    /// Exchanges proof messages and hands them to the verifiers.
    ///
    /// Returns whether some verifier is still waiting for a challenge.
    fn proof_step(&mut self) -> Result<bool, ProofError> {
        let msgs = self.ctx.step(self.msg.clone())?;
        if msgs.get(self.self_index) != Some(&self.msg) {
            return Err(ProofError::Stream("own proof message was corrupted".into()));
        }

        for (i, slot) in self.verifiers.iter_mut().enumerate() {
            let Some(handle) = slot else { continue };
            match msgs.get(i) {
                Some(msg) if msg.len() >= KEY_SIZE => {
                    let _ = handle.inbox.send(msg[KEY_SIZE..].to_vec());
                }
                _ => {
                    tracing::debug!(target: LOG_TARGET, node = self.self_index, peer = i, "peer gone");
                    self.results[i] = Err(ProofError::PeerGone);
                    if let Some(handle) = slot.take() {
                        handle.close();
                    }
                }
            }
        }

        let mut stragglers = false;
        for (i, slot) in self.verifiers.iter_mut().enumerate() {
            let Some(handle) = slot else { continue };
            match handle.signals.blocking_recv() {
                Some(Signal::NeedChallenge) => stragglers = true,
                Some(Signal::Finished(result)) => {
                    tracing::debug!(
                        target: LOG_TARGET,
                        node = self.self_index,
                        peer = i,
                        ok = result.is_ok(),
                        "verifier finished"
                    );
                    self.results[i] = result;
                    if let Some(handle) = slot.take() {
                        handle.close();
                    }
                }
                None => {
                    self.results[i] = Err(ProofError::Stream("verifier thread exited".into()));
                    if let Some(handle) = slot.take() {
                        handle.close();
                    }
                }
            }
        }

        self.msgs = msgs;
        Ok(stragglers)
    }

    /// Reveals keys, checks them against the commitments and derives the
    /// round's challenge seed from their XOR.
    fn challenge_step(&mut self) -> Result<(), ProofError> {
        let keys = self.ctx.step(self.key.clone())?;

        let mut mix = vec![0u8; KEY_SIZE];
        for (i, key) in keys.iter().enumerate() {
            let Some(commit) = self.msgs.get(i).and_then(|m| m.get(..KEY_SIZE)) else {
                continue;
            };
            if key.len() < KEY_SIZE {
                continue;
            }
            let mut check = vec![0u8; KEY_SIZE];
            xof(key).read(&mut check);
            if check != commit {
                return Err(ProofError::Stream(format!(
                    "key of participant {i} does not match its commitment"
                )));
            }
            for (m, k) in mix.iter_mut().zip(key) {
                *m ^= k;
            }
        }
        if keys.get(self.self_index) != Some(&self.key) {
            return Err(ProofError::Stream("own challenge key was corrupted".into()));
        }

        self.pubrand = Some(xof(&mix));
        for handle in self.verifiers.iter().flatten() {
            let _ = handle.inbox.send(mix.clone());
        }

        self.init_step();
        Ok(())
    }
}

impl<C: CurveGroup> ProverContext<C> for DeniableProver<'_, C> {
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
        self.proof_step()?;
        self.challenge_step()?;
        let pubrand = self
            .pubrand
            .as_mut()
            .ok_or_else(|| ProofError::Stream("no challenge derived".into()))?;
        Ok(group::scalars_from_xof(pubrand, n))
    }

    fn pri_rand(&mut self, n: usize) -> Vec<C::ScalarField> {
        (0..n)
            .map(|_| C::ScalarField::rand(&mut self.rng))
            .collect()
    }
}

/// Verifier context driven by the prover thread of the same participant.
struct DeniableVerifier<C: CurveGroup> {
    inbox: mpsc::UnboundedReceiver<Vec<u8>>,
    signals: mpsc::UnboundedSender<Signal>,
    proof: Vec<u8>,
    pos: usize,
    _group: PhantomData<C>,
}

impl<C: CurveGroup> DeniableVerifier<C> {
    fn next_proof(&mut self) -> Result<(), ProofError> {
        self.proof = self.inbox.blocking_recv().ok_or(ProofError::PeerGone)?;
        self.pos = 0;
        Ok(())
    }

    /// Rejects a step message the verifier did not read to the end.
    fn ensure_consumed(&self) -> Result<(), ProofError> {
        let trailing = self.proof.len() - self.pos;
        if trailing != 0 {
            tracing::debug!(target: LOG_TARGET, trailing, "proof message has unread bytes");
            return Err(ProofError::malformed_transcript());
        }
        Ok(())
    }

    fn read<T>(
        &mut self,
        n: usize,
        decode: impl Fn(&mut &[u8]) -> Result<T, group::EncodingError>,
    ) -> Result<Vec<T>, ProofError> {
        let mut cursor = &self.proof[self.pos..];
        let before = cursor.len();
        let items = (0..n)
            .map(|_| decode(&mut cursor))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ProofError::malformed_transcript())?;
        self.pos += before - cursor.len();
        Ok(items)
    }
}

impl<C: CurveGroup> VerifierContext<C> for DeniableVerifier<C> {
    fn get_points(&mut self, n: usize) -> Result<Vec<C>, ProofError> {
        self.read(n, group::decode_point::<C>)
    }

    fn get_scalars(&mut self, n: usize) -> Result<Vec<C::ScalarField>, ProofError> {
        self.read(n, group::decode_scalar::<C::ScalarField>)
    }

    fn pub_rand(&mut self, n: usize) -> Result<Vec<C::ScalarField>, ProofError> {
        self.ensure_consumed()?;
        self.signals
            .send(Signal::NeedChallenge)
            .map_err(|_| ProofError::PeerGone)?;
        let mix = self.inbox.blocking_recv().ok_or(ProofError::PeerGone)?;
        let scalars = group::scalars_from_xof(&mut xof(&mix), n);
        self.next_proof()?;
        Ok(scalars)
    }
}
