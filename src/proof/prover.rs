//! Prover traversal: commitments, then responses to the master challenge.
//!
//! Each OR-free subtree (a representation, or an AND of representations) is
//! one domain with shared blinding factors and a shared response vector, so a
//! secret used twice in a domain gets a single response.

use ark_ec::CurveGroup;
use ark_ff::Zero;

use super::error::ProofError;
use super::predicate::{PointVar, Predicate, PublicValues, SecretValues, SecretVar, VarTable};
use super::{Prover, ProverContext, ProverContextExt};

const LOG_TARGET: &str = "zk_mix::proof::prover";

/// Prover state recorded during the commit phase.
enum Committed<F> {
    Domain {
        /// Pre-challenge; `None` on a branch the prover must really satisfy.
        w: Option<F>,
        blinds: Vec<Option<F>>,
    },
    Or {
        /// Branch whose challenge is derived at response time, on obligated ORs.
        obligated: Option<usize>,
        challenges: Vec<Option<F>>,
        subs: Vec<Committed<F>>,
    },
}

struct ProofRun<'a, C: CurveGroup> {
    vars: &'a VarTable,
    secrets: &'a SecretValues<C::ScalarField>,
    points: &'a PublicValues<C>,
}

impl<C: CurveGroup> ProofRun<'_, C> {
    fn point(&self, var: PointVar) -> Result<C, ProofError> {
        self.points
            .get(var)
            .ok_or_else(|| ProofError::MissingPoint(self.vars.point_name(var).to_owned()))
    }

    fn secret(&self, var: SecretVar) -> Result<C::ScalarField, ProofError> {
        self.secrets
            .get(var)
            .ok_or_else(|| ProofError::MissingSecret(self.vars.secret_name(var).to_owned()))
    }

    fn prove(&self, pred: &Predicate, ctx: &mut dyn ProverContext<C>) -> Result<(), ProofError> {
        let committed = self.commit(pred, None, ctx)?;
        let challenge = ctx.pub_rand_scalar()?;
        self.respond(pred, &committed, challenge, ctx)
    }

    fn commit(
        &self,
        pred: &Predicate,
        w: Option<C::ScalarField>,
        ctx: &mut dyn ProverContext<C>,
    ) -> Result<Committed<C::ScalarField>, ProofError> {
        let Predicate::Or { subs, choice } = pred else {
            let mut blinds = vec![None; self.vars.secret_count()];
            self.commit_domain(pred, w, &mut blinds, ctx)?;
            return Ok(Committed::Domain { w, blinds });
        };

        let mut challenges = vec![None; subs.len()];
        let obligated = match w {
            None => {
                let choice = choice.filter(|c| *c < subs.len()).ok_or_else(|| {
                    ProofError::MalformedPredicate(
                        "no choice of proof branch for OR predicate".into(),
                    )
                })?;
                for (i, slot) in challenges.iter_mut().enumerate() {
                    if i != choice {
                        *slot = Some(ctx.pri_rand_scalar());
                    }
                }
                Some(choice)
            }
            Some(w) => {
                // Random pre-challenges that still add up to w.
                let last = subs.len() - 1;
                let mut rest = w;
                for slot in challenges.iter_mut().take(last) {
                    let c = ctx.pri_rand_scalar();
                    rest -= c;
                    *slot = Some(c);
                }
                challenges[last] = Some(rest);
                None
            }
        };

        let subs = subs
            .iter()
            .zip(&challenges)
            .map(|(sub, c)| self.commit(sub, *c, ctx))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Committed::Or {
            obligated,
            challenges,
            subs,
        })
    }

    fn commit_domain(
        &self,
        pred: &Predicate,
        w: Option<C::ScalarField>,
        blinds: &mut [Option<C::ScalarField>],
        ctx: &mut dyn ProverContext<C>,
    ) -> Result<(), ProofError> {
        match pred {
            Predicate::Rep { val, terms } => {
                let mut commitment = match w {
                    Some(w) => self.point(*val)? * w,
                    None => C::zero(),
                };
                for term in terms {
                    let blind = *blinds[term.secret.index()]
                        .get_or_insert_with(|| ctx.pri_rand_scalar());
                    commitment += self.point(term.base)? * blind;
                }
                ctx.put_point(commitment)
            }
            Predicate::And(subs) => subs
                .iter()
                .try_for_each(|sub| self.commit_domain(sub, w, blinds, ctx)),
            Predicate::Or { .. } => panic!("OR predicates cannot appear under AND"),
        }
    }

    fn respond(
        &self,
        pred: &Predicate,
        committed: &Committed<C::ScalarField>,
        challenge: C::ScalarField,
        ctx: &mut dyn ProverContext<C>,
    ) -> Result<(), ProofError> {
        match (pred, committed) {
            (Predicate::Or { subs, .. }, Committed::Or { obligated, challenges, subs: states }) => {
                let mut challenges = challenges.clone();
                if let Some(choice) = *obligated {
                    let others = challenges
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| *i != choice)
                        .filter_map(|(_, c)| *c)
                        .fold(C::ScalarField::zero(), |acc, c| acc + c);
                    challenges[choice] = Some(challenge - others);
                }
                let challenges: Vec<C::ScalarField> = challenges.into_iter().flatten().collect();
                debug_assert_eq!(challenges.len(), subs.len());

                if subs.len() > 1 {
                    ctx.put_scalars(&challenges)?;
                }
                for ((sub, state), c) in subs.iter().zip(states).zip(challenges) {
                    self.respond(sub, state, c, ctx)?;
                }
                Ok(())
            }
            (_, Committed::Domain { w, blinds }) => {
                let mut responses = vec![None; self.vars.secret_count()];
                self.respond_domain(pred, w.is_some(), blinds, challenge, &mut responses)?;
                let responses: Vec<C::ScalarField> = responses.into_iter().flatten().collect();
                ctx.put_scalars(&responses)
            }
            _ => unreachable!("commit state mirrors the predicate"),
        }
    }

    fn respond_domain(
        &self,
        pred: &Predicate,
        simulated: bool,
        blinds: &[Option<C::ScalarField>],
        challenge: C::ScalarField,
        responses: &mut [Option<C::ScalarField>],
    ) -> Result<(), ProofError> {
        match pred {
            Predicate::Rep { terms, .. } => {
                for term in terms {
                    let index = term.secret.index();
                    if responses[index].is_some() {
                        continue;
                    }
                    let Some(blind) = blinds[index] else {
                        unreachable!("every secret in a domain is blinded at commit time");
                    };
                    responses[index] = Some(if simulated {
                        blind
                    } else {
                        blind - challenge * self.secret(term.secret)?
                    });
                }
                Ok(())
            }
            Predicate::And(subs) => subs.iter().try_for_each(|sub| {
                self.respond_domain(sub, simulated, blinds, challenge, responses)
            }),
            Predicate::Or { .. } => panic!("OR predicates cannot appear under AND"),
        }
    }
}

impl Predicate {
    /// Builds a prover for this predicate.
    ///
    /// Structural problems and unassigned public points are reported here;
    /// a secret missing from an obligated branch surfaces when the prover runs.
    pub fn prover<C: CurveGroup>(
        &self,
        vars: &VarTable,
        secrets: SecretValues<C::ScalarField>,
        points: PublicValues<C>,
    ) -> Result<Prover<C>, ProofError> {
        self.validate(vars)?;
        points.ensure_covers(self, vars)?;

        let pred = self.clone();
        let vars = vars.clone();
        Ok(Box::new(move |ctx: &mut dyn ProverContext<C>| {
            tracing::debug!(target: LOG_TARGET, predicate = %pred.display(&vars), "proving");
            let run = ProofRun {
                vars: &vars,
                secrets: &secrets,
                points: &points,
            };
            run.prove(&pred, ctx)
        }))
    }
}
