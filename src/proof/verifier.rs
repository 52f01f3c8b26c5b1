//! Verifier traversal, mirroring the prover's transcript order.

use ark_ec::CurveGroup;
use ark_ff::Zero;

use super::error::{InvalidProofKind, ProofError};
use super::predicate::{Predicate, PublicValues, VarTable};
use super::{Verifier, VerifierContext, VerifierContextExt};

const LOG_TARGET: &str = "zk_mix::proof::verifier";

/// Commitments read for each OR-free domain.
enum Received<C> {
    Domain { commitments: Vec<C>, used: Vec<bool> },
    Or { subs: Vec<Received<C>> },
}

/// Counts representations and marks the secrets a domain uses.
fn scan_domain(pred: &Predicate, used: &mut [bool]) -> usize {
    match pred {
        Predicate::Rep { terms, .. } => {
            for term in terms {
                used[term.secret.index()] = true;
            }
            1
        }
        Predicate::And(subs) => subs.iter().map(|sub| scan_domain(sub, used)).sum(),
        Predicate::Or { .. } => panic!("OR predicates cannot appear under AND"),
    }
}

struct VerifyRun<'a, C: CurveGroup> {
    vars: &'a VarTable,
    points: &'a PublicValues<C>,
}

impl<C: CurveGroup> VerifyRun<'_, C> {
    fn point(&self, var: super::PointVar) -> Result<C, ProofError> {
        self.points
            .get(var)
            .ok_or_else(|| ProofError::MissingPoint(self.vars.point_name(var).to_owned()))
    }

    fn verify(&self, pred: &Predicate, ctx: &mut dyn VerifierContext<C>) -> Result<(), ProofError> {
        let received = self.get_commits(pred, ctx)?;
        let challenge = ctx.pub_rand_scalar()?;
        self.check(pred, &received, challenge, ctx)
    }

    fn get_commits(
        &self,
        pred: &Predicate,
        ctx: &mut dyn VerifierContext<C>,
    ) -> Result<Received<C>, ProofError> {
        match pred {
            Predicate::Or { subs, .. } => Ok(Received::Or {
                subs: subs
                    .iter()
                    .map(|sub| self.get_commits(sub, ctx))
                    .collect::<Result<_, _>>()?,
            }),
            _ => {
                let mut used = vec![false; self.vars.secret_count()];
                let count = scan_domain(pred, &mut used);
                let commitments = ctx.get_points(count)?;
                Ok(Received::Domain { commitments, used })
            }
        }
    }

    fn check(
        &self,
        pred: &Predicate,
        received: &Received<C>,
        challenge: C::ScalarField,
        ctx: &mut dyn VerifierContext<C>,
    ) -> Result<(), ProofError> {
        match (pred, received) {
            (Predicate::Or { subs, .. }, Received::Or { subs: records }) => {
                let challenges = if subs.len() > 1 {
                    let challenges = ctx.get_scalars(subs.len())?;
                    let sum = challenges
                        .iter()
                        .fold(C::ScalarField::zero(), |acc, c| acc + c);
                    if sum != challenge {
                        tracing::debug!(target: LOG_TARGET, "sub-challenges do not sum to parent");
                        return Err(ProofError::InvalidProof(InvalidProofKind::BadSubChallenges));
                    }
                    challenges
                } else {
                    vec![challenge]
                };
                for ((sub, record), c) in subs.iter().zip(records).zip(challenges) {
                    self.check(sub, record, c, ctx)?;
                }
                Ok(())
            }
            (_, Received::Domain { commitments, used }) => {
                let count = used.iter().filter(|u| **u).count();
                let mut values = ctx.get_scalars(count)?.into_iter();
                let responses: Vec<Option<C::ScalarField>> = used
                    .iter()
                    .map(|u| if *u { values.next() } else { None })
                    .collect();

                let mut commitments = commitments.iter();
                self.check_domain(pred, challenge, &responses, &mut commitments)
            }
            _ => unreachable!("received commitments mirror the predicate"),
        }
    }

    fn check_domain<'c>(
        &self,
        pred: &Predicate,
        challenge: C::ScalarField,
        responses: &[Option<C::ScalarField>],
        commitments: &mut impl Iterator<Item = &'c C>,
    ) -> Result<(), ProofError>
    where
        C: 'c,
    {
        match pred {
            Predicate::Rep { val, terms } => {
                let mut expected = self.point(*val)? * challenge;
                for term in terms {
                    let Some(response) = responses[term.secret.index()] else {
                        unreachable!("responses are read for every used secret");
                    };
                    expected += self.point(term.base)? * response;
                }
                match commitments.next() {
                    Some(commitment) if *commitment == expected => Ok(()),
                    _ => {
                        tracing::debug!(
                            target: LOG_TARGET,
                            rep = %pred.display(self.vars),
                            "commitment mismatch"
                        );
                        Err(ProofError::commit_mismatch())
                    }
                }
            }
            Predicate::And(subs) => subs
                .iter()
                .try_for_each(|sub| self.check_domain(sub, challenge, responses, commitments)),
            Predicate::Or { .. } => panic!("OR predicates cannot appear under AND"),
        }
    }
}

impl Predicate {
    /// Builds a verifier for this predicate against the given public points.
    pub fn verifier<C: CurveGroup>(
        &self,
        vars: &VarTable,
        points: PublicValues<C>,
    ) -> Result<Verifier<C>, ProofError> {
        self.validate(vars)?;
        points.ensure_covers(self, vars)?;

        let pred = self.clone();
        let vars = vars.clone();
        Ok(Box::new(move |ctx: &mut dyn VerifierContext<C>| {
            tracing::debug!(target: LOG_TARGET, predicate = %pred.display(&vars), "verifying");
            let run = VerifyRun {
                vars: &vars,
                points: &points,
            };
            run.verify(&pred, ctx)
        }))
    }
}
