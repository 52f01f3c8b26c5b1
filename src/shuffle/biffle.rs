//! Shuffle of exactly two ElGamal pairs ("biffle").
//!
//! With only two possible permutations the shuffle is proven by a plain sigma
//! disjunction: either both pairs were re-randomized in place, or both were
//! re-randomized and swapped.

use ark_ec::CurveGroup;
use ark_ff::UniformRand;
use ark_std::rand::Rng;

use crate::proof::{Predicate, Prover, ProofError, PublicValues, SecretValues, VarTable, Verifier};

const LOG_TARGET: &str = "zk_mix::shuffle::biffle";

struct BiffleStatement {
    vars: VarTable,
    pred: Predicate,
}

impl BiffleStatement {
    fn new() -> Self {
        let mut vars = VarTable::new();
        let beta = [vars.secret("beta0"), vars.secret("beta1")];
        let (g, h) = (vars.point("G"), vars.point("H"));

        // Branch `bit` proves Xbar_i - X_{i^bit} = beta_{i^bit}*G, and the same
        // for Y over H.
        let branch = |vars: &mut VarTable, bit: usize| {
            let mut reps = Vec::with_capacity(4);
            for i in 0..2 {
                let j = i ^ bit;
                let dx = vars.point(&format!("Xbar{i}-X{j}"));
                let dy = vars.point(&format!("Ybar{i}-Y{j}"));
                reps.push(Predicate::log(dx, beta[j], g));
                reps.push(Predicate::log(dy, beta[j], h));
            }
            Predicate::and(reps)
        };
        let straight = branch(&mut vars, 0);
        let swapped = branch(&mut vars, 1);
        let pred = Predicate::or([straight, swapped]);
        Self { vars, pred }
    }

    fn points<C: CurveGroup>(
        &self,
        g: C,
        h: C,
        x: &[C; 2],
        y: &[C; 2],
        xbar: &[C; 2],
        ybar: &[C; 2],
    ) -> Result<PublicValues<C>, ProofError> {
        let lookup = |name: &str| {
            self.vars
                .find_point(name)
                .ok_or_else(|| ProofError::MissingPoint(name.to_owned()))
        };
        let mut points = PublicValues::new()
            .with(lookup("G")?, g)
            .with(lookup("H")?, h);
        for i in 0..2 {
            for j in 0..2 {
                points.insert(lookup(&format!("Xbar{i}-X{j}"))?, xbar[i] - x[j]);
                points.insert(lookup(&format!("Ybar{i}-Y{j}"))?, ybar[i] - y[j]);
            }
        }
        Ok(points)
    }
}

/// Shuffles two pairs and returns the outputs with a prover for them.
pub fn biffle<C, R>(
    g: C,
    h: C,
    x: [C; 2],
    y: [C; 2],
    rng: &mut R,
) -> Result<([C; 2], [C; 2], Prover<C>), ProofError>
where
    C: CurveGroup,
    R: Rng + ?Sized,
{
    let bit = usize::from(rng.gen::<bool>());
    let beta = [C::ScalarField::rand(rng), C::ScalarField::rand(rng)];
    let xbar = [0, 1].map(|i| g * beta[i ^ bit] + x[i ^ bit]);
    let ybar = [0, 1].map(|i| h * beta[i ^ bit] + y[i ^ bit]);

    let statement = BiffleStatement::new();
    let points = statement.points(g, h, &x, &y, &xbar, &ybar)?;
    let mut secrets = SecretValues::new();
    for (i, value) in beta.into_iter().enumerate() {
        if let Some(var) = statement.vars.find_secret(&format!("beta{i}")) {
            secrets.insert(var, value);
        }
    }
    let prover = statement
        .pred
        .choose(bit)
        .prover(&statement.vars, secrets, points)?;
    tracing::debug!(target: LOG_TARGET, "biffle prepared");
    Ok((xbar, ybar, prover))
}

/// Builds a verifier for a biffle of `(x, y)` into `(xbar, ybar)`.
pub fn biffle_verifier<C: CurveGroup>(
    g: C,
    h: C,
    x: [C; 2],
    y: [C; 2],
    xbar: [C; 2],
    ybar: [C; 2],
) -> Result<Verifier<C>, ProofError> {
    let statement = BiffleStatement::new();
    let points = statement.points(g, h, &x, &y, &xbar, &ybar)?;
    statement.pred.verifier(&statement.vars, points)
}
