//! Predicate trees over discrete-log representations.
//!
//! Variables are declared once in a [`VarTable`] and referred to by small
//! stable indices afterwards. Names only matter for diagnostics.

use std::collections::BTreeMap;
use std::fmt;

use ark_ec::CurveGroup;

use super::error::ProofError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SecretVar(usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PointVar(usize);

impl SecretVar {
    pub fn index(self) -> usize {
        self.0
    }
}

impl PointVar {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Names of the secret and public variables a set of predicates may use.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VarTable {
    secrets: Vec<String>,
    points: Vec<String>,
}

impl VarTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a secret, or returns the existing handle for that name.
    pub fn secret(&mut self, name: &str) -> SecretVar {
        if let Some(index) = self.secrets.iter().position(|n| n == name) {
            return SecretVar(index);
        }
        self.secrets.push(name.to_owned());
        SecretVar(self.secrets.len() - 1)
    }

    /// Declares a public point, or returns the existing handle for that name.
    pub fn point(&mut self, name: &str) -> PointVar {
        if let Some(index) = self.points.iter().position(|n| n == name) {
            return PointVar(index);
        }
        self.points.push(name.to_owned());
        PointVar(self.points.len() - 1)
    }

    pub fn find_secret(&self, name: &str) -> Option<SecretVar> {
        self.secrets.iter().position(|n| n == name).map(SecretVar)
    }

    pub fn find_point(&self, name: &str) -> Option<PointVar> {
        self.points.iter().position(|n| n == name).map(PointVar)
    }

    pub fn secret_name(&self, var: SecretVar) -> &str {
        self.secrets.get(var.0).map(String::as_str).unwrap_or("?")
    }

    pub fn point_name(&self, var: PointVar) -> &str {
        self.points.get(var.0).map(String::as_str).unwrap_or("?")
    }

    pub fn secret_count(&self) -> usize {
        self.secrets.len()
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }
}

/// One `secret * base` term of a representation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Term {
    pub secret: SecretVar,
    pub base: PointVar,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Predicate {
    /// `val = Σ secret_i * base_i`
    Rep { val: PointVar, terms: Vec<Term> },
    And(Vec<Predicate>),
    /// `choice` is the branch the prover can actually satisfy. Verifiers
    /// ignore it.
    Or {
        subs: Vec<Predicate>,
        choice: Option<usize>,
    },
}

impl Predicate {
    pub fn rep(val: PointVar, terms: impl IntoIterator<Item = (SecretVar, PointVar)>) -> Self {
        Predicate::Rep {
            val,
            terms: terms
                .into_iter()
                .map(|(secret, base)| Term { secret, base })
                .collect(),
        }
    }

    /// Knowledge of a discrete logarithm: `val = secret * base`.
    pub fn log(val: PointVar, secret: SecretVar, base: PointVar) -> Self {
        Self::rep(val, [(secret, base)])
    }

    pub fn and(subs: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::And(subs.into_iter().collect())
    }

    pub fn or(subs: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::Or {
            subs: subs.into_iter().collect(),
            choice: None,
        }
    }

    /// Selects the branch a prover will satisfy. No-op on non-OR predicates.
    pub fn choose(mut self, branch: usize) -> Self {
        if let Predicate::Or { choice, .. } = &mut self {
            *choice = Some(branch);
        }
        self
    }

    /// Checks the structural rules: no OR below an AND, no empty compound,
    /// no term-less representation, and every variable declared in `vars`.
    pub fn validate(&self, vars: &VarTable) -> Result<(), ProofError> {
        self.check(vars, false)
    }

    fn check(&self, vars: &VarTable, under_and: bool) -> Result<(), ProofError> {
        match self {
            Predicate::Rep { val, terms } => {
                if terms.is_empty() {
                    return Err(malformed("representation without terms"));
                }
                check_point(vars, *val)?;
                for term in terms {
                    if term.secret.0 >= vars.secret_count() {
                        return Err(malformed(format!("undeclared secret #{}", term.secret.0)));
                    }
                    check_point(vars, term.base)?;
                }
                Ok(())
            }
            Predicate::And(subs) => {
                if subs.is_empty() {
                    return Err(malformed("empty AND"));
                }
                subs.iter().try_for_each(|sub| sub.check(vars, true))
            }
            Predicate::Or { subs, choice } => {
                if under_and {
                    return Err(malformed("OR predicates cannot appear under AND"));
                }
                if subs.is_empty() {
                    return Err(malformed("empty OR"));
                }
                if let Some(choice) = choice {
                    if *choice >= subs.len() {
                        return Err(malformed(format!(
                            "OR choice {choice} out of range for {} branches",
                            subs.len()
                        )));
                    }
                }
                subs.iter().try_for_each(|sub| sub.check(vars, false))
            }
        }
    }

    /// Every public variable this predicate refers to, in first-use order.
    pub fn point_vars(&self) -> Vec<PointVar> {
        let mut seen = Vec::new();
        self.collect_points(&mut seen);
        seen
    }

    fn collect_points(&self, seen: &mut Vec<PointVar>) {
        match self {
            Predicate::Rep { val, terms } => {
                for var in std::iter::once(*val).chain(terms.iter().map(|t| t.base)) {
                    if !seen.contains(&var) {
                        seen.push(var);
                    }
                }
            }
            Predicate::And(subs) | Predicate::Or { subs, .. } => {
                subs.iter().for_each(|sub| sub.collect_points(seen))
            }
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Predicate::Or { .. } => 1,
            Predicate::And(_) => 2,
            Predicate::Rep { .. } => 3,
        }
    }

    /// Renders the predicate in Camenisch–Stadler notation using the names
    /// in `vars`.
    pub fn display<'a>(&'a self, vars: &'a VarTable) -> PredicateDisplay<'a> {
        PredicateDisplay { pred: self, vars }
    }
}

fn malformed(msg: impl Into<String>) -> ProofError {
    ProofError::MalformedPredicate(msg.into())
}

fn check_point(vars: &VarTable, var: PointVar) -> Result<(), ProofError> {
    if var.0 >= vars.point_count() {
        return Err(malformed(format!("undeclared point #{}", var.0)));
    }
    Ok(())
}

pub struct PredicateDisplay<'a> {
    pred: &'a Predicate,
    vars: &'a VarTable,
}

impl PredicateDisplay<'_> {
    fn write(&self, f: &mut fmt::Formatter<'_>, pred: &Predicate, parent: u8) -> fmt::Result {
        let own = pred.precedence();
        if own < parent {
            write!(f, "(")?;
        }
        match pred {
            Predicate::Rep { val, terms } => {
                write!(f, "{}=", self.vars.point_name(*val))?;
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        write!(f, "+")?;
                    }
                    write!(
                        f,
                        "{}*{}",
                        self.vars.secret_name(term.secret),
                        self.vars.point_name(term.base)
                    )?;
                }
            }
            Predicate::And(subs) | Predicate::Or { subs, .. } => {
                let sep = if own == 1 { " || " } else { " && " };
                for (i, sub) in subs.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{sep}")?;
                    }
                    self.write(f, sub, own)?;
                }
            }
        }
        if own < parent {
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl fmt::Display for PredicateDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(f, self.pred, 0)
    }
}

/// Prover-side secret assignments. Secrets used only on branches the prover
/// is not obliged to satisfy may be left out.
#[derive(Clone, Debug)]
pub struct SecretValues<F> {
    values: BTreeMap<SecretVar, F>,
}

impl<F: Copy> SecretValues<F> {
    pub fn new() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, var: SecretVar, value: F) -> Self {
        self.insert(var, value);
        self
    }

    pub fn insert(&mut self, var: SecretVar, value: F) {
        self.values.insert(var, value);
    }

    pub fn get(&self, var: SecretVar) -> Option<F> {
        self.values.get(&var).copied()
    }
}

impl<F: Copy> Default for SecretValues<F> {
    fn default() -> Self {
        Self::new()
    }
}

/// Values of the public points, known to prover and verifier alike.
#[derive(Clone, Debug)]
pub struct PublicValues<C> {
    values: BTreeMap<PointVar, C>,
}

impl<C: CurveGroup> PublicValues<C> {
    pub fn new() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, var: PointVar, value: C) -> Self {
        self.insert(var, value);
        self
    }

    pub fn insert(&mut self, var: PointVar, value: C) {
        self.values.insert(var, value);
    }

    pub fn get(&self, var: PointVar) -> Option<C> {
        self.values.get(&var).copied()
    }

    /// Fails with [`ProofError::MissingPoint`] for the first public variable
    /// of `pred` that has no value.
    pub fn ensure_covers(&self, pred: &Predicate, vars: &VarTable) -> Result<(), ProofError> {
        match pred.point_vars().into_iter().find(|v| !self.values.contains_key(v)) {
            Some(missing) => Err(ProofError::MissingPoint(vars.point_name(missing).to_owned())),
            None => Ok(()),
        }
    }
}

impl<C: CurveGroup> Default for PublicValues<C> {
    fn default() -> Self {
        Self::new()
    }
}
