//! Safety witnesses
//!
//! A witness interprets every predicate of a problem by a formula over the
//! predicate's arguments such that each clause becomes valid.

use crate::{ChcError, ChcProblem, ChcResult, ClauseHead, PredicateId};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;
use tracing::debug;
use z4_arith::implies;
use z4_expr::{ChcExpr, ChcVar};

/// Interpretation of a predicate (what `Inv(x)` means)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateInterpretation {
    /// Variables the interpretation is over
    pub vars: Vec<ChcVar>,
    /// Formula defining the predicate
    pub formula: ChcExpr,
}

impl PredicateInterpretation {
    pub fn new(vars: Vec<ChcVar>, formula: ChcExpr) -> Self {
        Self { vars, formula }
    }

    /// The interpretation applied to arguments
    pub fn apply(&self, args: &[ChcExpr]) -> ChcExpr {
        let subst: FxHashMap<ChcVar, ChcExpr> = self
            .vars
            .iter()
            .cloned()
            .zip(args.iter().cloned())
            .collect();
        self.formula.substitute_map(&subst)
    }
}

/// Interpretations of the predicates of a safe problem
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityWitness {
    interpretations: BTreeMap<PredicateId, PredicateInterpretation>,
}

impl ValidityWitness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, pred: PredicateId, interp: PredicateInterpretation) {
        self.interpretations.insert(pred, interp);
    }

    pub fn get(&self, pred: PredicateId) -> Option<&PredicateInterpretation> {
        self.interpretations.get(&pred)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PredicateId, &PredicateInterpretation)> {
        self.interpretations.iter()
    }

    pub fn len(&self) -> usize {
        self.interpretations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interpretations.is_empty()
    }

    fn apply(&self, pred: PredicateId, args: &[ChcExpr]) -> ChcResult<ChcExpr> {
        self.get(pred)
            .map(|interp| interp.apply(args))
            .ok_or_else(|| ChcError::UndefinedPredicate(pred.to_string()))
    }

    /// Does every clause of `problem` hold under the interpretations
    pub fn validate(&self, problem: &ChcProblem) -> ChcResult<bool> {
        let theory = problem.theory()?;
        for (index, clause) in problem.clauses().iter().enumerate() {
            let mut body = vec![clause.body.constraint_or_true()];
            for (pred, args) in &clause.body.predicates {
                body.push(self.apply(*pred, args)?);
            }
            let head = match &clause.head {
                ClauseHead::Predicate(pred, args) => self.apply(*pred, args)?,
                ClauseHead::False => ChcExpr::Bool(false),
            };
            if !implies(theory, &ChcExpr::and_all(body), &head)? {
                debug!(clause = index, "witness violates clause");
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// SMT-LIB `define-fun` per predicate
    ///
    /// ```text
    /// (define-fun Inv ((x0 Int)) Bool
    ///   (and (>= x0 0) (<= x0 10)))
    /// ```
    pub fn to_smtlib(&self, problem: &ChcProblem) -> String {
        let mut output = String::new();
        for (pred, interp) in &self.interpretations {
            let name = problem
                .get_predicate(*pred)
                .map(|p| p.name.clone())
                .unwrap_or_else(|| pred.to_string());
            let params: Vec<String> = interp
                .vars
                .iter()
                .map(|v| format!("({} {})", v.name, v.sort))
                .collect();
            let _ = writeln!(
                output,
                "(define-fun {name} ({}) Bool\n  {})",
                params.join(" "),
                interp.formula
            );
        }
        output
    }
}
