//! Clause normalization
//!
//! Every predicate gets a canonical argument vector `x0, x1, ...`. In a
//! normalized clause the body application is over version 0 of those
//! variables (`x0#0, ...`) and the head application over version 1
//! (`x0#1, ...`); the original arguments are tied to them by equalities in
//! the constraint. Clause-local variables defined by such equalities are
//! substituted away, and whatever locals remain are renamed `aux0, aux1, ...`.

use crate::{ChcProblem, ChcResult, ClauseBody, ClauseHead, HornClause, PredicateId};
use num_traits::{One, Signed};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;
use z4_expr::{simplify, ChcExpr, ChcOp, ChcSort, ChcVar, LinearTerm, TimeMachine};

/// Canonical argument vectors of the predicates (unversioned)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalPredicates {
    vars: FxHashMap<PredicateId, Vec<ChcVar>>,
}

impl CanonicalPredicates {
    /// Canonical variables of `pred`, unversioned
    pub fn vars(&self, pred: PredicateId) -> Option<&[ChcVar]> {
        self.vars.get(&pred).map(Vec::as_slice)
    }

    /// Canonical variables of `pred` at a version
    pub fn versioned(&self, pred: PredicateId, time: u32) -> Option<Vec<ChcVar>> {
        self.vars(pred)
            .map(|vars| vars.iter().map(|v| TimeMachine::var_at(v, time)).collect())
    }
}

/// A problem in normal form together with its canonical representation
#[derive(Debug, Clone)]
pub struct NormalizedProblem {
    pub problem: ChcProblem,
    pub canonical: CanonicalPredicates,
}

/// Brings every clause of a problem to normal form
#[derive(Debug, Default)]
pub struct Normalizer {
    aux_counter: usize,
}

impl Normalizer {
    /// Normalizer whose auxiliary names start at `aux0`
    pub fn new() -> Self {
        Self::default()
    }

    pub fn normalize(&mut self, problem: &ChcProblem) -> ChcResult<NormalizedProblem> {
        problem.validate()?;
        let mut canonical = CanonicalPredicates::default();
        let mut normalized = ChcProblem::new();
        for pred in problem.predicates() {
            let id = normalized.declare_predicate(pred.name.clone(), pred.arg_sorts.clone());
            canonical.vars.insert(id, pred.canonical_vars());
        }
        for clause in problem.clauses() {
            let clause = self.normalize_clause(clause, &canonical)?;
            trace!(%clause, "normalized clause");
            normalized.add_clause(clause);
        }
        Ok(NormalizedProblem {
            problem: normalized,
            canonical,
        })
    }

    fn normalize_clause(
        &mut self,
        clause: &HornClause,
        canonical: &CanonicalPredicates,
    ) -> ChcResult<HornClause> {
        // rename the clause's own variables out of the way of canonical names
        let locals: Vec<ChcVar> = clause
            .vars()
            .into_iter()
            .enumerate()
            .map(|(i, v)| v.renamed(format!("l{i}")))
            .collect();
        let renaming: FxHashMap<ChcVar, ChcExpr> = clause
            .vars()
            .into_iter()
            .zip(&locals)
            .map(|(v, l)| (v, ChcExpr::var(l.clone())))
            .collect();

        let mut conjuncts = Vec::new();
        let mut body_preds = Vec::with_capacity(clause.body.predicates.len());
        for (pred, args) in &clause.body.predicates {
            let vars = canonical.versioned(*pred, 0).unwrap_or_default();
            for (v, arg) in vars.iter().zip(args) {
                conjuncts.push(ChcExpr::eq(ChcExpr::var(v.clone()), arg.substitute_map(&renaming)));
            }
            body_preds.push((*pred, vars.into_iter().map(ChcExpr::var).collect()));
        }
        if let Some(c) = &clause.body.constraint {
            conjuncts.push(c.substitute_map(&renaming));
        }
        let head = match &clause.head {
            ClauseHead::False => ClauseHead::False,
            ClauseHead::Predicate(pred, args) => {
                let vars = canonical.versioned(*pred, 1).unwrap_or_default();
                for (v, arg) in vars.iter().zip(args) {
                    conjuncts
                        .push(ChcExpr::eq(ChcExpr::var(v.clone()), arg.substitute_map(&renaming)));
                }
                ClauseHead::Predicate(*pred, vars.into_iter().map(ChcExpr::var).collect())
            }
        };

        let local_set: FxHashSet<ChcVar> = locals.into_iter().collect();
        let constraint = eliminate_defined(ChcExpr::and_all(conjuncts), &local_set);
        let constraint = self.rename_remaining(constraint, &local_set);
        let constraint = match constraint {
            ChcExpr::Bool(true) => None,
            other => Some(other),
        };
        Ok(HornClause::new(ClauseBody::new(body_preds, constraint), head))
    }

    fn rename_remaining(&mut self, constraint: ChcExpr, locals: &FxHashSet<ChcVar>) -> ChcExpr {
        let mut renaming = FxHashMap::default();
        for v in constraint.vars() {
            if locals.contains(&v) {
                let aux = v.renamed(format!("aux{}", self.aux_counter));
                self.aux_counter += 1;
                renaming.insert(v, ChcExpr::var(aux));
            }
        }
        constraint.substitute_map(&renaming)
    }
}

/// `var = definition` read off a conjunct, for some eliminable `var`
fn definition(conjunct: &ChcExpr, locals: &FxHashSet<ChcVar>) -> Option<(ChcVar, ChcExpr)> {
    match conjunct {
        ChcExpr::Var(v) if v.is_bool() && locals.contains(v) => {
            Some((v.clone(), ChcExpr::Bool(true)))
        }
        ChcExpr::Op(ChcOp::Not, args) => match args[0].as_ref() {
            ChcExpr::Var(v) if v.is_bool() && locals.contains(v) => {
                Some((v.clone(), ChcExpr::Bool(false)))
            }
            _ => None,
        },
        ChcExpr::Op(ChcOp::Eq | ChcOp::Iff, args) if args[0].sort() == ChcSort::Bool => {
            for (lhs, rhs) in [(&args[0], &args[1]), (&args[1], &args[0])] {
                if let ChcExpr::Var(v) = lhs.as_ref() {
                    if locals.contains(v) && !rhs.contains_var(v) {
                        return Some((v.clone(), rhs.as_ref().clone()));
                    }
                }
            }
            None
        }
        ChcExpr::Op(ChcOp::Eq, args) => {
            let diff = LinearTerm::from_expr(&args[0])
                .ok()?
                .minus(&LinearTerm::from_expr(&args[1]).ok()?);
            let (v, c) = diff.coeffs().iter().find(|(v, c)| {
                locals.contains(*v) && (v.sort == ChcSort::Real || c.abs().is_one())
            })?;
            // v = -(diff - c*v) / c
            let rest = diff.without(v).scaled(&-c.recip());
            if v.sort == ChcSort::Int && !rest.denominator_lcm().is_one() {
                return None;
            }
            Some((v.clone(), rest.to_expr(v.sort)))
        }
        _ => None,
    }
}

/// Substitute away locals defined by equalities among the top-level conjuncts
fn eliminate_defined(constraint: ChcExpr, locals: &FxHashSet<ChcVar>) -> ChcExpr {
    let mut conjuncts = simplify(&constraint).conjuncts();
    loop {
        let found = conjuncts
            .iter()
            .enumerate()
            .find_map(|(i, c)| definition(c, locals).map(|d| (i, d)));
        let Some((index, (var, def))) = found else {
            break;
        };
        conjuncts.remove(index);
        let subst = [(var, def)];
        conjuncts = conjuncts
            .iter()
            .map(|c| simplify(&c.substitute(&subst)))
            .flat_map(|c| c.conjuncts())
            .collect();
    }
    simplify(&ChcExpr::and_all(conjuncts))
}
