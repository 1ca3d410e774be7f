//! Incremental solver context
//!
//! `SmtContext` is the solver interface the rest of the workspace talks to:
//! assert formulas, check, read a model after `sat`, read an interpolant
//! after `unsat`, and scope assertions with push/pop.

use crate::formula::{to_node, Node, Purifier};
use crate::search::{CubeSearch, SearchOutcome};
use crate::theory::{Side, TheoryChecker, VarPartition};
use crate::{ArithResult, SmtError};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, trace};
use z4_expr::{simplify, ChcExpr, ChcOp, Model, Theory};

/// Handle of an asserted formula, used to build partition masks
///
/// Handles are never reused within a context, not even after `pop` or
/// `reset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FormulaId(u32);

/// Set of assertions forming the A side of an interpolation query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionMask(BTreeSet<FormulaId>);

impl PartitionMask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: FormulaId) {
        self.0.insert(id);
    }

    pub fn contains(&self, id: FormulaId) -> bool {
        self.0.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<FormulaId> for PartitionMask {
    fn from_iter<I: IntoIterator<Item = FormulaId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Result of a satisfiability check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SmtResult {
    Sat,
    Unsat,
    /// Resource limit hit during integer branching
    Unknown,
}

/// Limits of the decision procedure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtConfig {
    /// Maximum nesting of branch-and-bound splits in one integer cube
    pub max_branch_depth: u32,
    /// Maximum number of branch-and-bound splits per check
    pub max_branch_nodes: usize,
}

impl Default for SmtConfig {
    fn default() -> Self {
        Self {
            max_branch_depth: 64,
            max_branch_nodes: 20_000,
        }
    }
}

#[derive(Debug, Clone)]
enum LastCheck {
    Sat(Model),
    Unsat,
    Unknown,
}

/// Incremental decision procedure for quantifier-free linear arithmetic
#[derive(Debug)]
pub struct SmtContext {
    theory: Theory,
    config: SmtConfig,
    assertions: Vec<(FormulaId, ChcExpr)>,
    /// Assertion count at each push, with the answer for that stack if known
    frames: Vec<(usize, Option<LastCheck>)>,
    next_id: u32,
    /// Answer for the current stack; cleared whenever the stack changes
    last: Option<LastCheck>,
}

impl SmtContext {
    pub fn new(theory: Theory) -> Self {
        Self::with_config(theory, SmtConfig::default())
    }

    pub fn with_config(theory: Theory, config: SmtConfig) -> Self {
        Self {
            theory,
            config,
            assertions: Vec::new(),
            frames: Vec::new(),
            next_id: 0,
            last: None,
        }
    }

    pub fn theory(&self) -> Theory {
        self.theory
    }

    pub fn config(&self) -> &SmtConfig {
        &self.config
    }

    /// Assert a formula in the current scope
    pub fn assert(&mut self, formula: ChcExpr) -> FormulaId {
        let id = FormulaId(self.next_id);
        self.next_id += 1;
        self.assertions.push((id, formula));
        self.last = None;
        id
    }

    /// Open a scope
    pub fn push(&mut self) {
        self.frames.push((self.assertions.len(), self.last.clone()));
    }

    /// Drop the assertions of the innermost scope
    ///
    /// The answer known for the stack at the matching `push`, if any, is
    /// restored, so checking again does not search again.
    pub fn pop(&mut self) -> ArithResult<()> {
        let (mark, last) = self.frames.pop().ok_or(SmtError::PopWithoutPush)?;
        self.assertions.truncate(mark);
        self.last = last;
        Ok(())
    }

    /// Drop all assertions and scopes; formula handles keep increasing
    pub fn reset(&mut self) {
        self.assertions.clear();
        self.frames.clear();
        self.last = None;
    }

    pub fn assertions(&self) -> impl Iterator<Item = &ChcExpr> {
        self.assertions.iter().map(|(_, e)| e)
    }

    pub fn num_assertions(&self) -> usize {
        self.assertions.len()
    }

    /// Check the conjunction of all current assertions
    ///
    /// The whole stack is searched again unless it is unchanged since the
    /// last check, in which case the previous answer is returned.
    pub fn check(&mut self) -> ArithResult<SmtResult> {
        if let Some(last) = &self.last {
            trace!(assertions = self.assertions.len(), "check answered from cache");
            return Ok(last.result());
        }
        let mut purifier = Purifier::new("p", self.theory);
        let nodes = self
            .assertions
            .iter()
            .map(|(_, e)| to_node(e, &mut purifier))
            .collect::<ArithResult<Vec<Node>>>()?;
        let checker = TheoryChecker::new(self.theory, &self.config, None);
        let mut search = CubeSearch::new(checker, false);
        let goals = nodes.iter().rev().map(|n| (n, Side::A)).collect();
        let (result, last) = match search.run(goals) {
            SearchOutcome::Sat(model) => (SmtResult::Sat, LastCheck::Sat(model)),
            SearchOutcome::Unsat(_) => (SmtResult::Unsat, LastCheck::Unsat),
            SearchOutcome::Unknown => {
                debug!(assertions = self.assertions.len(), "check gave up");
                (SmtResult::Unknown, LastCheck::Unknown)
            }
        };
        trace!(assertions = self.assertions.len(), ?result, "check");
        self.last = Some(last);
        Ok(result)
    }

    /// Model of the last check, which must have answered `sat`
    pub fn model(&self) -> ArithResult<Model> {
        match &self.last {
            Some(LastCheck::Sat(model)) => Ok(model.clone()),
            _ => Err(SmtError::NoModel),
        }
    }

    /// Craig interpolant of the last `unsat` check
    ///
    /// The A side is the conjunction of the assertions in `mask`, the B side
    /// the conjunction of all others. The result is implied by A, is
    /// inconsistent with B and only mentions variables common to both.
    ///
    /// The refutation is searched again with A expanded first. When that
    /// yields a disjunction over the cubes of A, it is replaced by the atoms
    /// A implies, provided they refute B on their own.
    pub fn interpolant(&self, mask: &PartitionMask) -> ArithResult<ChcExpr> {
        match self.last {
            Some(LastCheck::Unsat) => {}
            Some(LastCheck::Unknown) => {
                return Err(SmtError::Incomplete(
                    "last check answered unknown".to_string(),
                ))
            }
            _ => return Err(SmtError::NoInterpolant),
        }
        let mut a_purifier = Purifier::new("a", self.theory);
        let mut b_purifier = Purifier::new("b", self.theory);
        let mut a_nodes = Vec::new();
        let mut b_nodes = Vec::new();
        for (id, e) in &self.assertions {
            if mask.contains(*id) {
                a_nodes.push(to_node(e, &mut a_purifier)?);
            } else {
                b_nodes.push(to_node(e, &mut b_purifier)?);
            }
        }
        let mut partition = VarPartition::default();
        collect(&a_nodes, &mut partition.a_vars);
        collect(&b_nodes, &mut partition.b_vars);

        let checker = TheoryChecker::new(self.theory, &self.config, Some(&partition));
        let mut search = CubeSearch::new(checker, true);
        // A formulas are expanded first
        let goals = b_nodes
            .iter()
            .rev()
            .map(|n| (n, Side::B))
            .chain(a_nodes.iter().rev().map(|n| (n, Side::A)))
            .collect();
        match search.run(goals) {
            SearchOutcome::Unsat(Some(itp)) => {
                let itp = self.generalize(mask, simplify(&itp))?;
                trace!(interpolant = %itp, "interpolant");
                Ok(itp)
            }
            SearchOutcome::Unsat(None) => Err(SmtError::Internal(
                "refutation without interpolant".to_string(),
            )),
            SearchOutcome::Sat(_) => Err(SmtError::Internal(
                "assertions became satisfiable during interpolation".to_string(),
            )),
            SearchOutcome::Unknown => Err(SmtError::Incomplete(
                "interpolation gave up".to_string(),
            )),
        }
    }
}

impl SmtContext {
    fn side<'a>(
        &'a self,
        mask: &'a PartitionMask,
        a_side: bool,
    ) -> impl Iterator<Item = &'a ChcExpr> + 'a {
        self.assertions
            .iter()
            .filter(move |(id, _)| mask.contains(*id) == a_side)
            .map(|(_, e)| e)
    }

    /// Conjunction of the atoms of a disjunctive interpolant that A implies,
    /// weakened as far as B allows; the interpolant itself if they do not
    /// refute B
    fn generalize(&self, mask: &PartitionMask, itp: ChcExpr) -> ArithResult<ChcExpr> {
        if !has_disjunction(&itp) {
            return Ok(itp);
        }
        let mut atoms = Vec::new();
        collect_atoms(&itp, &mut atoms);

        let mut a_ctx = SmtContext::with_config(self.theory, self.config.clone());
        for e in self.side(mask, true) {
            a_ctx.assert(e.clone());
        }
        let mut implied = Vec::new();
        for atom in atoms {
            a_ctx.push();
            a_ctx.assert(ChcExpr::not(atom.clone()));
            let result = a_ctx.check()?;
            a_ctx.pop()?;
            if result == SmtResult::Unsat {
                implied.push(atom);
            }
        }
        if implied.is_empty() || !self.refutes_b(mask, &implied)? {
            return Ok(itp);
        }
        let mut i = 0;
        while i < implied.len() {
            let dropped = implied.remove(i);
            if !self.refutes_b(mask, &implied)? {
                implied.insert(i, dropped);
                i += 1;
            }
        }
        let general = ChcExpr::and_all(implied);
        trace!(disjunctive = %itp, interpolant = %general, "interpolant generalized");
        Ok(general)
    }

    fn refutes_b(&self, mask: &PartitionMask, atoms: &[ChcExpr]) -> ArithResult<bool> {
        let mut ctx = SmtContext::with_config(self.theory, self.config.clone());
        for e in self.side(mask, false) {
            ctx.assert(e.clone());
        }
        ctx.assert(ChcExpr::and_all(atoms.iter().cloned()));
        Ok(ctx.check()? == SmtResult::Unsat)
    }
}

impl LastCheck {
    fn result(&self) -> SmtResult {
        match self {
            LastCheck::Sat(_) => SmtResult::Sat,
            LastCheck::Unsat => SmtResult::Unsat,
            LastCheck::Unknown => SmtResult::Unknown,
        }
    }
}

fn has_disjunction(e: &ChcExpr) -> bool {
    match e {
        ChcExpr::Op(ChcOp::Or, _) => true,
        ChcExpr::Op(ChcOp::And, args) => args.iter().any(|a| has_disjunction(a)),
        _ => false,
    }
}

fn collect_atoms(e: &ChcExpr, out: &mut Vec<ChcExpr>) {
    match e {
        ChcExpr::Op(ChcOp::And | ChcOp::Or, args) => {
            for a in args {
                collect_atoms(a, out);
            }
        }
        _ if !out.contains(e) => out.push(e.clone()),
        _ => {}
    }
}

fn collect(nodes: &[Node], out: &mut FxHashSet<z4_expr::ChcVar>) {
    for n in nodes {
        n.collect_vars(out);
    }
}

/// Satisfiability of a single formula
pub fn check_sat(theory: Theory, formula: &ChcExpr) -> ArithResult<SmtResult> {
    let mut ctx = SmtContext::new(theory);
    ctx.assert(formula.clone());
    ctx.check()
}

/// A model of a single formula, `None` when unsatisfiable
pub fn get_model(theory: Theory, formula: &ChcExpr) -> ArithResult<Option<Model>> {
    let mut ctx = SmtContext::new(theory);
    ctx.assert(formula.clone());
    match ctx.check()? {
        SmtResult::Sat => ctx.model().map(Some),
        SmtResult::Unsat => Ok(None),
        SmtResult::Unknown => Err(SmtError::Incomplete(format!("model of {formula}"))),
    }
}

/// Is `lhs => rhs` valid
pub fn implies(theory: Theory, lhs: &ChcExpr, rhs: &ChcExpr) -> ArithResult<bool> {
    let mut ctx = SmtContext::new(theory);
    ctx.assert(lhs.clone());
    ctx.assert(ChcExpr::not(rhs.clone()));
    match ctx.check()? {
        SmtResult::Unsat => Ok(true),
        SmtResult::Sat => Ok(false),
        SmtResult::Unknown => Err(SmtError::Incomplete(format!("{lhs} => {rhs}"))),
    }
}

/// Is the formula true in every model
pub fn is_valid(theory: Theory, formula: &ChcExpr) -> ArithResult<bool> {
    implies(theory, &ChcExpr::Bool(true), formula)
}

/// Do the two formulas have the same models
pub fn equivalent(theory: Theory, lhs: &ChcExpr, rhs: &ChcExpr) -> ArithResult<bool> {
    Ok(implies(theory, lhs, rhs)? && implies(theory, rhs, lhs)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use z4_expr::ChcVar;

    fn x() -> ChcExpr {
        ChcExpr::var(ChcVar::int("x"))
    }

    fn y() -> ChcExpr {
        ChcExpr::var(ChcVar::int("y"))
    }

    #[test]
    fn push_pop_restores_satisfiability() {
        let mut ctx = SmtContext::new(Theory::Integer);
        ctx.assert(ChcExpr::ge(x(), ChcExpr::int(0)));
        assert_eq!(ctx.check().unwrap(), SmtResult::Sat);
        ctx.push();
        ctx.assert(ChcExpr::lt(x(), ChcExpr::int(0)));
        assert_eq!(ctx.check().unwrap(), SmtResult::Unsat);
        assert!(ctx.model().is_err());
        ctx.pop().unwrap();
        assert_eq!(ctx.check().unwrap(), SmtResult::Sat);
        assert!(ctx.pop().is_err());
    }

    #[test]
    fn models_satisfy_the_assertions() {
        let f = ChcExpr::and_all([
            ChcExpr::or(
                ChcExpr::le(x(), ChcExpr::int(-5)),
                ChcExpr::ge(x(), ChcExpr::int(5)),
            ),
            ChcExpr::eq(y(), ChcExpr::add(x(), ChcExpr::int(1))),
            ChcExpr::gt(y(), ChcExpr::int(0)),
        ]);
        let model = get_model(Theory::Integer, &f).unwrap().unwrap();
        assert!(model.satisfies(&f).unwrap());
    }

    #[test]
    fn modulo_constraints_are_decided() {
        let even = ChcExpr::eq(ChcExpr::mod_op(x(), ChcExpr::int(2)), ChcExpr::int(0));
        let odd = ChcExpr::eq(
            ChcExpr::mod_op(ChcExpr::add(x(), ChcExpr::int(1)), ChcExpr::int(2)),
            ChcExpr::int(0),
        );
        assert_eq!(
            check_sat(Theory::Integer, &ChcExpr::and(even.clone(), odd)).unwrap(),
            SmtResult::Unsat
        );
        let model = get_model(Theory::Integer, &even).unwrap().unwrap();
        assert!(model.satisfies(&even).unwrap());
    }

    #[test]
    fn handles_are_not_reused() {
        let mut ctx = SmtContext::new(Theory::Real);
        let a = ctx.assert(ChcExpr::Bool(true));
        ctx.reset();
        let b = ctx.assert(ChcExpr::Bool(true));
        assert_ne!(a, b);
    }

    #[test]
    fn interpolant_over_shared_variable() {
        // A: x = y + 1, y >= 3   B: x <= 2
        let mut ctx = SmtContext::new(Theory::Integer);
        let a1 = ctx.assert(ChcExpr::eq(x(), ChcExpr::add(y(), ChcExpr::int(1))));
        let a2 = ctx.assert(ChcExpr::ge(y(), ChcExpr::int(3)));
        ctx.assert(ChcExpr::le(x(), ChcExpr::int(2)));
        assert_eq!(ctx.check().unwrap(), SmtResult::Unsat);
        let itp = ctx.interpolant(&[a1, a2].into_iter().collect()).unwrap();
        let a = ChcExpr::and(
            ChcExpr::eq(x(), ChcExpr::add(y(), ChcExpr::int(1))),
            ChcExpr::ge(y(), ChcExpr::int(3)),
        );
        assert!(implies(Theory::Integer, &a, &itp).unwrap());
        assert_eq!(
            check_sat(
                Theory::Integer,
                &ChcExpr::and(itp.clone(), ChcExpr::le(x(), ChcExpr::int(2)))
            )
            .unwrap(),
            SmtResult::Unsat
        );
        assert!(itp.var_set().iter().all(|v| v.name == "x"));
    }

    #[test]
    fn interpolant_requires_unsat() {
        let mut ctx = SmtContext::new(Theory::Integer);
        ctx.assert(ChcExpr::ge(x(), ChcExpr::int(0)));
        assert_eq!(ctx.check().unwrap(), SmtResult::Sat);
        assert!(matches!(
            ctx.interpolant(&PartitionMask::new()),
            Err(SmtError::NoInterpolant)
        ));
    }

    #[test]
    fn equality_on_the_a_side_gives_an_inequality() {
        // A: x = 5   B: x <= 2
        let mut ctx = SmtContext::new(Theory::Integer);
        let a = ctx.assert(ChcExpr::eq(x(), ChcExpr::int(5)));
        ctx.assert(ChcExpr::le(x(), ChcExpr::int(2)));
        assert_eq!(ctx.check().unwrap(), SmtResult::Unsat);
        let itp = ctx.interpolant(&[a].into_iter().collect()).unwrap();
        assert!(implies(Theory::Integer, &ChcExpr::eq(x(), ChcExpr::int(5)), &itp).unwrap());
        assert!(implies(Theory::Integer, &ChcExpr::eq(x(), ChcExpr::int(6)), &itp).unwrap());
        assert_eq!(
            check_sat(
                Theory::Integer,
                &ChcExpr::and(itp.clone(), ChcExpr::le(x(), ChcExpr::int(2)))
            )
            .unwrap(),
            SmtResult::Unsat
        );
    }

    #[test]
    fn disjunctive_a_side_gives_a_conjunction() {
        // A: x2 = x0 or x2 = x0 + 1   B: x0 = 0, x2 >= 3
        let x0 = ChcExpr::var(ChcVar::int("x0"));
        let x2 = ChcExpr::var(ChcVar::int("x2"));
        let a_formula = ChcExpr::or(
            ChcExpr::eq(x2.clone(), x0.clone()),
            ChcExpr::eq(x2.clone(), ChcExpr::add(x0.clone(), ChcExpr::int(1))),
        );
        let b_formula = ChcExpr::and(
            ChcExpr::eq(x0.clone(), ChcExpr::int(0)),
            ChcExpr::ge(x2.clone(), ChcExpr::int(3)),
        );
        let mut ctx = SmtContext::new(Theory::Integer);
        let a = ctx.assert(a_formula.clone());
        ctx.assert(b_formula.clone());
        assert_eq!(ctx.check().unwrap(), SmtResult::Unsat);
        let itp = ctx.interpolant(&[a].into_iter().collect()).unwrap();
        assert!(!has_disjunction(&itp), "{itp}");
        assert!(implies(Theory::Integer, &a_formula, &itp).unwrap());
        assert_eq!(
            check_sat(Theory::Integer, &ChcExpr::and(itp, b_formula)).unwrap(),
            SmtResult::Unsat
        );
    }

    #[test]
    fn pop_restores_the_previous_answer() {
        let mut ctx = SmtContext::new(Theory::Integer);
        ctx.assert(ChcExpr::ge(x(), ChcExpr::int(0)));
        assert_eq!(ctx.check().unwrap(), SmtResult::Sat);
        let model = ctx.model().unwrap();
        ctx.push();
        ctx.assert(ChcExpr::lt(x(), ChcExpr::int(0)));
        assert!(ctx.last.is_none());
        assert_eq!(ctx.check().unwrap(), SmtResult::Unsat);
        ctx.pop().unwrap();
        assert!(matches!(ctx.last, Some(LastCheck::Sat(_))));
        assert_eq!(ctx.model().unwrap(), model);
        assert_eq!(ctx.check().unwrap(), SmtResult::Sat);

        // a scope opened before any check restores nothing
        let mut fresh = SmtContext::new(Theory::Integer);
        fresh.push();
        fresh.assert(ChcExpr::ge(x(), ChcExpr::int(0)));
        fresh.check().unwrap();
        fresh.pop().unwrap();
        assert!(fresh.last.is_none());
    }
}
