//! Transition systems
//!
//! A transition system is the triple (init, transition, query) over a fixed
//! vector of state variables. Init and query mention state variables only;
//! the transition relates state variables to next-state variables and may use
//! auxiliary variables, which are existentially quantified per step.
//!
//! State variables are named `ts::x<i>`, next-state variables `ts::xp<i>` and
//! auxiliary variables `ts::aux<i>`. The engine works on versioned copies:
//! state variables at time `k` become `ts::x<i>#k`, and next-state variables
//! become the state variables one step later.

use crate::normalizer::NormalizedProblem;
use crate::qe::QuantifierElimination;
use crate::{ChcError, ChcResult, ClauseHead, PredicateId};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;
use z4_expr::{simplify, ChcExpr, ChcSort, ChcVar, Theory, TimeMachine};

const STATE_PREFIX: &str = "ts::x";
const NEXT_PREFIX: &str = "ts::xp";
const AUX_PREFIX: &str = "ts::aux";

/// The variable signature of a transition system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemType {
    state_vars: Vec<ChcVar>,
    next_vars: Vec<ChcVar>,
    aux_vars: Vec<ChcVar>,
}

impl SystemType {
    /// Canonical state and next-state variables for the given sorts
    pub fn new(state_sorts: &[ChcSort]) -> Self {
        let state_vars = state_sorts
            .iter()
            .enumerate()
            .map(|(i, s)| ChcVar::new(format!("{STATE_PREFIX}{i}"), *s))
            .collect();
        let next_vars = state_sorts
            .iter()
            .enumerate()
            .map(|(i, s)| ChcVar::new(format!("{NEXT_PREFIX}{i}"), *s))
            .collect();
        Self {
            state_vars,
            next_vars,
            aux_vars: Vec::new(),
        }
    }

    /// Add canonical auxiliary variables for the given sorts
    pub fn with_aux(mut self, aux_sorts: &[ChcSort]) -> Self {
        let start = self.aux_vars.len();
        self.aux_vars.extend(
            aux_sorts
                .iter()
                .enumerate()
                .map(|(i, s)| ChcVar::new(format!("{AUX_PREFIX}{}", start + i), *s)),
        );
        self
    }

    /// Current-state variables, one per predicate argument
    pub fn state_vars(&self) -> &[ChcVar] {
        &self.state_vars
    }

    /// Next-state variables, aligned with `state_vars`
    pub fn next_vars(&self) -> &[ChcVar] {
        &self.next_vars
    }

    /// Auxiliary variables the transition may mention
    pub fn aux_vars(&self) -> &[ChcVar] {
        &self.aux_vars
    }
}

/// A transition system (init, transition, query)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionSystem {
    ty: SystemType,
    init: ChcExpr,
    transition: ChcExpr,
    query: ChcExpr,
}

impl TransitionSystem {
    /// Build a system, checking that each formula stays within its variables
    pub fn new(
        ty: SystemType,
        init: ChcExpr,
        transition: ChcExpr,
        query: ChcExpr,
    ) -> ChcResult<Self> {
        if ty.state_vars.len() != ty.next_vars.len()
            || ty
                .state_vars
                .iter()
                .zip(&ty.next_vars)
                .any(|(x, xp)| x.sort != xp.sort)
        {
            return Err(ChcError::IllFormedTransitionSystem {
                role: "signature".to_string(),
                formula: format!("{} state / {} next", ty.state_vars.len(), ty.next_vars.len()),
            });
        }
        let system = Self {
            ty,
            init,
            transition,
            query,
        };
        if !system.is_state_formula(&system.init) {
            return Err(ill_formed("init", &system.init));
        }
        if !system.is_transition_formula(&system.transition) {
            return Err(ill_formed("transition", &system.transition));
        }
        if !system.is_state_formula(&system.query) {
            return Err(ill_formed("query", &system.query));
        }
        Ok(system)
    }

    /// Variable signature of the system
    pub fn system_type(&self) -> &SystemType {
        &self.ty
    }

    /// Current-state variables
    pub fn state_vars(&self) -> &[ChcVar] {
        &self.ty.state_vars
    }

    /// Next-state variables
    pub fn next_state_vars(&self) -> &[ChcVar] {
        &self.ty.next_vars
    }

    /// Auxiliary variables of the transition
    pub fn auxiliary_vars(&self) -> &[ChcVar] {
        &self.ty.aux_vars
    }

    /// Initial states, over the state variables
    pub fn init(&self) -> &ChcExpr {
        &self.init
    }

    /// Transition relation, over state, next-state and auxiliary variables
    pub fn transition(&self) -> &ChcExpr {
        &self.transition
    }

    /// Bad states, over the state variables
    pub fn query(&self) -> &ChcExpr {
        &self.query
    }

    /// Theory of the state variables
    pub fn theory(&self) -> ChcResult<Theory> {
        Ok(Theory::from_sorts(
            self.ty
                .state_vars
                .iter()
                .chain(&self.ty.aux_vars)
                .map(|v| &v.sort),
        )?)
    }

    /// Mentions state variables only
    pub fn is_state_formula(&self, e: &ChcExpr) -> bool {
        let allowed: FxHashSet<&ChcVar> = self.ty.state_vars.iter().collect();
        e.vars().iter().all(|v| allowed.contains(v))
    }

    /// Mentions state, next-state and auxiliary variables only
    pub fn is_transition_formula(&self, e: &ChcExpr) -> bool {
        let allowed: FxHashSet<&ChcVar> = self
            .ty
            .state_vars
            .iter()
            .chain(&self.ty.next_vars)
            .chain(&self.ty.aux_vars)
            .collect();
        e.vars().iter().all(|v| allowed.contains(v))
    }

    /// State variables at time `k`
    pub fn state_vars_at(&self, k: u32) -> Vec<ChcVar> {
        self.ty
            .state_vars
            .iter()
            .map(|v| TimeMachine::var_at(v, k))
            .collect()
    }

    /// Auxiliary variables of step `k`
    pub fn aux_vars_at(&self, k: u32) -> Vec<ChcVar> {
        self.ty
            .aux_vars
            .iter()
            .map(|v| TimeMachine::var_at(v, k))
            .collect()
    }

    /// A state formula over the state variables at time 0
    pub fn versioned_state_formula(&self, e: &ChcExpr) -> ChcExpr {
        let subst: FxHashMap<ChcVar, ChcExpr> = self
            .ty
            .state_vars
            .iter()
            .map(|v| (v.clone(), ChcExpr::var(TimeMachine::version_zero(v))))
            .collect();
        e.substitute_map(&subst)
    }

    /// The transition from time 0 to time 1
    pub fn versioned_transition(&self) -> ChcExpr {
        let mut subst: FxHashMap<ChcVar, ChcExpr> = FxHashMap::default();
        for (x, xp) in self.ty.state_vars.iter().zip(&self.ty.next_vars) {
            subst.insert(x.clone(), ChcExpr::var(TimeMachine::var_at(x, 0)));
            subst.insert(xp.clone(), ChcExpr::var(TimeMachine::var_at(x, 1)));
        }
        for a in &self.ty.aux_vars {
            subst.insert(a.clone(), ChcExpr::var(TimeMachine::version_zero(a)));
        }
        self.transition.substitute_map(&subst)
    }

    /// Back from versioned state variables at time `k` to plain state variables
    pub fn unversioned_state_formula(&self, e: &ChcExpr, k: u32) -> ChcExpr {
        let subst: FxHashMap<ChcVar, ChcExpr> = self
            .ty
            .state_vars
            .iter()
            .map(|v| (TimeMachine::var_at(v, k), ChcExpr::var(v.clone())))
            .collect();
        e.substitute_map(&subst)
    }

    /// `init@0 ∧ T@0 ∧ ... ∧ T@(n-1) ∧ query@n`
    pub fn path_formula(&self, n: u32) -> ChcResult<ChcExpr> {
        let init = self.versioned_state_formula(&self.init);
        let query = self.versioned_state_formula(&self.query);
        let transition = self.versioned_transition();
        let mut parts = vec![init];
        for k in 0..n {
            parts.push(TimeMachine::send_through_time(&transition, i64::from(k))?);
        }
        parts.push(TimeMachine::send_through_time(&query, i64::from(n))?);
        Ok(ChcExpr::and_all(parts))
    }
}

impl std::fmt::Display for TransitionSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "init: {}", self.init)?;
        writeln!(f, "transition: {}", self.transition)?;
        write!(f, "query: {}", self.query)
    }
}

fn ill_formed(role: &str, formula: &ChcExpr) -> ChcError {
    ChcError::IllFormedTransitionSystem {
        role: role.to_string(),
        formula: formula.to_string(),
    }
}

/// A transition system read off a normalized CHC problem
#[derive(Debug, Clone)]
pub struct ExtractedSystem {
    pub system: TransitionSystem,
    /// The predicate the system describes
    pub predicate: PredicateId,
    /// Canonical argument variables of the predicate, aligned with the state
    /// variables
    pub predicate_vars: Vec<ChcVar>,
}

impl ExtractedSystem {
    /// Rename a formula over the state variables to the predicate arguments
    pub fn state_to_predicate(&self, e: &ChcExpr) -> ChcExpr {
        let subst: FxHashMap<ChcVar, ChcExpr> = self
            .system
            .state_vars()
            .iter()
            .zip(&self.predicate_vars)
            .map(|(s, p)| (s.clone(), ChcExpr::var(p.clone())))
            .collect();
        e.substitute_map(&subst)
    }
}

impl TransitionSystem {
    /// Read a transition system off a normalized problem
    ///
    /// Facts are joined into init, self-loops into the transition and queries
    /// into the query, each by disjunction. Variables local to facts and
    /// queries are projected away; locals of transitions become auxiliary
    /// variables.
    pub fn from_problem(normalized: &NormalizedProblem) -> ChcResult<ExtractedSystem> {
        let problem = &normalized.problem;
        if !problem.is_transition_system() {
            return Err(ChcError::Unsupported(
                "problem is not a single linear transition system".to_string(),
            ));
        }
        extract(normalized, problem.theory()?)
    }
}

fn extract(normalized: &NormalizedProblem, theory: Theory) -> ChcResult<ExtractedSystem> {
    let problem = &normalized.problem;
    let pred = problem.predicates()[0].id;
    let canonical = normalized
        .canonical
        .vars(pred)
        .ok_or_else(|| ChcError::Internal(format!("no canonical variables for {pred}")))?
        .to_vec();
    let sorts: Vec<ChcSort> = canonical.iter().map(|v| v.sort).collect();
    let mut ty = SystemType::new(&sorts);

    let current: Vec<ChcVar> = canonical.iter().map(|v| TimeMachine::var_at(v, 0)).collect();
    let next: Vec<ChcVar> = canonical.iter().map(|v| TimeMachine::var_at(v, 1)).collect();
    let qe = QuantifierElimination::new(theory);

    let mut inits = Vec::new();
    let mut transitions = Vec::new();
    let mut queries = Vec::new();
    let mut aux: FxHashMap<ChcVar, ChcVar> = FxHashMap::default();
    for clause in problem.clauses() {
        let constraint = clause.body.constraint_or_true();
        match (&clause.head, clause.is_fact()) {
            (ClauseHead::Predicate(..), true) => {
                let projected = qe.keep_only(&constraint, &next)?;
                inits.push(rename(&projected, &next, ty.state_vars()));
            }
            (ClauseHead::Predicate(..), false) => {
                let mut subst: FxHashMap<ChcVar, ChcExpr> = FxHashMap::default();
                for ((c, n), (x, xp)) in current
                    .iter()
                    .zip(&next)
                    .zip(ty.state_vars.iter().zip(&ty.next_vars))
                {
                    subst.insert(c.clone(), ChcExpr::var(x.clone()));
                    subst.insert(n.clone(), ChcExpr::var(xp.clone()));
                }
                for v in constraint.vars() {
                    if subst.contains_key(&v) {
                        continue;
                    }
                    let fresh = match aux.get(&v) {
                        Some(a) => a.clone(),
                        None => {
                            ty = ty.with_aux(&[v.sort]);
                            let a = ty.aux_vars[ty.aux_vars.len() - 1].clone();
                            aux.insert(v.clone(), a.clone());
                            a
                        }
                    };
                    subst.insert(v, ChcExpr::var(fresh));
                }
                transitions.push(constraint.substitute_map(&subst));
            }
            (ClauseHead::False, _) => {
                let projected = qe.keep_only(&constraint, &current)?;
                queries.push(rename(&projected, &current, ty.state_vars()));
            }
        }
    }

    let system = TransitionSystem::new(
        ty,
        simplify(&ChcExpr::or_all(inits)),
        simplify(&ChcExpr::or_all(transitions)),
        simplify(&ChcExpr::or_all(queries)),
    )?;
    debug!(
        state_vars = system.state_vars().len(),
        aux_vars = system.auxiliary_vars().len(),
        "extracted transition system"
    );
    Ok(ExtractedSystem {
        system,
        predicate: pred,
        predicate_vars: canonical,
    })
}

fn rename(e: &ChcExpr, from: &[ChcVar], to: &[ChcVar]) -> ChcExpr {
    let subst: FxHashMap<ChcVar, ChcExpr> = from
        .iter()
        .zip(to)
        .map(|(f, t)| (f.clone(), ChcExpr::var(t.clone())))
        .collect();
    e.substitute_map(&subst)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> TransitionSystem {
        let ty = SystemType::new(&[ChcSort::Int]);
        let x = ChcExpr::var(ty.state_vars()[0].clone());
        let xp = ChcExpr::var(ty.next_vars()[0].clone());
        TransitionSystem::new(
            ty,
            ChcExpr::eq(x.clone(), ChcExpr::int(0)),
            ChcExpr::eq(xp, ChcExpr::add(x.clone(), ChcExpr::int(1))),
            ChcExpr::ge(x, ChcExpr::int(5)),
        )
        .unwrap()
    }

    #[test]
    fn system_type_names_variables() {
        let ty = SystemType::new(&[ChcSort::Int, ChcSort::Bool]).with_aux(&[ChcSort::Int]);
        let names: Vec<&str> = ty.state_vars().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["ts::x0", "ts::x1"]);
        assert_eq!(ty.next_vars()[1].name, "ts::xp1");
        assert_eq!(ty.next_vars()[1].sort, ChcSort::Bool);
        assert_eq!(ty.aux_vars()[0].name, "ts::aux0");
    }

    #[test]
    fn init_over_next_state_is_rejected() {
        let ty = SystemType::new(&[ChcSort::Int]);
        let xp = ChcExpr::var(ty.next_vars()[0].clone());
        let result = TransitionSystem::new(
            ty,
            ChcExpr::eq(xp, ChcExpr::int(0)),
            ChcExpr::Bool(true),
            ChcExpr::Bool(false),
        );
        assert!(matches!(
            result,
            Err(ChcError::IllFormedTransitionSystem { ref role, .. }) if role == "init"
        ));
    }

    #[test]
    fn formula_classification() {
        let system = counter();
        assert!(system.is_state_formula(system.init()));
        assert!(!system.is_state_formula(system.transition()));
        assert!(system.is_transition_formula(system.transition()));
    }

    #[test]
    fn path_formula_is_versioned() {
        let system = counter();
        let path = system.path_formula(2).unwrap();
        let names: FxHashSet<String> = path.vars().into_iter().map(|v| v.name).collect();
        let expected: FxHashSet<String> = ["ts::x0#0", "ts::x0#1", "ts::x0#2"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, expected);
    }
}
