//! Accelerated bounded model checking by transition power abstraction
//!
//! For every level `n` the engine keeps two relations between `x#0` and `x#1`:
//! `exact[n]` over-approximates reachability in exactly `2^(n-1)` steps and
//! `less_than[n]` reachability in fewer than `2^(n-1)` steps. A query at level
//! `n` is a two-step check against level `n-1`. When the check fails, an
//! interpolant strengthens level `n`; when it succeeds, a midpoint is projected
//! from the model and both halves are checked one level down. A spurious path
//! refines the lower level and the query is retried.
//!
//! A relation that absorbs its own composition is transitive and yields an
//! inductive invariant of the system.

use crate::config::TpaConfig;
use crate::invariant::{check_invariant, strengthen_k_inductive, InvariantCheck};
use crate::mbp::Mbp;
use crate::normalizer::Normalizer;
use crate::power::PowerArray;
use crate::qe::QuantifierElimination;
use crate::session::{IncrementalSession, Reachability, ReachabilitySession, SingleUseSession};
use crate::transition_system::{ExtractedSystem, TransitionSystem};
use crate::witness::{PredicateInterpretation, ValidityWitness};
use crate::{ChcError, ChcProblem, ChcResult, VerificationResult};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};
use z4_arith::{SmtContext, SmtError, SmtResult};
use z4_expr::{simplify, to_nnf, ChcExpr, ChcVar, Model, Theory, TimeMachine};

/// Answer to a reachability query between two state formulas
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    pub result: Reachability,
    /// Subset of the target shown reachable from the source, set on reachable
    /// answers above the base levels
    pub refined_target: Option<ChcExpr>,
}

impl QueryResult {
    fn reachable(refined_target: Option<ChcExpr>) -> Self {
        Self {
            result: Reachability::Reachable,
            refined_target,
        }
    }

    fn unreachable() -> Self {
        Self {
            result: Reachability::Unreachable,
            refined_target: None,
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.result.is_reachable()
    }
}

/// Verdict for a transition system
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TsVerdict {
    /// The query is unreachable, with an inductive invariant over the state
    /// variables when one was computed and validated
    Safe(Option<ChcExpr>),
    Unsafe,
    Unknown,
}

/// Engine statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TpaStats {
    pub exact_queries: u64,
    pub less_than_queries: u64,
    pub exact_refinements: u64,
    pub less_than_refinements: u64,
    /// Queries restarted after a spurious path
    pub retries: u64,
    pub fixed_point_checks: u64,
    /// Highest power checked
    pub max_power: u32,
}

/// Point state `⋀ var = value` of `vars` in `model`
pub fn extract_state_from_model(model: &Model, vars: &[ChcVar]) -> ChcExpr {
    ChcExpr::and_all(vars.iter().map(|v| {
        ChcExpr::eq(ChcExpr::var(v.clone()), model.value_of(v).to_expr(v.sort))
    }))
}

fn shift(e: &ChcExpr, steps: i64) -> ChcResult<ChcExpr> {
    Ok(TimeMachine::send_through_time(e, steps)?)
}

fn missing(what: &str, power: u32) -> ChcError {
    ChcError::Internal(format!("{what} at power {power} is missing"))
}

/// Errors on which the engine stops with an `Unknown` verdict
fn gives_up(e: &ChcError) -> bool {
    matches!(
        e,
        ChcError::Smt(SmtError::Incomplete(_))
            | ChcError::UnexpectedSolverResult(_)
            | ChcError::RetryLimit { .. }
    )
}

/// Power abstractions of one transition system
///
/// Holds versioned copies of init (`x#0`), transition (`x#0`, `x#1`, `a#0`)
/// and query (`x#0`), the `exact` and `less_than` relations and one solver
/// session per level of the exact chain.
pub struct PowerAbstraction {
    system: TransitionSystem,
    config: TpaConfig,
    theory: Theory,
    mbp: Mbp,
    qe: QuantifierElimination,
    /// State variables at times 0, 1 and 2
    state_vars: [Vec<ChcVar>; 3],
    init: ChcExpr,
    transition: ChcExpr,
    query: ChcExpr,
    exact: PowerArray<ChcExpr>,
    less_than: PowerArray<ChcExpr>,
    /// Session `n` holds `exact[n-1] ∧ next(exact[n-1])`
    sessions: PowerArray<Box<dyn ReachabilitySession>>,
    stats: TpaStats,
}

impl PowerAbstraction {
    pub fn new(system: &TransitionSystem, config: TpaConfig) -> ChcResult<Self> {
        let theory = system.theory()?;
        let normalize = |e: &ChcExpr| simplify(&to_nnf(e));
        let init = normalize(&system.versioned_state_formula(system.init()));
        let transition = normalize(&system.versioned_transition());
        let query = normalize(&system.versioned_state_formula(system.query()));
        let state_vars = [
            system.state_vars_at(0),
            system.state_vars_at(1),
            system.state_vars_at(2),
        ];
        let identity = ChcExpr::and_all(
            state_vars[0]
                .iter()
                .zip(&state_vars[1])
                .map(|(x, x1)| ChcExpr::eq(ChcExpr::var(x.clone()), ChcExpr::var(x1.clone()))),
        );
        debug!(%theory, %init, %transition, %query, "reset transition system");

        let mut engine = Self {
            system: system.clone(),
            qe: QuantifierElimination::with_config(theory, config.smt.clone()),
            mbp: Mbp::new(theory),
            config,
            theory,
            state_vars,
            init,
            transition: transition.clone(),
            query,
            exact: PowerArray::new(),
            less_than: PowerArray::new(),
            sessions: PowerArray::new(),
            stats: TpaStats::default(),
        };
        engine.exact.set(0, identity.clone());
        engine.store_exact(1, transition)?;
        engine.less_than.set(1, identity);
        Ok(engine)
    }

    pub fn stats(&self) -> &TpaStats {
        &self.stats
    }

    /// Versioned initial states
    pub fn init(&self) -> &ChcExpr {
        &self.init
    }

    /// Versioned transition
    pub fn transition(&self) -> &ChcExpr {
        &self.transition
    }

    /// Versioned query
    pub fn query(&self) -> &ChcExpr {
        &self.query
    }

    pub fn exact_power(&self, power: u32) -> Option<&ChcExpr> {
        self.exact.get(power)
    }

    pub fn less_than_power(&self, power: u32) -> Option<&ChcExpr> {
        self.less_than.get(power)
    }

    /// Check powers 1, 2, ... until a verdict or the power limit
    pub fn run(&mut self) -> ChcResult<TsVerdict> {
        let mut power = 1;
        loop {
            if self.config.max_power.is_some_and(|max| power > max) {
                info!(power, "power limit reached");
                return Ok(TsVerdict::Unknown);
            }
            match self.check_power(power)? {
                TsVerdict::Unknown => power += 1,
                verdict => return Ok(verdict),
            }
        }
    }

    /// Is the query reachable in at most `2^(power-1)` steps
    ///
    /// `Unknown` means it is not, and the next power must be checked.
    pub fn check_power(&mut self, power: u32) -> ChcResult<TsVerdict> {
        debug!(power, "checking power");
        self.stats.max_power = self.stats.max_power.max(power);
        let init = self.init.clone();
        let query = self.query.clone();

        let res = self.reachability_query_less_than(&init, &query, power)?;
        if res.is_reachable() {
            info!(power, "query reachable in fewer than 2^(power-1) steps");
            return Ok(TsVerdict::Unsafe);
        }
        if power >= 3 {
            if let Some(verdict) = self.check_less_than_fixed_point(power)? {
                return Ok(verdict);
            }
            if let Some(verdict) = self.check_exact_fixed_point(power - 1)? {
                return Ok(verdict);
            }
        }

        let res = self.reachability_query_exact(&init, &query, power)?;
        if res.is_reachable() {
            info!(power, "query reachable in exactly 2^(power-1) steps");
            return Ok(TsVerdict::Unsafe);
        }
        Ok(TsVerdict::Unknown)
    }

    /// Is `to` reachable from `from` in exactly `2^(power-1)` steps
    pub fn reachability_query_exact(
        &mut self,
        from: &ChcExpr,
        to: &ChcExpr,
        power: u32,
    ) -> ChcResult<QueryResult> {
        self.stats.exact_queries += 1;
        match power {
            0 => return Err(missing("exact query", power)),
            1 => return self.one_step(from, to),
            _ => {}
        }
        let goal = shift(to, 2)?;
        let query = ChcExpr::and(from.clone(), goal.clone());
        let mut retries = 0;
        loop {
            let session = self
                .sessions
                .get_mut(power)
                .ok_or_else(|| missing("reachability session", power))?;
            match session.check_consistent(&query)? {
                Reachability::Unreachable => {
                    let itp = session.last_query_transition_interpolant()?;
                    let itp = self.clean_interpolant(&itp)?;
                    debug!(power, %itp, "exact power refined");
                    self.stats.exact_refinements += 1;
                    self.store_exact(power, itp)?;
                    return Ok(QueryResult::unreachable());
                }
                Reachability::Reachable => {
                    let model = session.last_query_model()?;
                    let previous = self.exact_level(power - 1)?;
                    let two_step = ChcExpr::and(previous.clone(), shift(&previous, 1)?);
                    if power == 2 {
                        let target = self.refine_two_step_target(from, &two_step, &model)?;
                        return Ok(QueryResult::reachable(Some(target)));
                    }

                    let midpoint = self.extract_midpoint(from, &two_step, &goal, &model)?;
                    let first = self.reachability_query_exact(from, &midpoint, power - 1)?;
                    if !first.is_reachable() {
                        let changed = self.exact.get(power - 1) != Some(&previous);
                        self.retry(power, &mut retries, changed)?;
                        continue;
                    }
                    let midpoint = refined_target(first, power - 1)?;
                    let second = self.reachability_query_exact(&midpoint, to, power - 1)?;
                    if !second.is_reachable() {
                        let changed = self.exact.get(power - 1) != Some(&previous);
                        self.retry(power, &mut retries, changed)?;
                        continue;
                    }
                    return Ok(second);
                }
            }
        }
    }

    /// Is `to` reachable from `from` in fewer than `2^(power-1)` steps
    pub fn reachability_query_less_than(
        &mut self,
        from: &ChcExpr,
        to: &ChcExpr,
        power: u32,
    ) -> ChcResult<QueryResult> {
        self.stats.less_than_queries += 1;
        match power {
            0 => return Err(missing("less-than query", power)),
            1 => return self.zero_step(from, to),
            _ => {}
        }
        let goal = shift(to, 2)?;
        let query = ChcExpr::and(from.clone(), goal.clone());
        let mut retries = 0;
        loop {
            let previous_less_than = self.less_than_level(power - 1)?;
            let previous_exact = self.exact_level(power - 1)?;
            // fewer than 2^(n-2) steps, or 2^(n-2) steps after fewer than 2^(n-2)
            let stay = self.shift_only_next(&previous_less_than);
            let advance = ChcExpr::and(previous_less_than.clone(), shift(&previous_exact, 1)?);
            let two_step = ChcExpr::or(stay.clone(), advance.clone());

            let mut session = self.new_session(&two_step);
            match session.check_consistent(&query)? {
                Reachability::Unreachable => {
                    let itp = session.last_query_transition_interpolant()?;
                    let itp = self.clean_interpolant(&itp)?;
                    debug!(power, %itp, "less-than power refined");
                    self.stats.less_than_refinements += 1;
                    self.store_less_than(power, itp);
                    return Ok(QueryResult::unreachable());
                }
                Reachability::Reachable => {
                    let model = session.last_query_model()?;
                    if model.satisfies(&stay)? {
                        if power == 2 {
                            // zero steps
                            let target = ChcExpr::and(from.clone(), to.clone());
                            return Ok(QueryResult::reachable(Some(target)));
                        }
                        let sub = self.reachability_query_less_than(from, to, power - 1)?;
                        if sub.is_reachable() {
                            return Ok(sub);
                        }
                        let changed = self.less_than.get(power - 1) != Some(&previous_less_than);
                        self.retry(power, &mut retries, changed)?;
                        continue;
                    }

                    if power == 2 {
                        let target = self.refine_two_step_target(from, &advance, &model)?;
                        return Ok(QueryResult::reachable(Some(target)));
                    }
                    let midpoint = self.extract_midpoint(from, &advance, &goal, &model)?;
                    let first = self.reachability_query_less_than(from, &midpoint, power - 1)?;
                    if !first.is_reachable() {
                        let changed = self.less_than.get(power - 1) != Some(&previous_less_than);
                        self.retry(power, &mut retries, changed)?;
                        continue;
                    }
                    let midpoint = refined_target(first, power - 1)?;
                    let second = self.reachability_query_exact(&midpoint, to, power - 1)?;
                    if !second.is_reachable() {
                        let changed = self.exact.get(power - 1) != Some(&previous_exact);
                        self.retry(power, &mut retries, changed)?;
                        continue;
                    }
                    return Ok(second);
                }
            }
        }
    }

    /// Does the composition of `exact[power-1]` with itself imply
    /// `exact[power]`, and likewise for every level below
    pub fn verify_exact_power(&self, power: u32) -> ChcResult<bool> {
        // levels 0 and 1 hold by construction
        if power < 2 {
            return Ok(true);
        }
        if power > 2 && !self.verify_exact_power(power - 1)? {
            return Ok(false);
        }
        let current = self.exact_level(power)?;
        let previous = self.exact_level(power - 1)?;
        let escape = ChcExpr::and_all([
            previous.clone(),
            shift(&previous, 1)?,
            ChcExpr::not(self.shift_only_next(&current)),
        ]);
        Ok(!self.is_satisfiable(escape)?)
    }

    /// Does `less_than[power]` contain `less_than[power-1]` and its
    /// composition with `exact[power-1]`
    pub fn verify_less_than_power(&self, power: u32) -> ChcResult<bool> {
        if power < 2 {
            return Ok(true);
        }
        let current = self.less_than_level(power)?;
        let previous = self.less_than_level(power - 1)?;
        let previous_exact = self.exact_level(power - 1)?;
        let escape = ChcExpr::and(
            ChcExpr::or(
                self.shift_only_next(&previous),
                ChcExpr::and(previous.clone(), shift(&previous_exact, 1)?),
            ),
            ChcExpr::not(self.shift_only_next(&current)),
        );
        Ok(!self.is_satisfiable(escape)?)
    }

    fn check_less_than_fixed_point(&mut self, power: u32) -> ChcResult<Option<TsVerdict>> {
        for level in 3..=power {
            let Some(relation) = self.less_than.get(level).cloned() else {
                continue;
            };
            if !self.is_fixed_point(&relation)? {
                continue;
            }
            info!(level, power, "less-than relation is transitive");
            let reached = self.qe.eliminate(
                &ChcExpr::and(self.init.clone(), relation),
                &self.state_vars[0],
            )?;
            let invariant = shift(&reached, -1)?;
            return Ok(Some(TsVerdict::Safe(self.finish_invariant(invariant)?)));
        }
        Ok(None)
    }

    fn check_exact_fixed_point(&mut self, power: u32) -> ChcResult<Option<TsVerdict>> {
        for level in 2..=power {
            let Some(relation) = self.exact.get(level).cloned() else {
                continue;
            };
            if !self.is_fixed_point(&relation)? {
                continue;
            }
            info!(level, power, "exact relation is transitive");
            if power > self.config.max_invariant_power {
                warn!(
                    level,
                    power,
                    limit = self.config.max_invariant_power,
                    "k-inductive invariant too deep to strengthen, reporting safe without invariant"
                );
                return Ok(Some(TsVerdict::Safe(None)));
            }
            let invariant = self.exact_fixed_point_invariant(level, &relation)?;
            return Ok(Some(TsVerdict::Safe(self.finish_invariant(invariant)?)));
        }
        Ok(None)
    }

    /// `R ∧ next(R) ⟹ shift_only_next(R)`
    fn is_fixed_point(&mut self, relation: &ChcExpr) -> ChcResult<bool> {
        self.stats.fixed_point_checks += 1;
        let composed = ChcExpr::and_all([
            relation.clone(),
            shift(relation, 1)?,
            ChcExpr::not(self.shift_only_next(relation)),
        ]);
        Ok(!self.is_satisfiable(composed)?)
    }

    /// States reachable in fewer than `2^level` steps, strengthened from
    /// `2^(level-1)`-inductive to inductive
    fn exact_fixed_point_invariant(&self, level: u32, exact: &ChcExpr) -> ChcResult<ChcExpr> {
        let less_than = self.less_than_level(level)?;
        let transition_invariant = ChcExpr::or(
            self.shift_only_next(&less_than),
            ChcExpr::and(less_than, shift(exact, 1)?),
        );
        let reached = self.qe.keep_only(
            &ChcExpr::and(self.init.clone(), transition_invariant),
            &self.state_vars[2],
        )?;
        let states = shift(&reached, -2)?;
        let k = 1u64
            .checked_shl(level - 1)
            .ok_or_else(|| ChcError::Internal(format!("level {level} overflows k")))?;
        strengthen_k_inductive(&self.qe, &self.transition, &states, k, &self.state_vars[0])
    }

    /// Validate a versioned invariant and return it over the plain state
    /// variables
    fn finish_invariant(&self, invariant: ChcExpr) -> ChcResult<Option<ChcExpr>> {
        let invariant = simplify(&invariant);
        if self.config.validate_invariant {
            let check = check_invariant(
                self.theory,
                &self.init,
                &self.transition,
                &self.query,
                &invariant,
            )?;
            if check != InvariantCheck::Valid {
                warn!(?check, %invariant, "dropping invariant that failed validation");
                return Ok(None);
            }
        }
        debug!(%invariant, "inductive invariant");
        Ok(Some(self.system.unversioned_state_formula(&invariant, 0)))
    }

    fn one_step(&mut self, from: &ChcExpr, to: &ChcExpr) -> ChcResult<QueryResult> {
        let transition = self.exact_level(1)?;
        let formula = ChcExpr::and_all([transition, from.clone(), shift(to, 1)?]);
        self.base_query(formula, "one-step")
    }

    fn zero_step(&mut self, from: &ChcExpr, to: &ChcExpr) -> ChcResult<QueryResult> {
        self.base_query(ChcExpr::and(from.clone(), to.clone()), "zero-step")
    }

    fn base_query(&self, formula: ChcExpr, kind: &str) -> ChcResult<QueryResult> {
        let mut ctx = SmtContext::with_config(self.theory, self.config.smt.clone());
        ctx.assert(formula);
        match ctx.check()? {
            SmtResult::Sat => {
                let model = ctx.model()?;
                trace!(
                    kind,
                    state = %extract_state_from_model(&model, &self.state_vars[0]),
                    "base query reachable"
                );
                Ok(QueryResult::reachable(None))
            }
            SmtResult::Unsat => Ok(QueryResult::unreachable()),
            SmtResult::Unknown => Err(ChcError::UnexpectedSolverResult(format!(
                "unknown on a {kind} reachability check"
            ))),
        }
    }

    fn is_satisfiable(&self, formula: ChcExpr) -> ChcResult<bool> {
        let mut ctx = SmtContext::with_config(self.theory, self.config.smt.clone());
        ctx.assert(formula);
        match ctx.check()? {
            SmtResult::Sat => Ok(true),
            SmtResult::Unsat => Ok(false),
            SmtResult::Unknown => Err(ChcError::UnexpectedSolverResult(
                "unknown on a relation check".to_string(),
            )),
        }
    }

    fn new_session(&self, transition: &ChcExpr) -> Box<dyn ReachabilitySession> {
        let smt = self.config.smt.clone();
        if self.config.incremental_sessions {
            Box::new(IncrementalSession::new(self.theory, smt, transition))
        } else {
            Box::new(SingleUseSession::new(self.theory, smt, transition))
        }
    }

    fn store_exact(&mut self, power: u32, relation: ChcExpr) -> ChcResult<()> {
        let strengthening = ChcExpr::and(relation.clone(), shift(&relation, 1)?);
        let stored = match self.exact.get(power) {
            Some(current) => ChcExpr::and_all([current.clone(), relation]),
            None => relation,
        };
        self.exact.set(power, stored);
        match self.sessions.get_mut(power + 1) {
            Some(session) => session.strengthen_transition(&strengthening)?,
            None => {
                let session = self.new_session(&strengthening);
                self.sessions.set(power + 1, session);
            }
        }
        Ok(())
    }

    fn store_less_than(&mut self, power: u32, relation: ChcExpr) {
        let stored = match self.less_than.get(power) {
            Some(current) => ChcExpr::and_all([current.clone(), relation]),
            None => relation,
        };
        self.less_than.set(power, stored);
    }

    fn exact_level(&self, power: u32) -> ChcResult<ChcExpr> {
        self.exact
            .get(power)
            .cloned()
            .ok_or_else(|| missing("exact relation", power))
    }

    fn less_than_level(&self, power: u32) -> ChcResult<ChcExpr> {
        self.less_than
            .get(power)
            .cloned()
            .ok_or_else(|| missing("less-than relation", power))
    }

    fn retry(&mut self, power: u32, retries: &mut usize, changed: bool) -> ChcResult<()> {
        if !changed {
            return Err(ChcError::StuckRefinement { power });
        }
        *retries += 1;
        self.stats.retries += 1;
        if let Some(limit) = self.config.max_retries_per_level {
            if *retries > limit {
                return Err(ChcError::RetryLimit {
                    power,
                    retries: *retries,
                });
            }
        }
        trace!(power, retries = *retries, "spurious path, retrying");
        Ok(())
    }

    /// Rename `x#1` to `x#2`, leaving `x#0` alone
    fn shift_only_next(&self, relation: &ChcExpr) -> ChcExpr {
        let subst: FxHashMap<ChcVar, ChcExpr> = self.state_vars[1]
            .iter()
            .zip(&self.state_vars[2])
            .map(|(next, next_next)| (next.clone(), ChcExpr::var(next_next.clone())))
            .collect();
        relation.substitute_map(&subst)
    }

    /// An interpolant over `x#0` and `x#2` as a relation over `x#0` and `x#1`
    fn clean_interpolant(&self, itp: &ChcExpr) -> ChcResult<ChcExpr> {
        let stray = itp
            .vars()
            .into_iter()
            .find(|v| !self.state_vars[0].contains(v) && !self.state_vars[2].contains(v));
        if let Some(v) = stray {
            return Err(ChcError::Internal(format!(
                "interpolant {itp} mentions {} outside the shared states",
                v.name
            )));
        }
        let subst: FxHashMap<ChcVar, ChcExpr> = self.state_vars[2]
            .iter()
            .zip(&self.state_vars[1])
            .map(|(next_next, next)| (next_next.clone(), ChcExpr::var(next.clone())))
            .collect();
        Ok(itp.substitute_map(&subst))
    }

    /// States at `x#2` reachable from `from` under `two_step`, back at `x#0`
    fn refine_two_step_target(
        &self,
        from: &ChcExpr,
        two_step: &ChcExpr,
        model: &Model,
    ) -> ChcResult<ChcExpr> {
        let path = ChcExpr::and(from.clone(), two_step.clone());
        let target = self.mbp.keep_only(&path, &self.state_vars[2], model)?;
        shift(&target, -2)
    }

    /// Intermediate states at `x#1` of the path in `model`, back at `x#0`
    fn extract_midpoint(
        &self,
        from: &ChcExpr,
        two_step: &ChcExpr,
        goal: &ChcExpr,
        model: &Model,
    ) -> ChcResult<ChcExpr> {
        let path = ChcExpr::and_all([from.clone(), two_step.clone(), goal.clone()]);
        let midpoint = self.mbp.keep_only(&path, &self.state_vars[1], model)?;
        trace!(%midpoint, "midpoint");
        shift(&midpoint, -1)
    }
}

fn refined_target(result: QueryResult, power: u32) -> ChcResult<ChcExpr> {
    result.refined_target.ok_or_else(|| {
        ChcError::Internal(format!(
            "reachable answer at power {power} carries no refined target"
        ))
    })
}

/// Accelerated BMC engine for CHC problems shaped as transition systems
#[derive(Debug, Clone, Default)]
pub struct AcceleratedBmc {
    config: TpaConfig,
    stats: TpaStats,
}

impl AcceleratedBmc {
    pub fn new(config: TpaConfig) -> Self {
        Self {
            config,
            stats: TpaStats::default(),
        }
    }

    pub fn config(&self) -> &TpaConfig {
        &self.config
    }

    /// Statistics of the last run
    pub fn stats(&self) -> &TpaStats {
        &self.stats
    }

    /// Decide a CHC problem with one predicate, its facts, one self-loop and
    /// queries
    pub fn solve(&mut self, problem: &ChcProblem) -> ChcResult<VerificationResult> {
        let normalized = Normalizer::new().normalize(problem)?;
        let extracted = TransitionSystem::from_problem(&normalized)?;
        info!(
            predicate = %extracted.predicate,
            state_vars = extracted.system.state_vars().len(),
            aux_vars = extracted.system.auxiliary_vars().len(),
            "solving transition system"
        );
        let result = match self.solve_transition_system(&extracted.system)? {
            TsVerdict::Unsafe => VerificationResult::Unsafe,
            TsVerdict::Unknown => VerificationResult::Unknown,
            TsVerdict::Safe(Some(invariant)) if self.config.compute_witness => {
                VerificationResult::Safe(self.witness(problem, &extracted, &invariant)?)
            }
            TsVerdict::Safe(_) => VerificationResult::Safe(None),
        };
        info!(%result, "verdict");
        Ok(result)
    }

    pub fn solve_transition_system(&mut self, system: &TransitionSystem) -> ChcResult<TsVerdict> {
        let mut engine = PowerAbstraction::new(system, self.config.clone())?;
        let outcome = engine.run();
        self.stats = engine.stats().clone();
        match outcome {
            Err(e) if gives_up(&e) => {
                warn!(error = %e, "giving up");
                Ok(TsVerdict::Unknown)
            }
            other => other,
        }
    }

    fn witness(
        &self,
        problem: &ChcProblem,
        extracted: &ExtractedSystem,
        invariant: &ChcExpr,
    ) -> ChcResult<Option<ValidityWitness>> {
        let mut witness = ValidityWitness::new();
        witness.set(
            extracted.predicate,
            PredicateInterpretation::new(
                extracted.predicate_vars.clone(),
                extracted.state_to_predicate(invariant),
            ),
        );
        if !self.config.validate_invariant {
            return Ok(Some(witness));
        }
        match witness.validate(problem) {
            Ok(true) => Ok(Some(witness)),
            Ok(false) => {
                warn!("witness does not satisfy the input clauses, dropping it");
                Ok(None)
            }
            Err(e) if gives_up(&e) => {
                warn!(error = %e, "could not validate witness, dropping it");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
