//! Reachability sessions
//!
//! A session answers one-step reachability questions against a fixed
//! transition formula: is `query` consistent with the transition, and if not,
//! which interpolant of the transition separates it from the query. The
//! transition can only be strengthened. At most one query is open at a time;
//! it is closed by reading its model or interpolant.

use crate::{ChcError, ChcResult};
use tracing::trace;
use z4_arith::{FormulaId, PartitionMask, SmtConfig, SmtContext, SmtResult};
use z4_expr::{ChcExpr, Model, Theory};

/// Outcome of a reachability check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reachability {
    Reachable,
    Unreachable,
}

impl Reachability {
    pub fn is_reachable(self) -> bool {
        self == Reachability::Reachable
    }
}

/// Interpolating solver session over one transition formula
pub trait ReachabilitySession {
    /// Check `transition ∧ query`, leaving the query open
    fn check_consistent(&mut self, query: &ChcExpr) -> ChcResult<Reachability>;

    /// Conjoin a formula to the transition
    fn strengthen_transition(&mut self, transition: &ChcExpr) -> ChcResult<()>;

    /// Model of the open query, which must be reachable; closes it
    fn last_query_model(&mut self) -> ChcResult<Model>;

    /// Interpolant of the transition against the open query, which must be
    /// unreachable; closes it
    fn last_query_transition_interpolant(&mut self) -> ChcResult<ChcExpr>;
}

fn decide(result: SmtResult) -> ChcResult<Reachability> {
    match result {
        SmtResult::Sat => Ok(Reachability::Reachable),
        SmtResult::Unsat => Ok(Reachability::Unreachable),
        SmtResult::Unknown => Err(ChcError::UnexpectedSolverResult(
            "unknown on a reachability query".to_string(),
        )),
    }
}

fn misuse(what: &str) -> ChcError {
    ChcError::SessionMisuse(what.to_string())
}

/// One solver for the lifetime of the session
///
/// Transition formulas live at the base level; each query is asserted in a
/// pushed frame that is popped once its answer has been read.
///
/// The solver keeps no learned state between queries: each check searches
/// the transition and the query together, and an interpolant is read from a
/// second search of the same stack. Sharing the solver saves rebuilding the
/// transition side and lets the answer of the base level survive a pop.
#[derive(Debug)]
pub struct IncrementalSession {
    ctx: SmtContext,
    transition_ids: PartitionMask,
    open: Option<Reachability>,
}

impl IncrementalSession {
    pub fn new(theory: Theory, config: SmtConfig, transition: &ChcExpr) -> Self {
        let mut ctx = SmtContext::with_config(theory, config);
        let mut transition_ids = PartitionMask::new();
        transition_ids.insert(ctx.assert(transition.clone()));
        Self {
            ctx,
            transition_ids,
            open: None,
        }
    }

    fn close(&mut self) -> ChcResult<()> {
        self.open = None;
        self.ctx.pop()?;
        Ok(())
    }
}

impl ReachabilitySession for IncrementalSession {
    fn check_consistent(&mut self, query: &ChcExpr) -> ChcResult<Reachability> {
        if self.open.is_some() {
            return Err(misuse("query issued while another one is open"));
        }
        self.ctx.push();
        self.ctx.assert(query.clone());
        let checked = self.ctx.check().map_err(ChcError::from).and_then(decide);
        let result = match checked {
            Ok(r) => r,
            Err(e) => {
                self.ctx.pop()?;
                return Err(e);
            }
        };
        trace!(?result, transitions = self.transition_ids.len(), "incremental query");
        self.open = Some(result);
        Ok(result)
    }

    fn strengthen_transition(&mut self, transition: &ChcExpr) -> ChcResult<()> {
        if self.open.is_some() {
            return Err(misuse("transition strengthened while a query is open"));
        }
        self.transition_ids.insert(self.ctx.assert(transition.clone()));
        Ok(())
    }

    fn last_query_model(&mut self) -> ChcResult<Model> {
        if self.open != Some(Reachability::Reachable) {
            return Err(misuse("model requested without a reachable query"));
        }
        let model = self.ctx.model()?;
        self.close()?;
        Ok(model)
    }

    fn last_query_transition_interpolant(&mut self) -> ChcResult<ChcExpr> {
        if self.open != Some(Reachability::Unreachable) {
            return Err(misuse("interpolant requested without an unreachable query"));
        }
        let itp = self.ctx.interpolant(&self.transition_ids);
        self.close()?;
        Ok(itp?)
    }
}

/// A fresh solver for every query
#[derive(Debug)]
pub struct SingleUseSession {
    theory: Theory,
    config: SmtConfig,
    transition: ChcExpr,
    open: Option<(Reachability, SmtContext, FormulaId)>,
}

impl SingleUseSession {
    pub fn new(theory: Theory, config: SmtConfig, transition: &ChcExpr) -> Self {
        Self {
            theory,
            config,
            transition: transition.clone(),
            open: None,
        }
    }
}

impl ReachabilitySession for SingleUseSession {
    fn check_consistent(&mut self, query: &ChcExpr) -> ChcResult<Reachability> {
        if self.open.is_some() {
            return Err(misuse("query issued while another one is open"));
        }
        let mut ctx = SmtContext::with_config(self.theory, self.config.clone());
        let id = ctx.assert(self.transition.clone());
        ctx.assert(query.clone());
        let result = decide(ctx.check()?)?;
        trace!(?result, "single-use query");
        self.open = Some((result, ctx, id));
        Ok(result)
    }

    fn strengthen_transition(&mut self, transition: &ChcExpr) -> ChcResult<()> {
        if self.open.is_some() {
            return Err(misuse("transition strengthened while a query is open"));
        }
        self.transition = ChcExpr::and(self.transition.clone(), transition.clone());
        Ok(())
    }

    fn last_query_model(&mut self) -> ChcResult<Model> {
        match self.open.take() {
            Some((Reachability::Reachable, ctx, _)) => Ok(ctx.model()?),
            other => {
                self.open = other;
                Err(misuse("model requested without a reachable query"))
            }
        }
    }

    fn last_query_transition_interpolant(&mut self) -> ChcResult<ChcExpr> {
        match self.open.take() {
            Some((Reachability::Unreachable, ctx, id)) => {
                Ok(ctx.interpolant(&[id].into_iter().collect())?)
            }
            other => {
                self.open = other;
                Err(misuse("interpolant requested without an unreachable query"))
            }
        }
    }
}
