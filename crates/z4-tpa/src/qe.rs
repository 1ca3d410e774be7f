//! Quantifier elimination by projection enumeration
//!
//! `∃xs. φ` is computed as the disjunction of model-based projections of `φ`,
//! each under a model of `φ` that violates all projections found so far.

use crate::mbp::Mbp;
use crate::{ChcError, ChcResult};
use rustc_hash::FxHashSet;
use tracing::trace;
use z4_arith::{SmtConfig, SmtContext, SmtResult};
use z4_expr::{simplify, ChcExpr, ChcVar, Theory};

/// Exact existential quantifier elimination
#[derive(Debug, Clone)]
pub struct QuantifierElimination {
    theory: Theory,
    config: SmtConfig,
}

impl QuantifierElimination {
    pub fn new(theory: Theory) -> Self {
        Self::with_config(theory, SmtConfig::default())
    }

    pub fn with_config(theory: Theory, config: SmtConfig) -> Self {
        Self { theory, config }
    }

    pub fn theory(&self) -> Theory {
        self.theory
    }

    /// A quantifier-free formula equivalent to `∃vars. formula`
    pub fn eliminate(&self, formula: &ChcExpr, vars: &[ChcVar]) -> ChcResult<ChcExpr> {
        let present = formula.var_set();
        let vars: Vec<ChcVar> = vars
            .iter()
            .filter(|v| present.contains(*v))
            .cloned()
            .collect();
        if vars.is_empty() {
            return Ok(simplify(formula));
        }
        let mbp = Mbp::new(self.theory);
        let mut ctx = SmtContext::with_config(self.theory, self.config.clone());
        ctx.assert(formula.clone());
        let mut projections = Vec::new();
        loop {
            match ctx.check()? {
                SmtResult::Unsat => break,
                SmtResult::Sat => {
                    let model = ctx.model()?;
                    let projection = mbp.project(formula, &vars, &model)?;
                    trace!(%projection, "qe disjunct");
                    ctx.assert(ChcExpr::not(projection.clone()));
                    projections.push(projection);
                }
                SmtResult::Unknown => {
                    return Err(ChcError::UnexpectedSolverResult(format!(
                        "unknown while eliminating {} variables",
                        vars.len()
                    )))
                }
            }
        }
        Ok(simplify(&ChcExpr::or_all(projections)))
    }

    /// Eliminate every variable of `formula` not in `keep`
    pub fn keep_only(&self, formula: &ChcExpr, keep: &[ChcVar]) -> ChcResult<ChcExpr> {
        let keep: FxHashSet<&ChcVar> = keep.iter().collect();
        let eliminate: Vec<ChcVar> = formula
            .vars()
            .into_iter()
            .filter(|v| !keep.contains(v))
            .collect();
        self.eliminate(formula, &eliminate)
    }
}
