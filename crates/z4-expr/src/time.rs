//! Time-versioned variables
//!
//! A versioned variable is named `<base>#<time>`. Unrolling a transition
//! relation over several steps only needs to shift these versions; the rest
//! of the name is left alone.

use crate::{ChcExpr, ChcVar, ExprError, ExprResult};
use rustc_hash::FxHashMap;

/// Version separator in variable names
pub const VERSION_SEPARATOR: char = '#';

/// Shifts variables and formulas through time
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeMachine;

impl TimeMachine {
    /// Split `base#k` into `(base, k)`
    pub fn split(var: &ChcVar) -> Option<(&str, u32)> {
        let (base, time) = var.name.rsplit_once(VERSION_SEPARATOR)?;
        let time = time.parse().ok()?;
        Some((base, time))
    }

    pub fn is_versioned(var: &ChcVar) -> bool {
        Self::split(var).is_some()
    }

    pub fn time_of(var: &ChcVar) -> Option<u32> {
        Self::split(var).map(|(_, t)| t)
    }

    /// The unversioned variable
    pub fn base_var(var: &ChcVar) -> ChcVar {
        match Self::split(var) {
            Some((base, _)) => var.renamed(base),
            None => var.clone(),
        }
    }

    /// `base#time`
    pub fn var_at(var: &ChcVar, time: u32) -> ChcVar {
        let base = Self::base_var(var);
        var.renamed(format!("{}{VERSION_SEPARATOR}{time}", base.name))
    }

    /// Version zero of an unversioned variable (`x` becomes `x#0`)
    pub fn version_zero(var: &ChcVar) -> ChcVar {
        Self::var_at(var, 0)
    }

    /// Shift a versioned variable by `shift` steps; unversioned variables are
    /// returned unchanged
    pub fn send_var_through_time(var: &ChcVar, shift: i64) -> ExprResult<ChcVar> {
        let Some((_, time)) = Self::split(var) else {
            return Ok(var.clone());
        };
        let target = i64::from(time) + shift;
        let target = u32::try_from(target).map_err(|_| ExprError::NegativeTime {
            var: var.name.clone(),
            shift,
        })?;
        Ok(Self::var_at(var, target))
    }

    /// Shift every versioned variable of the formula by `shift` steps
    pub fn send_through_time(expr: &ChcExpr, shift: i64) -> ExprResult<ChcExpr> {
        if shift == 0 {
            return Ok(expr.clone());
        }
        let mut subst = FxHashMap::default();
        for var in expr.vars() {
            if Self::is_versioned(&var) {
                let shifted = Self::send_var_through_time(&var, shift)?;
                subst.insert(var, ChcExpr::var(shifted));
            }
        }
        Ok(expr.substitute_map(&subst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions_round_trip_through_names() {
        let x = ChcVar::int("ts::x0");
        let x0 = TimeMachine::version_zero(&x);
        assert_eq!(x0.name, "ts::x0#0");
        assert_eq!(TimeMachine::time_of(&x0), Some(0));
        let x3 = TimeMachine::send_var_through_time(&x0, 3).unwrap();
        assert_eq!(x3.name, "ts::x0#3");
        assert_eq!(TimeMachine::base_var(&x3), x);
    }

    #[test]
    fn unversioned_variables_do_not_move() {
        let x = ChcVar::int("x");
        assert_eq!(TimeMachine::send_var_through_time(&x, 5).unwrap(), x);
    }

    #[test]
    fn shifting_below_zero_is_an_error() {
        let x1 = ChcVar::int("x#1");
        assert!(TimeMachine::send_var_through_time(&x1, -2).is_err());
    }

    #[test]
    fn formulas_shift_all_versioned_variables() {
        let x0 = ChcVar::int("x#0");
        let y1 = ChcVar::int("y#1");
        let e = ChcExpr::lt(ChcExpr::var(x0), ChcExpr::var(y1));
        let shifted = TimeMachine::send_through_time(&e, 1).unwrap();
        assert_eq!(
            shifted,
            ChcExpr::lt(
                ChcExpr::var(ChcVar::int("x#1")),
                ChcExpr::var(ChcVar::int("y#2"))
            )
        );
    }
}
