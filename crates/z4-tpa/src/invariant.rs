//! Inductive invariants of versioned transition systems
//!
//! Formulas here use the engine's versioning: states at time 0 are `x#0`,
//! the transition relates `x#0` to `x#1` and may use auxiliary `a#0`.

use crate::qe::QuantifierElimination;
use crate::ChcResult;
use tracing::{debug, trace};
use z4_arith::{check_sat, implies, SmtResult};
use z4_expr::{simplify, ChcExpr, ChcVar, Theory, TimeMachine};

/// Outcome of checking a candidate invariant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantCheck {
    Valid,
    /// `init ⟹ I` fails
    NotInitiated,
    /// `I ∧ T ⟹ I'` fails
    NotInductive,
    /// `I ∧ query` is satisfiable
    NotSafe,
}

/// Check initiation, consecution and safety of `invariant`
pub fn check_invariant(
    theory: Theory,
    init: &ChcExpr,
    transition: &ChcExpr,
    query: &ChcExpr,
    invariant: &ChcExpr,
) -> ChcResult<InvariantCheck> {
    if !implies(theory, init, invariant)? {
        return Ok(InvariantCheck::NotInitiated);
    }
    let next = TimeMachine::send_through_time(invariant, 1)?;
    if !implies(theory, &ChcExpr::and(invariant.clone(), transition.clone()), &next)? {
        return Ok(InvariantCheck::NotInductive);
    }
    let bad = check_sat(theory, &ChcExpr::and(invariant.clone(), query.clone()))?;
    if bad != SmtResult::Unsat {
        return Ok(InvariantCheck::NotSafe);
    }
    Ok(InvariantCheck::Valid)
}

/// Strengthen a `k`-inductive state formula into an inductive one
///
/// The result holds in exactly those states from which every path of fewer
/// than `k` steps stays inside `s`. If `s` holds in all states reachable in
/// fewer than `k` steps from the initial states and any `k` consecutive
/// `s`-states are followed by an `s`-state, the result is inductive.
pub fn strengthen_k_inductive(
    qe: &QuantifierElimination,
    transition: &ChcExpr,
    s: &ChcExpr,
    k: u64,
    current: &[ChcVar],
) -> ChcResult<ChcExpr> {
    let mut bad = vec![simplify(&ChcExpr::not(s.clone()))];
    for j in 1..k {
        // states with a successor in bad_{j-1}
        let previous = TimeMachine::send_through_time(&bad[bad.len() - 1], 1)?;
        let step = ChcExpr::and(transition.clone(), previous);
        let pre = qe.keep_only(&step, current)?;
        if pre.is_false() {
            trace!(steps = j, "backward reachability emptied");
            break;
        }
        let seen = ChcExpr::or_all(bad.iter().cloned());
        if implies(qe.theory(), &pre, &seen)? {
            trace!(steps = j, "backward reachability converged");
            break;
        }
        bad.push(pre);
    }
    debug!(k, layers = bad.len(), "k-inductive strengthening");
    Ok(simplify(&ChcExpr::and_all(
        bad.into_iter().map(ChcExpr::not),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use z4_arith::equivalent;

    fn x(t: u32) -> ChcExpr {
        ChcExpr::var(ChcVar::int(format!("x#{t}")))
    }

    /// x' = x + 1 if x < 2, x' = 0 otherwise
    fn wraparound() -> ChcExpr {
        ChcExpr::or(
            ChcExpr::and(
                ChcExpr::lt(x(0), ChcExpr::int(2)),
                ChcExpr::eq(x(1), ChcExpr::add(x(0), ChcExpr::int(1))),
            ),
            ChcExpr::and(
                ChcExpr::ge(x(0), ChcExpr::int(2)),
                ChcExpr::eq(x(1), ChcExpr::int(0)),
            ),
        )
    }

    #[test]
    fn bounds_are_a_valid_invariant() {
        let init = ChcExpr::eq(x(0), ChcExpr::int(0));
        let query = ChcExpr::ge(x(0), ChcExpr::int(3));
        let inv = ChcExpr::and(
            ChcExpr::ge(x(0), ChcExpr::int(0)),
            ChcExpr::le(x(0), ChcExpr::int(2)),
        );
        let check = check_invariant(Theory::Integer, &init, &wraparound(), &query, &inv).unwrap();
        assert_eq!(check, InvariantCheck::Valid);
    }

    #[test]
    fn failures_are_classified() {
        let init = ChcExpr::eq(x(0), ChcExpr::int(0));
        let query = ChcExpr::ge(x(0), ChcExpr::int(3));
        let t = wraparound();
        let weak = ChcExpr::le(x(0), ChcExpr::int(5));
        let narrow = ChcExpr::le(x(0), ChcExpr::int(1));
        let late = ChcExpr::ge(x(0), ChcExpr::int(1));
        let check = |inv: &ChcExpr| check_invariant(Theory::Integer, &init, &t, &query, inv).unwrap();
        assert_eq!(check(&late), InvariantCheck::NotInitiated);
        assert_eq!(check(&narrow), InvariantCheck::NotInductive);
        assert_eq!(check(&weak), InvariantCheck::NotSafe);
    }

    #[test]
    fn inductive_formula_survives_strengthening() {
        let qe = QuantifierElimination::new(Theory::Integer);
        let s = ChcExpr::and(
            ChcExpr::ge(x(0), ChcExpr::int(0)),
            ChcExpr::le(x(0), ChcExpr::int(2)),
        );
        let current = [ChcVar::int("x#0")];
        let j = strengthen_k_inductive(&qe, &wraparound(), &s, 2, &current).unwrap();
        assert!(equivalent(Theory::Integer, &j, &s).unwrap());
    }

    #[test]
    fn strengthening_keeps_short_paths_inside() {
        // x' = x + 1 stays below 11 for two more steps from x <= 8
        let qe = QuantifierElimination::new(Theory::Integer);
        let t = ChcExpr::eq(x(1), ChcExpr::add(x(0), ChcExpr::int(1)));
        let s = ChcExpr::le(x(0), ChcExpr::int(10));
        let current = [ChcVar::int("x#0")];
        let j = strengthen_k_inductive(&qe, &t, &s, 3, &current).unwrap();
        assert!(equivalent(Theory::Integer, &j, &ChcExpr::le(x(0), ChcExpr::int(8))).unwrap());
    }
}
