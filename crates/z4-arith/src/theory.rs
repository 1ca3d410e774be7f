//! Conjunctions of linear constraints
//!
//! Rational conjunctions are decided by Fourier-Motzkin elimination. Integer
//! conjunctions are tightened first and then decided by branch and bound on
//! the rational relaxation. With a variable partition at hand, refutations
//! are turned into interpolants: the A-part of a minimized Farkas
//! certificate at every leaf, combined along the branch splits.

use crate::fm::{fourier_motzkin, FmOutcome};
use crate::SmtConfig;
use num_rational::BigRational;
use num_traits::{One, Zero};
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;
use tracing::trace;
use z4_expr::{ChcExpr, ChcVar, LinearConstraint, LinearTerm, Relation, Theory};

/// Which side of an interpolation query a constraint belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Side {
    A,
    B,
}

#[derive(Debug, Clone)]
pub(crate) struct TheoryLiteral {
    pub constraint: LinearConstraint,
    pub side: Side,
}

/// Variables of the A and B formulas of an interpolation query
#[derive(Debug, Clone, Default)]
pub(crate) struct VarPartition {
    pub a_vars: FxHashSet<ChcVar>,
    pub b_vars: FxHashSet<ChcVar>,
}

impl VarPartition {
    fn split_side(&self, var: &ChcVar) -> Side {
        if self.b_vars.contains(var) && !self.a_vars.contains(var) {
            Side::B
        } else {
            Side::A
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum TheoryOutcome {
    Sat(BTreeMap<ChcVar, BigRational>),
    /// Interpolant present when the checker interpolates
    Unsat(Option<ChcExpr>),
    Unknown,
}

/// Combine refutations of the branches of a split on `side`
pub(crate) fn join_interpolants(side: Side, parts: Vec<ChcExpr>) -> ChcExpr {
    match side {
        Side::A => ChcExpr::or_all(parts),
        Side::B => ChcExpr::and_all(parts),
    }
}

pub(crate) struct TheoryChecker<'a> {
    theory: Theory,
    config: &'a SmtConfig,
    partition: Option<&'a VarPartition>,
    nodes: usize,
}

impl<'a> TheoryChecker<'a> {
    pub(crate) fn new(
        theory: Theory,
        config: &'a SmtConfig,
        partition: Option<&'a VarPartition>,
    ) -> Self {
        Self {
            theory,
            config,
            partition,
            nodes: 0,
        }
    }

    fn prepare(&self, literals: &[TheoryLiteral]) -> Vec<TheoryLiteral> {
        if !self.theory.is_integer() {
            return literals.to_vec();
        }
        literals
            .iter()
            .map(|l| TheoryLiteral {
                constraint: l.constraint.tighten_integer(),
                side: l.side,
            })
            .collect()
    }

    fn eliminate(&self, literals: &[TheoryLiteral]) -> FmOutcome {
        let constraints: Vec<_> = literals.iter().map(|l| l.constraint.clone()).collect();
        let sides: Vec<Side> = literals.iter().map(|l| l.side).collect();
        let sides = self.partition.map(|_| sides.as_slice());
        fourier_motzkin(&constraints, self.theory.is_integer(), sides)
    }

    /// Refute the rational relaxation, if possible
    pub(crate) fn check_relaxation(&mut self, literals: &[TheoryLiteral]) -> TheoryOutcome {
        let literals = self.prepare(literals);
        match self.eliminate(&literals) {
            FmOutcome::Sat(values) => TheoryOutcome::Sat(values),
            FmOutcome::Unsat(_) => TheoryOutcome::Unsat(self.leaf_interpolant(&literals)),
        }
    }

    /// Decide the conjunction in the checker's theory
    pub(crate) fn check(&mut self, literals: &[TheoryLiteral]) -> TheoryOutcome {
        let literals = self.prepare(literals);
        if !self.theory.is_integer() {
            return match self.eliminate(&literals) {
                FmOutcome::Sat(values) => TheoryOutcome::Sat(values),
                FmOutcome::Unsat(_) => TheoryOutcome::Unsat(self.leaf_interpolant(&literals)),
            };
        }
        self.branch_and_bound(literals, 0)
    }

    fn branch_and_bound(&mut self, literals: Vec<TheoryLiteral>, depth: u32) -> TheoryOutcome {
        let values = match self.eliminate(&literals) {
            FmOutcome::Unsat(_) => return TheoryOutcome::Unsat(self.leaf_interpolant(&literals)),
            FmOutcome::Sat(values) => values,
        };
        let Some((var, value)) = values
            .iter()
            .find(|(_, v)| !v.is_integer())
            .map(|(x, v)| (x.clone(), v.clone()))
        else {
            return TheoryOutcome::Sat(values);
        };
        if depth >= self.config.max_branch_depth || self.nodes >= self.config.max_branch_nodes {
            trace!(depth, nodes = self.nodes, "branch and bound budget exhausted");
            return TheoryOutcome::Unknown;
        }
        self.nodes += 1;
        let side = self
            .partition
            .map_or(Side::A, |partition| partition.split_side(&var));
        let floor = value.floor();
        // var <= floor
        let below = LinearConstraint::new(
            LinearTerm::var(var.clone()).add_constant(&-floor.clone()),
            Relation::Le,
        );
        // floor + 1 <= var
        let above = LinearConstraint::new(
            LinearTerm::monomial(var, -BigRational::one())
                .add_constant(&(floor + BigRational::one())),
            Relation::Le,
        );
        let mut parts = Vec::with_capacity(2);
        let mut unknown = false;
        for split in [below, above] {
            let mut branch = literals.clone();
            branch.push(TheoryLiteral {
                constraint: split,
                side,
            });
            match self.branch_and_bound(branch, depth + 1) {
                TheoryOutcome::Sat(values) => return TheoryOutcome::Sat(values),
                TheoryOutcome::Unknown => unknown = true,
                TheoryOutcome::Unsat(itp) => parts.push(itp),
            }
        }
        if unknown {
            return TheoryOutcome::Unknown;
        }
        let itp = parts
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .map(|parts| join_interpolants(side, parts));
        TheoryOutcome::Unsat(itp)
    }

    /// Drop constraints not needed for the contradiction, A-side ones first
    fn minimize(&self, literals: &[TheoryLiteral]) -> Vec<TheoryLiteral> {
        let mut keep = vec![true; literals.len()];
        let order = (0..literals.len())
            .filter(|&i| literals[i].side == Side::A)
            .chain((0..literals.len()).filter(|&i| literals[i].side == Side::B))
            .collect::<Vec<_>>();
        for i in order {
            keep[i] = false;
            let subset: Vec<_> = literals
                .iter()
                .zip(&keep)
                .filter(|(_, k)| **k)
                .map(|(l, _)| l.clone())
                .collect();
            if matches!(self.eliminate(&subset), FmOutcome::Sat(_)) {
                keep[i] = true;
            }
        }
        literals
            .iter()
            .zip(&keep)
            .filter(|(_, k)| **k)
            .map(|(l, _)| l.clone())
            .collect()
    }

    /// Interpolant of an unsatisfiable conjunction, when interpolating
    fn leaf_interpolant(&self, literals: &[TheoryLiteral]) -> Option<ChcExpr> {
        if self.partition.is_none() {
            return None;
        }
        let core = self.minimize(literals);
        let FmOutcome::Unsat(refutation) = self.eliminate(&core) else {
            return None;
        };
        let rows = core
            .iter()
            .map(|l| (&l.constraint, l.side))
            .chain(refutation.derived.iter().map(|(c, s)| (c, *s)));
        // The certificate sums to `c <= 0` (or `c < 0`) with `c` violating
        // it, so the A-part as an inequality already clashes with the B-part,
        // even when every A row is an equality.
        let mut sum = LinearTerm::zero();
        let mut a_count = 0usize;
        let mut b_count = 0usize;
        let mut strict = false;
        for ((constraint, side), lambda) in rows.zip(&refutation.multipliers) {
            if lambda.is_zero() {
                continue;
            }
            match side {
                Side::B => b_count += 1,
                Side::A => {
                    a_count += 1;
                    sum = sum.plus(&constraint.term.scaled(lambda));
                    strict |= constraint.rel.is_strict();
                }
            }
        }
        if a_count == 0 {
            return Some(ChcExpr::Bool(true));
        }
        if b_count == 0 {
            return Some(ChcExpr::Bool(false));
        }
        let rel = if strict { Relation::Lt } else { Relation::Le };
        let itp = LinearConstraint::new(sum, rel);
        let sort = self.theory.sort();
        Some(if self.theory.is_integer() {
            itp.tighten_integer().to_expr(sort)
        } else {
            itp.to_expr(sort)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;
    use z4_expr::Model;

    fn q(n: i64) -> BigRational {
        BigRational::from_integer(BigInt::from(n))
    }

    fn lit(coeffs: &[(&ChcVar, i64)], k: i64, rel: Relation, side: Side) -> TheoryLiteral {
        let mut term = LinearTerm::constant(q(k));
        for (v, c) in coeffs {
            term.add_monomial(v, &q(*c));
        }
        TheoryLiteral {
            constraint: LinearConstraint::new(term, rel),
            side,
        }
    }

    #[test]
    fn parity_gap_needs_branching() {
        // 2x = 2y + 1 has rational but no integer solutions
        let x = ChcVar::int("x");
        let y = ChcVar::int("y");
        let config = SmtConfig::default();
        let lits = vec![lit(&[(&x, 2), (&y, -2)], -1, Relation::Eq, Side::A)];
        let mut real = TheoryChecker::new(Theory::Real, &config, None);
        assert!(matches!(real.check(&lits), TheoryOutcome::Sat(_)));
        let mut int = TheoryChecker::new(Theory::Integer, &config, None);
        assert!(matches!(int.check(&lits), TheoryOutcome::Unsat(None)));
    }

    #[test]
    fn branch_and_bound_finds_integer_points() {
        // 3x >= 2, 3x <= 4
        let x = ChcVar::int("x");
        let config = SmtConfig::default();
        let lits = vec![
            lit(&[(&x, -3)], 2, Relation::Le, Side::A),
            lit(&[(&x, 3)], -4, Relation::Le, Side::A),
        ];
        let mut checker = TheoryChecker::new(Theory::Integer, &config, None);
        match checker.check(&lits) {
            TheoryOutcome::Sat(values) => assert_eq!(values[&x], q(1)),
            other => panic!("expected sat, got {other:?}"),
        }
    }

    #[test]
    fn leaf_interpolant_separates_the_sides() {
        // A: x <= y, y <= 0   B: x >= 1
        let x = ChcVar::real("x");
        let y = ChcVar::real("y");
        let partition = VarPartition {
            a_vars: [x.clone(), y.clone()].into_iter().collect(),
            b_vars: [x.clone()].into_iter().collect(),
        };
        let config = SmtConfig::default();
        let lits = vec![
            lit(&[(&x, 1), (&y, -1)], 0, Relation::Le, Side::A),
            lit(&[(&y, 1)], 0, Relation::Le, Side::A),
            lit(&[(&x, -1)], 1, Relation::Le, Side::B),
        ];
        let mut checker = TheoryChecker::new(Theory::Real, &config, Some(&partition));
        let TheoryOutcome::Unsat(Some(itp)) = checker.check(&lits) else {
            panic!("expected an interpolant");
        };
        assert_eq!(itp.var_set(), [x.clone()].into_iter().collect());
        let mut m = Model::new();
        m.assign(x.clone(), z4_expr::Value::Num(q(0)));
        assert!(m.satisfies(&itp).unwrap());
        m.assign(x, z4_expr::Value::Num(q(1)));
        assert!(!m.satisfies(&itp).unwrap());
    }

    #[test]
    fn equality_rows_give_an_inequality_interpolant() {
        // A: x = 5   B: x <= 2
        let x = ChcVar::int("x");
        let partition = VarPartition {
            a_vars: [x.clone()].into_iter().collect(),
            b_vars: [x.clone()].into_iter().collect(),
        };
        let config = SmtConfig::default();
        let lits = vec![
            lit(&[(&x, 1)], -5, Relation::Eq, Side::A),
            lit(&[(&x, 1)], -2, Relation::Le, Side::B),
        ];
        let mut checker = TheoryChecker::new(Theory::Integer, &config, Some(&partition));
        let TheoryOutcome::Unsat(Some(itp)) = checker.check(&lits) else {
            panic!("expected an interpolant");
        };
        let mut m = Model::new();
        for (value, expected) in [(5, true), (6, true), (2, false), (0, false)] {
            m.assign(x.clone(), z4_expr::Value::Num(q(value)));
            assert_eq!(m.satisfies(&itp).unwrap(), expected, "x = {value}: {itp}");
        }
    }
}
