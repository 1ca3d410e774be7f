//! Formula rewriting: negation normal form and simplification

use crate::linear::LinearConstraint;
use crate::model::floor_mod;
use crate::{ChcExpr, ChcOp, ChcSort};
use rustc_hash::FxHashSet;
use std::sync::Arc;

/// Convert a formula to negation normal form
///
/// The result is built from `and`, `or`, arithmetic comparisons other than
/// disequalities, Boolean variables and negated Boolean variables. Arithmetic
/// `ite` terms are lifted to the Boolean level, `=>`, Boolean equalities and
/// Boolean `ite` are expanded, and negations are absorbed into comparisons.
pub fn to_nnf(e: &ChcExpr) -> ChcExpr {
    nnf(&lift_arith_ite(e), true)
}

fn nnf(e: &ChcExpr, positive: bool) -> ChcExpr {
    match e {
        ChcExpr::Bool(b) => ChcExpr::Bool(*b == positive),
        ChcExpr::Var(v) if v.is_bool() => {
            if positive {
                e.clone()
            } else {
                ChcExpr::not(e.clone())
            }
        }
        ChcExpr::Op(op, args) => match op {
            ChcOp::Not => nnf(&args[0], !positive),
            ChcOp::And => {
                let children = args.iter().map(|a| nnf(a, positive));
                if positive {
                    ChcExpr::and_all(children)
                } else {
                    ChcExpr::or_all(children)
                }
            }
            ChcOp::Or => {
                let children = args.iter().map(|a| nnf(a, positive));
                if positive {
                    ChcExpr::or_all(children)
                } else {
                    ChcExpr::and_all(children)
                }
            }
            ChcOp::Implies => {
                let expanded = ChcExpr::or(ChcExpr::not((*args[0]).clone()), (*args[1]).clone());
                nnf(&expanded, positive)
            }
            ChcOp::Iff => bool_equality(&args[0], &args[1], positive),
            ChcOp::Eq | ChcOp::Ne if args[0].sort() == ChcSort::Bool => {
                bool_equality(&args[0], &args[1], positive == (*op == ChcOp::Eq))
            }
            ChcOp::Ite => {
                let (c, t, f) = (&args[0], &args[1], &args[2]);
                ChcExpr::or_all([
                    ChcExpr::and_all([nnf(c, true), nnf(t, positive)]),
                    ChcExpr::and_all([nnf(c, false), nnf(f, positive)]),
                ])
            }
            op if op.is_comparison() => comparison(*op, &args[0], &args[1], positive),
            _ => e.clone(),
        },
        _ => e.clone(),
    }
}

fn bool_equality(a: &ChcExpr, b: &ChcExpr, positive: bool) -> ChcExpr {
    ChcExpr::or_all([
        ChcExpr::and_all([nnf(a, true), nnf(b, positive)]),
        ChcExpr::and_all([nnf(a, false), nnf(b, !positive)]),
    ])
}

fn comparison(op: ChcOp, a: &ChcExpr, b: &ChcExpr, positive: bool) -> ChcExpr {
    let (a, b) = (a.clone(), b.clone());
    let op = if positive {
        op
    } else {
        match op {
            ChcOp::Le => ChcOp::Gt,
            ChcOp::Lt => ChcOp::Ge,
            ChcOp::Ge => ChcOp::Lt,
            ChcOp::Gt => ChcOp::Le,
            ChcOp::Eq => ChcOp::Ne,
            _ => ChcOp::Eq,
        }
    };
    match op {
        ChcOp::Ne => ChcExpr::or(ChcExpr::lt(a.clone(), b.clone()), ChcExpr::gt(a, b)),
        op => ChcExpr::Op(op, vec![Arc::new(a), Arc::new(b)]),
    }
}

/// Lift arithmetic `ite` terms out of atoms:
/// `p(ite(c, t, f))` becomes `(c and p(t)) or (not c and p(f))`
fn lift_arith_ite(e: &ChcExpr) -> ChcExpr {
    match e {
        ChcExpr::Op(op, args) if op.is_comparison() => {
            match find_arith_ite(e) {
                Some(ite) => {
                    let (c, t, f) = (&ite.args()[0], &ite.args()[1], &ite.args()[2]);
                    let then_branch = replace_subterm(e, &ite, t);
                    let else_branch = replace_subterm(e, &ite, f);
                    let c = lift_arith_ite(c);
                    ChcExpr::or(
                        ChcExpr::and(c.clone(), lift_arith_ite(&then_branch)),
                        ChcExpr::and(ChcExpr::not(c), lift_arith_ite(&else_branch)),
                    )
                }
                None => ChcExpr::Op(*op, args.clone()),
            }
        }
        ChcExpr::Op(op, args) => ChcExpr::Op(
            *op,
            args.iter().map(|a| Arc::new(lift_arith_ite(a))).collect(),
        ),
        _ => e.clone(),
    }
}

fn find_arith_ite(e: &ChcExpr) -> Option<ChcExpr> {
    match e {
        ChcExpr::Op(ChcOp::Ite, _) if e.sort() != ChcSort::Bool => Some(e.clone()),
        ChcExpr::Op(_, args) => args.iter().find_map(|a| find_arith_ite(a)),
        _ => None,
    }
}

fn replace_subterm(e: &ChcExpr, target: &ChcExpr, replacement: &ChcExpr) -> ChcExpr {
    if e == target {
        return replacement.clone();
    }
    match e {
        ChcExpr::Op(op, args) => ChcExpr::Op(
            *op,
            args.iter()
                .map(|a| Arc::new(replace_subterm(a, target, replacement)))
                .collect(),
        ),
        _ => e.clone(),
    }
}

/// Is the formula in the negation normal form produced by [`to_nnf`]
pub fn is_nnf(e: &ChcExpr) -> bool {
    match e {
        ChcExpr::Bool(_) => true,
        ChcExpr::Var(v) => v.is_bool(),
        ChcExpr::Op(ChcOp::Not, args) => matches!(&*args[0], ChcExpr::Var(v) if v.is_bool()),
        ChcExpr::Op(ChcOp::And | ChcOp::Or, args) => args.iter().all(|a| is_nnf(a)),
        ChcExpr::Op(op, args) => {
            op.is_comparison() && *op != ChcOp::Ne && args[0].sort().is_arithmetic()
        }
        _ => false,
    }
}

/// Simplify a formula
///
/// Linear atoms are put in canonical form (integer atoms are also tightened),
/// constant subterms are folded, conjunctions and disjunctions are flattened
/// with duplicates and complementary literals resolved.
pub fn simplify(e: &ChcExpr) -> ChcExpr {
    match e {
        ChcExpr::Op(op, args) => {
            let args: Vec<ChcExpr> = args.iter().map(|a| simplify(a)).collect();
            simplify_op(*op, args)
        }
        _ => e.clone(),
    }
}

fn simplify_op(op: ChcOp, args: Vec<ChcExpr>) -> ChcExpr {
    match op {
        ChcOp::Not => ChcExpr::not(args.into_iter().next().unwrap_or(ChcExpr::Bool(false))),
        ChcOp::And => simplify_junction(args, true),
        ChcOp::Or => simplify_junction(args, false),
        ChcOp::Implies => {
            let mut it = args.into_iter();
            match (it.next(), it.next()) {
                (Some(a), Some(b)) => simplify_junction(vec![ChcExpr::not(a), b], false),
                _ => ChcExpr::Bool(true),
            }
        }
        ChcOp::Iff => {
            if args[0] == args[1] {
                return ChcExpr::Bool(true);
            }
            match (&args[0], &args[1]) {
                (ChcExpr::Bool(a), ChcExpr::Bool(b)) => ChcExpr::Bool(a == b),
                (ChcExpr::Bool(true), other) | (other, ChcExpr::Bool(true)) => other.clone(),
                (ChcExpr::Bool(false), other) | (other, ChcExpr::Bool(false)) => {
                    ChcExpr::not(other.clone())
                }
                _ => rebuild(op, args),
            }
        }
        ChcOp::Ite => match &args[0] {
            ChcExpr::Bool(true) => args[1].clone(),
            ChcExpr::Bool(false) => args[2].clone(),
            _ if args[1] == args[2] => args[1].clone(),
            _ => rebuild(op, args),
        },
        ChcOp::Eq | ChcOp::Ne if args[0].sort() == ChcSort::Bool => {
            let iff = simplify_op(ChcOp::Iff, args);
            if op == ChcOp::Eq {
                iff
            } else {
                ChcExpr::not(iff)
            }
        }
        op if op.is_comparison() => simplify_atom(op, args),
        ChcOp::Mod => match (args[0].as_numeral(), args[1].as_numeral()) {
            (Some(a), Some(b)) => ChcExpr::numeral(floor_mod(&a, &b), ChcSort::Int),
            _ => rebuild(op, args),
        },
        _ => rebuild(op, args),
    }
}

fn rebuild(op: ChcOp, args: Vec<ChcExpr>) -> ChcExpr {
    ChcExpr::Op(op, args.into_iter().map(Arc::new).collect())
}

fn atom_sort(a: &ChcExpr, b: &ChcExpr) -> ChcSort {
    if a.sort() == ChcSort::Real || b.sort() == ChcSort::Real {
        ChcSort::Real
    } else {
        ChcSort::Int
    }
}

fn canonical(constraint: &LinearConstraint, sort: ChcSort) -> ChcExpr {
    if sort == ChcSort::Int {
        constraint.tighten_integer().to_expr(sort)
    } else {
        constraint.to_expr(sort)
    }
}

fn simplify_atom(op: ChcOp, args: Vec<ChcExpr>) -> ChcExpr {
    let sort = atom_sort(&args[0], &args[1]);
    let atom_op = if op == ChcOp::Ne { ChcOp::Eq } else { op };
    let atom = rebuild(atom_op, args);
    let Ok(constraint) = LinearConstraint::from_atom(&atom) else {
        let ChcExpr::Op(_, args) = atom else {
            return atom;
        };
        return ChcExpr::Op(op, args);
    };
    let canonical = canonical(&constraint, sort);
    if op != ChcOp::Ne {
        return canonical;
    }
    match canonical {
        ChcExpr::Bool(b) => ChcExpr::Bool(!b),
        ChcExpr::Op(ChcOp::Eq, args) => ChcExpr::Op(ChcOp::Ne, args),
        other => ChcExpr::not(other),
    }
}

fn complement(e: &ChcExpr) -> Option<ChcExpr> {
    match e {
        ChcExpr::Op(ChcOp::Not, args) => Some((*args[0]).clone()),
        ChcExpr::Var(v) if v.is_bool() => Some(ChcExpr::not(e.clone())),
        ChcExpr::Op(op, args) if op.is_comparison() && *op != ChcOp::Eq && *op != ChcOp::Ne => {
            let negated = match op {
                ChcOp::Le => ChcOp::Gt,
                ChcOp::Lt => ChcOp::Ge,
                ChcOp::Ge => ChcOp::Lt,
                _ => ChcOp::Le,
            };
            Some(simplify_atom(
                negated,
                args.iter().map(|a| (**a).clone()).collect(),
            ))
        }
        _ => None,
    }
}

/// Flatten, drop neutral elements, remove duplicates, detect `p` with `not p`
fn simplify_junction(args: Vec<ChcExpr>, conjunction: bool) -> ChcExpr {
    let junction_op = if conjunction { ChcOp::And } else { ChcOp::Or };
    let mut flat = Vec::new();
    let mut stack: Vec<ChcExpr> = args.into_iter().rev().collect();
    while let Some(e) = stack.pop() {
        match e {
            ChcExpr::Op(op, inner) if op == junction_op => {
                stack.extend(inner.iter().rev().map(|a| (**a).clone()));
            }
            ChcExpr::Bool(b) if b == conjunction => {}
            ChcExpr::Bool(_) => return ChcExpr::Bool(!conjunction),
            other => flat.push(other),
        }
    }
    let mut seen = FxHashSet::default();
    flat.retain(|e| seen.insert(e.clone()));
    for e in &flat {
        if let Some(c) = complement(e) {
            if seen.contains(&c) {
                return ChcExpr::Bool(!conjunction);
            }
        }
    }
    if conjunction {
        ChcExpr::and_all(flat)
    } else {
        ChcExpr::or_all(flat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChcVar, Model, Value};
    use num_bigint::BigInt;
    use num_rational::BigRational;

    fn x() -> ChcExpr {
        ChcExpr::var(ChcVar::int("x"))
    }

    fn b(name: &str) -> ChcExpr {
        ChcExpr::var(ChcVar::boolean(name))
    }

    #[test]
    fn negation_is_pushed_into_comparisons() {
        let e = ChcExpr::not(ChcExpr::and(
            ChcExpr::le(x(), ChcExpr::int(3)),
            ChcExpr::eq(x(), ChcExpr::int(0)),
        ));
        let n = to_nnf(&e);
        assert!(is_nnf(&n));
        assert_eq!(
            n,
            ChcExpr::or_all([
                ChcExpr::gt(x(), ChcExpr::int(3)),
                ChcExpr::lt(x(), ChcExpr::int(0)),
                ChcExpr::gt(x(), ChcExpr::int(0)),
            ])
        );
    }

    #[test]
    fn boolean_equality_is_expanded() {
        let e = ChcExpr::eq(b("p"), b("q"));
        let n = to_nnf(&e);
        assert!(is_nnf(&n));
        let mut m = Model::new();
        m.assign(ChcVar::boolean("p"), Value::Bool(true));
        m.assign(ChcVar::boolean("q"), Value::Bool(false));
        assert!(!m.satisfies(&n).unwrap());
        m.assign(ChcVar::boolean("q"), Value::Bool(true));
        assert!(m.satisfies(&n).unwrap());
    }

    #[test]
    fn arithmetic_ite_is_lifted() {
        let e = ChcExpr::le(
            ChcExpr::ite(b("c"), x(), ChcExpr::int(10)),
            ChcExpr::int(5),
        );
        let n = to_nnf(&e);
        assert!(is_nnf(&n));
        let mut m = Model::new();
        m.assign(ChcVar::boolean("c"), Value::Bool(false));
        assert_eq!(m.satisfies(&n).unwrap(), m.satisfies(&e).unwrap());
        m.assign(ChcVar::boolean("c"), Value::Bool(true));
        m.assign(
            ChcVar::int("x"),
            Value::Num(BigRational::from_integer(BigInt::from(3))),
        );
        assert_eq!(m.satisfies(&n).unwrap(), m.satisfies(&e).unwrap());
    }

    #[test]
    fn simplify_folds_and_canonicalizes() {
        // 2*x < 7 over integers is x <= 3
        let e = ChcExpr::lt(ChcExpr::mul(ChcExpr::int(2), x()), ChcExpr::int(7));
        assert_eq!(simplify(&e), ChcExpr::le(x(), ChcExpr::int(3)));
        assert!(simplify(&ChcExpr::lt(ChcExpr::int(1), ChcExpr::int(2))).is_true());
    }

    #[test]
    fn simplify_detects_complementary_literals() {
        let p = ChcExpr::le(x(), ChcExpr::int(3));
        let e = ChcExpr::and(p.clone(), ChcExpr::gt(x(), ChcExpr::int(3)));
        assert!(simplify(&e).is_false());
        let d = ChcExpr::or(p.clone(), p.clone());
        assert_eq!(simplify(&d), p);
    }
}
