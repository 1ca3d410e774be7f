//! Interpolants on random unsatisfiable splits

use proptest::prelude::*;
use z4_arith::{check_sat, implies, SmtContext, SmtError, SmtResult};
use z4_expr::{ChcExpr, ChcVar, Theory};

fn var(name: &str, theory: Theory) -> ChcExpr {
    ChcExpr::var(ChcVar::new(name, theory.sort()))
}

fn num(n: i64, theory: Theory) -> ChcExpr {
    match theory {
        Theory::Integer => ChcExpr::int(n),
        Theory::Real => ChcExpr::rational(n, 1),
    }
}

/// `a*u + b*v <= k`
fn atom(theory: Theory, u: &str, v: &str, (a, b, k): (i64, i64, i64)) -> ChcExpr {
    ChcExpr::le(
        ChcExpr::add(
            ChcExpr::mul(num(a, theory), var(u, theory)),
            ChcExpr::mul(num(b, theory), var(v, theory)),
        ),
        num(k, theory),
    )
}

fn coeffs() -> impl Strategy<Value = (i64, i64, i64)> {
    (-3i64..=3, -3i64..=3, -4i64..=4)
}

fn side(theory: Theory, u: &'static str, v: &'static str) -> impl Strategy<Value = ChcExpr> {
    (
        prop::collection::vec(coeffs(), 1..4),
        prop::option::of((coeffs(), coeffs())),
    )
        .prop_map(move |(atoms, split)| {
            let mut parts: Vec<ChcExpr> = atoms.into_iter().map(|c| atom(theory, u, v, c)).collect();
            if let Some((l, r)) = split {
                parts.push(ChcExpr::or(atom(theory, u, v, l), atom(theory, u, v, r)));
            }
            ChcExpr::and_all(parts)
        })
}

fn check_interpolant(theory: Theory, a: ChcExpr, b: ChcExpr) {
    let mut ctx = SmtContext::new(theory);
    let a_id = ctx.assert(a.clone());
    ctx.assert(b.clone());
    if ctx.check().unwrap() != SmtResult::Unsat {
        return;
    }
    // integer branching may give up on unbounded splits
    let itp = match ctx.interpolant(&[a_id].into_iter().collect()) {
        Ok(itp) => itp,
        Err(SmtError::Incomplete(_)) => return,
        Err(e) => panic!("interpolation failed: {e}"),
    };
    assert!(implies(theory, &a, &itp).unwrap(), "A does not imply {itp}");
    assert_eq!(
        check_sat(theory, &ChcExpr::and(itp.clone(), b)).unwrap(),
        SmtResult::Unsat,
        "{itp} is consistent with B"
    );
    for v in itp.var_set() {
        assert_eq!(v.name, "y", "{itp} mentions a local variable");
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn integer_interpolants_are_sound(
        a in side(Theory::Integer, "x", "y"),
        b in side(Theory::Integer, "y", "w"),
    ) {
        check_interpolant(Theory::Integer, a, b);
    }

    #[test]
    fn real_interpolants_are_sound(
        a in side(Theory::Real, "x", "y"),
        b in side(Theory::Real, "y", "w"),
    ) {
        check_interpolant(Theory::Real, a, b);
    }
}

#[test]
fn parity_conflict_inside_a() {
    // A: x = 2y, x = 2z + 1   B: x >= 0
    let theory = Theory::Integer;
    let a = ChcExpr::and(
        ChcExpr::eq(
            var("x", theory),
            ChcExpr::mul(ChcExpr::int(2), var("y", theory)),
        ),
        ChcExpr::eq(
            var("x", theory),
            ChcExpr::add(
                ChcExpr::mul(ChcExpr::int(2), var("z", theory)),
                ChcExpr::int(1),
            ),
        ),
    );
    let b = ChcExpr::ge(var("x", theory), ChcExpr::int(0));
    let mut ctx = SmtContext::new(theory);
    let a_id = ctx.assert(a);
    ctx.assert(b);
    assert_eq!(ctx.check().unwrap(), SmtResult::Unsat);
    let itp = ctx.interpolant(&[a_id].into_iter().collect()).unwrap();
    assert!(itp.is_false(), "expected false, got {itp}");
}
