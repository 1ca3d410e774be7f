//! Shared problem builders for integration tests

#![allow(dead_code)]

use num_rational::BigRational;
use z4_expr::{ChcExpr, ChcSort, ChcVar, Model, Value};
use z4_tpa::{ChcProblem, ClauseBody, ClauseHead, HornClause, PredicateId};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn int(name: &str) -> ChcExpr {
    ChcExpr::var(ChcVar::int(name))
}

pub fn real(name: &str) -> ChcExpr {
    ChcExpr::var(ChcVar::real(name))
}

/// Integer model from name/value pairs
pub fn int_model(values: &[(&str, i64)]) -> Model {
    let mut model = Model::new();
    for (name, value) in values {
        model.assign(
            ChcVar::int(*name),
            Value::Num(BigRational::from_integer((*value).into())),
        );
    }
    model
}

/// `Inv` over the given sorts with one fact, one self-loop and one query
pub struct LoopProblem {
    pub problem: ChcProblem,
    pub inv: PredicateId,
}

impl LoopProblem {
    pub fn new(sorts: Vec<ChcSort>) -> Self {
        let mut problem = ChcProblem::new();
        let inv = problem.declare_predicate("Inv", sorts);
        Self { problem, inv }
    }

    pub fn fact(mut self, args: Vec<ChcExpr>, constraint: ChcExpr) -> Self {
        self.problem.add_clause(HornClause::new(
            ClauseBody::constraint(constraint),
            ClauseHead::Predicate(self.inv, args),
        ));
        self
    }

    pub fn step(mut self, args: Vec<ChcExpr>, next: Vec<ChcExpr>, constraint: Option<ChcExpr>) -> Self {
        self.problem.add_clause(HornClause::new(
            ClauseBody::new(vec![(self.inv, args)], constraint),
            ClauseHead::Predicate(self.inv, next),
        ));
        self
    }

    pub fn query(mut self, args: Vec<ChcExpr>, constraint: ChcExpr) -> Self {
        self.problem.add_clause(HornClause::new(
            ClauseBody::new(vec![(self.inv, args)], Some(constraint)),
            ClauseHead::False,
        ));
        self
    }

    pub fn build(self) -> ChcProblem {
        self.problem
    }
}

/// x = 0; x' = x + 1; bad when x >= bound
pub fn counter(bound: i64) -> ChcProblem {
    let x = int("x");
    LoopProblem::new(vec![ChcSort::Int])
        .fact(vec![x.clone()], ChcExpr::eq(x.clone(), ChcExpr::int(0)))
        .step(
            vec![x.clone()],
            vec![ChcExpr::add(x.clone(), ChcExpr::int(1))],
            None,
        )
        .query(vec![x.clone()], ChcExpr::ge(x, ChcExpr::int(bound)))
        .build()
}

/// x = 0; x < 2 ∧ x' = x + 1; bad when x >= 3
pub fn bounded_counter() -> ChcProblem {
    let x = int("x");
    LoopProblem::new(vec![ChcSort::Int])
        .fact(vec![x.clone()], ChcExpr::eq(x.clone(), ChcExpr::int(0)))
        .step(
            vec![x.clone()],
            vec![ChcExpr::add(x.clone(), ChcExpr::int(1))],
            Some(ChcExpr::lt(x.clone(), ChcExpr::int(2))),
        )
        .query(vec![x.clone()], ChcExpr::ge(x, ChcExpr::int(3)))
        .build()
}

/// x = y = 0; both increase together; bad when they differ
pub fn lockstep() -> ChcProblem {
    let (x, y) = (int("x"), int("y"));
    let (xn, yn) = (int("xn"), int("yn"));
    LoopProblem::new(vec![ChcSort::Int, ChcSort::Int])
        .fact(
            vec![x.clone(), y.clone()],
            ChcExpr::and(
                ChcExpr::eq(x.clone(), ChcExpr::int(0)),
                ChcExpr::eq(y.clone(), ChcExpr::int(0)),
            ),
        )
        .step(
            vec![x.clone(), y.clone()],
            vec![xn.clone(), yn.clone()],
            Some(ChcExpr::and(
                ChcExpr::eq(xn, ChcExpr::add(x.clone(), ChcExpr::int(1))),
                ChcExpr::eq(yn, ChcExpr::add(y.clone(), ChcExpr::int(1))),
            )),
        )
        .query(vec![x.clone(), y.clone()], ChcExpr::ne(x, y))
        .build()
}

/// x = 0; x' = x + d for some 0 <= d <= 2; bad when x < 0
pub fn nondeterministic_step() -> ChcProblem {
    let (x, xn, d) = (int("x"), int("xn"), int("d"));
    LoopProblem::new(vec![ChcSort::Int])
        .fact(vec![x.clone()], ChcExpr::eq(x.clone(), ChcExpr::int(0)))
        .step(
            vec![x.clone()],
            vec![xn.clone()],
            Some(ChcExpr::and_all([
                ChcExpr::ge(d.clone(), ChcExpr::int(0)),
                ChcExpr::le(d.clone(), ChcExpr::int(2)),
                ChcExpr::eq(xn, ChcExpr::add(x.clone(), d)),
            ])),
        )
        .query(vec![x.clone()], ChcExpr::lt(x, ChcExpr::int(0)))
        .build()
}

/// Real x = 0; x < 1 ∧ x' = x + 1/2; bad when x > 2
pub fn half_steps() -> ChcProblem {
    let x = real("x");
    LoopProblem::new(vec![ChcSort::Real])
        .fact(vec![x.clone()], ChcExpr::eq(x.clone(), ChcExpr::rational(0, 1)))
        .step(
            vec![x.clone()],
            vec![ChcExpr::add(x.clone(), ChcExpr::rational(1, 2))],
            Some(ChcExpr::lt(x.clone(), ChcExpr::rational(1, 1))),
        )
        .query(vec![x.clone()], ChcExpr::gt(x, ChcExpr::rational(2, 1)))
        .build()
}

/// x = y = 0; x' = x + 1, y' = y + 2; bad when y < x
pub fn two_rates() -> ChcProblem {
    let (x, y) = (int("x"), int("y"));
    LoopProblem::new(vec![ChcSort::Int, ChcSort::Int])
        .fact(
            vec![x.clone(), y.clone()],
            ChcExpr::and(
                ChcExpr::eq(x.clone(), ChcExpr::int(0)),
                ChcExpr::eq(y.clone(), ChcExpr::int(0)),
            ),
        )
        .step(
            vec![x.clone(), y.clone()],
            vec![
                ChcExpr::add(x.clone(), ChcExpr::int(1)),
                ChcExpr::add(y.clone(), ChcExpr::int(2)),
            ],
            None,
        )
        .query(vec![x.clone(), y.clone()], ChcExpr::lt(y, x))
        .build()
}

/// x = 0; x' = ite(b, x + 1, x), b' = ¬b; bad when x < 0
pub fn toggle() -> ChcProblem {
    let (x, b) = (int("x"), ChcExpr::var(ChcVar::boolean("b")));
    LoopProblem::new(vec![ChcSort::Int, ChcSort::Bool])
        .fact(vec![x.clone(), b.clone()], ChcExpr::eq(x.clone(), ChcExpr::int(0)))
        .step(
            vec![x.clone(), b.clone()],
            vec![
                ChcExpr::ite(b.clone(), ChcExpr::add(x.clone(), ChcExpr::int(1)), x.clone()),
                ChcExpr::not(b.clone()),
            ],
            None,
        )
        .query(vec![x.clone(), b], ChcExpr::lt(x, ChcExpr::int(0)))
        .build()
}

/// x = 0; x' = x + 2; bad when x = 7
pub fn parity() -> ChcProblem {
    let x = int("x");
    LoopProblem::new(vec![ChcSort::Int])
        .fact(vec![x.clone()], ChcExpr::eq(x.clone(), ChcExpr::int(0)))
        .step(
            vec![x.clone()],
            vec![ChcExpr::add(x.clone(), ChcExpr::int(2))],
            None,
        )
        .query(vec![x.clone()], ChcExpr::eq(x, ChcExpr::int(7)))
        .build()
}
