//! Depth-first search over the cubes of a set of formulas
//!
//! Conjunctions are expanded in place, disjunctions are split. Boolean
//! literals are checked for clashes as they are collected and every new
//! arithmetic literal is checked against the rational relaxation, so
//! infeasible branches are cut as soon as they appear. A complete cube goes
//! to the full theory check.

use crate::formula::{is_internal, Node};
use crate::theory::{join_interpolants, Side, TheoryChecker, TheoryLiteral, TheoryOutcome};
use num_rational::BigRational;
use std::collections::BTreeMap;
use z4_expr::{ChcExpr, ChcVar, Model, Value};

#[derive(Debug, Clone)]
pub(crate) enum SearchOutcome {
    Sat(Model),
    Unsat(Option<ChcExpr>),
    Unknown,
}

pub(crate) struct CubeSearch<'a> {
    checker: TheoryChecker<'a>,
    interpolating: bool,
    bools: Vec<(ChcVar, bool, Side)>,
    arith: Vec<TheoryLiteral>,
}

impl<'a> CubeSearch<'a> {
    pub(crate) fn new(checker: TheoryChecker<'a>, interpolating: bool) -> Self {
        Self {
            checker,
            interpolating,
            bools: Vec::new(),
            arith: Vec::new(),
        }
    }

    /// Search for a cube of all `goals`; goals are taken from the back
    pub(crate) fn run(&mut self, goals: Vec<(&Node, Side)>) -> SearchOutcome {
        let bool_mark = self.bools.len();
        let arith_mark = self.arith.len();
        let outcome = self.expand(goals);
        self.bools.truncate(bool_mark);
        self.arith.truncate(arith_mark);
        outcome
    }

    fn refuted(&self, itp: impl FnOnce() -> ChcExpr) -> SearchOutcome {
        SearchOutcome::Unsat(self.interpolating.then(itp))
    }

    fn expand<'n>(&mut self, mut goals: Vec<(&'n Node, Side)>) -> SearchOutcome {
        while let Some((node, side)) = goals.pop() {
            match node {
                Node::True => {}
                Node::False => return self.refuted(|| ChcExpr::Bool(side == Side::B)),
                Node::Bool(var, value) => {
                    let previous = self
                        .bools
                        .iter()
                        .find(|(v, _, _)| v == var)
                        .map(|(_, b, s)| (*b, *s));
                    match previous {
                        Some((b, _)) if b == *value => {}
                        Some((b, other)) => {
                            return self.refuted(|| clash_interpolant(var, b, other, side))
                        }
                        None => self.bools.push((var.clone(), *value, side)),
                    }
                }
                Node::Arith(constraint) => {
                    self.arith.push(TheoryLiteral {
                        constraint: constraint.clone(),
                        side,
                    });
                    if let TheoryOutcome::Unsat(itp) = self.checker.check_relaxation(&self.arith) {
                        return SearchOutcome::Unsat(itp);
                    }
                }
                Node::And(children) => goals.extend(children.iter().rev().map(|c| (c, side))),
                Node::Or(children) => return self.split(goals, children, side),
            }
        }
        match self.checker.check(&self.arith) {
            TheoryOutcome::Sat(values) => SearchOutcome::Sat(self.model(values)),
            TheoryOutcome::Unsat(itp) => SearchOutcome::Unsat(itp),
            TheoryOutcome::Unknown => SearchOutcome::Unknown,
        }
    }

    fn split<'n>(
        &mut self,
        goals: Vec<(&'n Node, Side)>,
        children: &'n [Node],
        side: Side,
    ) -> SearchOutcome {
        let mut parts = Vec::with_capacity(children.len());
        let mut unknown = false;
        for child in children {
            let mut branch = goals.clone();
            branch.push((child, side));
            match self.run(branch) {
                SearchOutcome::Sat(model) => return SearchOutcome::Sat(model),
                SearchOutcome::Unknown => unknown = true,
                SearchOutcome::Unsat(itp) => parts.push(itp),
            }
        }
        if unknown {
            return SearchOutcome::Unknown;
        }
        let itp = parts
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .map(|parts| join_interpolants(side, parts));
        SearchOutcome::Unsat(itp)
    }

    fn model(&self, values: BTreeMap<ChcVar, BigRational>) -> Model {
        let mut model = Model::new();
        for (var, value) in values {
            if !is_internal(&var) {
                model.assign(var, Value::Num(value));
            }
        }
        for (var, value, _) in &self.bools {
            model.assign(var.clone(), Value::Bool(*value));
        }
        model
    }
}

/// Interpolant for a literal clashing with an earlier one
fn clash_interpolant(var: &ChcVar, earlier: bool, earlier_side: Side, side: Side) -> ChcExpr {
    match (earlier_side, side) {
        (Side::A, Side::A) => ChcExpr::Bool(false),
        (Side::B, Side::B) => ChcExpr::Bool(true),
        // the A literal
        (Side::A, Side::B) => literal(var, earlier),
        (Side::B, Side::A) => literal(var, !earlier),
    }
}

fn literal(var: &ChcVar, value: bool) -> ChcExpr {
    let v = ChcExpr::var(var.clone());
    if value {
        v
    } else {
        ChcExpr::not(v)
    }
}
