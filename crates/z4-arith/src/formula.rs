//! Asserted formulas in solver form
//!
//! Formulas are brought to negation normal form and then into a tree whose
//! leaves are Boolean literals and linear constraints. Modulo terms are
//! purified away: each `(mod t c)` becomes a fresh remainder variable `r`
//! with a fresh quotient `q` and the defining constraints
//! `t = c*q + r, 0 <= r <= c - 1` conjoined at the root.

use crate::{ArithResult, SmtError};
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use z4_expr::{
    simplify, to_nnf, ChcExpr, ChcOp, ChcSort, ChcVar, LinearConstraint, LinearTerm, Relation,
    Theory,
};

/// Prefix of variables introduced by the solver; never part of a model
pub(crate) const INTERNAL_PREFIX: char = '!';

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Node {
    True,
    False,
    Bool(ChcVar, bool),
    Arith(LinearConstraint),
    And(Vec<Node>),
    Or(Vec<Node>),
}

impl Node {
    pub(crate) fn collect_vars(&self, out: &mut FxHashSet<ChcVar>) {
        match self {
            Node::True | Node::False => {}
            Node::Bool(v, _) => {
                out.insert(v.clone());
            }
            Node::Arith(c) => out.extend(c.term.vars().cloned()),
            Node::And(children) | Node::Or(children) => {
                for c in children {
                    c.collect_vars(out);
                }
            }
        }
    }
}

/// Replaces modulo terms by fresh variables
#[derive(Debug)]
pub(crate) struct Purifier {
    tag: &'static str,
    theory: Theory,
    memo: FxHashMap<ChcExpr, ChcVar>,
    definitions: Vec<LinearConstraint>,
}

impl Purifier {
    pub(crate) fn new(tag: &'static str, theory: Theory) -> Self {
        Self {
            tag,
            theory,
            memo: FxHashMap::default(),
            definitions: Vec::new(),
        }
    }

    fn fresh(&self, kind: &str) -> ChcVar {
        ChcVar::int(format!(
            "{INTERNAL_PREFIX}{}_{kind}{}",
            self.tag,
            self.memo.len()
        ))
    }

    fn purify(&mut self, e: &ChcExpr) -> ArithResult<ChcExpr> {
        let ChcExpr::Op(op, args) = e else {
            return Ok(e.clone());
        };
        let mut purified = Vec::with_capacity(args.len());
        for a in args {
            purified.push(Arc::new(self.purify(a)?));
        }
        if *op != ChcOp::Mod {
            return Ok(ChcExpr::Op(*op, purified));
        }
        if !self.theory.is_integer() {
            return Err(SmtError::Unsupported(format!("mod in real arithmetic: {e}")));
        }
        let divisor = purified
            .get(1)
            .and_then(|d| d.as_numeral())
            .filter(|d| d.is_integer())
            .ok_or_else(|| SmtError::Unsupported(format!("mod by a non-constant: {e}")))?;
        let dividend = purified[0].as_ref().clone();
        if divisor.is_zero() {
            return Ok(dividend);
        }
        let key = ChcExpr::Op(ChcOp::Mod, purified);
        if let Some(r) = self.memo.get(&key) {
            return Ok(ChcExpr::var(r.clone()));
        }
        let c = divisor.abs();
        let q = self.fresh("q");
        let r = self.fresh("r");
        let t = LinearTerm::from_expr(&dividend)?;
        // t - c*q - r = 0
        let mut def = t;
        def.add_monomial(&q, &-c.clone());
        def.add_monomial(&r, &-BigRational::one());
        self.definitions.push(LinearConstraint::new(def, Relation::Eq));
        // -r <= 0
        self.definitions.push(LinearConstraint::new(
            LinearTerm::monomial(r.clone(), -BigRational::one()),
            Relation::Le,
        ));
        // r - (c - 1) <= 0
        self.definitions.push(LinearConstraint::new(
            LinearTerm::var(r.clone()).add_constant(&(BigRational::one() - c)),
            Relation::Le,
        ));
        self.memo.insert(key, r.clone());
        Ok(ChcExpr::var(r))
    }

    fn take_definitions(&mut self) -> Vec<LinearConstraint> {
        std::mem::take(&mut self.definitions)
    }
}

fn build(e: &ChcExpr, purifier: &mut Purifier) -> ArithResult<Node> {
    match e {
        ChcExpr::Bool(true) => Ok(Node::True),
        ChcExpr::Bool(false) => Ok(Node::False),
        ChcExpr::Var(v) if v.sort == ChcSort::Bool => Ok(Node::Bool(v.clone(), true)),
        ChcExpr::Op(ChcOp::Not, args) => match args.first().map(|a| a.as_ref()) {
            Some(ChcExpr::Var(v)) if v.sort == ChcSort::Bool => Ok(Node::Bool(v.clone(), false)),
            _ => Err(SmtError::Unsupported(format!("negation in normal form: {e}"))),
        },
        ChcExpr::Op(ChcOp::And, args) => Ok(Node::And(
            args.iter()
                .map(|a| build(a, purifier))
                .collect::<ArithResult<_>>()?,
        )),
        ChcExpr::Op(ChcOp::Or, args) => Ok(Node::Or(
            args.iter()
                .map(|a| build(a, purifier))
                .collect::<ArithResult<_>>()?,
        )),
        ChcExpr::Op(op, _) if op.is_comparison() => {
            let atom = if e.contains_mod() {
                purifier.purify(e)?
            } else {
                e.clone()
            };
            let constraint = LinearConstraint::from_atom(&atom)?;
            match constraint.constant_truth() {
                Some(true) => Ok(Node::True),
                Some(false) => Ok(Node::False),
                None => Ok(Node::Arith(constraint)),
            }
        }
        _ => Err(SmtError::Unsupported(format!("not a formula: {e}"))),
    }
}

/// Convert an asserted formula, purifying modulo terms through `purifier`
pub(crate) fn to_node(e: &ChcExpr, purifier: &mut Purifier) -> ArithResult<Node> {
    let nnf = to_nnf(&simplify(e));
    let node = build(&nnf, purifier)?;
    let definitions = purifier.take_definitions();
    if definitions.is_empty() {
        return Ok(node);
    }
    let mut parts = vec![node];
    parts.extend(definitions.into_iter().map(Node::Arith));
    Ok(Node::And(parts))
}

pub(crate) fn is_internal(var: &ChcVar) -> bool {
    var.name.starts_with(INTERNAL_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disequalities_split_into_two_constraints() {
        let x = ChcExpr::var(ChcVar::int("x"));
        let mut p = Purifier::new("t", Theory::Integer);
        let node = to_node(&ChcExpr::ne(x, ChcExpr::int(3)), &mut p).unwrap();
        assert!(matches!(node, Node::Or(ref c) if c.len() == 2));
    }

    #[test]
    fn mod_terms_get_definitions() {
        let x = ChcExpr::var(ChcVar::int("x"));
        let e = ChcExpr::eq(ChcExpr::mod_op(x, ChcExpr::int(2)), ChcExpr::int(1));
        let mut p = Purifier::new("t", Theory::Integer);
        let Node::And(parts) = to_node(&e, &mut p).unwrap() else {
            panic!("expected definitions");
        };
        assert_eq!(parts.len(), 4);
        let mut vars = FxHashSet::default();
        parts[0].collect_vars(&mut vars);
        assert!(vars.iter().all(is_internal));
    }

    #[test]
    fn mod_is_rejected_over_the_reals() {
        let x = ChcExpr::var(ChcVar::real("x"));
        let e = ChcExpr::eq(ChcExpr::mod_op(x, ChcExpr::int(2)), ChcExpr::int(1));
        let mut p = Purifier::new("t", Theory::Real);
        assert!(matches!(to_node(&e, &mut p), Err(SmtError::Unsupported(_))));
    }
}
