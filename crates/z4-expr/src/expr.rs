//! Expression types for CHC formulas

// These constructors build AST nodes, not perform operations.
// Implementing std::ops traits would be semantically incorrect.
#![allow(clippy::should_implement_trait)]

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Signed, Zero};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Sort (type) of expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChcSort {
    Bool,
    Int,
    Real,
}

impl ChcSort {
    /// True for `Int` and `Real`
    pub fn is_arithmetic(self) -> bool {
        matches!(self, ChcSort::Int | ChcSort::Real)
    }
}

impl fmt::Display for ChcSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChcSort::Bool => write!(f, "Bool"),
            ChcSort::Int => write!(f, "Int"),
            ChcSort::Real => write!(f, "Real"),
        }
    }
}

/// A variable in CHC expressions
///
/// Variables are ordered by name first, which keeps every map keyed by
/// variables deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChcVar {
    pub name: String,
    pub sort: ChcSort,
}

impl ChcVar {
    pub fn new(name: impl Into<String>, sort: ChcSort) -> Self {
        Self {
            name: name.into(),
            sort,
        }
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, ChcSort::Int)
    }

    pub fn real(name: impl Into<String>) -> Self {
        Self::new(name, ChcSort::Real)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ChcSort::Bool)
    }

    /// Same sort, different name
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self::new(name, self.sort)
    }

    pub fn is_bool(&self) -> bool {
        self.sort == ChcSort::Bool
    }
}

impl fmt::Display for ChcVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Operations in CHC expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChcOp {
    // Boolean operations
    Not,
    And,
    Or,
    Implies,
    Iff,

    // Arithmetic operations
    Add,
    Sub,
    Mul,
    /// Division by a non-zero constant (real sort only)
    Div,
    /// Remainder modulo a positive constant (integer sort only)
    Mod,
    Neg,

    // Comparisons
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    // Conditional
    Ite,
}

impl ChcOp {
    /// Binary arithmetic comparison
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            ChcOp::Eq | ChcOp::Ne | ChcOp::Lt | ChcOp::Le | ChcOp::Gt | ChcOp::Ge
        )
    }

    /// Operation producing a number
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            ChcOp::Add | ChcOp::Sub | ChcOp::Mul | ChcOp::Div | ChcOp::Mod | ChcOp::Neg
        )
    }
}

/// CHC expression
///
/// Expressions are immutable trees with shared children. Equality and hashing
/// are structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChcExpr {
    /// Boolean constant
    Bool(bool),
    /// Integer constant
    Int(BigInt),
    /// Real constant
    Real(BigRational),
    /// Variable reference
    Var(ChcVar),
    /// Operation application
    Op(ChcOp, Vec<Arc<ChcExpr>>),
}

impl ChcExpr {
    // Convenience constructors

    pub fn bool_const(b: bool) -> Self {
        ChcExpr::Bool(b)
    }

    pub fn int(n: i64) -> Self {
        ChcExpr::Int(BigInt::from(n))
    }

    pub fn int_big(n: BigInt) -> Self {
        ChcExpr::Int(n)
    }

    pub fn real(r: BigRational) -> Self {
        ChcExpr::Real(r)
    }

    /// Real constant `n/d`
    pub fn rational(n: i64, d: i64) -> Self {
        ChcExpr::Real(BigRational::new(BigInt::from(n), BigInt::from(d)))
    }

    /// Numeric constant of the given sort; integer sorts take the integer part
    pub fn numeral(value: BigRational, sort: ChcSort) -> Self {
        match sort {
            ChcSort::Int => ChcExpr::Int(value.to_integer()),
            _ => ChcExpr::Real(value),
        }
    }

    pub fn var(v: ChcVar) -> Self {
        ChcExpr::Var(v)
    }

    pub fn not(e: ChcExpr) -> Self {
        match e {
            ChcExpr::Bool(b) => ChcExpr::Bool(!b),
            // Double negation elimination: NOT(NOT(x)) = x
            ChcExpr::Op(ChcOp::Not, args) if args.len() == 1 => (*args[0]).clone(),
            e => ChcExpr::Op(ChcOp::Not, vec![Arc::new(e)]),
        }
    }

    pub fn and(a: ChcExpr, b: ChcExpr) -> Self {
        ChcExpr::Op(ChcOp::And, vec![Arc::new(a), Arc::new(b)])
    }

    pub fn or(a: ChcExpr, b: ChcExpr) -> Self {
        ChcExpr::Op(ChcOp::Or, vec![Arc::new(a), Arc::new(b)])
    }

    /// Flattened conjunction; `true` for no arguments
    pub fn and_all(exprs: impl IntoIterator<Item = ChcExpr>) -> Self {
        let mut args = Vec::new();
        for e in exprs {
            match e {
                ChcExpr::Bool(true) => {}
                ChcExpr::Bool(false) => return ChcExpr::Bool(false),
                ChcExpr::Op(ChcOp::And, inner) => args.extend(inner),
                other => args.push(Arc::new(other)),
            }
        }
        match args.len() {
            0 => ChcExpr::Bool(true),
            1 => (*args[0]).clone(),
            _ => ChcExpr::Op(ChcOp::And, args),
        }
    }

    /// Flattened disjunction; `false` for no arguments
    pub fn or_all(exprs: impl IntoIterator<Item = ChcExpr>) -> Self {
        let mut args = Vec::new();
        for e in exprs {
            match e {
                ChcExpr::Bool(false) => {}
                ChcExpr::Bool(true) => return ChcExpr::Bool(true),
                ChcExpr::Op(ChcOp::Or, inner) => args.extend(inner),
                other => args.push(Arc::new(other)),
            }
        }
        match args.len() {
            0 => ChcExpr::Bool(false),
            1 => (*args[0]).clone(),
            _ => ChcExpr::Op(ChcOp::Or, args),
        }
    }

    pub fn implies(a: ChcExpr, b: ChcExpr) -> Self {
        ChcExpr::Op(ChcOp::Implies, vec![Arc::new(a), Arc::new(b)])
    }

    pub fn iff(a: ChcExpr, b: ChcExpr) -> Self {
        ChcExpr::Op(ChcOp::Iff, vec![Arc::new(a), Arc::new(b)])
    }

    pub fn add(a: ChcExpr, b: ChcExpr) -> Self {
        ChcExpr::Op(ChcOp::Add, vec![Arc::new(a), Arc::new(b)])
    }

    pub fn sub(a: ChcExpr, b: ChcExpr) -> Self {
        ChcExpr::Op(ChcOp::Sub, vec![Arc::new(a), Arc::new(b)])
    }

    pub fn mul(a: ChcExpr, b: ChcExpr) -> Self {
        ChcExpr::Op(ChcOp::Mul, vec![Arc::new(a), Arc::new(b)])
    }

    pub fn div(a: ChcExpr, b: ChcExpr) -> Self {
        ChcExpr::Op(ChcOp::Div, vec![Arc::new(a), Arc::new(b)])
    }

    pub fn mod_op(a: ChcExpr, b: ChcExpr) -> Self {
        ChcExpr::Op(ChcOp::Mod, vec![Arc::new(a), Arc::new(b)])
    }

    pub fn neg(e: ChcExpr) -> Self {
        ChcExpr::Op(ChcOp::Neg, vec![Arc::new(e)])
    }

    pub fn eq(a: ChcExpr, b: ChcExpr) -> Self {
        ChcExpr::Op(ChcOp::Eq, vec![Arc::new(a), Arc::new(b)])
    }

    pub fn ne(a: ChcExpr, b: ChcExpr) -> Self {
        ChcExpr::Op(ChcOp::Ne, vec![Arc::new(a), Arc::new(b)])
    }

    pub fn lt(a: ChcExpr, b: ChcExpr) -> Self {
        ChcExpr::Op(ChcOp::Lt, vec![Arc::new(a), Arc::new(b)])
    }

    pub fn le(a: ChcExpr, b: ChcExpr) -> Self {
        ChcExpr::Op(ChcOp::Le, vec![Arc::new(a), Arc::new(b)])
    }

    pub fn gt(a: ChcExpr, b: ChcExpr) -> Self {
        ChcExpr::Op(ChcOp::Gt, vec![Arc::new(a), Arc::new(b)])
    }

    pub fn ge(a: ChcExpr, b: ChcExpr) -> Self {
        ChcExpr::Op(ChcOp::Ge, vec![Arc::new(a), Arc::new(b)])
    }

    pub fn ite(cond: ChcExpr, then_: ChcExpr, else_: ChcExpr) -> Self {
        ChcExpr::Op(
            ChcOp::Ite,
            vec![Arc::new(cond), Arc::new(then_), Arc::new(else_)],
        )
    }

    /// Get the sort of this expression
    pub fn sort(&self) -> ChcSort {
        match self {
            ChcExpr::Bool(_) => ChcSort::Bool,
            ChcExpr::Int(_) => ChcSort::Int,
            ChcExpr::Real(_) => ChcSort::Real,
            ChcExpr::Var(v) => v.sort,
            ChcExpr::Op(op, args) => match op {
                ChcOp::Not | ChcOp::And | ChcOp::Or | ChcOp::Implies | ChcOp::Iff => ChcSort::Bool,
                ChcOp::Eq | ChcOp::Ne | ChcOp::Lt | ChcOp::Le | ChcOp::Gt | ChcOp::Ge => {
                    ChcSort::Bool
                }
                ChcOp::Div => ChcSort::Real,
                ChcOp::Add | ChcOp::Sub | ChcOp::Mul | ChcOp::Mod | ChcOp::Neg => {
                    if args.iter().any(|a| a.sort() == ChcSort::Real) {
                        ChcSort::Real
                    } else {
                        ChcSort::Int
                    }
                }
                ChcOp::Ite => args.get(1).map(|a| a.sort()).unwrap_or(ChcSort::Bool),
            },
        }
    }

    pub fn is_true(&self) -> bool {
        matches!(self, ChcExpr::Bool(true))
    }

    pub fn is_false(&self) -> bool {
        matches!(self, ChcExpr::Bool(false))
    }

    pub fn as_var(&self) -> Option<&ChcVar> {
        match self {
            ChcExpr::Var(v) => Some(v),
            _ => None,
        }
    }

    /// Value of a numeric constant
    pub fn as_numeral(&self) -> Option<BigRational> {
        match self {
            ChcExpr::Int(n) => Some(BigRational::from_integer(n.clone())),
            ChcExpr::Real(r) => Some(r.clone()),
            _ => None,
        }
    }

    /// Arguments of an operation (empty for leaves)
    pub fn args(&self) -> &[Arc<ChcExpr>] {
        match self {
            ChcExpr::Op(_, args) => args,
            _ => &[],
        }
    }

    /// Theory atom: arithmetic comparison, Boolean variable or constant
    pub fn is_atom(&self) -> bool {
        match self {
            ChcExpr::Bool(_) => true,
            ChcExpr::Var(v) => v.is_bool(),
            ChcExpr::Op(op, args) => {
                op.is_comparison() && args.first().is_some_and(|a| a.sort().is_arithmetic())
            }
            _ => false,
        }
    }

    /// Substitute variables in the expression (simultaneously)
    pub fn substitute(&self, subst: &[(ChcVar, ChcExpr)]) -> ChcExpr {
        if subst.is_empty() {
            return self.clone();
        }
        let map: FxHashMap<ChcVar, ChcExpr> = subst.iter().cloned().collect();
        self.substitute_map(&map)
    }

    /// Substitute variables using a prepared map
    pub fn substitute_map(&self, subst: &FxHashMap<ChcVar, ChcExpr>) -> ChcExpr {
        if subst.is_empty() {
            return self.clone();
        }
        match self {
            ChcExpr::Bool(_) | ChcExpr::Int(_) | ChcExpr::Real(_) => self.clone(),
            ChcExpr::Var(v) => subst.get(v).cloned().unwrap_or_else(|| self.clone()),
            ChcExpr::Op(op, args) => {
                let new_args: Vec<_> = args
                    .iter()
                    .map(|a| Arc::new(a.substitute_map(subst)))
                    .collect();
                ChcExpr::Op(*op, new_args)
            }
        }
    }

    /// Get all variables in the expression, in order of first occurrence
    pub fn vars(&self) -> Vec<ChcVar> {
        let mut seen = FxHashSet::default();
        let mut result = Vec::new();
        self.collect_vars(&mut seen, &mut result);
        result
    }

    /// Variables of the expression as a set
    pub fn var_set(&self) -> FxHashSet<ChcVar> {
        self.vars().into_iter().collect()
    }

    fn collect_vars(&self, seen: &mut FxHashSet<ChcVar>, result: &mut Vec<ChcVar>) {
        match self {
            ChcExpr::Bool(_) | ChcExpr::Int(_) | ChcExpr::Real(_) => {}
            ChcExpr::Var(v) => {
                if seen.insert(v.clone()) {
                    result.push(v.clone());
                }
            }
            ChcExpr::Op(_, args) => {
                for arg in args {
                    arg.collect_vars(seen, result);
                }
            }
        }
    }

    pub fn contains_var(&self, var: &ChcVar) -> bool {
        match self {
            ChcExpr::Var(v) => v == var,
            ChcExpr::Op(_, args) => args.iter().any(|a| a.contains_var(var)),
            _ => false,
        }
    }

    /// Does the expression mention any variable of the set
    pub fn mentions_any(&self, vars: &FxHashSet<ChcVar>) -> bool {
        match self {
            ChcExpr::Var(v) => vars.contains(v),
            ChcExpr::Op(_, args) => args.iter().any(|a| a.mentions_any(vars)),
            _ => false,
        }
    }

    pub fn contains_mod(&self) -> bool {
        match self {
            ChcExpr::Op(ChcOp::Mod, _) => true,
            ChcExpr::Op(_, args) => args.iter().any(|a| a.contains_mod()),
            _ => false,
        }
    }

    /// Top-level conjuncts (nested conjunctions are flattened, `true` is dropped)
    pub fn conjuncts(&self) -> Vec<ChcExpr> {
        fn flatten(expr: &ChcExpr, out: &mut Vec<ChcExpr>) {
            match expr {
                ChcExpr::Op(ChcOp::And, args) => {
                    for a in args {
                        flatten(a, out);
                    }
                }
                ChcExpr::Bool(true) => {}
                _ => out.push(expr.clone()),
            }
        }
        let mut out = Vec::new();
        flatten(self, &mut out);
        out
    }

    /// Top-level disjuncts (nested disjunctions are flattened, `false` is dropped)
    pub fn disjuncts(&self) -> Vec<ChcExpr> {
        fn flatten(expr: &ChcExpr, out: &mut Vec<ChcExpr>) {
            match expr {
                ChcExpr::Op(ChcOp::Or, args) => {
                    for a in args {
                        flatten(a, out);
                    }
                }
                ChcExpr::Bool(false) => {}
                _ => out.push(expr.clone()),
            }
        }
        let mut out = Vec::new();
        flatten(self, &mut out);
        out
    }

    /// Number of nodes in the expression tree
    pub fn size(&self) -> usize {
        match self {
            ChcExpr::Op(_, args) => 1 + args.iter().map(|a| a.size()).sum::<usize>(),
            _ => 1,
        }
    }
}

fn write_rational(f: &mut fmt::Formatter<'_>, r: &BigRational) -> fmt::Result {
    let abs = r.abs();
    let body = if abs.is_integer() {
        format!("{}.0", abs.numer())
    } else {
        format!("(/ {}.0 {}.0)", abs.numer(), abs.denom())
    };
    if r.is_negative() {
        write!(f, "(- {body})")
    } else {
        write!(f, "{body}")
    }
}

impl fmt::Display for ChcExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChcExpr::Bool(b) => write!(f, "{b}"),
            ChcExpr::Int(n) => {
                if n.is_negative() {
                    write!(f, "(- {})", -n)
                } else {
                    write!(f, "{n}")
                }
            }
            ChcExpr::Real(r) => {
                if r.is_zero() {
                    write!(f, "0.0")
                } else {
                    write_rational(f, r)
                }
            }
            ChcExpr::Var(v) => write!(f, "{v}"),
            ChcExpr::Op(op, args) => {
                let op_str = match op {
                    ChcOp::Not => "not",
                    ChcOp::And => "and",
                    ChcOp::Or => "or",
                    ChcOp::Implies => "=>",
                    ChcOp::Iff => "=",
                    ChcOp::Add => "+",
                    ChcOp::Sub => "-",
                    ChcOp::Mul => "*",
                    ChcOp::Div => "/",
                    ChcOp::Mod => "mod",
                    ChcOp::Neg => "-",
                    ChcOp::Eq => "=",
                    ChcOp::Ne => "distinct",
                    ChcOp::Lt => "<",
                    ChcOp::Le => "<=",
                    ChcOp::Gt => ">",
                    ChcOp::Ge => ">=",
                    ChcOp::Ite => "ite",
                };
                write!(f, "({op_str}")?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> ChcExpr {
        ChcExpr::var(ChcVar::int("x"))
    }

    fn y() -> ChcExpr {
        ChcExpr::var(ChcVar::int("y"))
    }

    #[test]
    fn structural_equality_and_hashing() {
        let a = ChcExpr::le(ChcExpr::add(x(), ChcExpr::int(1)), y());
        let b = ChcExpr::le(ChcExpr::add(x(), ChcExpr::int(1)), y());
        assert_eq!(a, b);
        let mut set = FxHashSet::default();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn substitution_is_simultaneous() {
        let e = ChcExpr::lt(x(), y());
        let swapped = e.substitute(&[(ChcVar::int("x"), y()), (ChcVar::int("y"), x())]);
        assert_eq!(swapped, ChcExpr::lt(y(), x()));
    }

    #[test]
    fn vars_in_first_occurrence_order() {
        let e = ChcExpr::and(ChcExpr::lt(y(), x()), ChcExpr::ge(x(), ChcExpr::int(0)));
        let names: Vec<_> = e.vars().into_iter().map(|v| v.name).collect();
        assert_eq!(names, vec!["y", "x"]);
    }

    #[test]
    fn and_all_flattens_and_absorbs() {
        let a = ChcExpr::lt(x(), y());
        let b = ChcExpr::ge(x(), ChcExpr::int(0));
        let nested = ChcExpr::and_all([ChcExpr::and(a.clone(), b.clone()), ChcExpr::Bool(true)]);
        assert_eq!(nested.conjuncts(), vec![a.clone(), b]);
        assert!(ChcExpr::and_all([a.clone(), ChcExpr::Bool(false)]).is_false());
        assert!(ChcExpr::and_all(Vec::new()).is_true());
        assert!(ChcExpr::or_all(Vec::new()).is_false());
        assert_eq!(ChcExpr::or_all([a.clone()]), a);
    }

    #[test]
    fn double_negation_is_removed() {
        let a = ChcExpr::lt(x(), y());
        assert_eq!(ChcExpr::not(ChcExpr::not(a.clone())), a);
        assert!(ChcExpr::not(ChcExpr::Bool(true)).is_false());
    }

    #[test]
    fn smtlib_printing() {
        let e = ChcExpr::le(ChcExpr::add(x(), ChcExpr::int(-3)), ChcExpr::rational(1, 2));
        assert_eq!(e.to_string(), "(<= (+ x (- 3)) (/ 1.0 2.0))");
        assert_eq!(ChcExpr::rational(-4, 1).to_string(), "(- 4.0)");
    }

    #[test]
    fn sort_of_mixed_arithmetic_is_real() {
        let e = ChcExpr::add(x(), ChcExpr::rational(1, 2));
        assert_eq!(e.sort(), ChcSort::Real);
        assert_eq!(ChcExpr::add(x(), y()).sort(), ChcSort::Int);
        assert!(ChcExpr::lt(x(), y()).is_atom());
        assert!(!ChcExpr::and(ChcExpr::lt(x(), y()), ChcExpr::Bool(true)).is_atom());
    }
}
