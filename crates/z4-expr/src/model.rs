//! Variable assignments and expression evaluation

use crate::{ChcExpr, ChcOp, ChcSort, ChcVar, ExprError, ExprResult};
use num_rational::BigRational;
use num_traits::{Signed, Zero};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A value in a model
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    /// Integer and real values alike; integers are integral rationals
    Num(BigRational),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Num(_) => None,
        }
    }

    pub fn as_num(&self) -> Option<&BigRational> {
        match self {
            Value::Num(n) => Some(n),
            Value::Bool(_) => None,
        }
    }

    /// Constant expression denoting this value
    pub fn to_expr(&self, sort: ChcSort) -> ChcExpr {
        match self {
            Value::Bool(b) => ChcExpr::Bool(*b),
            Value::Num(n) => ChcExpr::numeral(n.clone(), sort),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Num(n) => write!(f, "{n}"),
        }
    }
}

/// Assignment of values to variables
///
/// Evaluation is total: unassigned variables take the default of their sort
/// (`false` or `0`). Any extension of a model found for a formula satisfies
/// the formula as well, so the defaults are never observable by callers that
/// only evaluate the formula the model was produced for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Model {
    values: FxHashMap<ChcVar, Value>,
}

fn sort_error(context: &ChcExpr, expected: &str, actual: &Value) -> ExprError {
    ExprError::SortMismatch {
        context: context.to_string(),
        expected: expected.to_string(),
        actual: match actual {
            Value::Bool(_) => "Bool".to_string(),
            Value::Num(_) => "number".to_string(),
        },
    }
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, var: ChcVar, value: Value) {
        self.values.insert(var, value);
    }

    pub fn get(&self, var: &ChcVar) -> Option<&Value> {
        self.values.get(var)
    }

    pub fn contains(&self, var: &ChcVar) -> bool {
        self.values.contains_key(var)
    }

    pub fn remove(&mut self, var: &ChcVar) -> Option<Value> {
        self.values.remove(var)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ChcVar, &Value)> {
        self.values.iter()
    }

    /// Numeric value of a variable (zero when unassigned)
    pub fn numeric(&self, var: &ChcVar) -> BigRational {
        match self.values.get(var) {
            Some(Value::Num(n)) => n.clone(),
            _ => BigRational::zero(),
        }
    }

    /// Boolean value of a variable (false when unassigned)
    pub fn boolean(&self, var: &ChcVar) -> bool {
        matches!(self.values.get(var), Some(Value::Bool(true)))
    }

    /// Value of a variable, defaulted by sort
    pub fn value_of(&self, var: &ChcVar) -> Value {
        match var.sort {
            ChcSort::Bool => Value::Bool(self.boolean(var)),
            _ => Value::Num(self.numeric(var)),
        }
    }

    pub fn eval_bool(&self, e: &ChcExpr) -> ExprResult<bool> {
        let v = self.eval(e)?;
        v.as_bool().ok_or_else(|| sort_error(e, "Bool", &v))
    }

    pub fn eval_num(&self, e: &ChcExpr) -> ExprResult<BigRational> {
        match self.eval(e)? {
            Value::Num(n) => Ok(n),
            v => Err(sort_error(e, "number", &v)),
        }
    }

    /// Does the model satisfy the formula
    pub fn satisfies(&self, e: &ChcExpr) -> ExprResult<bool> {
        self.eval_bool(e)
    }

    pub fn eval(&self, e: &ChcExpr) -> ExprResult<Value> {
        match e {
            ChcExpr::Bool(b) => Ok(Value::Bool(*b)),
            ChcExpr::Int(n) => Ok(Value::Num(BigRational::from_integer(n.clone()))),
            ChcExpr::Real(r) => Ok(Value::Num(r.clone())),
            ChcExpr::Var(v) => Ok(self.value_of(v)),
            ChcExpr::Op(op, args) => self.eval_op(e, *op, args),
        }
    }

    fn eval_op(
        &self,
        e: &ChcExpr,
        op: ChcOp,
        args: &[std::sync::Arc<ChcExpr>],
    ) -> ExprResult<Value> {
        let arity_error = || ExprError::NotAnAtom(e.to_string());
        match op {
            ChcOp::Not => {
                let a = args.first().ok_or_else(arity_error)?;
                Ok(Value::Bool(!self.eval_bool(a)?))
            }
            ChcOp::And => {
                for a in args {
                    if !self.eval_bool(a)? {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }
            ChcOp::Or => {
                for a in args {
                    if self.eval_bool(a)? {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
            ChcOp::Implies => {
                let [a, b] = args else {
                    return Err(arity_error());
                };
                Ok(Value::Bool(!self.eval_bool(a)? || self.eval_bool(b)?))
            }
            ChcOp::Iff | ChcOp::Eq | ChcOp::Ne => {
                let [a, b] = args else {
                    return Err(arity_error());
                };
                let same = self.eval(a)? == self.eval(b)?;
                Ok(Value::Bool(if op == ChcOp::Ne { !same } else { same }))
            }
            ChcOp::Lt | ChcOp::Le | ChcOp::Gt | ChcOp::Ge => {
                let [a, b] = args else {
                    return Err(arity_error());
                };
                let (a, b) = (self.eval_num(a)?, self.eval_num(b)?);
                Ok(Value::Bool(match op {
                    ChcOp::Lt => a < b,
                    ChcOp::Le => a <= b,
                    ChcOp::Gt => a > b,
                    _ => a >= b,
                }))
            }
            ChcOp::Add => {
                let mut sum = BigRational::zero();
                for a in args {
                    sum += self.eval_num(a)?;
                }
                Ok(Value::Num(sum))
            }
            ChcOp::Sub => {
                let (first, rest) = args.split_first().ok_or_else(arity_error)?;
                let mut diff = self.eval_num(first)?;
                if rest.is_empty() {
                    return Ok(Value::Num(-diff));
                }
                for a in rest {
                    diff -= self.eval_num(a)?;
                }
                Ok(Value::Num(diff))
            }
            ChcOp::Mul => {
                let mut prod = BigRational::from_integer(1.into());
                for a in args {
                    prod *= self.eval_num(a)?;
                }
                Ok(Value::Num(prod))
            }
            ChcOp::Neg => {
                let a = args.first().ok_or_else(arity_error)?;
                Ok(Value::Num(-self.eval_num(a)?))
            }
            ChcOp::Div => {
                let [a, b] = args else {
                    return Err(arity_error());
                };
                let (a, b) = (self.eval_num(a)?, self.eval_num(b)?);
                // SMT-LIB total semantics: division by zero yields zero
                if b.is_zero() {
                    return Ok(Value::Num(BigRational::zero()));
                }
                Ok(Value::Num(a / b))
            }
            ChcOp::Mod => {
                let [a, b] = args else {
                    return Err(arity_error());
                };
                let (a, b) = (self.eval_num(a)?, self.eval_num(b)?);
                Ok(Value::Num(floor_mod(&a, &b)))
            }
            ChcOp::Ite => {
                let [c, t, f] = args else {
                    return Err(arity_error());
                };
                if self.eval_bool(c)? {
                    self.eval(t)
                } else {
                    self.eval(f)
                }
            }
        }
    }
}

/// Non-negative remainder of `a` modulo `|b|`; `a` itself when `b` is zero
pub fn floor_mod(a: &BigRational, b: &BigRational) -> BigRational {
    if b.is_zero() {
        return a.clone();
    }
    let m = b.abs();
    a - &m * (a / &m).floor()
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<_> = self.values.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        write!(f, "{{")?;
        for (i, (var, value)) in entries.into_iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{var} = {value}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    fn num(n: i64) -> Value {
        Value::Num(BigRational::from_integer(BigInt::from(n)))
    }

    #[test]
    fn evaluates_linear_comparisons() {
        let x = ChcVar::int("x");
        let mut m = Model::new();
        m.assign(x.clone(), num(4));
        let e = ChcExpr::and(
            ChcExpr::le(ChcExpr::var(x.clone()), ChcExpr::int(4)),
            ChcExpr::gt(
                ChcExpr::mul(ChcExpr::int(2), ChcExpr::var(x.clone())),
                ChcExpr::int(7),
            ),
        );
        assert!(m.satisfies(&e).unwrap());
        assert!(!m.satisfies(&ChcExpr::ne(ChcExpr::var(x), ChcExpr::int(4))).unwrap());
    }

    #[test]
    fn unassigned_variables_take_defaults() {
        let m = Model::new();
        let b = ChcVar::boolean("b");
        let y = ChcVar::int("y");
        assert!(!m.satisfies(&ChcExpr::var(b)).unwrap());
        assert!(m
            .satisfies(&ChcExpr::eq(ChcExpr::var(y), ChcExpr::int(0)))
            .unwrap());
    }

    #[test]
    fn modulo_is_non_negative() {
        let x = ChcVar::int("x");
        let mut m = Model::new();
        m.assign(x.clone(), num(-7));
        let e = ChcExpr::mod_op(ChcExpr::var(x), ChcExpr::int(3));
        assert_eq!(m.eval(&e).unwrap(), num(2));
    }

    #[test]
    fn sort_errors_are_reported() {
        let m = Model::new();
        let bad = ChcExpr::add(ChcExpr::Bool(true), ChcExpr::int(1));
        assert!(matches!(m.eval(&bad), Err(ExprError::SortMismatch { .. })));
    }
}
