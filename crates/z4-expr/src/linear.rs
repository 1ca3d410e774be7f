//! Linear terms and constraints over exact rationals
//!
//! A [`LinearTerm`] is `c1*x1 + ... + cn*xn + c0` with rational coefficients.
//! A [`LinearConstraint`] is a linear term related to zero. Every arithmetic
//! atom the procedures in this workspace reason about is converted into this
//! form first.

use crate::{ChcExpr, ChcOp, ChcSort, ChcVar, ExprError, ExprResult, Model};
use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// `sum(coeff * var) + constant`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinearTerm {
    coeffs: BTreeMap<ChcVar, BigRational>,
    constant: BigRational,
}

impl LinearTerm {
    pub fn zero() -> Self {
        Self {
            coeffs: BTreeMap::new(),
            constant: BigRational::zero(),
        }
    }

    pub fn constant(c: BigRational) -> Self {
        Self {
            coeffs: BTreeMap::new(),
            constant: c,
        }
    }

    pub fn var(v: ChcVar) -> Self {
        Self::monomial(v, BigRational::one())
    }

    pub fn monomial(v: ChcVar, c: BigRational) -> Self {
        let mut t = Self::zero();
        t.add_monomial(&v, &c);
        t
    }

    pub fn coeffs(&self) -> &BTreeMap<ChcVar, BigRational> {
        &self.coeffs
    }

    pub fn constant_part(&self) -> &BigRational {
        &self.constant
    }

    /// Coefficient of `v` (zero if absent)
    pub fn coeff(&self, v: &ChcVar) -> BigRational {
        self.coeffs.get(v).cloned().unwrap_or_else(BigRational::zero)
    }

    pub fn contains(&self, v: &ChcVar) -> bool {
        self.coeffs.contains_key(v)
    }

    pub fn is_constant(&self) -> bool {
        self.coeffs.is_empty()
    }

    pub fn vars(&self) -> impl Iterator<Item = &ChcVar> {
        self.coeffs.keys()
    }

    /// Add `c * v` in place
    pub fn add_monomial(&mut self, v: &ChcVar, c: &BigRational) {
        if c.is_zero() {
            return;
        }
        let entry = self
            .coeffs
            .entry(v.clone())
            .or_insert_with(BigRational::zero);
        *entry += c;
        if entry.is_zero() {
            self.coeffs.remove(v);
        }
    }

    pub fn plus(&self, other: &LinearTerm) -> LinearTerm {
        let mut result = self.clone();
        for (v, c) in &other.coeffs {
            result.add_monomial(v, c);
        }
        result.constant += &other.constant;
        result
    }

    pub fn minus(&self, other: &LinearTerm) -> LinearTerm {
        self.plus(&other.negated())
    }

    pub fn scaled(&self, c: &BigRational) -> LinearTerm {
        if c.is_zero() {
            return LinearTerm::zero();
        }
        LinearTerm {
            coeffs: self
                .coeffs
                .iter()
                .map(|(v, k)| (v.clone(), k * c))
                .collect(),
            constant: &self.constant * c,
        }
    }

    pub fn negated(&self) -> LinearTerm {
        self.scaled(&-BigRational::one())
    }

    pub fn add_constant(&self, c: &BigRational) -> LinearTerm {
        let mut result = self.clone();
        result.constant += c;
        result
    }

    /// The term with the monomial of `v` removed
    pub fn without(&self, v: &ChcVar) -> LinearTerm {
        let mut result = self.clone();
        result.coeffs.remove(v);
        result
    }

    /// Replace `v` by `replacement`
    pub fn substitute(&self, v: &ChcVar, replacement: &LinearTerm) -> LinearTerm {
        match self.coeffs.get(v) {
            None => self.clone(),
            Some(c) => self.without(v).plus(&replacement.scaled(c)),
        }
    }

    /// Value under a model (unassigned variables count as zero)
    pub fn eval(&self, model: &Model) -> BigRational {
        let mut value = self.constant.clone();
        for (v, c) in &self.coeffs {
            value += c * model.numeric(v);
        }
        value
    }

    /// Least common multiple of all denominators, constant included
    pub fn denominator_lcm(&self) -> BigInt {
        self.coeffs
            .values()
            .chain(std::iter::once(&self.constant))
            .fold(BigInt::one(), |acc, c| acc.lcm(c.denom()))
    }

    /// Greatest common divisor of the variable coefficients' numerators
    pub fn coefficient_gcd(&self) -> BigInt {
        self.coeffs
            .values()
            .fold(BigInt::zero(), |acc, c| acc.gcd(c.numer()))
    }

    /// Scale by the positive factor that makes every coefficient integral
    pub fn integral(&self) -> LinearTerm {
        let l = self.denominator_lcm();
        if l.is_one() {
            return self.clone();
        }
        self.scaled(&BigRational::from_integer(l))
    }

    /// Convert an arithmetic expression
    pub fn from_expr(e: &ChcExpr) -> ExprResult<LinearTerm> {
        match e {
            ChcExpr::Int(n) => Ok(LinearTerm::constant(BigRational::from_integer(n.clone()))),
            ChcExpr::Real(r) => Ok(LinearTerm::constant(r.clone())),
            ChcExpr::Var(v) if v.sort.is_arithmetic() => Ok(LinearTerm::var(v.clone())),
            ChcExpr::Var(v) => Err(ExprError::SortMismatch {
                context: "linear term".to_string(),
                expected: "Int or Real".to_string(),
                actual: v.sort.to_string(),
            }),
            ChcExpr::Op(ChcOp::Add, args) => {
                let mut sum = LinearTerm::zero();
                for a in args {
                    sum = sum.plus(&LinearTerm::from_expr(a)?);
                }
                Ok(sum)
            }
            ChcExpr::Op(ChcOp::Sub, args) if !args.is_empty() => {
                let mut diff = LinearTerm::from_expr(&args[0])?;
                if args.len() == 1 {
                    return Ok(diff.negated());
                }
                for a in &args[1..] {
                    diff = diff.minus(&LinearTerm::from_expr(a)?);
                }
                Ok(diff)
            }
            ChcExpr::Op(ChcOp::Neg, args) if args.len() == 1 => {
                Ok(LinearTerm::from_expr(&args[0])?.negated())
            }
            ChcExpr::Op(ChcOp::Mul, args) => {
                let mut factor = BigRational::one();
                let mut symbolic: Option<LinearTerm> = None;
                for a in args {
                    let t = LinearTerm::from_expr(a)?;
                    if t.is_constant() {
                        factor *= t.constant;
                    } else if symbolic.is_none() {
                        symbolic = Some(t);
                    } else {
                        return Err(ExprError::NonLinear(e.to_string()));
                    }
                }
                Ok(match symbolic {
                    Some(t) => t.scaled(&factor),
                    None => LinearTerm::constant(factor),
                })
            }
            ChcExpr::Op(ChcOp::Div, args) if args.len() == 2 => {
                let divisor = LinearTerm::from_expr(&args[1])?;
                if !divisor.is_constant() || divisor.constant.is_zero() {
                    return Err(ExprError::NonConstantDivisor(e.to_string()));
                }
                Ok(LinearTerm::from_expr(&args[0])?.scaled(&divisor.constant.recip()))
            }
            _ => Err(ExprError::NonLinear(e.to_string())),
        }
    }

    /// Render as an expression of the given sort
    ///
    /// For `Int` the coefficients are expected to be integral.
    pub fn to_expr(&self, sort: ChcSort) -> ChcExpr {
        let mut parts = Vec::new();
        for (v, c) in &self.coeffs {
            if c.is_one() {
                parts.push(ChcExpr::var(v.clone()));
            } else {
                parts.push(ChcExpr::mul(
                    ChcExpr::numeral(c.clone(), sort),
                    ChcExpr::var(v.clone()),
                ));
            }
        }
        if !self.constant.is_zero() || parts.is_empty() {
            parts.push(ChcExpr::numeral(self.constant.clone(), sort));
        }
        if parts.len() == 1 {
            return parts.remove(0);
        }
        ChcExpr::Op(ChcOp::Add, parts.into_iter().map(Arc::new).collect())
    }
}

impl fmt::Display for LinearTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (v, c) in &self.coeffs {
            if !first {
                write!(f, " + ")?;
            }
            first = false;
            write!(f, "{c}*{v}")?;
        }
        if first || !self.constant.is_zero() {
            if !first {
                write!(f, " + ")?;
            }
            write!(f, "{}", self.constant)?;
        }
        Ok(())
    }
}

/// Relation of a linear term to zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Relation {
    /// `t <= 0`
    Le,
    /// `t < 0`
    Lt,
    /// `t = 0`
    Eq,
}

impl Relation {
    pub fn is_strict(self) -> bool {
        self == Relation::Lt
    }

    /// Does `value REL 0` hold
    pub fn holds(self, value: &BigRational) -> bool {
        match self {
            Relation::Le => !value.is_positive(),
            Relation::Lt => value.is_negative(),
            Relation::Eq => value.is_zero(),
        }
    }
}

/// `term REL 0`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinearConstraint {
    pub term: LinearTerm,
    pub rel: Relation,
}

impl LinearConstraint {
    pub fn new(term: LinearTerm, rel: Relation) -> Self {
        Self { term, rel }
    }

    /// `lhs <= rhs`
    pub fn le(lhs: &LinearTerm, rhs: &LinearTerm) -> Self {
        Self::new(lhs.minus(rhs), Relation::Le)
    }

    /// `lhs < rhs`
    pub fn lt(lhs: &LinearTerm, rhs: &LinearTerm) -> Self {
        Self::new(lhs.minus(rhs), Relation::Lt)
    }

    /// `lhs = rhs`
    pub fn eq(lhs: &LinearTerm, rhs: &LinearTerm) -> Self {
        Self::new(lhs.minus(rhs), Relation::Eq)
    }

    /// The constraint `false`
    pub fn falsum() -> Self {
        Self::new(LinearTerm::constant(BigRational::one()), Relation::Eq)
    }

    /// Convert an arithmetic comparison (`=`, `<`, `<=`, `>`, `>=`)
    ///
    /// Disequalities are rejected: they are not convex and callers split them.
    pub fn from_atom(atom: &ChcExpr) -> ExprResult<LinearConstraint> {
        let ChcExpr::Op(op, args) = atom else {
            return Err(ExprError::NotAnAtom(atom.to_string()));
        };
        if args.len() != 2 {
            return Err(ExprError::NotAnAtom(atom.to_string()));
        }
        let lhs = LinearTerm::from_expr(&args[0])?;
        let rhs = LinearTerm::from_expr(&args[1])?;
        let (term, rel) = match op {
            ChcOp::Le => (lhs.minus(&rhs), Relation::Le),
            ChcOp::Lt => (lhs.minus(&rhs), Relation::Lt),
            ChcOp::Ge => (rhs.minus(&lhs), Relation::Le),
            ChcOp::Gt => (rhs.minus(&lhs), Relation::Lt),
            ChcOp::Eq => (lhs.minus(&rhs), Relation::Eq),
            _ => return Err(ExprError::NotAnAtom(atom.to_string())),
        };
        Ok(LinearConstraint::new(term, rel))
    }

    pub fn is_strict(&self) -> bool {
        self.rel.is_strict()
    }

    pub fn holds(&self, model: &Model) -> bool {
        self.rel.holds(&self.term.eval(model))
    }

    /// Truth value when no variable is left
    pub fn constant_truth(&self) -> Option<bool> {
        if self.term.is_constant() {
            Some(self.rel.holds(self.term.constant_part()))
        } else {
            None
        }
    }

    /// Strongest equivalent constraint under integer semantics
    ///
    /// Coefficients become coprime integers, strict inequalities become
    /// non-strict and the constant is rounded towards the feasible side. An
    /// equality whose coefficients' gcd does not divide the constant becomes
    /// [`LinearConstraint::falsum`].
    pub fn tighten_integer(&self) -> LinearConstraint {
        let mut term = self.term.integral();
        let mut rel = self.rel;
        if rel == Relation::Lt {
            term = term.add_constant(&BigRational::one());
            rel = Relation::Le;
        }
        let g = term.coefficient_gcd();
        if g.is_zero() {
            return LinearConstraint::new(term, rel);
        }
        let g = BigRational::from_integer(g);
        let constant = term.constant_part() / &g;
        let mut divided = term.without_constant().scaled(&g.recip());
        match rel {
            Relation::Eq if !constant.is_integer() => LinearConstraint::falsum(),
            Relation::Eq => {
                divided = divided.add_constant(&constant);
                LinearConstraint::new(divided, rel)
            }
            _ => {
                divided = divided.add_constant(&constant.ceil());
                LinearConstraint::new(divided, rel)
            }
        }
    }

    /// Scale so that the first coefficient is `1` (equalities) or `±1`
    /// (inequalities)
    pub fn normalized(&self) -> LinearConstraint {
        let Some(lead) = self.term.coeffs().values().next() else {
            return self.clone();
        };
        let factor = match self.rel {
            Relation::Eq => lead.recip(),
            _ => lead.abs().recip(),
        };
        LinearConstraint::new(self.term.scaled(&factor), self.rel)
    }

    /// Render as a canonical atom: variables on the left, constant on the
    /// right, leading coefficient positive
    pub fn to_expr(&self, sort: ChcSort) -> ChcExpr {
        if let Some(truth) = self.constant_truth() {
            return ChcExpr::Bool(truth);
        }
        let term = if sort == ChcSort::Int {
            self.term.integral()
        } else {
            self.term.clone()
        };
        let flip = term
            .coeffs()
            .values()
            .next()
            .is_some_and(|c| c.is_negative());
        let term = if flip { term.negated() } else { term };
        let rhs = ChcExpr::numeral(-term.constant_part().clone(), sort);
        let lhs = term.without_constant().to_expr(sort);
        match (self.rel, flip) {
            (Relation::Eq, _) => ChcExpr::eq(lhs, rhs),
            (Relation::Le, false) => ChcExpr::le(lhs, rhs),
            (Relation::Le, true) => ChcExpr::ge(lhs, rhs),
            (Relation::Lt, false) => ChcExpr::lt(lhs, rhs),
            (Relation::Lt, true) => ChcExpr::gt(lhs, rhs),
        }
    }
}

impl LinearTerm {
    /// The term with its constant set to zero
    pub fn without_constant(&self) -> LinearTerm {
        LinearTerm {
            coeffs: self.coeffs.clone(),
            constant: BigRational::zero(),
        }
    }
}

impl fmt::Display for LinearConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rel = match self.rel {
            Relation::Le => "<=",
            Relation::Lt => "<",
            Relation::Eq => "=",
        };
        write!(f, "{} {rel} 0", self.term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(n: i64) -> BigRational {
        BigRational::from_integer(BigInt::from(n))
    }

    fn x() -> ChcVar {
        ChcVar::int("x")
    }

    fn y() -> ChcVar {
        ChcVar::int("y")
    }

    #[test]
    fn converts_nested_arithmetic() {
        // 2*(x - y) + 3 - (-x)
        let e = ChcExpr::sub(
            ChcExpr::add(
                ChcExpr::mul(
                    ChcExpr::int(2),
                    ChcExpr::sub(ChcExpr::var(x()), ChcExpr::var(y())),
                ),
                ChcExpr::int(3),
            ),
            ChcExpr::neg(ChcExpr::var(x())),
        );
        let t = LinearTerm::from_expr(&e).unwrap();
        assert_eq!(t.coeff(&x()), q(3));
        assert_eq!(t.coeff(&y()), q(-2));
        assert_eq!(t.constant_part(), &q(3));
    }

    #[test]
    fn rejects_products_of_variables() {
        let e = ChcExpr::mul(ChcExpr::var(x()), ChcExpr::var(y()));
        assert!(matches!(
            LinearTerm::from_expr(&e),
            Err(ExprError::NonLinear(_))
        ));
    }

    #[test]
    fn cancelling_monomials_disappear() {
        let t = LinearTerm::var(x()).minus(&LinearTerm::var(x()));
        assert!(t.is_constant());
    }

    #[test]
    fn integer_tightening() {
        // 2x < 3  ~>  x <= 1
        let c = LinearConstraint::lt(
            &LinearTerm::monomial(x(), q(2)),
            &LinearTerm::constant(q(3)),
        );
        let t = c.tighten_integer();
        assert_eq!(t.rel, Relation::Le);
        assert_eq!(t.term.coeff(&x()), q(1));
        assert_eq!(t.term.constant_part(), &q(-1));

        // 2x = 3 has no integer solution
        let e = LinearConstraint::eq(
            &LinearTerm::monomial(x(), q(2)),
            &LinearTerm::constant(q(3)),
        );
        assert_eq!(e.tighten_integer().constant_truth(), Some(false));
    }

    #[test]
    fn canonical_atom_has_positive_leading_coefficient() {
        // -x + 3 <= 0  ~>  x >= 3
        let c = LinearConstraint::new(
            LinearTerm::monomial(x(), q(-1)).add_constant(&q(3)),
            Relation::Le,
        );
        assert_eq!(
            c.to_expr(ChcSort::Int),
            ChcExpr::ge(ChcExpr::var(x()), ChcExpr::int(3))
        );
    }

    #[test]
    fn from_atom_orients_every_comparison() {
        let ge = ChcExpr::ge(ChcExpr::var(x()), ChcExpr::int(1));
        let c = LinearConstraint::from_atom(&ge).unwrap();
        assert_eq!(c.rel, Relation::Le);
        assert_eq!(c.term.coeff(&x()), q(-1));
        let ne = ChcExpr::ne(ChcExpr::var(x()), ChcExpr::int(1));
        assert!(LinearConstraint::from_atom(&ne).is_err());
    }
}
