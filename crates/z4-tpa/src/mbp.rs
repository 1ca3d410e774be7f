//! Model-based projection
//!
//! Given a formula `φ`, a model `M ⊨ φ` and variables `xs`, `project`
//! returns a formula over the remaining variables that holds in `M` and
//! implies `∃xs. φ`. Since only finitely many results exist for a fixed `φ`
//! and `xs`, enumerating projections under fresh models computes the exact
//! quantifier elimination (see [`crate::qe`]).
//!
//! The projection works on the implicant of `φ` selected by `M`:
//!
//! - Boolean variables are replaced by their model values
//! - For reals, variables are eliminated by Loos–Weispfenning virtual
//!   substitution of the greatest lower bound under `M`
//! - For integers, the model-guided rules of Bjørner and Janota are used:
//!   divisibility constraints are resolved first, then equalities, then the
//!   lower/upper bound resolution with divisibility side conditions
//!
//! `mod t c` terms are replaced by their model value `r` together with the
//! divisibility constraint `c | t - r`.

use crate::{ChcError, ChcResult};
use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;
use z4_expr::{
    floor_mod, simplify, to_nnf, ChcExpr, ChcOp, ChcSort, ChcVar, LinearConstraint, LinearTerm,
    Model, Relation, Theory, Value,
};

/// A literal of an implicant
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Literal {
    pub atom: ChcExpr,
    pub positive: bool,
}

impl Literal {
    pub fn to_expr(&self) -> ChcExpr {
        if self.positive {
            self.atom.clone()
        } else {
            ChcExpr::not(self.atom.clone())
        }
    }
}

/// `divisor | term`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Divisibility {
    divisor: BigInt,
    term: LinearTerm,
}

impl Divisibility {
    fn to_expr(&self) -> ChcExpr {
        ChcExpr::eq(
            ChcExpr::mod_op(
                self.term.to_expr(ChcSort::Int),
                ChcExpr::int_big(self.divisor.clone()),
            ),
            ChcExpr::int(0),
        )
    }

    fn holds_for_constant(&self) -> bool {
        let value = self.term.constant_part();
        value.is_integer() && value.to_integer().is_multiple_of(&self.divisor)
    }
}

/// Model-based projection for one arithmetic theory
#[derive(Debug, Clone, Copy)]
pub struct Mbp {
    theory: Theory,
}

impl Mbp {
    pub fn new(theory: Theory) -> Self {
        Self { theory }
    }

    pub fn theory(&self) -> Theory {
        self.theory
    }

    /// Project `vars` out of `formula` under `model`
    pub fn project(
        &self,
        formula: &ChcExpr,
        vars: &[ChcVar],
        model: &Model,
    ) -> ChcResult<ChcExpr> {
        let present = formula.var_set();
        let mut bool_subst = Vec::new();
        let mut arith = Vec::new();
        for v in vars.iter().filter(|v| present.contains(*v)) {
            match v.sort {
                ChcSort::Bool => bool_subst.push((v.clone(), ChcExpr::Bool(model.boolean(v)))),
                sort if sort == self.theory.sort() => arith.push(v.clone()),
                sort => {
                    return Err(ChcError::UnsupportedTheory(format!(
                        "cannot project {sort} variable {v} under {}",
                        self.theory
                    )))
                }
            }
        }
        let formula = if bool_subst.is_empty() {
            formula.clone()
        } else {
            simplify(&formula.substitute(&bool_subst))
        };
        if arith.is_empty() {
            return Ok(formula);
        }

        let implicant = self.implicant(&formula, model)?;
        let mut projection = Projection::new(self.theory, model.clone(), &arith);
        for literal in &implicant {
            projection.add_literal(literal)?;
        }
        for v in &arith {
            match self.theory {
                Theory::Real => projection.eliminate_real(v)?,
                Theory::Integer => projection.eliminate_int(v)?,
            }
        }
        let result = simplify(&projection.into_formula());
        trace!(eliminated = arith.len(), %result, "projection");
        Ok(result)
    }

    /// Project out every variable of `formula` except `keep`
    pub fn keep_only(
        &self,
        formula: &ChcExpr,
        keep: &[ChcVar],
        model: &Model,
    ) -> ChcResult<ChcExpr> {
        let keep: FxHashSet<&ChcVar> = keep.iter().collect();
        let eliminate: Vec<ChcVar> = formula
            .vars()
            .into_iter()
            .filter(|v| !keep.contains(v))
            .collect();
        self.project(formula, &eliminate, model)
    }

    /// Literals of `formula` that the model selects
    ///
    /// The conjunction of the result holds in the model and implies the
    /// formula.
    pub fn implicant(&self, formula: &ChcExpr, model: &Model) -> ChcResult<Vec<Literal>> {
        let nnf = to_nnf(formula);
        let mut literals = Vec::new();
        collect_implicant(&nnf, model, &mut literals)?;
        let mut seen = FxHashSet::default();
        literals.retain(|l| seen.insert(l.clone()));
        Ok(literals)
    }
}

fn collect_implicant(e: &ChcExpr, model: &Model, out: &mut Vec<Literal>) -> ChcResult<()> {
    match e {
        ChcExpr::Bool(true) => Ok(()),
        ChcExpr::Bool(false) => Err(ChcError::Internal(
            "model does not satisfy the projected formula".to_string(),
        )),
        ChcExpr::Op(ChcOp::And, args) => {
            for a in args {
                collect_implicant(a, model, out)?;
            }
            Ok(())
        }
        ChcExpr::Op(ChcOp::Or, args) => {
            for a in args {
                if model.satisfies(a)? {
                    return collect_implicant(a, model, out);
                }
            }
            Err(ChcError::Internal(format!(
                "model satisfies no disjunct of {e}"
            )))
        }
        ChcExpr::Op(ChcOp::Not, args) if args[0].is_atom() => {
            out.push(Literal {
                atom: args[0].as_ref().clone(),
                positive: false,
            });
            Ok(())
        }
        e if e.is_atom() => {
            out.push(Literal {
                atom: e.clone(),
                positive: true,
            });
            Ok(())
        }
        other => Err(ChcError::NotNormalForm(other.to_string())),
    }
}

/// Working state of one projection
struct Projection {
    theory: Theory,
    model: Model,
    eliminated: FxHashSet<ChcVar>,
    /// Literals free of eliminated variables, kept verbatim
    opaque: Vec<ChcExpr>,
    constraints: Vec<LinearConstraint>,
    divisibility: Vec<Divisibility>,
    fresh: usize,
}

impl Projection {
    fn new(theory: Theory, model: Model, eliminated: &[ChcVar]) -> Self {
        Self {
            theory,
            model,
            eliminated: eliminated.iter().cloned().collect(),
            opaque: Vec::new(),
            constraints: Vec::new(),
            divisibility: Vec::new(),
            fresh: 0,
        }
    }

    fn add_literal(&mut self, literal: &Literal) -> ChcResult<()> {
        if !literal.atom.mentions_any(&self.eliminated) {
            self.opaque.push(literal.to_expr());
            return Ok(());
        }
        let atom = if literal.atom.contains_mod() {
            if !self.theory.is_integer() {
                return Err(ChcError::UnsupportedTheory(format!(
                    "mod over reals: {}",
                    literal.atom
                )));
            }
            self.purify_mod(&literal.atom)?
        } else {
            literal.atom.clone()
        };
        let ChcExpr::Op(op, args) = &atom else {
            return Err(ChcError::Internal(format!("not an arithmetic literal: {atom}")));
        };
        let comparison = |lhs: &ChcExpr, rhs: &ChcExpr| -> ChcResult<LinearConstraint> {
            Ok(LinearConstraint::eq(
                &LinearTerm::from_expr(lhs)?,
                &LinearTerm::from_expr(rhs)?,
            ))
        };
        let constraint = match (op, literal.positive) {
            (ChcOp::Ne, true) => self.disequality(comparison(&args[0], &args[1])?, &atom)?,
            (ChcOp::Eq, false) => self.disequality(comparison(&args[0], &args[1])?, &atom)?,
            (ChcOp::Ne, false) => comparison(&args[0], &args[1])?,
            (_, true) => LinearConstraint::from_atom(&atom)?,
            (_, false) => {
                let c = LinearConstraint::from_atom(&atom)?;
                let rel = if c.is_strict() {
                    Relation::Le
                } else {
                    Relation::Lt
                };
                LinearConstraint::new(c.term.negated(), rel)
            }
        };
        self.push_constraint(constraint);
        Ok(())
    }

    /// The side of `t != 0` the model is on
    fn disequality(&self, eq: LinearConstraint, atom: &ChcExpr) -> ChcResult<LinearConstraint> {
        let value = eq.term.eval(&self.model);
        if value.is_negative() {
            Ok(LinearConstraint::new(eq.term, Relation::Lt))
        } else if value.is_positive() {
            Ok(LinearConstraint::new(eq.term.negated(), Relation::Lt))
        } else {
            Err(ChcError::Internal(format!(
                "model violates disequality {atom}"
            )))
        }
    }

    fn push_constraint(&mut self, constraint: LinearConstraint) {
        let constraint = if self.theory.is_integer() {
            constraint.tighten_integer()
        } else {
            constraint
        };
        if constraint.constant_truth() != Some(true) {
            self.constraints.push(constraint);
        }
    }

    /// Replace `mod t c` by its model value `r`, recording `c | t - r`
    fn purify_mod(&mut self, e: &ChcExpr) -> ChcResult<ChcExpr> {
        let ChcExpr::Op(op, args) = e else {
            return Ok(e.clone());
        };
        let args = args
            .iter()
            .map(|a| self.purify_mod(a))
            .collect::<ChcResult<Vec<_>>>()?;
        if *op != ChcOp::Mod {
            return Ok(ChcExpr::Op(
                *op,
                args.into_iter().map(std::sync::Arc::new).collect(),
            ));
        }
        let divisor = args[1]
            .as_numeral()
            .filter(|d| d.is_integer() && d.is_positive())
            .ok_or_else(|| ChcError::UnsupportedTheory(format!("mod by non-constant: {e}")))?;
        let dividend = LinearTerm::from_expr(&args[0])?;
        let remainder = floor_mod(&dividend.eval(&self.model), &divisor);
        self.divisibility.push(Divisibility {
            divisor: divisor.to_integer(),
            term: dividend.add_constant(&-remainder.clone()),
        });
        Ok(ChcExpr::numeral(remainder, ChcSort::Int))
    }

    fn value(&self, term: &LinearTerm) -> BigRational {
        term.eval(&self.model)
    }

    fn eliminate_real(&mut self, x: &ChcVar) -> ChcResult<()> {
        if let Some(pos) = self
            .constraints
            .iter()
            .position(|c| c.rel == Relation::Eq && c.term.contains(x))
        {
            let eq = self.constraints.remove(pos);
            let a = eq.term.coeff(x);
            let replacement = eq.term.without(x).scaled(&-a.recip());
            for c in &mut self.constraints {
                c.term = c.term.substitute(x, &replacement);
            }
            self.constraints.retain(|c| c.constant_truth() != Some(true));
            return Ok(());
        }

        let (with, without): (Vec<_>, Vec<_>) = std::mem::take(&mut self.constraints)
            .into_iter()
            .partition(|c| c.term.contains(x));
        self.constraints = without;
        // x >= bound (lower) or x <= bound (upper), strictness in the flag
        let mut lowers = Vec::new();
        let mut uppers = Vec::new();
        for c in with {
            let a = c.term.coeff(x);
            let bound = c.term.without(x).scaled(&-a.recip());
            if a.is_negative() {
                lowers.push((bound, c.is_strict()));
            } else {
                uppers.push((bound, c.is_strict()));
            }
        }
        if lowers.is_empty() || uppers.is_empty() {
            return Ok(());
        }
        let mut glb = 0;
        for (i, (bound, strict)) in lowers.iter().enumerate().skip(1) {
            let (best, best_strict) = &lowers[glb];
            let (value, best_value) = (self.value(bound), self.value(best));
            if value > best_value || (value == best_value && *strict && !best_strict) {
                glb = i;
            }
        }
        let (glb_bound, glb_strict) = lowers[glb].clone();
        for (i, (bound, strict)) in lowers.iter().enumerate() {
            if i == glb {
                continue;
            }
            let rel = if *strict && !glb_strict {
                Relation::Lt
            } else {
                Relation::Le
            };
            self.push_constraint(LinearConstraint::new(bound.minus(&glb_bound), rel));
        }
        for (bound, strict) in &uppers {
            let rel = if *strict || glb_strict {
                Relation::Lt
            } else {
                Relation::Le
            };
            self.push_constraint(LinearConstraint::new(glb_bound.minus(bound), rel));
        }
        Ok(())
    }

    fn eliminate_int(&mut self, x: &ChcVar) -> ChcResult<()> {
        let x = if self.divisibility.iter().any(|d| d.term.contains(x)) {
            self.resolve_divisibility(x)
        } else {
            x.clone()
        };
        let x = &x;

        if let Some(pos) = self
            .constraints
            .iter()
            .position(|c| c.rel == Relation::Eq && c.term.contains(x))
        {
            let eq = self.constraints.remove(pos);
            let mut a = eq.term.coeff(x);
            let mut eq_term = eq.term;
            if a.is_negative() {
                a = -a;
                eq_term = eq_term.negated();
            }
            // a*x + r = 0
            let rest = eq_term.without(x);
            for c in std::mem::take(&mut self.constraints) {
                if !c.term.contains(x) {
                    self.constraints.push(c);
                    continue;
                }
                let b = c.term.coeff(x);
                let term = c.term.scaled(&a).minus(&eq_term.scaled(&b));
                self.push_constraint(LinearConstraint::new(term, c.rel));
            }
            if !a.is_one() {
                self.divisibility.push(Divisibility {
                    divisor: a.to_integer(),
                    term: rest,
                });
            }
            return Ok(());
        }

        let (with, without): (Vec<_>, Vec<_>) = std::mem::take(&mut self.constraints)
            .into_iter()
            .partition(|c| c.term.contains(x));
        self.constraints = without;
        // lower: b*x >= s, upper: a*x <= t
        let mut lowers: Vec<(BigRational, LinearTerm)> = Vec::new();
        let mut uppers: Vec<(BigRational, LinearTerm)> = Vec::new();
        for c in with {
            let coeff = c.term.coeff(x);
            let rest = c.term.without(x);
            if coeff.is_negative() {
                lowers.push((-coeff, rest));
            } else {
                uppers.push((coeff, rest.negated()));
            }
        }
        if lowers.is_empty() || uppers.is_empty() {
            return Ok(());
        }
        let mut glb = 0;
        for (i, (b, s)) in lowers.iter().enumerate().skip(1) {
            let (best_b, best_s) = &lowers[glb];
            if self.value(s) / b > self.value(best_s) / best_b {
                glb = i;
            }
        }
        let (b, s) = lowers[glb].clone();
        for (i, (b2, s2)) in lowers.iter().enumerate() {
            if i != glb {
                // s2/b2 <= s/b
                self.push_constraint(LinearConstraint::new(
                    s2.scaled(&b).minus(&s.scaled(b2)),
                    Relation::Le,
                ));
            }
        }
        for (a, t) in &uppers {
            self.resolve_bounds((&b, &s), (a, t));
        }
        Ok(())
    }

    /// Resolve the greatest lower bound `b*x >= s` with an upper bound
    /// `a*x <= t`
    fn resolve_bounds(&mut self, (b, s): (&BigRational, &LinearTerm), (a, t): (&BigRational, &LinearTerm)) {
        let one = BigRational::one();
        let d = (a - &one) * (b - &one);
        let (ms, mt) = (self.value(s), self.value(t));
        let as_ = s.scaled(a);
        let bt = t.scaled(b);
        if b * &mt - a * &ms >= d {
            // a*s + d <= b*t
            self.push_constraint(LinearConstraint::new(
                as_.add_constant(&d).minus(&bt),
                Relation::Le,
            ));
            return;
        }
        self.push_constraint(LinearConstraint::new(as_.minus(&bt), Relation::Le));
        if a >= b {
            let e = floor_mod(&-ms, b);
            if !e.is_zero() {
                let shifted = s.add_constant(&e);
                self.push_constraint(LinearConstraint::new(
                    shifted.scaled(a).minus(&bt),
                    Relation::Le,
                ));
                self.push_divisibility(b, shifted);
            } else {
                self.push_divisibility(b, s.clone());
            }
        } else {
            let e = floor_mod(&mt, a);
            if !e.is_zero() {
                let shifted = t.add_constant(&-e);
                self.push_constraint(LinearConstraint::new(
                    as_.minus(&shifted.scaled(b)),
                    Relation::Le,
                ));
                self.push_divisibility(a, shifted);
            } else {
                self.push_divisibility(a, t.clone());
            }
        }
    }

    fn push_divisibility(&mut self, divisor: &BigRational, term: LinearTerm) {
        if !divisor.is_one() {
            self.divisibility.push(Divisibility {
                divisor: divisor.to_integer(),
                term,
            });
        }
    }

    /// Fix `x` modulo the divisors it occurs under
    ///
    /// With `d` the lcm of those divisors and `u = M(x) mod d`, divisibility
    /// constraints get `x := u` and all other constraints `x := u + d*x'` for
    /// a fresh `x'`, which is returned and eliminated in place of `x`.
    fn resolve_divisibility(&mut self, x: &ChcVar) -> ChcVar {
        let d = self
            .divisibility
            .iter()
            .filter(|div| div.term.contains(x))
            .fold(BigInt::one(), |acc, div| acc.lcm(&div.divisor));
        let d = BigRational::from_integer(d);
        let mx = self.model.numeric(x);
        let u = floor_mod(&mx, &d);

        let constant = LinearTerm::constant(u.clone());
        for div in &mut self.divisibility {
            div.term = div.term.substitute(x, &constant);
        }
        self.divisibility.retain(|div| !div.term.is_constant());

        let fresh = ChcVar::new(format!("mbp!{}", self.fresh), x.sort);
        self.fresh += 1;
        self.model
            .assign(fresh.clone(), Value::Num((&mx - &u) / &d));
        let replacement = LinearTerm::monomial(fresh.clone(), d).add_constant(&u);
        for c in &mut self.constraints {
            c.term = c.term.substitute(x, &replacement);
        }
        fresh
    }

    fn into_formula(self) -> ChcExpr {
        let sort = self.theory.sort();
        let mut parts = self.opaque;
        parts.extend(
            strongest_bounds(self.constraints)
                .iter()
                .map(|c| c.to_expr(sort)),
        );
        let mut seen = FxHashSet::default();
        for div in self.divisibility {
            if div.term.is_constant() {
                if !div.holds_for_constant() {
                    parts.push(ChcExpr::Bool(false));
                }
                continue;
            }
            if seen.insert(div.clone()) {
                parts.push(div.to_expr());
            }
        }
        ChcExpr::and_all(parts)
    }
}

/// Keep only the tightest bound per linear form
fn strongest_bounds(constraints: Vec<LinearConstraint>) -> Vec<LinearConstraint> {
    let mut result: Vec<LinearConstraint> = Vec::new();
    let mut index: FxHashMap<(LinearTerm, bool), usize> = FxHashMap::default();
    for c in constraints {
        let c = c.normalized();
        if c.constant_truth() == Some(true) {
            continue;
        }
        let key = (c.term.without_constant(), c.rel == Relation::Eq);
        match index.get(&key) {
            Some(&i) if c.rel != Relation::Eq => {
                let current = &result[i];
                let (new_k, old_k) = (c.term.constant_part(), current.term.constant_part());
                if new_k > old_k || (new_k == old_k && c.is_strict()) {
                    result[i] = c;
                }
            }
            Some(&i) if result[i] == c => {}
            _ => {
                index.insert(key, result.len());
                result.push(c);
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use z4_arith::{check_sat, implies, SmtResult};

    fn int(name: &str) -> ChcVar {
        ChcVar::int(name)
    }

    fn v(var: &ChcVar) -> ChcExpr {
        ChcExpr::var(var.clone())
    }

    fn model(values: &[(&ChcVar, i64)]) -> Model {
        let mut m = Model::new();
        for (var, value) in values {
            m.assign((*var).clone(), Value::Num(BigRational::from_integer((*value).into())));
        }
        m
    }

    #[test]
    fn real_projection_uses_greatest_lower_bound() {
        let (x, y, z) = (ChcVar::real("x"), ChcVar::real("y"), ChcVar::real("z"));
        // y <= x <= z
        let f = ChcExpr::and_all([
            ChcExpr::le(v(&y), v(&x)),
            ChcExpr::le(v(&x), v(&z)),
        ]);
        let mut m = Model::new();
        for (var, value) in [(&x, 1), (&y, 0), (&z, 2)] {
            m.assign(var.clone(), Value::Num(BigRational::from_integer(value.into())));
        }
        let result = Mbp::new(Theory::Real).project(&f, &[x], &m).unwrap();
        assert!(!result.contains_var(&ChcVar::real("x")));
        assert!(m.satisfies(&result).unwrap());
        assert!(implies(Theory::Real, &result, &ChcExpr::le(v(&y), v(&z))).unwrap());
        assert!(implies(Theory::Real, &ChcExpr::le(v(&y), v(&z)), &result).unwrap());
    }

    #[test]
    fn integer_equality_with_coefficient_yields_divisibility() {
        let (x, y) = (int("x"), int("y"));
        // 2x = y
        let f = ChcExpr::eq(ChcExpr::mul(ChcExpr::int(2), v(&x)), v(&y));
        let m = model(&[(&x, 3), (&y, 6)]);
        let result = Mbp::new(Theory::Integer).project(&f, &[x], &m).unwrap();
        assert!(m.satisfies(&result).unwrap());
        let odd = model(&[(&y, 5)]);
        assert!(!odd.satisfies(&result).unwrap());
    }

    #[test]
    fn integer_bounds_are_resolved() {
        let (x, y, z) = (int("x"), int("y"), int("z"));
        // y <= 2x <= z
        let f = ChcExpr::and(
            ChcExpr::le(v(&y), ChcExpr::mul(ChcExpr::int(2), v(&x))),
            ChcExpr::le(ChcExpr::mul(ChcExpr::int(2), v(&x)), v(&z)),
        );
        let m = model(&[(&x, 2), (&y, 3), (&z, 4)]);
        let result = Mbp::new(Theory::Integer).project(&f, &[x.clone()], &m).unwrap();
        assert!(!result.contains_var(&x));
        assert!(m.satisfies(&result).unwrap());
        // y = z = 3 leaves no even number in between
        let blocked = ChcExpr::and_all([
            result,
            ChcExpr::eq(v(&y), ChcExpr::int(3)),
            ChcExpr::eq(v(&z), ChcExpr::int(3)),
        ]);
        assert_eq!(check_sat(Theory::Integer, &blocked).unwrap(), SmtResult::Unsat);
    }

    #[test]
    fn mod_terms_become_divisibility() {
        let (x, y) = (int("x"), int("y"));
        // (x mod 3) = 1 ∧ y = x + 1
        let f = ChcExpr::and(
            ChcExpr::eq(ChcExpr::mod_op(v(&x), ChcExpr::int(3)), ChcExpr::int(1)),
            ChcExpr::eq(v(&y), ChcExpr::add(v(&x), ChcExpr::int(1))),
        );
        let m = model(&[(&x, 4), (&y, 5)]);
        let result = Mbp::new(Theory::Integer).project(&f, &[x.clone()], &m).unwrap();
        assert!(!result.contains_var(&x));
        assert!(m.satisfies(&result).unwrap());
        let expected = ChcExpr::eq(ChcExpr::mod_op(v(&y), ChcExpr::int(3)), ChcExpr::int(2));
        assert!(implies(Theory::Integer, &result, &expected).unwrap());
    }

    #[test]
    fn booleans_take_model_values() {
        let (b, y) = (ChcVar::boolean("b"), int("y"));
        let f = ChcExpr::or(
            ChcExpr::and(v(&b), ChcExpr::ge(v(&y), ChcExpr::int(0))),
            ChcExpr::and(ChcExpr::not(v(&b)), ChcExpr::lt(v(&y), ChcExpr::int(0))),
        );
        let mut m = model(&[(&y, 3)]);
        m.assign(b.clone(), Value::Bool(true));
        let result = Mbp::new(Theory::Integer).project(&f, &[b], &m).unwrap();
        assert!(implies(Theory::Integer, &result, &ChcExpr::ge(v(&y), ChcExpr::int(0))).unwrap());
    }

    #[test]
    fn integer_variable_under_real_projection_is_rejected() {
        let x = int("x");
        let f = ChcExpr::ge(v(&x), ChcExpr::int(0));
        let result = Mbp::new(Theory::Real).project(&f, &[x], &Model::new());
        assert!(matches!(result, Err(ChcError::UnsupportedTheory(_))));
    }

    #[test]
    fn disequality_picks_the_model_side() {
        let (x, y) = (int("x"), int("y"));
        // x != y ∧ x = 0
        let f = ChcExpr::and(
            ChcExpr::ne(v(&x), v(&y)),
            ChcExpr::eq(v(&x), ChcExpr::int(0)),
        );
        let m = model(&[(&x, 0), (&y, 2)]);
        let result = Mbp::new(Theory::Integer).project(&f, &[x], &m).unwrap();
        assert!(m.satisfies(&result).unwrap());
        assert!(implies(Theory::Integer, &result, &ChcExpr::gt(v(&y), ChcExpr::int(0))).unwrap());
    }
}
