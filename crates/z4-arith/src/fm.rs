//! Fourier-Motzkin elimination with Farkas certificates
//!
//! Decides conjunctions of linear constraints over the rationals. Every row
//! carries the vector of multipliers that derives it from the input rows, so
//! a contradiction comes with a certificate: non-negative multipliers for the
//! inequalities (arbitrary ones for the equalities) whose combination is a
//! constant row that does not hold. Satisfiable systems are answered with a
//! model rebuilt by back-substitution through the eliminated variables.
//!
//! Over the integers the procedure is strengthened with tightening of
//! derived rows, which keeps parity and divisibility facts that plain
//! elimination would lose.

use crate::theory::Side;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};
use z4_expr::{ChcVar, LinearConstraint, LinearTerm, Relation};

/// Answer of [`fourier_motzkin`]
#[derive(Debug, Clone)]
pub(crate) enum FmOutcome {
    /// Satisfying rational assignment for every variable of the input
    Sat(BTreeMap<ChcVar, BigRational>),
    Unsat(Refutation),
}

/// Farkas certificate over the inputs extended with derived constraints
///
/// `multipliers[i]` belongs to input `i` for `i < inputs.len()` and to
/// `derived[i - inputs.len()]` otherwise. Derived constraints are integer
/// tightenings of rows supported by a single side; they are implied by that
/// side alone.
#[derive(Debug, Clone)]
pub(crate) struct Refutation {
    pub multipliers: Vec<BigRational>,
    pub derived: Vec<(LinearConstraint, Side)>,
}

#[derive(Debug, Clone)]
struct Row {
    term: LinearTerm,
    rel: Relation,
    /// Sparse towards the end: missing entries are zero
    cert: Vec<BigRational>,
}

enum Step {
    /// `var = definition` over variables eliminated later
    Equality { var: ChcVar, definition: LinearTerm },
    /// Rows that bounded `var` when it was eliminated
    Bounds { var: ChcVar, rows: Vec<Row> },
}

fn unit(len: usize, index: usize) -> Vec<BigRational> {
    let mut cert = vec![BigRational::zero(); len];
    cert[index] = BigRational::one();
    cert
}

fn add_scaled(target: &mut Vec<BigRational>, source: &[BigRational], factor: &BigRational) {
    if target.len() < source.len() {
        target.resize(source.len(), BigRational::zero());
    }
    for (t, s) in target.iter_mut().zip(source) {
        if !s.is_zero() {
            *t += s * factor;
        }
    }
}

fn combine(a: &[BigRational], fa: &BigRational, b: &[BigRational], fb: &BigRational) -> Vec<BigRational> {
    let mut out: Vec<BigRational> = a.iter().map(|x| x * fa).collect();
    add_scaled(&mut out, b, fb);
    out
}

/// Certificate of the first violated constant row, oriented so that the
/// combined constant is positive
fn find_conflict(rows: &[Row]) -> Option<Vec<BigRational>> {
    let row = rows
        .iter()
        .find(|r| r.term.is_constant() && !r.rel.holds(r.term.constant_part()))?;
    // only equalities contribute to equality rows, so they may be negated
    if row.rel == Relation::Eq && row.term.constant_part().is_negative() {
        return Some(row.cert.iter().map(|c| -c).collect());
    }
    Some(row.cert.clone())
}

/// Keep one row per direction: the tightest, strict rows winning ties
fn dedup(rows: Vec<Row>) -> Vec<Row> {
    let mut kept: Vec<Row> = Vec::with_capacity(rows.len());
    let mut index: FxHashMap<LinearTerm, usize> = FxHashMap::default();
    for row in rows {
        let Some(lead) = row.term.coeffs().values().next().map(|c| c.abs()) else {
            kept.push(row);
            continue;
        };
        let factor = lead.recip();
        let row = Row {
            term: row.term.scaled(&factor),
            rel: row.rel,
            cert: row.cert.iter().map(|c| c * &factor).collect(),
        };
        let key = row.term.without_constant();
        match index.get(&key) {
            Some(&i) => {
                let old = &kept[i];
                let tighter = row.term.constant_part() > old.term.constant_part()
                    || (row.term.constant_part() == old.term.constant_part()
                        && row.rel.is_strict()
                        && !old.rel.is_strict());
                if tighter {
                    kept[i] = row;
                }
            }
            None => {
                index.insert(key, kept.len());
                kept.push(row);
            }
        }
    }
    kept
}

/// Variable whose elimination adds the fewest rows
fn choose_var(rows: &[Row]) -> Option<ChcVar> {
    let vars: BTreeSet<&ChcVar> = rows.iter().flat_map(|r| r.term.vars()).collect();
    vars.into_iter()
        .min_by_key(|v| {
            let (mut pos, mut neg) = (0usize, 0usize);
            for r in rows {
                let c = r.term.coeff(v);
                if c.is_positive() {
                    pos += 1;
                } else if c.is_negative() {
                    neg += 1;
                }
            }
            (pos * neg).saturating_sub(pos + neg)
        })
        .cloned()
}

/// Pivot of an equality: a unit coefficient if there is one
fn choose_pivot(term: &LinearTerm) -> Option<(ChcVar, BigRational)> {
    let coeffs = term.coeffs();
    coeffs
        .iter()
        .find(|(_, c)| c.abs().is_one())
        .or_else(|| coeffs.iter().next())
        .map(|(v, c)| (v.clone(), c.clone()))
}

fn eval(term: &LinearTerm, values: &BTreeMap<ChcVar, BigRational>) -> BigRational {
    let mut value = term.constant_part().clone();
    for (v, c) in term.coeffs() {
        if let Some(x) = values.get(v) {
            value += c * x;
        }
    }
    value
}

type Bound = Option<(BigRational, bool)>;

/// A value inside the bounds, preferring zero and then integers
fn pick_value(lower: &Bound, upper: &Bound) -> BigRational {
    let fits = |v: &BigRational| {
        lower.as_ref().map_or(true, |(l, strict)| if *strict { v > l } else { v >= l })
            && upper.as_ref().map_or(true, |(u, strict)| if *strict { v < u } else { v <= u })
    };
    let mut candidates = vec![BigRational::zero()];
    if let Some((l, strict)) = lower {
        candidates.push(if l.is_integer() && !strict {
            l.clone()
        } else {
            l.floor() + BigRational::one()
        });
    }
    if let Some((u, strict)) = upper {
        candidates.push(if u.is_integer() && !strict {
            u.clone()
        } else {
            u.ceil() - BigRational::one()
        });
    }
    if let Some(v) = candidates.into_iter().find(|v| fits(v)) {
        return v;
    }
    match (lower, upper) {
        (Some((l, false)), _) => l.clone(),
        (_, Some((u, false))) => u.clone(),
        (Some((l, _)), Some((u, _))) => (l + u) / BigRational::from_integer(2.into()),
        _ => BigRational::zero(),
    }
}

fn build_model(steps: Vec<Step>, inputs: &[LinearConstraint]) -> BTreeMap<ChcVar, BigRational> {
    let mut values = BTreeMap::new();
    for step in steps.into_iter().rev() {
        match step {
            Step::Equality { var, definition } => {
                let v = eval(&definition, &values);
                values.insert(var, v);
            }
            Step::Bounds { var, rows } => {
                let mut lower: Bound = None;
                let mut upper: Bound = None;
                for row in &rows {
                    let a = row.term.coeff(&var);
                    let bound = -eval(&row.term.without(&var), &values) / &a;
                    let strict = row.rel.is_strict();
                    if a.is_positive() {
                        let better = upper.as_ref().map_or(true, |(u, s)| {
                            bound < *u || (bound == *u && strict && !s)
                        });
                        if better {
                            upper = Some((bound, strict));
                        }
                    } else {
                        let better = lower.as_ref().map_or(true, |(l, s)| {
                            bound > *l || (bound == *l && strict && !s)
                        });
                        if better {
                            lower = Some((bound, strict));
                        }
                    }
                }
                values.insert(var, pick_value(&lower, &upper));
            }
        }
    }
    for c in inputs {
        for v in c.term.vars() {
            values.entry(v.clone()).or_insert_with(BigRational::zero);
        }
    }
    values
}

/// Elimination state
struct Eliminator<'s> {
    inputs: usize,
    integer: bool,
    sides: Option<&'s [Side]>,
    derived: Vec<(LinearConstraint, Side)>,
}

impl Eliminator<'_> {
    fn side_of(&self, index: usize) -> Option<Side> {
        let sides = self.sides?;
        if index < self.inputs {
            sides.get(index).copied()
        } else {
            self.derived.get(index - self.inputs).map(|(_, s)| *s)
        }
    }

    /// Side all of the row's support lies on
    fn support_side(&self, cert: &[BigRational]) -> Option<Side> {
        let mut side = None;
        for (i, l) in cert.iter().enumerate() {
            if l.is_zero() {
                continue;
            }
            let s = self.side_of(i)?;
            match side {
                None => side = Some(s),
                Some(prev) if prev != s => return None,
                Some(_) => {}
            }
        }
        side
    }

    /// Integer tightening of a derived row
    ///
    /// Without sides the certificate is not maintained. With sides only rows
    /// supported by one side are tightened, and the tightened row becomes a
    /// derived input of that side.
    fn tighten(&mut self, row: Row) -> Row {
        if !self.integer || row.term.is_constant() {
            return row;
        }
        let term = row.term.integral();
        let g = BigRational::from_integer(term.coefficient_gcd());
        let strengthens = row.rel.is_strict() || !(term.constant_part() / &g).is_integer();
        if !strengthens {
            return row;
        }
        let tightened = LinearConstraint::new(row.term.clone(), row.rel).tighten_integer();
        if self.sides.is_none() {
            return Row {
                term: tightened.term,
                rel: tightened.rel,
                cert: row.cert,
            };
        }
        let Some(side) = self.support_side(&row.cert) else {
            return row;
        };
        self.derived.push((tightened.clone(), side));
        Row {
            term: tightened.term,
            rel: tightened.rel,
            cert: unit(self.inputs + self.derived.len(), self.inputs + self.derived.len() - 1),
        }
    }

    fn refutation(self, multipliers: Vec<BigRational>) -> FmOutcome {
        let mut multipliers = multipliers;
        multipliers.resize(self.inputs + self.derived.len(), BigRational::zero());
        FmOutcome::Unsat(Refutation {
            multipliers,
            derived: self.derived,
        })
    }
}

/// Decide a conjunction of linear constraints
///
/// Over the integers (`integer`), derived rows are tightened as they appear
/// and equalities are solved for unit coefficients when possible; the
/// answer `Sat` then still only promises a rational solution. `sides` tags
/// each input for interpolation.
pub(crate) fn fourier_motzkin(
    inputs: &[LinearConstraint],
    integer: bool,
    sides: Option<&[Side]>,
) -> FmOutcome {
    let n = inputs.len();
    let mut fm = Eliminator {
        inputs: n,
        integer,
        sides,
        derived: Vec::new(),
    };
    let mut rows: Vec<Row> = inputs
        .iter()
        .enumerate()
        .map(|(i, c)| Row {
            term: c.term.clone(),
            rel: c.rel,
            cert: unit(n, i),
        })
        .collect();
    let mut steps = Vec::new();

    if let Some(cert) = find_conflict(&rows) {
        return fm.refutation(cert);
    }
    rows.retain(|r| !r.term.is_constant());

    while let Some(pos) = rows.iter().position(|r| r.rel == Relation::Eq) {
        let eq = rows.remove(pos);
        let Some((var, a)) = choose_pivot(&eq.term) else {
            continue;
        };
        let mut substituted = Vec::with_capacity(rows.len());
        for mut row in rows {
            let b = row.term.coeff(&var);
            if !b.is_zero() {
                let factor = -(&b / &a);
                row.term = row.term.plus(&eq.term.scaled(&factor));
                add_scaled(&mut row.cert, &eq.cert, &factor);
                row = fm.tighten(row);
            }
            substituted.push(row);
        }
        rows = substituted;
        let definition = eq.term.without(&var).scaled(&(-a.recip()));
        steps.push(Step::Equality { var, definition });
        if let Some(cert) = find_conflict(&rows) {
            return fm.refutation(cert);
        }
        rows.retain(|r| !r.term.is_constant());
    }

    loop {
        rows = dedup(rows);
        let Some(var) = choose_var(&rows) else {
            break;
        };
        let (with, mut next): (Vec<Row>, Vec<Row>) =
            rows.into_iter().partition(|r| r.term.contains(&var));
        let (upper, lower): (Vec<&Row>, Vec<&Row>) =
            with.iter().partition(|r| r.term.coeff(&var).is_positive());
        for u in &upper {
            let a = u.term.coeff(&var);
            for l in &lower {
                let b = -l.term.coeff(&var);
                let rel = if u.rel.is_strict() || l.rel.is_strict() {
                    Relation::Lt
                } else {
                    Relation::Le
                };
                let row = Row {
                    term: u.term.scaled(&b).plus(&l.term.scaled(&a)),
                    rel,
                    cert: combine(&u.cert, &b, &l.cert, &a),
                };
                next.push(fm.tighten(row));
            }
        }
        steps.push(Step::Bounds { var, rows: with });
        if let Some(cert) = find_conflict(&next) {
            return fm.refutation(cert);
        }
        next.retain(|r| !r.term.is_constant());
        rows = next;
    }

    FmOutcome::Sat(build_model(steps, inputs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    fn q(n: i64) -> BigRational {
        BigRational::from_integer(BigInt::from(n))
    }

    fn x() -> ChcVar {
        ChcVar::real("x")
    }

    fn y() -> ChcVar {
        ChcVar::real("y")
    }

    /// `sum(c * v) + k REL 0`
    fn row(coeffs: &[(ChcVar, i64)], k: i64, rel: Relation) -> LinearConstraint {
        let mut term = LinearTerm::constant(q(k));
        for (v, c) in coeffs {
            term.add_monomial(v, &q(*c));
        }
        LinearConstraint::new(term, rel)
    }

    fn assert_certificate(inputs: &[LinearConstraint], cert: &[BigRational]) {
        let mut sum = LinearTerm::zero();
        let mut strict = false;
        for (c, l) in inputs.iter().zip(cert) {
            if l.is_zero() {
                continue;
            }
            if c.rel != Relation::Eq {
                assert!(l.is_positive(), "inequality multiplier must be positive");
            }
            strict |= c.rel.is_strict();
            sum = sum.plus(&c.term.scaled(l));
        }
        assert!(sum.is_constant(), "certificate leaves variables: {sum}");
        let k = sum.constant_part();
        assert!(k.is_positive() || (strict && k.is_zero()));
    }

    fn assert_model(inputs: &[LinearConstraint], values: &BTreeMap<ChcVar, BigRational>) {
        for c in inputs {
            assert!(c.rel.holds(&eval(&c.term, values)), "{c} violated");
        }
    }

    #[test]
    fn bounded_interval_is_satisfiable() {
        // 1 <= x, x <= 3, x + y = 5
        let inputs = vec![
            row(&[(x(), -1)], 1, Relation::Le),
            row(&[(x(), 1)], -3, Relation::Le),
            row(&[(x(), 1), (y(), 1)], -5, Relation::Eq),
        ];
        match fourier_motzkin(&inputs, false, None) {
            FmOutcome::Sat(values) => assert_model(&inputs, &values),
            FmOutcome::Unsat(_) => panic!("expected sat"),
        }
    }

    #[test]
    fn crossing_bounds_give_a_certificate() {
        // x - y < 0, y - x < 0
        let inputs = vec![
            row(&[(x(), 1), (y(), -1)], 0, Relation::Lt),
            row(&[(y(), 1), (x(), -1)], 0, Relation::Lt),
        ];
        match fourier_motzkin(&inputs, false, None) {
            FmOutcome::Unsat(r) => assert_certificate(&inputs, &r.multipliers),
            FmOutcome::Sat(_) => panic!("expected unsat"),
        }
    }

    #[test]
    fn equalities_feed_the_certificate() {
        // x = 2y, y >= 1, x <= 1
        let inputs = vec![
            row(&[(x(), 1), (y(), -2)], 0, Relation::Eq),
            row(&[(y(), -1)], 1, Relation::Le),
            row(&[(x(), 1)], -1, Relation::Le),
        ];
        match fourier_motzkin(&inputs, false, None) {
            FmOutcome::Unsat(r) => assert_certificate(&inputs, &r.multipliers),
            FmOutcome::Sat(_) => panic!("expected unsat"),
        }
    }

    #[test]
    fn strict_bounds_choose_interior_points() {
        // 0 < x < 1/2 has no integer point
        let mut half = LinearTerm::var(x());
        half = half.add_constant(&BigRational::new(BigInt::from(-1), BigInt::from(2)));
        let inputs = vec![
            row(&[(x(), -1)], 0, Relation::Lt),
            LinearConstraint::new(half, Relation::Lt),
        ];
        match fourier_motzkin(&inputs, false, None) {
            FmOutcome::Sat(values) => assert_model(&inputs, &values),
            FmOutcome::Unsat(_) => panic!("expected sat"),
        }
    }

    #[test]
    fn constant_contradiction_is_detected_immediately() {
        let inputs = vec![LinearConstraint::falsum()];
        match fourier_motzkin(&inputs, false, None) {
            FmOutcome::Unsat(r) => assert_eq!(r.multipliers, vec![q(1)]),
            FmOutcome::Sat(_) => panic!("expected unsat"),
        }
    }

    #[test]
    fn integer_mode_keeps_parity() {
        // x = 2y, x = 2w + 1
        let x = ChcVar::int("x");
        let y = ChcVar::int("y");
        let w = ChcVar::int("w");
        let inputs = vec![
            row(&[(x.clone(), 1), (y, -2)], 0, Relation::Eq),
            row(&[(x, 1), (w, -2)], -1, Relation::Eq),
        ];
        assert!(matches!(
            fourier_motzkin(&inputs, false, None),
            FmOutcome::Sat(_)
        ));
        assert!(matches!(
            fourier_motzkin(&inputs, true, None),
            FmOutcome::Unsat(_)
        ));
    }

    #[test]
    fn one_sided_tightenings_become_derived_inputs() {
        let x = ChcVar::int("x");
        let y = ChcVar::int("y");
        let w = ChcVar::int("w");
        let inputs = vec![
            row(&[(x.clone(), 1), (y, -2)], 0, Relation::Eq),
            row(&[(x.clone(), 1), (w, -2)], -1, Relation::Eq),
            row(&[(x, -1)], 0, Relation::Le),
        ];
        let sides = [Side::A, Side::A, Side::B];
        let FmOutcome::Unsat(r) = fourier_motzkin(&inputs, true, Some(&sides)) else {
            panic!("expected unsat");
        };
        assert_eq!(r.derived.len(), 1);
        assert_eq!(r.derived[0].1, Side::A);
        assert_eq!(r.multipliers.len(), inputs.len() + 1);
    }
}
