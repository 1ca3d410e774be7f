//! Z4 Arith - decision procedure for quantifier-free linear arithmetic
//!
//! Decides conjunctions, disjunctions and negations of linear constraints over
//! integers or reals (with Boolean variables and `mod` by constants), produces
//! models, and computes Craig interpolants for any split of the assertions.
//!
//! ## Algorithm Overview
//!
//! 1. Formulas are simplified, put in negation normal form, and `mod` terms
//!    are replaced by fresh quotient and remainder variables
//! 2. A depth-first search enumerates the cubes of the formula tree, cutting
//!    a branch as soon as its literals are inconsistent
//! 3. Each cube is decided by Fourier-Motzkin elimination over the rationals
//! 4. For integers the constraints are tightened first, and fractional
//!    solutions are refined by branch and bound
//!
//! ## Interpolation
//!
//! Every refuted leaf carries a Farkas certificate. Summing the A-side rows
//! of a minimized certificate yields an inequality over the shared variables,
//! strict when a strict A row takes part. Leaf interpolants are joined by
//! disjunction across A-side splits and by conjunction across B-side splits.
//! A disjunctive result is then replaced by the atoms A implies, when those
//! alone already refute B.
//!
//! Branch and bound is bounded by [`SmtConfig`]; exhausting it answers
//! [`SmtResult::Unknown`].

#![warn(clippy::all)]

mod error;
mod fm;
mod formula;
mod search;
mod smt;
mod theory;

pub use error::{ArithResult, SmtError};
pub use smt::{
    check_sat, equivalent, get_model, implies, is_valid, FormulaId, PartitionMask, SmtConfig,
    SmtContext, SmtResult,
};
