//! Term algebra for CHC transition systems over linear arithmetic
//!
//! Formulas are immutable expression trees over Boolean, integer and real
//! variables. This crate provides everything the solving layers need to
//! build, inspect and transform them, without any decision procedure.
//!
//! # Architecture
//!
//! - `ChcExpr`: expressions with structural equality and hashing
//! - `LinearTerm` / `LinearConstraint`: exact rational view of linear atoms
//! - `Model`: variable assignment with total evaluation
//! - `rewrite`: negation normal form and simplification
//! - `TimeMachine`: `x#k` versioning used to unroll transition relations
//! - `Theory`: real or integer arithmetic tag

#![warn(clippy::all)]

mod error;
mod expr;
pub mod linear;
mod model;
pub mod rewrite;
mod theory;
mod time;

pub use error::{ExprError, ExprResult};
pub use expr::{ChcExpr, ChcOp, ChcSort, ChcVar};
pub use linear::{LinearConstraint, LinearTerm, Relation};
pub use model::{floor_mod, Model, Value};
pub use rewrite::{is_nnf, simplify, to_nnf};
pub use theory::Theory;
pub use time::{TimeMachine, VERSION_SEPARATOR};
