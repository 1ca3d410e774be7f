//! Z4 TPA - accelerated bounded model checking for CHC transition systems
//!
//! Decides safety of CHC problems made of one predicate, its facts, one
//! self-loop and queries. The engine over-approximates reachability in
//! exactly `2^n` and fewer than `2^n` steps, refines the approximations with
//! interpolants and model-based projection, and reports either a reachable
//! query or an inductive invariant.
//!
//! # Example CHC Problem
//!
//! ```text
//! ; 1. x = 0 => Inv(x)
//! ; 2. Inv(x) /\ x < 2 => Inv(x+1)
//! ; 3. Inv(x) /\ x >= 3 => false
//! ```
//!
//! # Architecture
//!
//! - `ChcProblem`: predicates and Horn clauses
//! - `Normalizer`: canonical predicate arguments and trivial elimination of
//!   clause-local variables
//! - `TransitionSystem`: init, transition and query over state variables
//! - `Mbp` / `QuantifierElimination`: model-based projection over linear
//!   integer or real arithmetic, and exact elimination built from it
//! - `ReachabilitySession`: interpolating one-step reachability checks
//! - `AcceleratedBmc`: the power abstraction engine and its invariants
//! - `ValidityWitness`: predicate interpretations of a safe problem

#![warn(clippy::all)]

mod clause;
mod config;
mod error;
pub mod invariant;
pub mod mbp;
mod normalizer;
mod power;
mod predicate;
mod problem;
pub mod qe;
mod result;
pub mod session;
mod tpa;
mod transition_system;
mod witness;

pub use clause::{ClauseBody, ClauseHead, HornClause};
pub use config::{TpaConfig, TpaConfigBuilder};
pub use error::{ChcError, ChcResult};
pub use mbp::{Literal, Mbp};
pub use normalizer::{CanonicalPredicates, NormalizedProblem, Normalizer};
pub use power::PowerArray;
pub use predicate::{Predicate, PredicateId};
pub use problem::ChcProblem;
pub use qe::QuantifierElimination;
pub use result::VerificationResult;
pub use session::{IncrementalSession, Reachability, ReachabilitySession, SingleUseSession};
pub use tpa::{
    extract_state_from_model, AcceleratedBmc, PowerAbstraction, QueryResult, TpaStats, TsVerdict,
};
pub use transition_system::{ExtractedSystem, SystemType, TransitionSystem};
pub use witness::{PredicateInterpretation, ValidityWitness};
