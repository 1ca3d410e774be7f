//! Error types for CHC solving

use thiserror::Error;
use z4_arith::SmtError;
use z4_expr::ExprError;

/// CHC solver errors
#[derive(Debug, Error)]
pub enum ChcError {
    #[error("undefined predicate: {0}")]
    UndefinedPredicate(String),

    #[error("arity mismatch for predicate {name}: expected {expected}, got {actual}")]
    ArityMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("no query clause found")]
    NoQuery,

    #[error("ill-formed transition system: {role} formula `{formula}` mentions variables outside its role")]
    IllFormedTransitionSystem { role: String, formula: String },

    #[error("unsupported problem: {0}")]
    Unsupported(String),

    #[error("unsupported theory: {0}")]
    UnsupportedTheory(String),

    #[error("formula is not in negation normal form: {0}")]
    NotNormalForm(String),

    #[error("unexpected solver result: {0}")]
    UnexpectedSolverResult(String),

    #[error("solver session misuse: {0}")]
    SessionMisuse(String),

    #[error("refinement at power {power} did not change the abstraction")]
    StuckRefinement { power: u32 },

    #[error("gave up at power {power} after {retries} refinements")]
    RetryLimit { power: u32, retries: usize },

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Smt(#[from] SmtError),

    #[error(transparent)]
    Expr(#[from] ExprError),
}

/// Result type for CHC operations
pub type ChcResult<T> = Result<T, ChcError>;
