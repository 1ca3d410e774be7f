//! Error types for the arithmetic decision procedure

use thiserror::Error;
use z4_expr::ExprError;

/// Decision procedure errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SmtError {
    #[error("no model available: the last check did not answer sat")]
    NoModel,

    #[error("no interpolant available: the last check did not answer unsat")]
    NoInterpolant,

    #[error("pop without matching push")]
    PopWithoutPush,

    #[error("solver gave up: {0}")]
    Incomplete(String),

    #[error("unsupported formula: {0}")]
    Unsupported(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Expr(#[from] ExprError),
}

/// Result type for decision procedure operations
pub type ArithResult<T> = Result<T, SmtError>;
