//! Error types for term construction and evaluation

use thiserror::Error;

/// Errors raised while manipulating expressions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    #[error("non-linear term: {0}")]
    NonLinear(String),

    #[error("sort mismatch in {context}: expected {expected}, got {actual}")]
    SortMismatch {
        context: String,
        expected: String,
        actual: String,
    },

    #[error("divisor must be a non-zero constant: {0}")]
    NonConstantDivisor(String),

    #[error("version shift of {var} by {shift} goes below time zero")]
    NegativeTime { var: String, shift: i64 },

    #[error("expression is not an arithmetic atom: {0}")]
    NotAnAtom(String),

    #[error("system mixes integer and real arithmetic")]
    MixedArithmetic,
}

/// Result type for expression operations
pub type ExprResult<T> = Result<T, ExprError>;
