//! Arithmetic theory of a problem

use crate::{ChcSort, ExprError, ExprResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The arithmetic a problem is stated in
///
/// Resolved once from the sorts of the state variables; procedures branch on
/// this tag instead of inspecting terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Theory {
    /// Linear real arithmetic
    Real,
    /// Linear integer arithmetic
    Integer,
}

impl Theory {
    /// Theory of a collection of sorts; Boolean-only collections count as
    /// integer arithmetic
    pub fn from_sorts<'a>(sorts: impl IntoIterator<Item = &'a ChcSort>) -> ExprResult<Theory> {
        let mut has_int = false;
        let mut has_real = false;
        for sort in sorts {
            match sort {
                ChcSort::Int => has_int = true,
                ChcSort::Real => has_real = true,
                ChcSort::Bool => {}
            }
        }
        match (has_int, has_real) {
            (true, true) => Err(ExprError::MixedArithmetic),
            (false, true) => Ok(Theory::Real),
            _ => Ok(Theory::Integer),
        }
    }

    /// Sort of the numbers in this theory
    pub fn sort(self) -> ChcSort {
        match self {
            Theory::Real => ChcSort::Real,
            Theory::Integer => ChcSort::Int,
        }
    }

    pub fn is_integer(self) -> bool {
        self == Theory::Integer
    }
}

impl fmt::Display for Theory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theory::Real => write!(f, "QF_LRA"),
            Theory::Integer => write!(f, "QF_LIA"),
        }
    }
}
