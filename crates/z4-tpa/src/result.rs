//! Verification verdicts

use crate::ValidityWitness;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Answer for a CHC problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationResult {
    /// The query is unreachable; the witness is absent when it was not
    /// requested or could not be produced
    Safe(Option<ValidityWitness>),
    /// The query is reachable
    Unsafe,
    /// Limits were hit before a verdict
    Unknown,
}

impl VerificationResult {
    pub fn is_safe(&self) -> bool {
        matches!(self, VerificationResult::Safe(_))
    }

    pub fn is_unsafe(&self) -> bool {
        matches!(self, VerificationResult::Unsafe)
    }

    pub fn witness(&self) -> Option<&ValidityWitness> {
        match self {
            VerificationResult::Safe(witness) => witness.as_ref(),
            _ => None,
        }
    }
}

impl fmt::Display for VerificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationResult::Safe(_) => write!(f, "sat"),
            VerificationResult::Unsafe => write!(f, "unsat"),
            VerificationResult::Unknown => write!(f, "unknown"),
        }
    }
}
