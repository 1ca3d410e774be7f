//! Predicate declarations

use serde::{Deserialize, Serialize};
use std::fmt;
use z4_expr::{ChcSort, ChcVar};

/// Index of a predicate in its problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PredicateId(pub(crate) u32);

impl PredicateId {
    /// Id of the predicate at position `id`
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Position of the predicate in its problem
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PredicateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// An uninterpreted relation over sorted arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub id: PredicateId,
    pub name: String,
    pub arg_sorts: Vec<ChcSort>,
}

impl Predicate {
    /// Declaration of `name` over `arg_sorts`
    pub fn new(id: PredicateId, name: impl Into<String>, arg_sorts: Vec<ChcSort>) -> Self {
        Self {
            id,
            name: name.into(),
            arg_sorts,
        }
    }

    /// Number of arguments
    pub fn arity(&self) -> usize {
        self.arg_sorts.len()
    }

    /// One variable `x<i>` per argument position
    pub fn canonical_vars(&self) -> Vec<ChcVar> {
        self.arg_sorts
            .iter()
            .enumerate()
            .map(|(i, sort)| ChcVar::new(format!("x{i}"), *sort))
            .collect()
    }
}

/// SMT-LIB declaration, `(declare-fun Inv (Int Int) Bool)`
impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sorts: Vec<String> = self.arg_sorts.iter().map(ToString::to_string).collect();
        write!(f, "(declare-fun {} ({}) Bool)", self.name, sorts.join(" "))
    }
}
