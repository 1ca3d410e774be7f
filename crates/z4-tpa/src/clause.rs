//! Horn clauses

use crate::PredicateId;
use std::fmt;
use z4_expr::{ChcExpr, ChcVar};

/// Body of a Horn clause: predicate applications and a background constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClauseBody {
    /// Uninterpreted predicate applications
    pub predicates: Vec<(PredicateId, Vec<ChcExpr>)>,
    /// Interpreted constraint (`None` means `true`)
    pub constraint: Option<ChcExpr>,
}

impl ClauseBody {
    pub fn new(predicates: Vec<(PredicateId, Vec<ChcExpr>)>, constraint: Option<ChcExpr>) -> Self {
        Self {
            predicates,
            constraint,
        }
    }

    /// Body with only a constraint
    pub fn constraint(constraint: ChcExpr) -> Self {
        Self::new(Vec::new(), Some(constraint))
    }

    /// The constraint, `true` when absent
    pub fn constraint_or_true(&self) -> ChcExpr {
        self.constraint.clone().unwrap_or(ChcExpr::Bool(true))
    }
}

/// Head of a Horn clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClauseHead {
    /// Predicate application
    Predicate(PredicateId, Vec<ChcExpr>),
    /// `false`: the clause is a query
    False,
}

impl ClauseHead {
    pub fn predicate_id(&self) -> Option<PredicateId> {
        match self {
            ClauseHead::Predicate(id, _) => Some(*id),
            ClauseHead::False => None,
        }
    }

    pub fn is_false(&self) -> bool {
        matches!(self, ClauseHead::False)
    }
}

/// A constrained Horn clause `body => head`
///
/// Variables are implicitly universally quantified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HornClause {
    pub body: ClauseBody,
    pub head: ClauseHead,
}

impl HornClause {
    pub fn new(body: ClauseBody, head: ClauseHead) -> Self {
        Self { body, head }
    }

    /// No predicate in the body
    pub fn is_fact(&self) -> bool {
        self.body.predicates.is_empty()
    }

    /// `false` in the head
    pub fn is_query(&self) -> bool {
        self.head.is_false()
    }

    /// All variables of the clause, in first-occurrence order
    pub fn vars(&self) -> Vec<ChcVar> {
        let mut exprs: Vec<&ChcExpr> = Vec::new();
        for (_, args) in &self.body.predicates {
            exprs.extend(args);
        }
        exprs.extend(self.body.constraint.iter());
        if let ClauseHead::Predicate(_, args) = &self.head {
            exprs.extend(args);
        }
        let mut seen = rustc_hash::FxHashSet::default();
        let mut vars = Vec::new();
        for e in exprs {
            for v in e.vars() {
                if seen.insert(v.clone()) {
                    vars.push(v);
                }
            }
        }
        vars
    }
}

fn write_app(f: &mut fmt::Formatter<'_>, id: PredicateId, args: &[ChcExpr]) -> fmt::Result {
    write!(f, "({id}")?;
    for a in args {
        write!(f, " {a}")?;
    }
    write!(f, ")")
}

impl fmt::Display for HornClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(=> (and")?;
        for (id, args) in &self.body.predicates {
            write!(f, " ")?;
            write_app(f, *id, args)?;
        }
        if let Some(c) = &self.body.constraint {
            write!(f, " {c}")?;
        }
        write!(f, ") ")?;
        match &self.head {
            ClauseHead::Predicate(id, args) => write_app(f, *id, args)?,
            ClauseHead::False => write!(f, "false")?,
        }
        write!(f, ")")
    }
}
