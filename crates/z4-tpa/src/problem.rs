//! CHC problem definition

use crate::{ChcError, ChcResult, ClauseHead, HornClause, Predicate, PredicateId};
use z4_expr::{ChcSort, Theory};

/// A Constrained Horn Clause problem
///
/// Contains:
/// - A set of predicate declarations (uninterpreted relations)
/// - A set of Horn clauses (rules)
/// - Query clauses (clauses with false head)
#[derive(Debug, Clone, Default)]
pub struct ChcProblem {
    /// Predicate declarations
    predicates: Vec<Predicate>,
    /// All Horn clauses
    clauses: Vec<HornClause>,
}

impl ChcProblem {
    /// Create a new empty CHC problem
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a new predicate
    pub fn declare_predicate(
        &mut self,
        name: impl Into<String>,
        arg_sorts: Vec<ChcSort>,
    ) -> PredicateId {
        let id = PredicateId::new(self.predicates.len() as u32);
        self.predicates.push(Predicate::new(id, name, arg_sorts));
        id
    }

    /// Get a predicate by ID
    pub fn get_predicate(&self, id: PredicateId) -> Option<&Predicate> {
        self.predicates.get(id.index())
    }

    /// Add a Horn clause
    pub fn add_clause(&mut self, clause: HornClause) {
        self.clauses.push(clause);
    }

    /// Get all clauses
    pub fn clauses(&self) -> &[HornClause] {
        &self.clauses
    }

    /// Get all predicates
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Get query clauses (clauses with false head)
    pub fn queries(&self) -> impl Iterator<Item = &HornClause> {
        self.clauses.iter().filter(|c| c.is_query())
    }

    /// Get fact clauses (clauses with no predicates in body)
    pub fn facts(&self) -> impl Iterator<Item = &HornClause> {
        self.clauses.iter().filter(|c| c.is_fact() && !c.is_query())
    }

    /// Get transition clauses (clauses with predicates in both body and head)
    pub fn transitions(&self) -> impl Iterator<Item = &HornClause> {
        self.clauses
            .iter()
            .filter(|c| !c.is_fact() && !c.is_query())
    }

    /// Get clauses that define a predicate (have it in head)
    pub fn clauses_defining(&self, pred: PredicateId) -> impl Iterator<Item = &HornClause> {
        self.clauses
            .iter()
            .filter(move |c| c.head.predicate_id() == Some(pred))
    }

    /// Validate the problem
    pub fn validate(&self) -> ChcResult<()> {
        for clause in &self.clauses {
            let heads = match &clause.head {
                ClauseHead::Predicate(id, args) => Some((id, args)),
                ClauseHead::False => None,
            };
            for (pred_id, args) in clause.body.predicates.iter().map(|(id, a)| (id, a)).chain(heads)
            {
                let pred = self
                    .get_predicate(*pred_id)
                    .ok_or_else(|| ChcError::UndefinedPredicate(pred_id.to_string()))?;
                if args.len() != pred.arity() {
                    return Err(ChcError::ArityMismatch {
                        name: pred.name.clone(),
                        expected: pred.arity(),
                        actual: args.len(),
                    });
                }
            }
        }

        if self.queries().count() == 0 {
            return Err(ChcError::NoQuery);
        }

        Ok(())
    }

    /// Does the problem describe a single transition system
    ///
    /// That is one predicate `P`, and every clause is a fact `φ => P(x)`, a
    /// linear self-loop `P(x) ∧ φ => P(x')` or a query `P(x) ∧ φ => false`.
    pub fn is_transition_system(&self) -> bool {
        if self.predicates.len() != 1 {
            return false;
        }
        let p = self.predicates[0].id;
        self.clauses.iter().all(|c| {
            let body_ok = match c.body.predicates.as_slice() {
                [] => !c.is_query(),
                [(id, _)] => *id == p,
                _ => false,
            };
            let head_ok = match &c.head {
                ClauseHead::Predicate(id, _) => *id == p,
                ClauseHead::False => true,
            };
            body_ok && head_ok
        })
    }

    /// Arithmetic theory of the predicate signatures
    pub fn theory(&self) -> ChcResult<Theory> {
        Ok(Theory::from_sorts(
            self.predicates.iter().flat_map(|p| p.arg_sorts.iter()),
        )?)
    }
}
