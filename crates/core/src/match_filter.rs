//! Auxiliary match filter
//!
//! Auxiliary predicates (`&name`, `&!name`) never take part in the duplicate
//! key. A row the tracker flags as a duplicate is only suppressed when every
//! auxiliary predicate also holds.

use crate::predicate::ColumnPredicate;
use crate::Result;

/// Conjunction of auxiliary column predicates
#[derive(Debug, Clone, Default)]
pub struct MatchFilter {
    predicates: Vec<ColumnPredicate>,
}

impl MatchFilter {
    pub fn new(predicates: Vec<ColumnPredicate>) -> Self {
        Self { predicates }
    }

    /// True iff every predicate passes. An empty filter always matches.
    ///
    /// Every referenced column is looked up, so a short row fails with
    /// `ColumnLookup` regardless of which predicate fails first.
    pub fn matches(&self, row: &[String], row_number: usize) -> Result<bool> {
        let mut all_match = true;
        for predicate in &self.predicates {
            all_match &= predicate.evaluate(row, row_number)?;
        }
        Ok(all_match)
    }

    pub fn predicates(&self) -> &[ColumnPredicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}
