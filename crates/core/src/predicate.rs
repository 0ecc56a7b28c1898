//! Predicate language for conditional deduplication
//!
//! A predicate specification is an ordered list of `(token, pattern)` pairs.
//! The token names a column and may carry modifiers:
//!
//! - `name`: the field must equal `pattern`
//! - `!name`: the field must differ from `pattern`
//! - `&name`, `&!name`: as above, but the column is *auxiliary*; it gates
//!   suppression of a duplicate without being part of the duplicate key
//!
//! A pattern equal to the wildcard marker matches any value. Negating the
//! wildcard therefore never matches, which is reported as a vacuous predicate.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::match_filter::MatchFilter;
use crate::schema::Schema;
use crate::tracker::DuplicateKey;
use crate::{Error, Result};

/// One `(token, pattern)` pair as written by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateToken {
    /// Column name, possibly prefixed with `&`, `!` or `&!`
    pub column: String,
    /// Value to compare against, or the wildcard marker
    pub pattern: String,
}

impl PredicateToken {
    pub fn new(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            pattern: pattern.into(),
        }
    }
}

/// Ordered list of predicate tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PredicateSpec {
    tokens: Vec<PredicateToken>,
}

impl PredicateSpec {
    pub fn new(tokens: Vec<PredicateToken>) -> Self {
        Self { tokens }
    }

    /// Parse a flat argument list `token pattern token pattern ...`.
    pub fn from_flat<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        if args.len() % 2 != 0 {
            return Err(Error::InvalidSpec(format!(
                "expected column/pattern pairs, but token {:?} has no pattern",
                args[args.len() - 1].as_ref()
            )));
        }

        let tokens = args
            .chunks(2)
            .map(|pair| PredicateToken::new(pair[0].as_ref(), pair[1].as_ref()))
            .collect();
        Ok(Self { tokens })
    }

    /// Add a pair to the end of the specification
    pub fn push(&mut self, column: impl Into<String>, pattern: impl Into<String>) {
        self.tokens.push(PredicateToken::new(column, pattern));
    }

    pub fn tokens(&self) -> &[PredicateToken] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Comparison applied to a single field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// Wildcard equality; always true
    Any,
    /// Negated wildcard; always false
    Never,
    /// Field must equal the pattern
    Equals(String),
    /// Field must differ from the pattern
    NotEquals(String),
}

impl Matcher {
    fn build(pattern: &str, wildcard: &str, negated: bool) -> Self {
        match (pattern == wildcard, negated) {
            (true, false) => Matcher::Any,
            (true, true) => Matcher::Never,
            (false, false) => Matcher::Equals(pattern.to_string()),
            (false, true) => Matcher::NotEquals(pattern.to_string()),
        }
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            Matcher::Any => true,
            Matcher::Never => false,
            Matcher::Equals(pattern) => value == pattern,
            Matcher::NotEquals(pattern) => value != pattern,
        }
    }
}

/// A matcher bound to a resolved column position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPredicate {
    /// Bare column name, modifiers stripped
    pub column: String,
    /// Position of the column in the schema
    pub index: usize,
    pub matcher: Matcher,
}

impl ColumnPredicate {
    /// Borrow this predicate's field from `row`.
    ///
    /// `row_number` is the 1-based data row ordinal, used only for reporting.
    pub fn field<'r>(&self, row: &'r [String], row_number: usize) -> Result<&'r str> {
        row.get(self.index)
            .map(String::as_str)
            .ok_or_else(|| Error::ColumnLookup {
                column: self.column.clone(),
                index: self.index,
                row: row_number,
                width: row.len(),
            })
    }

    pub fn evaluate(&self, row: &[String], row_number: usize) -> Result<bool> {
        Ok(self.matcher.matches(self.field(row, row_number)?))
    }
}

/// A negated wildcard found at compile time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VacuousPredicate {
    /// Token as written, modifiers included
    pub token: String,
    pub pattern: String,
}

/// Split modifiers off a column token.
///
/// Returns `(bare_name, auxiliary, negated)`. `&!` is checked before `&`,
/// which is checked before `!`.
fn strip_modifiers(token: &str) -> (&str, bool, bool) {
    if let Some(rest) = token.strip_prefix("&!") {
        (rest, true, true)
    } else if let Some(rest) = token.strip_prefix('&') {
        (rest, true, false)
    } else if let Some(rest) = token.strip_prefix('!') {
        (rest, false, true)
    } else {
        (token, false, false)
    }
}

/// Insert keeping first-seen order; a repeated column replaces its earlier predicate in place.
fn upsert(predicates: &mut Vec<ColumnPredicate>, predicate: ColumnPredicate) {
    match predicates.iter_mut().find(|p| p.column == predicate.column) {
        Some(existing) => {
            debug!("Predicate for column {:?} replaced", predicate.column);
            *existing = predicate;
        }
        None => predicates.push(predicate),
    }
}

/// Predicates split into the duplicate-key columns and the auxiliary filter.
#[derive(Debug, Clone)]
pub struct CompiledPredicateSet {
    counted: Vec<ColumnPredicate>,
    auxiliary: MatchFilter,
    vacuous: Vec<VacuousPredicate>,
}

impl CompiledPredicateSet {
    /// Resolve every token against `schema` and build its matcher.
    ///
    /// Fails with `UnknownColumn` on the first token whose bare name is not a
    /// column of `schema`.
    pub fn compile(spec: &PredicateSpec, wildcard: &str, schema: &Schema) -> Result<Self> {
        let mut counted = Vec::new();
        let mut auxiliary = Vec::new();
        let mut vacuous = Vec::new();

        for token in spec.tokens() {
            let (name, is_auxiliary, negated) = strip_modifiers(&token.column);
            let index = schema.require(name, &token.column)?;
            let matcher = Matcher::build(&token.pattern, wildcard, negated);

            if matcher == Matcher::Never {
                vacuous.push(VacuousPredicate {
                    token: token.column.clone(),
                    pattern: token.pattern.clone(),
                });
            }

            let predicate = ColumnPredicate {
                column: name.to_string(),
                index,
                matcher,
            };
            if is_auxiliary {
                upsert(&mut auxiliary, predicate);
            } else {
                upsert(&mut counted, predicate);
            }
        }

        debug!(
            "Compiled {} counted and {} auxiliary predicates",
            counted.len(),
            auxiliary.len()
        );

        Ok(Self {
            counted,
            auxiliary: MatchFilter::new(auxiliary),
            vacuous,
        })
    }

    /// Predicates forming the duplicate key, in key order
    pub fn counted(&self) -> &[ColumnPredicate] {
        &self.counted
    }

    pub fn auxiliary(&self) -> &MatchFilter {
        &self.auxiliary
    }

    pub fn vacuous(&self) -> &[VacuousPredicate] {
        &self.vacuous
    }

    /// Extract the duplicate key of `row` and whether every counted predicate holds.
    ///
    /// All counted columns are looked up even after a predicate fails, so a
    /// short row is always reported.
    pub fn evaluate_counted(
        &self,
        row: &[String],
        row_number: usize,
    ) -> Result<(DuplicateKey, bool)> {
        let mut key = Vec::with_capacity(self.counted.len());
        let mut all_match = true;
        for predicate in &self.counted {
            let value = predicate.field(row, row_number)?;
            all_match &= predicate.matcher.matches(value);
            key.push(value.to_string());
        }
        Ok((key, all_match))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANY: &str = "_any_";

    fn schema() -> Schema {
        Schema::new(vec!["a".into(), "b".into(), "c".into()])
    }

    fn row(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_from_flat_pairs() {
        let spec = PredicateSpec::from_flat(&["b", ANY, "!c", "0"]).unwrap();
        assert_eq!(spec.len(), 2);
        assert_eq!(spec.tokens()[1], PredicateToken::new("!c", "0"));
    }

    #[test]
    fn test_from_flat_rejects_dangling_token() {
        let result = PredicateSpec::from_flat(&["b", ANY, "c"]);
        assert!(matches!(result, Err(Error::InvalidSpec(_))));
    }

    #[test]
    fn test_modifier_precedence() {
        assert_eq!(strip_modifiers("&!c"), ("c", true, true));
        assert_eq!(strip_modifiers("&c"), ("c", true, false));
        assert_eq!(strip_modifiers("!c"), ("c", false, true));
        assert_eq!(strip_modifiers("c"), ("c", false, false));
        // only the leading `!` is a modifier
        assert_eq!(strip_modifiers("!&c"), ("&c", false, true));
    }

    #[test]
    fn test_matchers() {
        assert!(Matcher::build(ANY, ANY, false).matches("anything"));
        assert!(!Matcher::build(ANY, ANY, true).matches("anything"));
        assert!(Matcher::build("0", ANY, false).matches("0"));
        assert!(!Matcher::build("0", ANY, false).matches("1"));
        assert!(Matcher::build("#", ANY, true).matches("0"));
        assert!(!Matcher::build("#", ANY, true).matches("#"));
    }

    #[test]
    fn test_routing_and_order() {
        let spec = PredicateSpec::from_flat(&["c", "0", "&a", "1", "b", ANY, "&!b", "x"]).unwrap();
        let compiled = CompiledPredicateSet::compile(&spec, ANY, &schema()).unwrap();

        let counted: Vec<_> = compiled.counted().iter().map(|p| p.column.as_str()).collect();
        assert_eq!(counted, vec!["c", "b"]);
        assert_eq!(compiled.counted()[0].index, 2);

        let auxiliary: Vec<_> = compiled
            .auxiliary()
            .predicates()
            .iter()
            .map(|p| (p.column.as_str(), p.matcher.clone()))
            .collect();
        assert_eq!(
            auxiliary,
            vec![
                ("a", Matcher::Equals("1".into())),
                ("b", Matcher::NotEquals("x".into())),
            ]
        );
        assert!(compiled.vacuous().is_empty());
    }

    #[test]
    fn test_unknown_column_names_token() {
        let spec = PredicateSpec::from_flat(&["b", ANY, "&!missing", "0"]).unwrap();
        match CompiledPredicateSet::compile(&spec, ANY, &schema()) {
            Err(Error::UnknownColumn { column, schema }) => {
                assert_eq!(column, "&!missing");
                assert_eq!(schema.len(), 3);
            }
            other => panic!("expected UnknownColumn, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_negated_wildcard_is_vacuous() {
        let spec = PredicateSpec::from_flat(&["!c", ANY, "&!a", ANY]).unwrap();
        let compiled = CompiledPredicateSet::compile(&spec, ANY, &schema()).unwrap();

        assert_eq!(compiled.vacuous().len(), 2);
        assert_eq!(compiled.vacuous()[0].token, "!c");
        assert_eq!(compiled.counted()[0].matcher, Matcher::Never);
    }

    #[test]
    fn test_repeated_column_replaces_in_place() {
        let spec = PredicateSpec::from_flat(&["b", "1", "c", "0", "b", "2"]).unwrap();
        let compiled = CompiledPredicateSet::compile(&spec, ANY, &schema()).unwrap();

        assert_eq!(compiled.counted().len(), 2);
        assert_eq!(compiled.counted()[0].column, "b");
        assert_eq!(compiled.counted()[0].matcher, Matcher::Equals("2".into()));
    }

    #[test]
    fn test_evaluate_counted() {
        let spec = PredicateSpec::from_flat(&["b", ANY, "c", "0"]).unwrap();
        let compiled = CompiledPredicateSet::compile(&spec, ANY, &schema()).unwrap();

        let (key, matched) = compiled.evaluate_counted(&row(&["1", "2", "0"]), 1).unwrap();
        assert_eq!(key, row(&["2", "0"]));
        assert!(matched);

        let (key, matched) = compiled.evaluate_counted(&row(&["4", "2", "1"]), 2).unwrap();
        assert_eq!(key, row(&["2", "1"]));
        assert!(!matched);
    }

    #[test]
    fn test_short_row_is_lookup_error() {
        let spec = PredicateSpec::from_flat(&["c", "0", "b", ANY]).unwrap();
        let compiled = CompiledPredicateSet::compile(&spec, ANY, &schema()).unwrap();

        match compiled.evaluate_counted(&row(&["1", "2"]), 7) {
            Err(Error::ColumnLookup { column, index, row, width }) => {
                assert_eq!(column, "c");
                assert_eq!(index, 2);
                assert_eq!(row, 7);
                assert_eq!(width, 2);
            }
            other => panic!("expected ColumnLookup, got {:?}", other),
        }
    }
}
