//! Occurrence counting for conditional deduplication
//!
//! The tracker keeps one counter per duplicate key. A counter only advances
//! for rows whose counted predicates all hold, but every row can be looked
//! up. This is what scopes deduplication to rows matching a condition.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Values of a row's counted columns, in compiled order
pub type DuplicateKey = Vec<String>;

/// How many occurrences of a repeated key survive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetentionMode {
    /// Two passes over buffered rows: every occurrence of a key that
    /// matched more than once is dropped, the first one included
    #[serde(rename = "all")]
    All,
    /// One streaming pass: the first occurrence is kept, later ones dropped
    #[serde(rename = "all but one", alias = "all-but-one")]
    AllButOne,
}

impl RetentionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetentionMode::All => "all",
            RetentionMode::AllButOne => "all but one",
        }
    }
}

impl fmt::Display for RetentionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetentionMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(RetentionMode::All),
            "all but one" | "all-but-one" => Ok(RetentionMode::AllButOne),
            other => Err(Error::InvalidSpec(format!(
                "unknown mode {:?}; expected \"all\" or \"all but one\"",
                other
            ))),
        }
    }
}

/// Per-key counters for one pipeline invocation
#[derive(Debug, Clone, Default)]
pub struct OccurrenceTable {
    counts: AHashMap<DuplicateKey, usize>,
}

impl OccurrenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current count for `key`; zero when unseen
    pub fn count(&self, key: &[String]) -> usize {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Add one to `key`'s counter and return the value before the increment
    pub fn increment(&mut self, key: &[String]) -> usize {
        if let Some(counter) = self.counts.get_mut(key) {
            let before = *counter;
            *counter += 1;
            return before;
        }
        self.counts.insert(key.to_vec(), 1);
        0
    }

    /// Number of keys that have been counted at least once
    pub fn distinct_keys(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Answers "is this row a duplicate?" against an occurrence table.
///
/// The streaming verdict is `observe`. The buffered verdict is `record` for
/// every row followed by `is_repeated` for every row.
#[derive(Debug, Clone, Default)]
pub struct DuplicateTracker {
    occurrences: OccurrenceTable,
}

impl DuplicateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Streaming step: the verdict uses the counter *before* this row.
    ///
    /// Returns `true` if a previous row with the same key matched all counted
    /// predicates. The counter advances only when `matched` is true.
    pub fn observe(&mut self, key: &[String], matched: bool) -> bool {
        if matched {
            self.occurrences.increment(key) > 0
        } else {
            self.occurrences.count(key) > 0
        }
    }

    /// Buffered first pass: count the row, discard any verdict
    pub fn record(&mut self, key: &[String], matched: bool) {
        if matched {
            self.occurrences.increment(key);
        }
    }

    /// Buffered second pass: a key that matched more than once is repeated
    pub fn is_repeated(&self, key: &[String]) -> bool {
        self.occurrences.count(key) > 1
    }

    pub fn occurrences(&self) -> &OccurrenceTable {
        &self.occurrences
    }
}
