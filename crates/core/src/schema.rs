//! Column schema taken from a header row

use ahash::AHashMap;
use tracing::debug;

use crate::{Error, Result};

/// A single row of field values.
pub type Row = Vec<String>;

/// Ordered column names plus a name → position index.
#[derive(Debug, Clone)]
pub struct Schema {
    names: Vec<String>,
    positions: AHashMap<String, usize>,
}

impl Schema {
    /// Build a schema from a header row.
    ///
    /// Column names are expected to be unique. If a name repeats, lookups
    /// resolve to its first position.
    pub fn new(names: Vec<String>) -> Self {
        let mut positions = AHashMap::with_capacity(names.len());
        for (index, name) in names.iter().enumerate() {
            if positions.contains_key(name) {
                debug!("Header repeats column {:?} at index {}", name, index);
                continue;
            }
            positions.insert(name.clone(), index);
        }
        Self { names, positions }
    }

    /// Position of `name`, if it is a column of this schema.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Position of `name`, or `UnknownColumn` reporting the offending token.
    pub fn require(&self, name: &str, token: &str) -> Result<usize> {
        self.index_of(name).ok_or_else(|| Error::UnknownColumn {
            column: token.to_string(),
            schema: self.names.clone(),
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl From<Vec<String>> for Schema {
    fn from(names: Vec<String>) -> Self {
        Self::new(names)
    }
}
