//! Left outer join against a second table
//!
//! The right-hand table is loaded into memory keyed on the join column. Each
//! left row is emitted once per matching right row, or once padded with empty
//! fields when nothing matches.

use ahash::AHashMap;
use rowdedup_core::Row;
use tracing::{debug, warn};

use crate::filter::{field, RowFilter};
use crate::{Error, Result};

/// Right-hand rows grouped by join key, key column removed
#[derive(Debug, Clone)]
pub struct RightTable {
    header: Row,
    rows: AHashMap<String, Vec<Row>>,
}

impl RightTable {
    /// Build from rows whose first row is the header.
    ///
    /// Repeated identical rows for the same key are discarded with a warning.
    pub fn build<I: IntoIterator<Item = Row>>(key: &str, rows: I) -> Result<Self> {
        let mut rows = rows.into_iter();
        let header = rows.next().ok_or(Error::MissingRow("right-hand header"))?;
        let key_index = header.iter().position(|h| h == key).ok_or_else(|| Error::UnknownColumn {
            column: key.to_string(),
            header: header.clone(),
        })?;

        let mut grouped: AHashMap<String, Vec<Row>> = AHashMap::new();
        for (index, row) in rows.enumerate() {
            let row_key = field(&row, key_index, key, index + 1)?.to_string();
            let trimmed: Row = without(&row, key_index);

            let matches = grouped.entry(row_key).or_default();
            if matches.contains(&trimmed) {
                warn!("Discarding duplicate row in right-hand table: {:?}", trimmed);
            } else {
                matches.push(trimmed);
            }
        }

        debug!("Right-hand table built with {} keys", grouped.len());
        Ok(Self {
            header: without(&header, key_index),
            rows: grouped,
        })
    }

    /// Right-hand header without the key column
    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn matches(&self, key: &str) -> Option<&[Row]> {
        self.rows.get(key).map(Vec::as_slice)
    }
}

fn without(row: &[String], skip: usize) -> Row {
    row.iter()
        .enumerate()
        .filter(|(i, _)| *i != skip)
        .map(|(_, v)| v.clone())
        .collect()
}

/// Joins the row stream (left side) against a `RightTable`
#[derive(Debug)]
pub struct LeftOuterJoin {
    key: String,
    right: RightTable,
    left_index: Option<usize>,
    rows_seen: usize,
}

impl LeftOuterJoin {
    pub fn new(key: impl Into<String>, right: RightTable) -> Self {
        Self {
            key: key.into(),
            right,
            left_index: None,
            rows_seen: 0,
        }
    }
}

impl RowFilter for LeftOuterJoin {
    fn process(&mut self, row: Row, out: &mut Vec<Row>) -> Result<()> {
        let Some(left_index) = self.left_index else {
            let index = row.iter().position(|h| *h == self.key).ok_or_else(|| Error::UnknownColumn {
                column: self.key.clone(),
                header: row.clone(),
            })?;
            self.left_index = Some(index);
            let mut header = row;
            header.extend(self.right.header().iter().cloned());
            out.push(header);
            return Ok(());
        };

        self.rows_seen += 1;
        let key = field(&row, left_index, &self.key, self.rows_seen)?;
        match self.right.matches(key) {
            Some(matches) => {
                for columns in matches {
                    let mut joined = row.clone();
                    joined.extend(columns.iter().cloned());
                    out.push(joined);
                }
            }
            None => {
                let mut joined = row;
                joined.resize(joined.len() + self.right.header().len(), String::new());
                out.push(joined);
            }
        }
        Ok(())
    }
}
