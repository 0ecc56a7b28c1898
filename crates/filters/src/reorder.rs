//! Column reordering for part files written with a shuffled column order
//!
//! The first input row is the reference order; the second is the header the
//! data was actually written with. Every later row, including repeated headers
//! from concatenated part files, is rearranged into reference order.

use rowdedup_core::Row;
use tracing::debug;

use crate::filter::{field, RowFilter};
use crate::{Error, Result};

#[derive(Debug)]
enum State {
    AwaitingReference,
    AwaitingHeader { reference: Row },
    Reordering { mapping: Vec<usize>, reference: Row },
}

/// Rearranges leading columns to match a reference header
#[derive(Debug)]
pub struct Reorder {
    state: State,
    rows_seen: usize,
}

impl Default for Reorder {
    fn default() -> Self {
        Self {
            state: State::AwaitingReference,
            rows_seen: 0,
        }
    }
}

impl Reorder {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Position in `actual` of each `reference` column, identity tail trimmed
pub fn build_mapping(reference: &[String], actual: &[String]) -> Result<Vec<usize>> {
    let mut mapping = reference
        .iter()
        .map(|column| {
            actual
                .iter()
                .position(|h| h == column)
                .ok_or_else(|| Error::UnknownColumn {
                    column: column.clone(),
                    header: actual.to_vec(),
                })
        })
        .collect::<Result<Vec<_>>>()?;

    while mapping.last().is_some_and(|&last| last == mapping.len() - 1) {
        mapping.pop();
    }
    Ok(mapping)
}

impl RowFilter for Reorder {
    fn process(&mut self, row: Row, out: &mut Vec<Row>) -> Result<()> {
        match &mut self.state {
            State::AwaitingReference => {
                debug!("Reference order: {:?}", row);
                self.state = State::AwaitingHeader { reference: row };
            }
            State::AwaitingHeader { reference } => {
                let reference = std::mem::take(reference);
                let mapping = build_mapping(&reference, &row)?;
                debug!("Actual header {:?}; mapping {:?}", row, mapping);

                let mut header = reference.clone();
                header.extend(row.iter().skip(reference.len()).cloned());
                out.push(header);
                self.state = State::Reordering { mapping, reference };
            }
            State::Reordering { mapping, reference } => {
                self.rows_seen += 1;
                let mut reordered = Vec::with_capacity(mapping.len());
                for (&source, column) in mapping.iter().zip(reference.iter()) {
                    reordered.push(field(&row, source, column, self.rows_seen)?.to_string());
                }
                let mut row = row;
                let end = mapping.len().min(row.len());
                row.splice(..end, reordered);
                out.push(row);
            }
        }
        Ok(())
    }

    fn finish(&mut self, _out: &mut Vec<Row>) -> Result<()> {
        match self.state {
            State::AwaitingReference => Err(Error::MissingRow("reference header")),
            State::AwaitingHeader { .. } => Err(Error::MissingRow("actual header")),
            State::Reordering { .. } => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::run_filter_rows;

    fn row(values: &[&str]) -> Row {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn strings(values: &[&str]) -> Vec<String> {
        row(values)
    }

    #[test]
    fn test_mapping_trims_identity_tail() {
        let mapping =
            build_mapping(&strings(&["a", "b", "c"]), &strings(&["b", "a", "c", "d"])).unwrap();
        assert_eq!(mapping, vec![1, 0]);

        let identity = build_mapping(&strings(&["a", "b"]), &strings(&["a", "b", "c"])).unwrap();
        assert!(identity.is_empty());
    }

    #[test]
    fn test_reorders_rows() {
        let mut filter = Reorder::new();
        let mut out: Vec<Row> = Vec::new();
        run_filter_rows(
            &mut filter,
            vec![
                row(&["a", "b", "c"]),
                row(&["b", "a", "c", "d", "e"]),
                row(&["2", "1", "3", "4", "5"]),
                row(&["b", "a", "c", "d", "e"]),
            ],
            &mut out,
        )
        .unwrap();

        assert_eq!(
            out,
            vec![
                row(&["a", "b", "c", "d", "e"]),
                row(&["1", "2", "3", "4", "5"]),
                row(&["a", "b", "c", "d", "e"]),
            ]
        );
    }

    #[test]
    fn test_unknown_reference_column() {
        let mut filter = Reorder::new();
        let mut out: Vec<Row> = Vec::new();
        let input = vec![row(&["a", "z"]), row(&["a", "b"])];
        let result = run_filter_rows(&mut filter, input, &mut out);

        assert!(matches!(result, Err(Error::UnknownColumn { ref column, .. }) if column == "z"));
        assert!(out.is_empty());
    }

    #[test]
    fn test_short_row() {
        let mut filter = Reorder::new();
        let mut out: Vec<Row> = Vec::new();
        let result = run_filter_rows(
            &mut filter,
            vec![row(&["a", "b"]), row(&["b", "a"]), row(&["x"])],
            &mut out,
        );

        assert!(matches!(result, Err(Error::ColumnLookup { row: 1, .. })));
    }

    #[test]
    fn test_missing_header_rows() {
        let mut filter = Reorder::new();
        let mut out: Vec<Row> = Vec::new();
        let result = run_filter_rows(&mut filter, vec![row(&["a"])], &mut out);

        assert!(matches!(result, Err(Error::MissingRow(_))));
    }
}
