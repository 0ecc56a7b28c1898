//! Pipe-separated input repair
//!
//! `PsvPassthrough` re-emits PSV rows unchanged so they are written as CSV.
//!
//! `BadPsvRepair` handles files where every line was wrapped in an extra set
//! of quotes, so that each line parses as a single field holding the real
//! PSV record. It buffers the whole input, so it is meant for small files.

use csv::StringRecord;
use rowdedup_core::Row;
use tracing::debug;

use crate::filter::RowFilter;
use crate::{Error, Result};

/// Passes rows through untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct PsvPassthrough;

impl RowFilter for PsvPassthrough {
    fn process(&mut self, row: Row, out: &mut Vec<Row>) -> Result<()> {
        out.push(row);
        Ok(())
    }
}

/// Unwraps double-quoted PSV lines and pads short rows
#[derive(Debug, Default)]
pub struct BadPsvRepair {
    rows: Vec<Row>,
}

impl BadPsvRepair {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Parse one line of PSV text into its fields
fn parse_psv_line(line: &str, row_number: usize) -> Result<Row> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'|')
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());

    let mut record = StringRecord::new();
    match reader.read_record(&mut record) {
        Ok(true) => Ok(record.iter().map(str::to_string).collect()),
        Ok(false) => Ok(Vec::new()),
        Err(source) => Err(Error::Psv {
            row: row_number,
            source,
        }),
    }
}

impl RowFilter for BadPsvRepair {
    fn process(&mut self, row: Row, _out: &mut Vec<Row>) -> Result<()> {
        self.rows.push(row);
        Ok(())
    }

    fn finish(&mut self, out: &mut Vec<Row>) -> Result<()> {
        let rows = std::mem::take(&mut self.rows);
        let Some(first) = rows.first() else {
            return Ok(());
        };

        if first.len() > 1 {
            debug!("First row has {} fields; input is not wrapped", first.len());
            out.extend(rows);
            return Ok(());
        }

        let mut width = None;
        let mut padded = 0;
        for (index, row) in rows.iter().enumerate() {
            let line = row.first().map(String::as_str).unwrap_or("");
            let mut fields = parse_psv_line(line, index + 1)?;
            let header_width = *width.get_or_insert(fields.len());
            if fields.len() < header_width {
                padded += 1;
                fields.resize(header_width, String::new());
            }
            out.push(fields);
        }
        debug!("Unwrapped {} rows, padded {} short rows", rows.len(), padded);
        Ok(())
    }
}
