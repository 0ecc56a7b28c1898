//! Drops repeated header rows from concatenated part files

use rowdedup_core::Row;
use tracing::debug;

use crate::filter::RowFilter;
use crate::Result;

/// Emits the first row, then drops every later row equal to it
#[derive(Debug, Default)]
pub struct StripHeaders {
    header: Option<Row>,
    dropped: usize,
}

impl StripHeaders {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RowFilter for StripHeaders {
    fn process(&mut self, row: Row, out: &mut Vec<Row>) -> Result<()> {
        match &self.header {
            None => {
                self.header = Some(row.clone());
                out.push(row);
            }
            Some(header) if *header == row => self.dropped += 1,
            Some(_) => out.push(row),
        }
        Ok(())
    }

    fn finish(&mut self, _out: &mut Vec<Row>) -> Result<()> {
        debug!("Dropped {} repeated headers", self.dropped);
        Ok(())
    }
}
