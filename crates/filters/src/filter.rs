//! Row filter trait and the loop that drives a filter over a row stream

use rowdedup_core::sink::{deliver, finish, Delivery, RowSink};
use rowdedup_core::{Outcome, Row};
use tracing::info;

use crate::{Error, Result};

/// A transform over a row stream whose first row is a header.
///
/// Output rows are pushed onto `out`; a call may push none, one or many.
pub trait RowFilter {
    fn process(&mut self, row: Row, out: &mut Vec<Row>) -> Result<()>;

    /// Called once after the last input row
    fn finish(&mut self, _out: &mut Vec<Row>) -> Result<()> {
        Ok(())
    }
}

/// Counters for one filter run; both include the header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterReport {
    pub outcome: Outcome,
    pub rows_read: usize,
    pub rows_written: usize,
}

/// Look up `index` in `row`, failing with `ColumnLookup` when the row is too short
pub(crate) fn field<'r>(
    row: &'r [String],
    index: usize,
    column: &str,
    row_number: usize,
) -> Result<&'r str> {
    row.get(index)
        .map(String::as_str)
        .ok_or_else(|| Error::ColumnLookup {
            column: column.to_string(),
            index,
            row: row_number,
            width: row.len(),
        })
}

fn drain<W: RowSink + ?Sized>(
    pending: &mut Vec<Row>,
    sink: &mut W,
    report: &mut FilterReport,
) -> Result<Delivery> {
    for row in pending.drain(..) {
        if deliver(sink, &row)?.is_closed() {
            return Ok(Delivery::Closed);
        }
        report.rows_written += 1;
    }
    Ok(Delivery::Delivered)
}

/// Push every row of `rows` through `filter` into `sink`.
///
/// A closed output stops the run early and successfully.
pub fn run_filter<F, I, E, W>(filter: &mut F, rows: I, sink: &mut W) -> Result<FilterReport>
where
    F: RowFilter + ?Sized,
    I: IntoIterator<Item = std::result::Result<Row, E>>,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
    W: RowSink + ?Sized,
{
    let mut report = FilterReport {
        outcome: Outcome::Completed,
        rows_read: 0,
        rows_written: 0,
    };
    let mut pending = Vec::new();

    for row in rows {
        let row = row.map_err(|e| rowdedup_core::Error::Read(e.into()))?;
        report.rows_read += 1;
        filter.process(row, &mut pending)?;
        if drain(&mut pending, sink, &mut report)?.is_closed() {
            return Ok(closed(report));
        }
    }

    filter.finish(&mut pending)?;
    if drain(&mut pending, sink, &mut report)?.is_closed() || finish(sink)?.is_closed() {
        return Ok(closed(report));
    }
    Ok(report)
}

/// Run over rows that cannot fail to read
pub fn run_filter_rows<F, I, W>(filter: &mut F, rows: I, sink: &mut W) -> Result<FilterReport>
where
    F: RowFilter + ?Sized,
    I: IntoIterator<Item = Row>,
    W: RowSink + ?Sized,
{
    run_filter(filter, rows.into_iter().map(Ok::<_, std::convert::Infallible>), sink)
}

fn closed(mut report: FilterReport) -> FilterReport {
    info!("Output closed downstream after {} rows; stopping", report.rows_written);
    report.outcome = Outcome::OutputClosed;
    report
}
