//! Row output and downstream-closure handling
//!
//! A closed downstream (broken pipe, e.g. `| head`) stops output without
//! failing the run. Every other write error is fatal.

use std::io;

use crate::schema::Row;
use crate::{Error, Result};

/// Destination for emitted rows.
pub trait RowSink {
    fn write_row(&mut self, row: &[String]) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl RowSink for Vec<Row> {
    fn write_row(&mut self, row: &[String]) -> io::Result<()> {
        self.push(row.to_vec());
        Ok(())
    }
}

impl<S: RowSink + ?Sized> RowSink for &mut S {
    fn write_row(&mut self, row: &[String]) -> io::Result<()> {
        (**self).write_row(row)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// Result of handing a row to a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// Downstream went away; nothing more should be written
    Closed,
}

impl Delivery {
    pub fn is_closed(&self) -> bool {
        matches!(self, Delivery::Closed)
    }
}

/// Whether `err` means the reading end of the output has been closed
pub fn is_output_closed(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::BrokenPipe
}

fn settle(result: io::Result<()>) -> Result<Delivery> {
    match result {
        Ok(()) => Ok(Delivery::Delivered),
        Err(e) if is_output_closed(&e) => Ok(Delivery::Closed),
        Err(e) => Err(Error::Io(e)),
    }
}

/// Write one row, mapping a closed output to `Delivery::Closed`
pub fn deliver<S: RowSink + ?Sized>(sink: &mut S, row: &[String]) -> Result<Delivery> {
    settle(sink.write_row(row))
}

/// Flush the sink, mapping a closed output to `Delivery::Closed`
pub fn finish<S: RowSink + ?Sized>(sink: &mut S) -> Result<Delivery> {
    settle(sink.flush())
}
