//! Streaming reader for delimited text
//!
//! Reads a header row followed by data rows. Row widths are not enforced
//! here; checking them is the job of whatever consumes the rows.

use crate::{Dialect, Error, Result};
use csv::StringRecord;
use flate2::read::GzDecoder;
use rowdedup_core::Row;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tracing::debug;

/// Read buffer size for the underlying csv reader
const BUFFER_SIZE: usize = 64 * 1024;

/// Adds a final `\n` to a source that ends without one, so that every
/// record is followed by a terminator
struct Terminated<R> {
    inner: R,
    last: Option<u8>,
    done: bool,
}

impl<R: Read> Read for Terminated<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.done || buf.is_empty() {
            return Ok(0);
        }
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.last = Some(buf[n - 1]);
            return Ok(n);
        }
        self.done = true;
        match self.last {
            Some(byte) if byte != b'\n' => {
                buf[0] = b'\n';
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}

/// Streaming reader over delimited rows.
///
/// Blank lines are returned as rows with no fields, the same as any other
/// short row. Lines may end in `\n` or `\r\n`.
pub struct DelimitedReader<R: Read> {
    reader: csv::Reader<Terminated<R>>,
    record: StringRecord,
    /// Blank lines still to be returned before `pending`
    blank_lines: u64,
    pending: Option<Row>,
}

impl DelimitedReader<Box<dyn Read>> {
    /// Open a file, decompressing it when the name ends in `.gz`
    pub fn open<P: AsRef<Path>>(path: P, dialect: Dialect) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;

        let reader: Box<dyn Read> = match path.extension().and_then(|e| e.to_str()) {
            Some("gz") => {
                debug!("Opening gzip-compressed {:?} file: {:?}", dialect, path);
                Box::new(GzDecoder::new(file))
            }
            _ => {
                debug!("Opening plain {:?} file: {:?}", dialect, path);
                Box::new(file)
            }
        };
        Ok(Self::new(reader, dialect))
    }

    /// Open `path`, or standard input when it is `None` or `-`
    pub fn open_input(path: Option<&Path>, dialect: Dialect) -> Result<Self> {
        match path {
            Some(path) if path != Path::new("-") => Self::open(path, dialect),
            _ => {
                debug!("Reading {:?} rows from stdin", dialect);
                let reader: Box<dyn Read> = Box::new(io::stdin());
                Ok(Self::new(reader, dialect))
            }
        }
    }
}

impl<R: Read> DelimitedReader<R> {
    /// Create a reader over any `Read` source
    pub fn new(reader: R, dialect: Dialect) -> Self {
        // Blank line counting needs each record's `\n` consumed by its own
        // read, so `\r` is left in the data and stripped in `current_row`
        let reader = csv::ReaderBuilder::new()
            .delimiter(dialect.delimiter())
            .terminator(csv::Terminator::Any(b'\n'))
            .has_headers(false)
            .flexible(true)
            .buffer_capacity(BUFFER_SIZE)
            .from_reader(Terminated {
                inner: reader,
                last: None,
                done: false,
            });

        Self {
            reader,
            record: StringRecord::new(),
            blank_lines: 0,
            pending: None,
        }
    }

    /// Read the header row. Fails with `MissingHeader` on empty input.
    ///
    /// Must be called before iterating; otherwise the header is returned as
    /// the first row.
    pub fn read_header(&mut self) -> Result<Row> {
        self.next().unwrap_or(Err(Error::MissingHeader))
    }

    fn current_row(&self) -> Row {
        // a `\r\n` blank line
        if self.record.len() == 1 && &self.record[0] == "\r" {
            return Row::new();
        }
        let mut row: Row = self.record.iter().map(str::to_string).collect();
        if let Some(last) = row.last_mut() {
            if last.ends_with('\r') {
                last.pop();
            }
        }
        row
    }

    /// Return the first of `skipped` blank lines now, queueing the rest ahead of `row`
    fn emit(&mut self, skipped: u64, row: Option<Row>) -> Option<Result<Row>> {
        if skipped == 0 {
            return row.map(Ok);
        }
        debug!("Returning {} blank lines as empty rows", skipped);
        self.blank_lines = skipped - 1;
        self.pending = row;
        Some(Ok(Row::new()))
    }
}

impl<R: Read> Iterator for DelimitedReader<R> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.blank_lines > 0 {
            self.blank_lines -= 1;
            return Some(Ok(Row::new()));
        }
        if let Some(row) = self.pending.take() {
            return Some(Ok(row));
        }

        // The csv reader skips empty lines but still counts them, so any
        // newline consumed beyond the record's own terminator and the ones
        // quoted inside its fields belongs to a blank line.
        let line = self.reader.position().line();
        match self.reader.read_record(&mut self.record) {
            Ok(true) => {
                let consumed = self.reader.position().line() - line;
                let quoted = self
                    .record
                    .iter()
                    .map(|field| field.bytes().filter(|&b| b == b'\n').count() as u64)
                    .sum::<u64>();
                let row = self.current_row();
                self.emit(consumed.saturating_sub(quoted + 1), Some(row))
            }
            Ok(false) => {
                let consumed = self.reader.position().line() - line;
                self.emit(consumed, None)
            }
            Err(e) => Some(Err(Error::Csv(e))),
        }
    }
}
