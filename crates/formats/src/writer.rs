//! CSV writer used as the output of every filter

use crate::{Dialect, Result};
use rowdedup_core::RowSink;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use tracing::debug;

/// Writes rows as delimited text with `\n` line endings
pub struct DelimitedWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl DelimitedWriter<Box<dyn Write>> {
    /// Create `path`, or write to standard output when it is `None` or `-`
    pub fn create_output(path: Option<&Path>, dialect: Dialect) -> Result<Self> {
        let writer: Box<dyn Write> = match path {
            Some(path) if path != Path::new("-") => {
                debug!("Writing {:?} rows to {:?}", dialect, path);
                Box::new(File::create(path)?)
            }
            _ => Box::new(io::stdout()),
        };
        Ok(Self::new(writer, dialect))
    }
}

impl<W: Write> DelimitedWriter<W> {
    pub fn new(writer: W, dialect: Dialect) -> Self {
        let writer = csv::WriterBuilder::new()
            .delimiter(dialect.delimiter())
            .terminator(csv::Terminator::Any(b'\n'))
            .flexible(true)
            .from_writer(writer);
        Self { writer }
    }

    /// Flush and return the underlying writer
    pub fn into_inner(self) -> io::Result<W> {
        self.writer.into_inner().map_err(|e| e.into_error())
    }
}

/// Recover the `io::Error` behind a csv error so a broken pipe stays recognizable
fn into_io_error(err: csv::Error) -> io::Error {
    if !err.is_io_error() {
        return io::Error::new(io::ErrorKind::InvalidData, err);
    }
    match err.into_kind() {
        csv::ErrorKind::Io(e) => e,
        other => io::Error::new(io::ErrorKind::Other, format!("{:?}", other)),
    }
}

impl<W: Write> RowSink for DelimitedWriter<W> {
    fn write_row(&mut self, row: &[String]) -> io::Result<()> {
        self.writer.write_record(row).map_err(into_io_error)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn written(rows: &[Vec<String>], dialect: Dialect) -> String {
        let mut writer = DelimitedWriter::new(Vec::new(), dialect);
        for r in rows {
            writer.write_row(r).unwrap();
        }
        String::from_utf8(writer.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_writes_csv_with_newlines() {
        let out = written(&[row(&["a", "b"]), row(&["1", "2"])], Dialect::Csv);
        assert_eq!(out, "a,b\n1,2\n");
    }

    #[test]
    fn test_quotes_only_when_needed() {
        let out = written(&[row(&["Smith, J", "said \"hi\"", "plain"])], Dialect::Csv);
        assert_eq!(out, "\"Smith, J\",\"said \"\"hi\"\"\",plain\n");
    }

    #[test]
    fn test_psv_output() {
        let out = written(&[row(&["a", "b,c"])], Dialect::Psv);
        assert_eq!(out, "a|b,c\n");
    }

    /// Refuses every write with a broken pipe
    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[test]
    fn test_broken_pipe_surfaces_on_flush() {
        let mut writer = DelimitedWriter::new(ClosedPipe, Dialect::Csv);
        // rows are buffered; the failure shows up when the buffer is flushed
        writer.write_row(&row(&["a"])).unwrap();
        let err = RowSink::flush(&mut writer).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
