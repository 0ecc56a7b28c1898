//! Field delimiters understood by the readers and writers

use std::path::Path;

/// Delimited text flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// Comma separated values
    #[default]
    Csv,
    /// Pipe separated values
    Psv,
}

impl Dialect {
    pub fn delimiter(&self) -> u8 {
        match self {
            Dialect::Csv => b',',
            Dialect::Psv => b'|',
        }
    }

    /// Guess the dialect from a file name, looking through a trailing `.gz`.
    ///
    /// Anything that is not `.psv` is read as CSV.
    pub fn detect<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let stem_path;
        let path = match path.extension().and_then(|e| e.to_str()) {
            Some("gz") => {
                stem_path = path.with_extension("");
                stem_path.as_path()
            }
            _ => path,
        };

        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("psv") => Dialect::Psv,
            _ => Dialect::Csv,
        }
    }
}
