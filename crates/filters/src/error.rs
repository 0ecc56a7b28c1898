//! Error types for filters

use thiserror::Error;

/// Filter errors
#[derive(Error, Debug)]
pub enum Error {
    #[error("Column {column:?} not found in header {header:?}")]
    UnknownColumn { column: String, header: Vec<String> },

    #[error("Input ended before the {0} row")]
    MissingRow(&'static str),

    #[error("Row {row} has {width} fields; column {column:?} is at index {index}")]
    ColumnLookup {
        column: String,
        index: usize,
        row: usize,
        width: usize,
    },

    #[error("Could not use {value:?} from column {column:?} as a number")]
    InvalidNumber { column: String, value: String },

    #[error("Failed to re-parse PSV row {row}: {source}")]
    Psv {
        row: usize,
        #[source]
        source: csv::Error,
    },

    #[error(transparent)]
    Core(#[from] rowdedup_core::Error),
}

/// Result type alias for filter operations
pub type Result<T> = std::result::Result<T, Error>;
