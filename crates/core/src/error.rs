//! Error types for the deduplication engine

use thiserror::Error;

/// Deduplication engine errors
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown column {column:?}; known columns are {schema:?}")]
    UnknownColumn { column: String, schema: Vec<String> },

    #[error("Data row {row} has {width} fields; column {column:?} is at index {index}")]
    ColumnLookup {
        column: String,
        index: usize,
        row: usize,
        width: usize,
    },

    #[error("Invalid predicate specification: {0}")]
    InvalidSpec(String),

    #[error("Failed to read input: {0}")]
    Read(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;
