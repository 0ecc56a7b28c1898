//! Error types for delimited readers and writers

use thiserror::Error;

/// Format errors
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Delimited parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Input has no header row")]
    MissingHeader,
}

/// Result type alias for format operations
pub type Result<T> = std::result::Result<T, Error>;
