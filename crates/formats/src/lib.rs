//! Delimited text readers and writers
//!
//! Streaming CSV/PSV reading with transparent gzip decompression, and a CSV
//! writer that plugs into the deduplication pipeline as a row sink.

pub mod dialect;
pub mod error;
pub mod reader;
pub mod writer;

pub use dialect::Dialect;
pub use error::{Error, Result};
pub use reader::DelimitedReader;
pub use writer::DelimitedWriter;
