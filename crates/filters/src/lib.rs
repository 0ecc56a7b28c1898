//! Row filters for cleaning delimited tables
//!
//! Each filter consumes a row stream whose first row is a header and produces
//! another. `run_filter` drives any `RowFilter` from a reader into a sink.

pub mod calculate;
pub mod digits;
pub mod error;
pub mod filter;
pub mod headers;
pub mod join;
pub mod psv;
pub mod reorder;

pub use calculate::Calculate;
pub use digits::TrimDigits;
pub use error::{Error, Result};
pub use filter::{run_filter, run_filter_rows, FilterReport, RowFilter};
pub use headers::StripHeaders;
pub use join::{LeftOuterJoin, RightTable};
pub use psv::{BadPsvRepair, PsvPassthrough};
pub use reorder::Reorder;
