//! Conditional deduplication of delimited rows
//!
//! This crate compiles a per-column predicate specification against a header,
//! counts occurrences of duplicate keys, and streams retained rows to a sink
//! under one of two retention modes.

pub mod diagnostics;
pub mod error;
pub mod match_filter;
pub mod pipeline;
pub mod predicate;
pub mod schema;
pub mod sink;
pub mod tracker;

pub use diagnostics::{Diagnostic, DiagnosticSink, TracingDiagnostics};
pub use error::{Error, Result};
pub use pipeline::{Outcome, Pipeline, PipelineBuilder, PipelineConfig, PipelineStats, RunReport};
pub use predicate::{CompiledPredicateSet, PredicateSpec, PredicateToken};
pub use schema::{Row, Schema};
pub use sink::{Delivery, RowSink};
pub use tracker::{DuplicateTracker, RetentionMode};
