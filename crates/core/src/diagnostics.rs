//! Diagnostic events raised while a pipeline runs
//!
//! The pipeline never logs through global state directly; it reports to a
//! `DiagnosticSink` handed to it at construction.

use tracing::{info, warn};

use crate::tracker::RetentionMode;

/// Something worth telling the operator about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A negated predicate compared against the wildcard and can never match
    VacuousPredicate { token: String, pattern: String },
    /// A full pass over the input finished
    PassComplete {
        mode: RetentionMode,
        pass: usize,
        rows: usize,
    },
    /// Downstream closed its input; emission stopped after `rows_emitted` data rows
    OutputClosed { rows_emitted: usize },
}

/// Receiver for pipeline diagnostics
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn report(&mut self, diagnostic: Diagnostic) {
        match diagnostic {
            Diagnostic::VacuousPredicate { token, pattern } => warn!(
                "Predicate {:?} negates the wildcard {:?} and never matches",
                token, pattern
            ),
            Diagnostic::PassComplete { mode, pass, rows } => {
                info!("Pass {} ({}) complete: {} rows", pass, mode, rows)
            }
            Diagnostic::OutputClosed { rows_emitted } => info!(
                "Output closed downstream after {} rows; stopping",
                rows_emitted
            ),
        }
    }
}

/// Collects diagnostics in memory
impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

impl<D: DiagnosticSink + ?Sized> DiagnosticSink for &mut D {
    fn report(&mut self, diagnostic: Diagnostic) {
        (**self).report(diagnostic)
    }
}
