//! Conditional deduplication pipeline
//!
//! Reads a header and a row stream, compiles the predicate specification
//! against the header, and emits every row that is not a suppressed
//! duplicate, in input order.
//!
//! A row is dropped iff the tracker flags it as a duplicate *and* the
//! auxiliary match filter passes. In `AllButOne` mode this is decided in a
//! single streaming pass. In `All` mode the whole input is buffered in memory
//! first, because the verdict for the first occurrence of a key depends on
//! rows that come after it. Memory use in that mode grows with the input.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingDiagnostics};
use crate::predicate::{CompiledPredicateSet, PredicateSpec};
use crate::schema::{Row, Schema};
use crate::sink::{deliver, finish, Delivery, RowSink};
use crate::tracker::{DuplicateKey, DuplicateTracker, RetentionMode};
use crate::{Error, Result};

/// Wildcard marker used when none is configured
pub const DEFAULT_WILDCARD: &str = "_any_";

/// Pipeline statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    /// Data rows read, header excluded
    pub rows_read: usize,
    /// Data rows written, header excluded
    pub rows_emitted: usize,
    /// Duplicates suppressed
    pub duplicates_dropped: usize,
    /// Duplicates kept because the auxiliary filter did not match
    pub duplicates_retained: usize,
    /// Keys counted at least once
    pub distinct_keys: usize,
}

impl PipelineStats {
    pub fn dedup_rate(&self) -> f64 {
        if self.rows_read > 0 {
            (self.duplicates_dropped as f64 / self.rows_read as f64) * 100.0
        } else {
            0.0
        }
    }

    pub fn retention_rate(&self) -> f64 {
        if self.rows_read > 0 {
            (self.rows_emitted as f64 / self.rows_read as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// All input consumed and every retained row written
    Completed,
    /// Downstream closed its input; emission stopped early
    OutputClosed,
}

/// Outcome and statistics of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub outcome: Outcome,
    pub stats: PipelineStats,
}

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub mode: RetentionMode,
    /// Pattern meaning "any value"
    #[serde(default = "default_wildcard")]
    pub wildcard: String,
    #[serde(default)]
    pub predicates: PredicateSpec,
}

fn default_wildcard() -> String {
    DEFAULT_WILDCARD.to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: RetentionMode::AllButOne,
            wildcard: default_wildcard(),
            predicates: PredicateSpec::default(),
        }
    }
}

impl PipelineConfig {
    /// Build a configuration from the ordered argument list
    /// `mode wildcard [token pattern]...`
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        let (mode, rest) = args
            .split_first()
            .ok_or_else(|| Error::InvalidSpec("missing mode".to_string()))?;
        let (wildcard, predicates) = rest
            .split_first()
            .ok_or_else(|| Error::InvalidSpec("missing wildcard marker".to_string()))?;

        Ok(Self {
            mode: mode.as_ref().parse()?,
            wildcard: wildcard.as_ref().to_string(),
            predicates: PredicateSpec::from_flat(predicates)?,
        })
    }
}

/// A row held between the two passes of `All` mode
struct BufferedRow {
    row: Row,
    key: DuplicateKey,
    auxiliary: bool,
}

/// Deduplication pipeline bound to one header.
///
/// Owns its occurrence table, so a pipeline handles exactly one input.
pub struct Pipeline<D: DiagnosticSink = TracingDiagnostics> {
    schema: Schema,
    mode: RetentionMode,
    predicates: CompiledPredicateSet,
    tracker: DuplicateTracker,
    diagnostics: D,
    stats: PipelineStats,
}

impl<D: DiagnosticSink> Pipeline<D> {
    /// Compile `config` against `schema`.
    ///
    /// Fails with `UnknownColumn` before anything is read or written.
    pub fn new(config: &PipelineConfig, schema: Schema, mut diagnostics: D) -> Result<Self> {
        let predicates =
            CompiledPredicateSet::compile(&config.predicates, &config.wildcard, &schema)?;

        for vacuous in predicates.vacuous() {
            diagnostics.report(Diagnostic::VacuousPredicate {
                token: vacuous.token.clone(),
                pattern: vacuous.pattern.clone(),
            });
        }

        info!(
            "Deduplicating {:?} rows on {} counted and {} auxiliary columns",
            config.mode.as_str(),
            predicates.counted().len(),
            predicates.auxiliary().predicates().len()
        );

        Ok(Self {
            schema,
            mode: config.mode,
            predicates,
            tracker: DuplicateTracker::new(),
            diagnostics,
            stats: PipelineStats::default(),
        })
    }

    /// Write the header and every retained row of `rows` to `sink`.
    ///
    /// A read failure aborts the run with `Error::Read`. A closed output ends
    /// it successfully with `Outcome::OutputClosed`.
    pub fn run<I, E, W>(mut self, rows: I, sink: &mut W) -> Result<RunReport>
    where
        I: IntoIterator<Item = std::result::Result<Row, E>>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
        W: RowSink + ?Sized,
    {
        let rows = rows.into_iter().map(|row| row.map_err(|e| Error::Read(e.into())));

        let mut outcome = if deliver(sink, self.schema.names())?.is_closed() {
            Outcome::OutputClosed
        } else {
            match self.mode {
                RetentionMode::AllButOne => self.run_streaming(rows, sink)?,
                RetentionMode::All => self.run_buffered(rows, sink)?,
            }
        };

        if outcome == Outcome::Completed && finish(sink)?.is_closed() {
            outcome = Outcome::OutputClosed;
        }
        if outcome == Outcome::OutputClosed {
            self.diagnostics.report(Diagnostic::OutputClosed {
                rows_emitted: self.stats.rows_emitted,
            });
        }

        self.stats.distinct_keys = self.tracker.occurrences().distinct_keys();
        Ok(RunReport {
            outcome,
            stats: self.stats,
        })
    }

    /// Run over rows that cannot fail to read
    pub fn run_rows<I, W>(self, rows: I, sink: &mut W) -> Result<RunReport>
    where
        I: IntoIterator<Item = Row>,
        W: RowSink + ?Sized,
    {
        self.run(rows.into_iter().map(Ok::<_, std::convert::Infallible>), sink)
    }

    fn run_streaming<I, W>(&mut self, rows: I, sink: &mut W) -> Result<Outcome>
    where
        I: Iterator<Item = Result<Row>>,
        W: RowSink + ?Sized,
    {
        for (index, row) in rows.enumerate() {
            let row = row?;
            let row_number = index + 1;
            self.stats.rows_read += 1;

            let (key, matched) = self.predicates.evaluate_counted(&row, row_number)?;
            let auxiliary = self.predicates.auxiliary().matches(&row, row_number)?;
            let duplicate = self.tracker.observe(&key, matched);

            if self.suppress(duplicate, auxiliary, row_number) {
                continue;
            }
            if self.emit(sink, &row)?.is_closed() {
                return Ok(Outcome::OutputClosed);
            }
        }

        self.diagnostics.report(Diagnostic::PassComplete {
            mode: self.mode,
            pass: 1,
            rows: self.stats.rows_read,
        });
        Ok(Outcome::Completed)
    }

    fn run_buffered<I, W>(&mut self, rows: I, sink: &mut W) -> Result<Outcome>
    where
        I: Iterator<Item = Result<Row>>,
        W: RowSink + ?Sized,
    {
        let mut buffer = Vec::new();
        for (index, row) in rows.enumerate() {
            let row = row?;
            let row_number = index + 1;
            self.stats.rows_read += 1;

            let (key, matched) = self.predicates.evaluate_counted(&row, row_number)?;
            let auxiliary = self.predicates.auxiliary().matches(&row, row_number)?;
            self.tracker.record(&key, matched);
            buffer.push(BufferedRow { row, key, auxiliary });
        }

        self.diagnostics.report(Diagnostic::PassComplete {
            mode: self.mode,
            pass: 1,
            rows: buffer.len(),
        });

        for (index, buffered) in buffer.iter().enumerate() {
            let duplicate = self.tracker.is_repeated(&buffered.key);
            if self.suppress(duplicate, buffered.auxiliary, index + 1) {
                continue;
            }
            if self.emit(sink, &buffered.row)?.is_closed() {
                return Ok(Outcome::OutputClosed);
            }
        }

        self.diagnostics.report(Diagnostic::PassComplete {
            mode: self.mode,
            pass: 2,
            rows: buffer.len(),
        });
        Ok(Outcome::Completed)
    }

    /// Apply the suppression rule and record it in the statistics
    fn suppress(&mut self, duplicate: bool, auxiliary: bool, row_number: usize) -> bool {
        match (duplicate, auxiliary) {
            (true, true) => {
                debug!("Dropping duplicate data row {}", row_number);
                self.stats.duplicates_dropped += 1;
                true
            }
            (true, false) => {
                debug!("Keeping duplicate data row {}: auxiliary filter failed", row_number);
                self.stats.duplicates_retained += 1;
                false
            }
            _ => false,
        }
    }

    fn emit<W: RowSink + ?Sized>(&mut self, sink: &mut W, row: &[String]) -> Result<Delivery> {
        let delivery = deliver(sink, row)?;
        if delivery == Delivery::Delivered {
            self.stats.rows_emitted += 1;
        }
        Ok(delivery)
    }
}

/// Builder for a deduplication pipeline
pub struct PipelineBuilder {
    config: PipelineConfig,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    pub fn from_config(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn mode(mut self, mode: RetentionMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn wildcard(mut self, wildcard: impl Into<String>) -> Self {
        self.config.wildcard = wildcard.into();
        self
    }

    pub fn predicates(mut self, spec: PredicateSpec) -> Self {
        self.config.predicates = spec;
        self
    }

    /// Append one `(token, pattern)` pair
    pub fn predicate(mut self, column: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.config.predicates.push(column, pattern);
        self
    }

    /// Build a pipeline that reports diagnostics through `tracing`
    pub fn build(self, schema: Schema) -> Result<Pipeline> {
        Pipeline::new(&self.config, schema, TracingDiagnostics)
    }

    pub fn build_with_diagnostics<D: DiagnosticSink>(
        self,
        schema: Schema,
        diagnostics: D,
    ) -> Result<Pipeline<D>> {
        Pipeline::new(&self.config, schema, diagnostics)
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
