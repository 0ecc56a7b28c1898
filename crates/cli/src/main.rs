//! rowdedup CLI
//!
//! Row filters for cleaning delimited tables in a shell pipeline. Every
//! subcommand reads rows from a file or stdin and writes CSV to a file or
//! stdout; logs and summaries go to stderr.

mod config;

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use rowdedup_core::{Outcome, PipelineBuilder, PipelineConfig, PipelineStats, Row, Schema};
use rowdedup_filters::{
    run_filter, BadPsvRepair, Calculate, FilterReport, LeftOuterJoin, PsvPassthrough, Reorder,
    RightTable, RowFilter, StripHeaders, TrimDigits,
};
use rowdedup_formats::{DelimitedReader, DelimitedWriter, Dialect};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use config::load_dedup_config;

#[derive(Parser)]
#[command(name = "rowdedup")]
#[command(
    version,
    about = "Conditional deduplication and cleanup of delimited tables",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print the run summary as JSON on stderr
    #[arg(long, global = true)]
    json: bool,
}

/// Input and output shared by every row filter
#[derive(Args, Debug, Clone)]
struct IoArgs {
    /// Input file (`-` or omitted for stdin, `.gz` decompressed)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output file (`-` or omitted for stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Read pipe-separated input (implied by a `.psv` input name)
    #[arg(long)]
    psv: bool,
}

impl IoArgs {
    fn dialect(&self) -> Dialect {
        match &self.input {
            _ if self.psv => Dialect::Psv,
            Some(path) => Dialect::detect(path),
            None => Dialect::Csv,
        }
    }

    fn describe(path: &Option<PathBuf>, fallback: &str) -> String {
        match path {
            Some(path) if path != Path::new("-") => path.display().to_string(),
            _ => fallback.to_string(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Remove duplicate rows under per-column predicates
    ///
    /// Arguments are MODE WILDCARD then TOKEN PATTERN pairs, e.g.
    /// `rowdedup dedup "all but one" _any_ id _any_ '&!status' closed`.
    /// Options must come before the positional arguments.
    Dedup {
        /// Mode ("all" or "all but one"), wildcard marker, then token/pattern pairs
        #[arg(
            value_name = "MODE WILDCARD [TOKEN PATTERN]...",
            num_args = 2..,
            allow_hyphen_values = true,
            required_unless_present = "config",
            conflicts_with = "config"
        )]
        arguments: Vec<String>,

        /// Load mode, wildcard and predicates from a YAML or TOML file
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        io: IoArgs,
    },

    /// Convert pipe-separated input to CSV
    FixPsv {
        /// Unwrap lines that were quoted whole and pad short rows (buffers the input)
        #[arg(long)]
        bad: bool,

        #[command(flatten)]
        io: IoArgs,
    },

    /// Set a column to the sum of other columns; prefix a column with `-` to subtract
    Calculate {
        /// Result column, appended when absent from the header
        result: String,

        /// Operand columns
        #[arg(num_args = 1.., allow_hyphen_values = true)]
        columns: Vec<String>,

        #[command(flatten)]
        io: IoArgs,
    },

    /// Left outer join the input against a second table
    Join {
        /// Column present in both headers
        key: String,

        /// Right-hand table, loaded into memory
        right: PathBuf,

        #[command(flatten)]
        io: IoArgs,
    },

    /// Drop repeats of the first row from concatenated part files
    StripHeaders {
        #[command(flatten)]
        io: IoArgs,
    },

    /// Reorder columns to match a reference header given as the first row
    Reorder {
        #[command(flatten)]
        io: IoArgs,
    },

    /// Rewrite numeric fields in their shortest form
    TrimDigits {
        /// Also strip leading zeros from integers
        #[arg(long)]
        ints: bool,

        /// Write zero values as empty fields
        #[arg(long)]
        null_zeroes: bool,

        #[command(flatten)]
        io: IoArgs,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging; stdout carries data
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_ansi(!cli.json)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Dedup { arguments, config, io } => {
            let config = match config {
                Some(path) => load_dedup_config(&path)?,
                None => PipelineConfig::from_args(&arguments).context("Invalid dedup arguments")?,
            };
            dedup(config, &io, cli.json)?;
        }
        Commands::FixPsv { bad, io } => {
            let dialect = Dialect::Psv;
            if bad {
                apply_filter("fix-psv --bad", &mut BadPsvRepair::new(), &io, dialect, cli.json)?;
            } else {
                apply_filter("fix-psv", &mut PsvPassthrough, &io, dialect, cli.json)?;
            }
        }
        Commands::Calculate { result, columns, io } => {
            let mut filter = Calculate::new(result, &columns);
            apply_filter("calculate", &mut filter, &io, io.dialect(), cli.json)?;
        }
        Commands::Join { key, right, io } => {
            let right = load_right_table(&key, &right)?;
            let mut filter = LeftOuterJoin::new(key, right);
            apply_filter("join", &mut filter, &io, io.dialect(), cli.json)?;
        }
        Commands::StripHeaders { io } => {
            apply_filter("strip-headers", &mut StripHeaders::new(), &io, io.dialect(), cli.json)?;
        }
        Commands::Reorder { io } => {
            apply_filter("reorder", &mut Reorder::new(), &io, io.dialect(), cli.json)?;
        }
        Commands::TrimDigits { ints, null_zeroes, io } => {
            let mut filter = TrimDigits::new(ints, null_zeroes);
            apply_filter("trim-digits", &mut filter, &io, io.dialect(), cli.json)?;
        }
        Commands::Completions { shell } => {
            generate_completions(shell);
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct DedupSummary<'a> {
    input: String,
    output: String,
    outcome: Outcome,
    #[serde(flatten)]
    stats: &'a PipelineStats,
    dedup_rate: f64,
    retention_rate: f64,
}

fn dedup(config: PipelineConfig, io: &IoArgs, json_output: bool) -> Result<()> {
    let input = IoArgs::describe(&io.input, "stdin");
    let output = IoArgs::describe(&io.output, "stdout");

    info!("Starting deduplication");
    info!("  Input: {}", input);
    info!("  Output: {}", output);
    info!("  Mode: {}", config.mode);
    info!("  Predicates: {}", config.predicates.len());

    let mut reader = DelimitedReader::open_input(io.input.as_deref(), io.dialect())
        .with_context(|| format!("Failed to open input: {}", input))?;
    let header = reader
        .read_header()
        .with_context(|| format!("Failed to read header from {}", input))?;

    let pipeline = PipelineBuilder::from_config(config)
        .build(Schema::new(header))
        .context("Failed to compile predicates")?;

    let mut writer = DelimitedWriter::create_output(io.output.as_deref(), Dialect::Csv)
        .with_context(|| format!("Failed to create output: {}", output))?;
    let report = pipeline.run(&mut reader, &mut writer).context("Deduplication failed")?;

    let stats = &report.stats;
    if json_output {
        let summary = DedupSummary {
            input,
            output,
            outcome: report.outcome,
            stats,
            dedup_rate: stats.dedup_rate(),
            retention_rate: stats.retention_rate(),
        };
        eprintln!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        info!("Deduplication finished ({:?})", report.outcome);
        info!("  Rows read: {}", stats.rows_read);
        info!("  Rows emitted: {}", stats.rows_emitted);
        info!(
            "  Duplicates dropped: {} ({:.2}%)",
            stats.duplicates_dropped,
            stats.dedup_rate()
        );
        info!("  Duplicates retained: {}", stats.duplicates_retained);
        info!("  Distinct keys: {}", stats.distinct_keys);
    }

    Ok(())
}

fn load_right_table(key: &str, path: &Path) -> Result<RightTable> {
    let reader = DelimitedReader::open(path, Dialect::detect(path))
        .with_context(|| format!("Failed to open right-hand table: {}", path.display()))?;
    let rows = reader
        .collect::<rowdedup_formats::Result<Vec<Row>>>()
        .with_context(|| format!("Failed to read right-hand table: {}", path.display()))?;
    let table = RightTable::build(key, rows)
        .with_context(|| format!("Invalid right-hand table: {}", path.display()))?;
    info!(
        "Loaded right-hand table {} ({} columns besides {:?})",
        path.display(),
        table.header().len(),
        key
    );
    Ok(table)
}

fn apply_filter<F: RowFilter>(
    name: &str,
    filter: &mut F,
    io: &IoArgs,
    dialect: Dialect,
    json_output: bool,
) -> Result<()> {
    let input = IoArgs::describe(&io.input, "stdin");
    let output = IoArgs::describe(&io.output, "stdout");

    let reader = DelimitedReader::open_input(io.input.as_deref(), dialect)
        .with_context(|| format!("Failed to open input: {}", input))?;
    let mut writer = DelimitedWriter::create_output(io.output.as_deref(), Dialect::Csv)
        .with_context(|| format!("Failed to create output: {}", output))?;

    let report: FilterReport =
        run_filter(filter, reader, &mut writer).with_context(|| format!("{} failed", name))?;

    if json_output {
        let summary = serde_json::json!({
            "command": name,
            "input": input,
            "output": output,
            "outcome": report.outcome,
            "rows_read": report.rows_read,
            "rows_written": report.rows_written,
        });
        eprintln!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        info!(
            "{}: {} rows read, {} rows written ({:?})",
            name, report.rows_read, report.rows_written, report.outcome
        );
    }

    Ok(())
}

fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowdedup_core::RetentionMode;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_dedup_positional_arguments() {
        let cli = Cli::try_parse_from([
            "rowdedup",
            "dedup",
            "--input",
            "rows.csv",
            "all but one",
            "_any_",
            "id",
            "_any_",
            "&!status",
            "closed",
        ])
        .unwrap();

        let Commands::Dedup { arguments, config, io } = cli.command else {
            panic!("expected dedup");
        };
        assert!(config.is_none());
        assert_eq!(io.input, Some(PathBuf::from("rows.csv")));

        let config = PipelineConfig::from_args(&arguments).unwrap();
        assert_eq!(config.mode, RetentionMode::AllButOne);
        assert_eq!(config.predicates.len(), 2);
    }

    #[test]
    fn test_dedup_config_conflicts_with_arguments() {
        let result =
            Cli::try_parse_from(["rowdedup", "dedup", "--config", "d.yaml", "all", "_any_"]);
        assert!(result.is_err());

        let cli = Cli::try_parse_from(["rowdedup", "dedup", "--config", "d.yaml"]).unwrap();
        assert!(matches!(cli.command, Commands::Dedup { config: Some(_), .. }));
    }

    #[test]
    fn test_calculate_accepts_subtracted_columns() {
        let cli = Cli::try_parse_from(["rowdedup", "calculate", "net", "gross", "-fee"]).unwrap();

        let Commands::Calculate { result, columns, .. } = cli.command else {
            panic!("expected calculate");
        };
        assert_eq!(result, "net");
        assert_eq!(columns, vec!["gross".to_string(), "-fee".to_string()]);
    }

    #[test]
    fn test_dialect_selection() {
        let io = |input: Option<&str>, psv: bool| IoArgs {
            input: input.map(PathBuf::from),
            output: None,
            psv,
        };

        assert_eq!(io(None, false).dialect(), Dialect::Csv);
        assert_eq!(io(None, true).dialect(), Dialect::Psv);
        assert_eq!(io(Some("part-0001.psv.gz"), false).dialect(), Dialect::Psv);
        assert_eq!(io(Some("part-0001.csv"), true).dialect(), Dialect::Psv);
    }

    #[test]
    fn test_dedup_file_to_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("rows.csv");
        let output = dir.path().join("deduped.csv");
        std::fs::write(&input, "a,b,c\n1,2,0\n2,3,0\n3,2,0\n4,2,1\n5,2,1\n").unwrap();

        let config =
            PipelineConfig::from_args(&["all but one", "_any_", "b", "_any_", "c", "0"]).unwrap();
        let io = IoArgs {
            input: Some(input),
            output: Some(output.clone()),
            psv: false,
        };
        dedup(config, &io, false).unwrap();

        let written = std::fs::read_to_string(&output).unwrap();
        assert_eq!(written, "a,b,c\n1,2,0\n2,3,0\n4,2,1\n5,2,1\n");
    }

    #[test]
    fn test_dedup_blank_line_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("rows.csv");
        std::fs::write(&input, "a,b,c\n1,2,0\n\n3,2,0\n").unwrap();

        let config = PipelineConfig::from_args(&["all", "_any_", "b", "_any_"]).unwrap();
        let io = IoArgs {
            input: Some(input),
            output: Some(dir.path().join("out.csv")),
            psv: false,
        };

        assert!(dedup(config, &io, false).is_err());
    }

    #[test]
    fn test_describe_paths() {
        assert_eq!(IoArgs::describe(&None, "stdin"), "stdin");
        assert_eq!(IoArgs::describe(&Some(PathBuf::from("-")), "stdout"), "stdout");
        assert_eq!(IoArgs::describe(&Some(PathBuf::from("a.csv")), "stdin"), "a.csv");
    }
}
