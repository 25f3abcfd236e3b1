//! Fizzy CLI
//!
//! Command-line interface for metagenomic feature selection.

use clap::{Args, Parser, Subcommand, ValueEnum};
use fizzy::data::{
    read_delimited, resolve_labels, AbundanceTable, LabelSource, MappingTable, DEFAULT_ID_COLUMN,
};
use fizzy::error::{FizzyError, Result};
use fizzy::pipeline::{InputFormat, Pipeline, RunConfig};
use fizzy::report::ReportFormat;
use fizzy::select::{ExternalEngine, SelectionMethod};
use std::path::{Path, PathBuf};

/// CLI-friendly report format enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliReportFormat {
    /// Tab-separated table
    Tsv,
    /// JSON document
    Json,
    /// YAML document
    Yaml,
}

impl From<CliReportFormat> for ReportFormat {
    fn from(format: CliReportFormat) -> Self {
        match format {
            CliReportFormat::Tsv => ReportFormat::Tsv,
            CliReportFormat::Json => ReportFormat::Json,
            CliReportFormat::Yaml => ReportFormat::Yaml,
        }
    }
}

/// Feature selection for metagenomic abundance data
#[derive(Parser)]
#[command(name = "fizzy")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Select features and write the per-class report
    Run(RunArgs),

    /// Write an example run configuration
    Example {
        /// Output path for the YAML configuration
        #[arg(short, long, default_value = "fizzy.yaml")]
        output: PathBuf,
    },

    /// Print dimensions, sparsity and class sizes of a matrix
    Inspect {
        /// Abundance matrix (BIOM JSON unless --delimited)
        #[arg(short, long)]
        input: PathBuf,

        /// Read the matrix as delimited text
        #[arg(long)]
        delimited: bool,

        /// Field delimiter for delimited input
        #[arg(long, default_value = ",")]
        delimiter: char,

        /// Mapping file with sample metadata
        #[arg(short, long)]
        mapping: Option<PathBuf>,

        /// Metadata field holding the class label
        #[arg(short, long)]
        label: Option<String>,

        /// Sample identifier column of the mapping file
        #[arg(long, default_value = DEFAULT_ID_COLUMN)]
        id_column: String,
    },
}

/// Options of the `run` command. Flags override values from `--config`.
#[derive(Args)]
struct RunArgs {
    /// Run configuration YAML
    #[arg(long)]
    config: Option<PathBuf>,

    /// Selection engine program
    #[arg(short, long)]
    engine: PathBuf,

    /// Extra argument passed to the engine before the selection flags (repeatable)
    #[arg(long = "engine-arg")]
    engine_args: Vec<String>,

    /// Abundance matrix (BIOM JSON unless --delimited)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Read the matrix as delimited text
    #[arg(long)]
    delimited: bool,

    /// Field delimiter for delimited input
    #[arg(long)]
    delimiter: Option<char>,

    /// Mapping file with sample metadata
    #[arg(short, long)]
    mapping: Option<PathBuf>,

    /// Sample identifier column of the mapping file
    #[arg(long)]
    id_column: Option<String>,

    /// Metadata field holding the class label
    #[arg(short, long)]
    label: Option<String>,

    /// Selection method (CIFE, CMIM, CondMI, Condred, DISR, ICAP, JMI, MIM, MIFS, mRMR)
    #[arg(long)]
    method: Option<String>,

    /// Number of features to select
    #[arg(short, long)]
    select: Option<usize>,

    /// Bootstrap iterations
    #[arg(long)]
    bootstraps: Option<usize>,

    /// Significance threshold
    #[arg(long)]
    alpha: Option<f64>,

    /// Worker-count hint for the engine
    #[arg(long)]
    workers: Option<usize>,

    /// Bins per feature for discretization
    #[arg(long)]
    bins: Option<usize>,

    /// Output path for the report
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum)]
    format: Option<CliReportFormat>,

    /// Output path for the reduced matrix (dense BIOM JSON)
    #[arg(long)]
    reduced: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => cmd_run(args),

        Commands::Example { output } => cmd_example(&output),

        Commands::Inspect {
            input,
            delimited,
            delimiter,
            mapping,
            label,
            id_column,
        } => cmd_inspect(
            &input,
            delimited,
            delimiter,
            mapping.as_deref(),
            label.as_deref(),
            &id_column,
        ),
    };

    if let Err(e) = result {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn required<T>(value: Option<T>, flag: &str) -> Result<T> {
    value.ok_or_else(|| {
        FizzyError::InvalidArgument(format!("{} is required when --config is not given", flag))
    })
}

/// Merge the configuration file (if any) with command-line overrides.
fn build_config(args: &RunArgs) -> Result<RunConfig> {
    let mut config = match &args.config {
        Some(path) => RunConfig::from_yaml_file(path)?,
        None => RunConfig::new(
            required(args.input.clone(), "--input")?,
            &required(args.label.clone(), "--label")?,
            required(args.output.clone(), "--output")?,
        ),
    };

    if let Some(input) = &args.input {
        config.input = input.clone();
    }
    if args.delimited {
        config.input_format = InputFormat::Delimited;
    }
    if let Some(delimiter) = args.delimiter {
        config.delimiter = delimiter;
    }
    if let Some(mapping) = &args.mapping {
        config.mapping = Some(mapping.clone());
    }
    if let Some(id_column) = &args.id_column {
        config.sample_id_column = id_column.clone();
    }
    if let Some(label) = &args.label {
        config.label_field = label.clone();
    }
    if let Some(method) = &args.method {
        config.selection.method = method.parse::<SelectionMethod>()?;
    }
    if let Some(n_select) = args.select {
        config.selection.n_select = n_select;
    }
    if let Some(bootstraps) = args.bootstraps {
        config.selection.bootstraps = bootstraps;
    }
    if let Some(alpha) = args.alpha {
        config.selection.alpha = alpha;
    }
    if let Some(workers) = args.workers {
        config.selection.workers = workers;
    }
    if let Some(bins) = args.bins {
        config.n_bins = bins;
    }
    if let Some(output) = &args.output {
        config.output = output.clone();
    }
    if let Some(format) = args.format {
        config.output_format = format.into();
    }
    if let Some(reduced) = &args.reduced {
        config.reduced_output = Some(reduced.clone());
    }
    Ok(config)
}

/// Run feature selection
fn cmd_run(args: RunArgs) -> Result<()> {
    let config = build_config(&args)?;
    let pipeline = Pipeline::new(config)?;
    let engine = ExternalEngine::new(args.engine.clone()).with_args(args.engine_args.iter().cloned());

    let outcome = pipeline.execute(&engine)?;

    eprintln!();
    eprintln!("=== Selected Features ===");
    for row in &outcome.report.features {
        eprintln!("  {:>5}  {}  ({})", row.index, row.feature_id, row.feature);
    }
    Ok(())
}

/// Write an example configuration file
fn cmd_example(output_path: &Path) -> Result<()> {
    let mut config = RunConfig::new("otu_table.biom", "Class", "selected_features.tsv");
    config.mapping = Some(PathBuf::from("mapping.txt"));
    config.selection.method = SelectionMethod::Jmi;
    config.reduced_output = Some(PathBuf::from("reduced.biom"));

    let yaml = config.to_yaml()?;
    std::fs::write(output_path, &yaml).map_err(FizzyError::io_at(output_path))?;
    eprintln!("Wrote example configuration to {:?}", output_path);
    eprintln!();
    eprintln!("Contents:");
    println!("{}", yaml);

    Ok(())
}

/// Summarize a matrix and, optionally, its classes
fn cmd_inspect(
    input: &Path,
    delimited: bool,
    delimiter: char,
    mapping: Option<&Path>,
    label: Option<&str>,
    id_column: &str,
) -> Result<()> {
    let table = if delimited {
        if !delimiter.is_ascii() {
            return Err(FizzyError::InvalidArgument(format!(
                "Delimiter must be a single ASCII character, got '{}'",
                delimiter
            )));
        }
        read_delimited(input, delimiter as u8)?
    } else {
        AbundanceTable::from_biom(input)?
    };
    let matrix = &table.matrix;

    let total = matrix.n_samples() * matrix.n_features();
    let sparsity = if total == 0 {
        0.0
    } else {
        1.0 - matrix.nnz() as f64 / total as f64
    };
    let sums = matrix.row_sums();
    let min_sum = sums.iter().cloned().fold(f64::INFINITY, f64::min);
    let max_sum = sums.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    println!("=== Matrix ===");
    println!("Samples:  {}", matrix.n_samples());
    println!("Features: {}", matrix.n_features());
    println!("Non-zero: {} ({:.1}% sparse)", matrix.nnz(), sparsity * 100.0);
    if !sums.is_empty() {
        println!("Sample totals: {} to {}", min_sum, max_sum);
    }
    let empty = sums.iter().filter(|&&s| s == 0.0).count();
    if empty > 0 {
        log::warn!("{} samples have no counts and cannot be normalized", empty);
    }

    let Some(field) = label else {
        return Ok(());
    };
    let labels = match mapping {
        Some(path) => {
            let column = MappingTable::from_tsv(path, id_column)?.label_column(field)?;
            resolve_labels(matrix.sample_ids(), LabelSource::Mapping(&column))?
        }
        None => resolve_labels(
            matrix.sample_ids(),
            LabelSource::Inline {
                metadata: &table.sample_metadata,
                field,
            },
        )?,
    };

    println!();
    println!("=== Classes ({}) ===", field);
    for (class, size) in labels.classes().iter().zip(labels.class_sizes()) {
        println!("  {}: {} samples", class, size);
    }
    Ok(())
}
