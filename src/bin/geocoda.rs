//! geocoda - compositional transform CLI
//!
//! Command-line interface for closing compositions and applying log-ratio
//! and Box-Cox transforms to TSV tables.

use clap::{Parser, Subcommand, ValueEnum};
use geocoda::closure::{close_with, ClosureOptions};
use geocoda::data::CompositionTable;
use geocoda::error::{CodaError, Result};
use geocoda::transform::BoxCoxOptions;
use geocoda::transformer::{FittedTransform, TransformConfig, TransformSpec, Transformer};
use geocoda::zero::{adaptive_delta, multiplicative_replacement};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// CLI-friendly transform selector
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMethod {
    /// Identity passthrough
    Linear,
    /// Additive log-ratio (D-1 coordinates)
    Alr,
    /// Centred log-ratio (D coordinates)
    Clr,
    /// Isometric log-ratio (D-1 coordinates)
    Ilr,
    /// Box-Cox power transform (D coordinates)
    Boxcox,
}

/// Compositional data transforms for geochemical tables
#[derive(Parser)]
#[command(name = "geocoda")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform a composition table
    Transform {
        /// Input composition TSV (first column = sample id)
        #[arg(short, long)]
        input: PathBuf,

        /// Output path for the coordinates TSV
        #[arg(short, long)]
        output: PathBuf,

        /// Transform configuration YAML (overrides --method)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Transform to apply
        #[arg(short, long, value_enum, default_value = "clr")]
        method: CliMethod,

        /// ALR reference column (index or part name; default: last)
        #[arg(long)]
        reference: Option<String>,

        /// Fixed Box-Cox lambda (default: fitted per column)
        #[arg(long)]
        lambda: Option<f64>,

        /// Close rows to 1 before transforming
        #[arg(long)]
        close: bool,

        /// Replace zeros multiplicatively; "auto" or a delta in (0, 1)
        #[arg(long)]
        replace_zeros: Option<String>,

        /// Where to save the fitted transform (JSON) for a later inverse
        #[arg(short, long)]
        fitted: Option<PathBuf>,
    },

    /// Inverse-transform coordinates with a saved fitted transform
    Inverse {
        /// Input coordinates TSV
        #[arg(short, long)]
        input: PathBuf,

        /// Output path for the composition TSV
        #[arg(short, long)]
        output: PathBuf,

        /// Fitted transform JSON written by `transform --fitted`
        #[arg(short, long)]
        fitted: PathBuf,
    },

    /// Close rows to a constant sum
    Close {
        /// Input composition TSV
        #[arg(short, long)]
        input: PathBuf,

        /// Output path for the closed TSV
        #[arg(short, long)]
        output: PathBuf,

        /// Target row sum (default: 1)
        #[arg(short, long, default_value = "1.0")]
        target: f64,

        /// Part names or indices to pass through unscaled (comma-separated)
        #[arg(long)]
        exclude: Option<String>,
    },

    /// Generate an example transform configuration
    Example {
        /// Output path for the example YAML
        #[arg(short, long, default_value = "transform.yaml")]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Transform {
            input,
            output,
            config,
            method,
            reference,
            lambda,
            close,
            replace_zeros,
            fitted,
        } => cmd_transform(TransformArgs {
            input: &input,
            output: &output,
            config: config.as_deref(),
            method,
            reference: reference.as_deref(),
            lambda,
            close,
            replace_zeros: replace_zeros.as_deref(),
            fitted: fitted.as_deref(),
        }),

        Commands::Inverse {
            input,
            output,
            fitted,
        } => cmd_inverse(&input, &output, &fitted),

        Commands::Close {
            input,
            output,
            target,
            exclude,
        } => cmd_close(&input, &output, target, exclude.as_deref()),

        Commands::Example { output } => cmd_example(&output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

struct TransformArgs<'a> {
    input: &'a Path,
    output: &'a Path,
    config: Option<&'a Path>,
    method: CliMethod,
    reference: Option<&'a str>,
    lambda: Option<f64>,
    close: bool,
    replace_zeros: Option<&'a str>,
    fitted: Option<&'a Path>,
}

fn cmd_transform(args: TransformArgs<'_>) -> Result<()> {
    info!(path = ?args.input, "loading composition table");
    let table = CompositionTable::from_tsv(args.input)?;
    info!(
        n_samples = table.n_samples(),
        n_parts = table.n_parts(),
        "loaded composition table"
    );

    let mut data = table.data().clone();
    if let Some(delta) = args.replace_zeros {
        let delta = if delta == "auto" {
            adaptive_delta(&data)
        } else {
            delta.parse::<f64>().map_err(|_| {
                CodaError::InvalidParameter(format!("Invalid zero replacement delta '{}'", delta))
            })?
        };
        data = multiplicative_replacement(&data, delta)?;
    }
    if args.close {
        data = close_with(&data, &ClosureOptions::default())?;
    }

    let spec = match args.config {
        Some(path) => {
            let config = TransformConfig::from_file(path)?;
            info!(name = %config.name, "using transform configuration");
            config.transform
        }
        None => spec_from_flags(args.method, args.reference, args.lambda, &table)?,
    };

    let mut transformer = spec.build();
    let coords = transformer.transform(&data)?;
    let names = transformer.output_names(table.part_names());
    table.with_data(coords, names)?.to_tsv(args.output)?;

    if let Some(path) = args.fitted {
        FittedTransform {
            part_names: table.part_names().to_vec(),
            transform: transformer.clone(),
        }
        .save(path)?;
        info!(path = ?path, "saved fitted transform");
    }

    eprintln!(
        "Done! {} samples transformed with {}",
        table.n_samples(),
        transformer.name()
    );
    Ok(())
}

fn spec_from_flags(
    method: CliMethod,
    reference: Option<&str>,
    lambda: Option<f64>,
    table: &CompositionTable,
) -> Result<TransformSpec> {
    Ok(match method {
        CliMethod::Linear => TransformSpec::Linear,
        CliMethod::Alr => TransformSpec::Alr {
            ref_idx: reference.map(|r| resolve_column(r, table)).transpose()?,
        },
        CliMethod::Clr => TransformSpec::Clr,
        CliMethod::Ilr => TransformSpec::Ilr,
        CliMethod::Boxcox => TransformSpec::BoxCox {
            options: match lambda {
                Some(lambda) => BoxCoxOptions::fixed(lambda),
                None => BoxCoxOptions::fitted(),
            },
        },
    })
}

/// Resolve a column given by part name or zero-based index.
fn resolve_column(column: &str, table: &CompositionTable) -> Result<usize> {
    if let Some(idx) = table.part_index(column) {
        return Ok(idx);
    }
    column.parse::<usize>().map_err(|_| {
        CodaError::InvalidParameter(format!("Unknown part '{}'", column))
    })
}

fn cmd_inverse(input: &Path, output: &Path, fitted_path: &Path) -> Result<()> {
    let fitted = FittedTransform::load(fitted_path)?;
    info!(transform = fitted.transform.name(), "loaded fitted transform");

    let coords = CompositionTable::from_tsv(input)?;
    let data = fitted.transform.inverse_transform(coords.data())?;
    coords
        .with_data(data, fitted.part_names.clone())?
        .to_tsv(output)?;

    eprintln!("Done! {} samples restored", coords.n_samples());
    Ok(())
}

fn cmd_close(input: &Path, output: &Path, target: f64, exclude: Option<&str>) -> Result<()> {
    let table = CompositionTable::from_tsv(input)?;
    let exclude = match exclude {
        Some(list) => list
            .split(',')
            .map(|c| resolve_column(c.trim(), &table))
            .collect::<Result<Vec<usize>>>()?,
        None => Vec::new(),
    };

    let closed = close_with(table.data(), &ClosureOptions { target, exclude })?;
    table
        .with_data(closed, table.part_names().to_vec())?
        .to_tsv(output)?;

    eprintln!("Done! {} samples closed to {}", table.n_samples(), target);
    Ok(())
}

fn cmd_example(output_path: &Path) -> Result<()> {
    let config = TransformConfig {
        name: "major-oxides-ilr".to_string(),
        description: Some(
            "Isometric log-ratio coordinates for closed major-element oxides".to_string(),
        ),
        transform: TransformSpec::Ilr,
    };
    let yaml = config.to_yaml()?;

    std::fs::write(output_path, &yaml)?;
    eprintln!("Wrote example configuration to {:?}", output_path);
    eprintln!();
    eprintln!("Contents:");
    println!("{}", yaml);

    Ok(())
}
