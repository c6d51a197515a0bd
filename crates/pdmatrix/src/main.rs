use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::WrapErr;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use pdmatrix_core::{Dimension, Matrix, Parameters};

#[derive(Parser, Debug)]
#[command(name = "pdmatrix")]
#[command(about = "Inspect and query power deviation matrix files")]
struct Args {
    /// Log level (debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show a matrix's name, fallback value, dimensions, and cell count
    Inspect {
        path: PathBuf,

        /// Emit machine-readable JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Look up the deviation for a tuple of parameter values
    Query {
        path: PathBuf,

        /// Parameter value as NAME=VALUE; repeat once per dimension
        #[arg(short = 'p', long = "param", value_parser = parse_param, required = true)]
        params: Vec<(String, f64)>,
    },
    /// Load a matrix and write it back out, canonicalizing bin centers
    Copy { input: PathBuf, output: PathBuf },
}

fn parse_param(s: &str) -> Result<(String, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got {s:?}"))?;
    let value: f64 = value
        .parse()
        .map_err(|_| format!("{value:?} is not a number"))?;
    Ok((name.to_string(), value))
}

#[derive(Serialize)]
struct MatrixSummary<'a> {
    name: &'a str,
    out_of_range_value: f64,
    cell_count: usize,
    dimensions: &'a [Dimension],
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pdmatrix={level},pdmatrix_core={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn inspect(path: &PathBuf, json: bool) -> color_eyre::Result<()> {
    let matrix =
        Matrix::load(path).wrap_err_with(|| format!("failed to load {}", path.display()))?;

    if json {
        let summary = MatrixSummary {
            name: matrix.name(),
            out_of_range_value: matrix.out_of_range_value(),
            cell_count: matrix.len(),
            dimensions: matrix.dimensions(),
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Name:               {}", matrix.name());
    println!("Out-of-range value: {}", matrix.out_of_range_value());
    println!("Cells:              {}", matrix.len());
    println!("Dimensions:");
    for dimension in matrix.dimensions() {
        println!(
            "  {:<30} first {:>10} width {:>10} bins {:>4} last {:>10}",
            dimension.parameter(),
            dimension.center_of_first_bin(),
            dimension.bin_width(),
            dimension.number_of_bins(),
            dimension.center_of_last_bin(),
        );
    }
    Ok(())
}

fn query(path: &PathBuf, params: &[(String, f64)]) -> color_eyre::Result<()> {
    let matrix =
        Matrix::load(path).wrap_err_with(|| format!("failed to load {}", path.display()))?;

    let mut parameters = Parameters::new();
    for (name, value) in params {
        parameters.set(name, *value);
    }

    let deviation = matrix.get(&parameters).wrap_err("lookup failed")?;
    println!("{deviation}");
    Ok(())
}

fn copy(input: &PathBuf, output: &PathBuf) -> color_eyre::Result<()> {
    let mut matrix =
        Matrix::load(input).wrap_err_with(|| format!("failed to load {}", input.display()))?;

    let dimensions = matrix.dimensions().to_vec();
    let tree = matrix.cell_tree();
    matrix
        .save(output, &dimensions, &tree)
        .wrap_err_with(|| format!("failed to save {}", output.display()))?;

    tracing::info!(
        cells = matrix.len(),
        output = %output.display(),
        "matrix copied"
    );
    Ok(())
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    init_logging(&args.log_level);

    match &args.command {
        Command::Inspect { path, json } => inspect(path, *json),
        Command::Query { path, params } => query(path, params),
        Command::Copy { input, output } => copy(input, output),
    }
}
