//! CLI entry point for the solar unit detail fetcher.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Parser;
use mastr_solar::{Client, export_details, read_numbers};
use tracing::info;

/// Export full solar unit detail records from the Marktstammdatenregister.
///
/// Reads registry numbers from a column of an input CSV (typically the
/// output of `fetch-solar-units`) and writes one detail row per unit.
/// Failed units are skipped and reported; the run exits non-zero if any
/// unit failed.
#[derive(Parser, Debug)]
#[command(name = "fetch-solar-data")]
#[command(author, version, about)]
struct Args {
    /// MaStR API key
    #[arg(short = 'a', long, env = "API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// MaStR number of the market actor the key belongs to
    #[arg(short = 'm', long, env = "MASTR_NUMBER")]
    mastr_number: Option<String>,

    /// Registry API base URL
    #[arg(long, env = "MASTR_API_URL")]
    url: Option<String>,

    /// Input CSV containing the registry numbers
    #[arg(short = 'i', long)]
    input: PathBuf,

    /// Column of the input CSV holding the registry numbers
    #[arg(short = 'n', long, default_value_t = 0)]
    index: usize,

    /// Input rows to skip before the first number (1 skips a header row)
    #[arg(short = 't', long, default_value_t = 1)]
    start: usize,

    /// Output CSV path
    #[arg(short = 'o', long, default_value = "data/details.csv")]
    output: PathBuf,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    quiet: bool,
}

fn init_tracing(verbose: u8, quiet: bool) {
    // RUST_LOG wins over the flag-derived level
    let default_level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose, args.quiet);

    let numbers = read_numbers(&args.input, args.index, args.start)?;
    info!(
        units = numbers.len(),
        input = %args.input.display(),
        "loaded registry numbers"
    );

    let client = Client::new(args.url, args.api_key, args.mastr_number)?;
    let report = export_details(&client, &numbers, &args.output, !args.quiet)?;

    if !report.skipped.is_empty() {
        bail!(
            "{} of {} units failed to fetch: {}",
            report.skipped.len(),
            numbers.len(),
            report
                .skipped
                .iter()
                .map(|(number, _)| number.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    info!(exported = report.exported, "done");
    Ok(())
}
