//! CLI entry point for the solar unit lister.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use mastr_solar::{Client, ListOptions, export_units};
use tracing::info;

/// Export solar unit summaries from the Marktstammdatenregister.
///
/// Pages through the registry's unit list, keeps the units matching the
/// configured type, and writes them to a CSV file. The first column of that
/// file feeds `fetch-solar-data`.
#[derive(Parser, Debug)]
#[command(name = "fetch-solar-units")]
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

    /// Maximum number of units to request across all pages
    #[arg(short = 'l', long, default_value_t = 10_000, value_parser = clap::value_parser!(u32).range(1..))]
    limit: u32,

    /// Units per page
    #[arg(short = 's', long, default_value_t = 2_000, value_parser = clap::value_parser!(u32).range(1..=5_000))]
    step: u32,

    /// Page index to start from (to resume an earlier run)
    #[arg(short = 't', long, default_value_t = 0)]
    start: u32,

    /// Keep only units of this type
    #[arg(short = 'f', long, default_value = "Solareinheit")]
    filter_type: String,

    /// Output CSV path
    #[arg(short = 'o', long, default_value = "data/units.csv")]
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

    let client = Client::new(args.url, args.api_key, args.mastr_number)?;

    let report = export_units(
        &client,
        &ListOptions {
            limit: args.limit as usize,
            step: args.step as usize,
            start: args.start as usize,
            filter_type: args.filter_type,
            output: args.output,
        },
    )?;

    info!(
        fetched = report.fetched,
        exported = report.exported,
        "done"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse() {
        let args = Args::try_parse_from(["fetch-solar-units"]).unwrap();
        assert_eq!(args.limit, 10_000);
        assert_eq!(args.step, 2_000);
        assert_eq!(args.start, 0);
        assert_eq!(args.filter_type, "Solareinheit");
        assert_eq!(args.output, PathBuf::from("data/units.csv"));
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
    }

    #[test]
    fn short_flags_parse() {
        let args = Args::try_parse_from([
            "fetch-solar-units",
            "-a",
            "KEY",
            "-m",
            "SOM1",
            "-l",
            "100",
            "-s",
            "10",
            "-t",
            "2",
            "-f",
            "Windeinheit",
            "-o",
            "out.csv",
        ])
        .unwrap();
        assert_eq!(args.api_key.as_deref(), Some("KEY"));
        assert_eq!(args.mastr_number.as_deref(), Some("SOM1"));
        assert_eq!(args.limit, 100);
        assert_eq!(args.step, 10);
        assert_eq!(args.start, 2);
        assert_eq!(args.filter_type, "Windeinheit");
        assert_eq!(args.output, PathBuf::from("out.csv"));
    }

    #[test]
    fn zero_step_is_rejected() {
        let result = Args::try_parse_from(["fetch-solar-units", "-s", "0"]);
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ValueValidation
        );
    }

    #[test]
    fn help_flag_shows_usage() {
        let result = Args::try_parse_from(["fetch-solar-units", "--help"]);
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::DisplayHelp
        );
    }

    #[test]
    fn version_flag_shows_version() {
        let result = Args::try_parse_from(["fetch-solar-units", "--version"]);
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::DisplayVersion
        );
    }
}
