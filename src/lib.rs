//! Exports solar unit data from the Marktstammdatenregister (MaStR) web API
//! to CSV files.
//!
//! Two pipelines share one blocking client:
//! - [`export_units`] pulls unit summaries page by page until the registry
//!   is exhausted and writes them to a CSV file (the `fetch-solar-units`
//!   binary).
//! - [`export_details`] takes registry numbers (usually the first column of
//!   that file, via [`read_numbers`]) and writes one detail row per unit
//!   (the `fetch-solar-data` binary).
//!
//! ## Quick start
//! - Configure credentials via environment variables (`API_KEY`,
//!   `MASTR_NUMBER`) or a `.mastrrc` file (supported in the current
//!   directory and in your home directory).
//! - Build a [`Client`] and run a pipeline.
//!
//! ```no_run
//! use mastr_solar::{Client, ListOptions, export_units};
//!
//! fn main() -> mastr_solar::Result<()> {
//!     let client = Client::from_env()?;
//!     let report = export_units(
//!         &client,
//!         &ListOptions {
//!             limit: 10_000,
//!             step: 2_000,
//!             start: 0,
//!             filter_type: "Solareinheit".to_string(),
//!             output: "data/units.csv".into(),
//!         },
//!     )?;
//!     println!("exported {} of {} units", report.exported, report.fetched);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

mod client;
mod config;
mod detail;
mod error;
mod export;
mod list;
mod records;
mod util;

pub use client::{Client, ClientConfig, UnitSource};
pub use config::DEFAULT_API_URL;
pub use detail::{DetailReport, export_details};
pub use error::{RegistryError, Result};
pub use export::{CsvSink, read_numbers};
pub use list::{ListOptions, ListReport, Pages, export_units};
pub use records::{DETAIL_FIELDS, SUMMARY_FIELDS, UnitRecord};
