use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::client::UnitSource;
use crate::error::{RegistryError, Result};
use crate::export::CsvSink;
use crate::records::DETAIL_FIELDS;

/// An unbroken run of failures this long means the API or the credentials
/// are gone, not the individual units.
const CONSECUTIVE_ERRORS_LIMIT: usize = 20;

#[derive(Debug)]
pub struct DetailReport {
    /// Units whose detail record was written.
    pub exported: usize,
    /// Units that failed, with the error that skipped them, in input order.
    pub skipped: Vec<(String, String)>,
    /// Final output path.
    pub output: PathBuf,
}

/// Fetches one detail record per registry number, in input order, writing
/// each successful row to `output`.
///
/// Failure policy: a failed unit is logged and skipped, and the run goes on;
/// a success resets the failure streak. The run aborts once
/// [`CONSECUTIVE_ERRORS_LIMIT`] consecutive fetches have failed, and an auth
/// rejection aborts immediately (retrying other units cannot fix the key).
/// Skipped units are returned in the report; deciding whether skips fail the
/// process is the caller's business.
pub fn export_details<S: UnitSource + ?Sized>(
    source: &S,
    numbers: &[String],
    output: &Path,
    progress: bool,
) -> Result<DetailReport> {
    let mut sink = CsvSink::create(output, DETAIL_FIELDS)?;

    let pb = if progress {
        let pb = ProgressBar::new(numbers.len() as u64);
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} {pos}/{len} {wide_bar} {eta}")
                .unwrap()
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };

    let mut exported = 0usize;
    let mut skipped: Vec<(String, String)> = Vec::new();
    let mut consecutive = 0usize;

    for number in numbers {
        match source.unit_detail(number) {
            Ok(record) => {
                sink.write(&record)?;
                exported += 1;
                // a successful reply means the earlier errors were not systemic
                consecutive = 0;
            }
            Err(e @ RegistryError::Auth(_)) => {
                if let Some(pb) = &pb {
                    pb.finish_and_clear();
                }
                return Err(e);
            }
            Err(e) => {
                warn!(unit = %number, error = %e, "detail fetch failed, skipping unit");
                skipped.push((number.clone(), e.to_string()));
                consecutive += 1;
                if consecutive >= CONSECUTIVE_ERRORS_LIMIT {
                    if let Some(pb) = &pb {
                        pb.finish_and_clear();
                    }
                    return Err(RegistryError::TooManyFailures(consecutive));
                }
            }
        }

        if let Some(pb) = &pb {
            pb.inc(1);
        }
    }

    if let Some(pb) = &pb {
        pb.finish_and_clear();
    }

    let output = sink.finish()?;

    info!(
        exported,
        skipped = skipped.len(),
        output = %output.display(),
        "detail export complete"
    );

    Ok(DetailReport {
        exported,
        skipped,
        output,
    })
}
