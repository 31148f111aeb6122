use std::path::PathBuf;

use tracing::{info, warn};

use crate::client::UnitSource;
use crate::error::{RegistryError, Result};
use crate::export::CsvSink;
use crate::records::{SUMMARY_FIELDS, UnitRecord, unit_type};

/// Lazy iterator over summary pages.
///
/// Yields `Ok(page)` per non-empty page and stops on the first empty page,
/// on the configured unit bound, or on a registry fault (the registry faults
/// rather than returning an empty page once `startAb` runs past the end of
/// the data set). Auth, network, and parse errors are yielded as `Err` and
/// end the iteration.
pub struct Pages<'a, S: UnitSource + ?Sized> {
    source: &'a S,
    step: usize,
    next_step: usize,
    last_step: usize,
    ended_by_fault: Option<String>,
    done: bool,
}

impl<'a, S: UnitSource + ?Sized> Pages<'a, S> {
    /// Pages of `step` units each, starting at page index `start`, bounded
    /// by `limit` units overall.
    pub fn new(source: &'a S, start: usize, step: usize, limit: usize) -> Self {
        debug_assert!(step > 0);
        Self {
            source,
            step,
            next_step: start,
            last_step: limit.div_ceil(step),
            ended_by_fault: None,
            done: false,
        }
    }

    /// The fault message that ended pagination, if any.
    pub fn ended_by_fault(&self) -> Option<&str> {
        self.ended_by_fault.as_deref()
    }
}

impl<S: UnitSource + ?Sized> Iterator for Pages<'_, S> {
    type Item = Result<Vec<UnitRecord>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.next_step >= self.last_step {
            return None;
        }

        let offset = self.next_step * self.step;
        self.next_step += 1;

        match self.source.list_page(offset, self.step) {
            Ok(units) if units.is_empty() => {
                self.done = true;
                None
            }
            Ok(units) => Some(Ok(units)),
            Err(RegistryError::Fault { code, message }) => {
                self.done = true;
                self.ended_by_fault = Some(format!("{} ({})", message, code));
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListOptions {
    /// Maximum number of units to request across all pages.
    pub limit: usize,
    /// Units per page.
    pub step: usize,
    /// Page index to start from.
    pub start: usize,
    /// Keep only units of this type, e.g. `Solareinheit`.
    pub filter_type: String,
    /// Output CSV path.
    pub output: PathBuf,
}

#[derive(Debug)]
pub struct ListReport {
    /// Units returned by the registry across all pages.
    pub fetched: usize,
    /// Units that matched the filter and were written.
    pub exported: usize,
    /// Final output path.
    pub output: PathBuf,
}

/// Fetches unit summaries page by page and writes the matching ones to CSV.
///
/// Any error aborts the run before the output file appears; a registry fault
/// mid-pagination instead ends the run normally with the rows fetched so far
/// (see [`Pages`]).
pub fn export_units<S: UnitSource + ?Sized>(source: &S, opts: &ListOptions) -> Result<ListReport> {
    let mut rows: Vec<UnitRecord> = Vec::new();
    let mut fetched = 0usize;

    let mut pages = Pages::new(source, opts.start, opts.step, opts.limit);
    for (i, page) in (&mut pages).enumerate() {
        let page = page?;
        let page_len = page.len();
        fetched += page_len;

        let before = rows.len();
        rows.extend(
            page.into_iter()
                .filter(|unit| unit_type(unit) == Some(opts.filter_type.as_str())),
        );

        info!(
            step = opts.start + i,
            fetched = page_len,
            kept = rows.len() - before,
            "fetched page"
        );
    }

    if let Some(fault) = pages.ended_by_fault() {
        warn!(%fault, "registry reported a fault; treating it as the end of the data set");
    }

    let mut sink = CsvSink::create(&opts.output, SUMMARY_FIELDS)?;
    for row in &rows {
        sink.write(row)?;
    }
    let output = sink.finish()?;

    info!(
        fetched,
        exported = rows.len(),
        output = %output.display(),
        "summary export complete"
    );

    Ok(ListReport {
        fetched,
        exported: rows.len(),
        output,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use std::cell::Cell;

    enum Failure {
        None,
        Auth,
        FaultPastEnd,
    }

    struct FakeRegistry {
        units: Vec<UnitRecord>,
        failure: Failure,
        calls: Cell<usize>,
    }

    impl FakeRegistry {
        fn with_units(units: Vec<UnitRecord>) -> Self {
            Self {
                units,
                failure: Failure::None,
                calls: Cell::new(0),
            }
        }
    }

    impl UnitSource for FakeRegistry {
        fn list_page(&self, offset: usize, limit: usize) -> Result<Vec<UnitRecord>> {
            self.calls.set(self.calls.get() + 1);
            match self.failure {
                Failure::Auth => {
                    return Err(RegistryError::Auth("registry authentication failed".into()));
                }
                Failure::FaultPastEnd if offset >= self.units.len() => {
                    return Err(RegistryError::Fault {
                        code: "KeineDatenVorhanden".into(),
                        message: "startAb liegt hinter dem letzten Datensatz".into(),
                    });
                }
                _ => {}
            }
            Ok(self.units.iter().skip(offset).take(limit).cloned().collect())
        }

        fn unit_detail(&self, _unit_number: &str) -> Result<UnitRecord> {
            unreachable!("lister never fetches details")
        }
    }

    fn solar(n: &str) -> UnitRecord {
        unit(n, "Solareinheit")
    }

    fn unit(n: &str, typ: &str) -> UnitRecord {
        match json!({
            "EinheitMastrNummer": n,
            "Name": format!("Unit {n}"),
            "Einheittyp": typ,
        }) {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    fn options(output: std::path::PathBuf) -> ListOptions {
        ListOptions {
            limit: 10_000,
            step: 2,
            start: 0,
            filter_type: "Solareinheit".into(),
            output,
        }
    }

    #[test]
    fn three_pages_then_empty_yields_six_rows() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("units.csv");
        let registry = FakeRegistry::with_units(
            (1..=6).map(|i| solar(&format!("SEE{i}"))).collect(),
        );

        let report = export_units(&registry, &options(out.clone())).unwrap();

        assert_eq!(report.fetched, 6);
        assert_eq!(report.exported, 6);
        // 3 full pages plus the empty page that signals exhaustion
        assert_eq!(registry.calls.get(), 4);

        let text = std::fs::read_to_string(&out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 7);
        assert!(lines[1].starts_with("SEE1,"));
        assert!(lines[6].starts_with("SEE6,"));
    }

    #[test]
    fn limit_bounds_the_page_loop() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("units.csv");
        let registry = FakeRegistry::with_units(
            (1..=6).map(|i| solar(&format!("SEE{i}"))).collect(),
        );

        let mut opts = options(out);
        opts.limit = 4;
        let report = export_units(&registry, &opts).unwrap();

        assert_eq!(report.exported, 4);
        assert_eq!(registry.calls.get(), 2);
    }

    #[test]
    fn start_skips_leading_pages() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("units.csv");
        let registry = FakeRegistry::with_units(
            (1..=6).map(|i| solar(&format!("SEE{i}"))).collect(),
        );

        let mut opts = options(out.clone());
        opts.start = 1;
        let report = export_units(&registry, &opts).unwrap();

        assert_eq!(report.exported, 4);
        let text = std::fs::read_to_string(&out).unwrap();
        assert!(text.lines().nth(1).unwrap().starts_with("SEE3,"));
    }

    #[test]
    fn filter_drops_other_unit_types() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("units.csv");
        let registry = FakeRegistry::with_units(vec![
            solar("SEE1"),
            unit("SEE2", "Windeinheit"),
            solar("SEE3"),
            unit("SEE4", "Speichereinheit"),
        ]);

        let report = export_units(&registry, &options(out)).unwrap();

        assert_eq!(report.fetched, 4);
        assert_eq!(report.exported, 2);
    }

    #[test]
    fn fault_past_the_end_keeps_fetched_rows() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("units.csv");
        let mut registry = FakeRegistry::with_units(
            (1..=4).map(|i| solar(&format!("SEE{i}"))).collect(),
        );
        registry.failure = Failure::FaultPastEnd;

        let report = export_units(&registry, &options(out.clone())).unwrap();

        assert_eq!(report.exported, 4);
        assert!(out.exists());
    }

    #[test]
    fn auth_failure_aborts_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("units.csv");
        let mut registry = FakeRegistry::with_units(vec![solar("SEE1")]);
        registry.failure = Failure::Auth;

        let err = export_units(&registry, &options(out.clone())).unwrap_err();
        assert!(matches!(err, RegistryError::Auth(_)));
        assert!(!out.exists());
    }

    #[test]
    fn identical_responses_produce_identical_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let registry = FakeRegistry::with_units(
            (1..=5).map(|i| solar(&format!("SEE{i}"))).collect(),
        );

        let first = dir.path().join("first.csv");
        let second = dir.path().join("second.csv");
        export_units(&registry, &options(first.clone())).unwrap();
        export_units(&registry, &options(second.clone())).unwrap();

        assert_eq!(
            std::fs::read(&first).unwrap(),
            std::fs::read(&second).unwrap()
        );
    }
}
