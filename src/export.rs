use std::ffi::OsString;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{RegistryError, Result};
use crate::records::{UnitRecord, flatten_field};

/// CSV writer with a fixed column set.
///
/// Rows go to `<path>.tmp`; the file only appears at `path` once
/// [`CsvSink::finish`] has flushed and renamed it, so an aborted or failed
/// run never leaves a partial export behind.
pub struct CsvSink {
    writer: csv::Writer<File>,
    fields: Vec<String>,
    tmp: PathBuf,
    path: PathBuf,
    finished: bool,
}

impl CsvSink {
    /// Creates the temp file, writes the header row, and returns the sink.
    pub fn create(path: &Path, fields: &[&str]) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = tmp_path(path);
        let mut writer = csv::Writer::from_path(&tmp)?;
        writer.write_record(fields)?;

        Ok(Self {
            writer,
            fields: fields.iter().map(|f| (*f).to_string()).collect(),
            tmp,
            path: path.to_path_buf(),
            finished: false,
        })
    }

    /// Writes one record, extracting the sink's columns in order; absent
    /// fields become empty cells.
    pub fn write(&mut self, record: &UnitRecord) -> Result<()> {
        self.writer
            .write_record(self.fields.iter().map(|f| csv_cell(record.get(f))))?;
        Ok(())
    }

    /// Flushes and moves the file to its final path.
    pub fn finish(mut self) -> Result<PathBuf> {
        self.writer.flush()?;
        fs::rename(&self.tmp, &self.path)?;
        self.finished = true;
        Ok(self.path.clone())
    }
}

impl Drop for CsvSink {
    fn drop(&mut self) {
        if !self.finished {
            let _ = fs::remove_file(&self.tmp);
        }
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

fn csv_cell(value: Option<&Value>) -> String {
    match value.map(flatten_field) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    }
}

/// Reads registry numbers from column `index` of a CSV file.
///
/// The first `skip` records are dropped (pass 1 when the input carries a
/// header row, or a larger offset to resume an earlier run). A row without
/// column `index` is an input error.
pub fn read_numbers(path: &Path, index: usize, skip: usize) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| RegistryError::Input {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let mut numbers = Vec::new();
    for (row, record) in reader.records().enumerate().skip(skip) {
        let record = record?;
        let number = record.get(index).ok_or_else(|| RegistryError::Input {
            path: path.to_path_buf(),
            message: format!("row {} has no column {}", row, index),
        })?;
        numbers.push(number.to_string());
    }

    Ok(numbers)
}
