//! Left-vector CSV logs: `<dir>/<name>_LeftVector.csv`, one timestamped row per step.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::sink::ResultSink;
use crate::types::{LabeledVector, TimeSeries};
use crate::{ResultsError, ResultsResult};

/// File-name suffix expected by downstream result readers.
pub const LEFT_VECTOR_SUFFIX: &str = "_LeftVector";

pub fn left_vector_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}{LEFT_VECTOR_SUFFIX}.csv"))
}

/// Writes each recorded step as a CSV row `time,<values...>`.
///
/// The header is written with the first row, so the labels are fixed by the
/// first step.
pub struct CsvSink {
    path: PathBuf,
    writer: csv::Writer<File>,
    header: Option<Vec<String>>,
}

impl CsvSink {
    /// Create `<dir>/<name>_LeftVector.csv`, creating `dir` if needed.
    pub fn create(dir: &Path, name: &str) -> ResultsResult<Self> {
        fs::create_dir_all(dir)?;
        let path = left_vector_path(dir, name);
        let writer = csv::Writer::from_path(&path)?;
        tracing::debug!(path = %path.display(), "opened left-vector log");
        Ok(Self {
            path,
            writer,
            header: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultSink for CsvSink {
    fn record(&mut self, time: f64, output: &LabeledVector) -> ResultsResult<()> {
        if output.labels().len() != output.values().len() {
            return Err(ResultsError::RaggedOutput {
                labels: output.labels().len(),
                values: output.values().len(),
            });
        }
        match self.header.as_deref() {
            Some(expected) if expected != output.labels() => {
                return Err(ResultsError::LabelMismatch {
                    expected: expected.to_vec(),
                    actual: output.labels().to_vec(),
                });
            }
            Some(_) => {}
            None => {
                let labels = output.labels().iter().map(String::as_str);
                self.writer
                    .write_record(std::iter::once("time").chain(labels))?;
                self.header = Some(output.labels().to_vec());
            }
        }

        let mut row = Vec::with_capacity(output.values().len() + 1);
        row.push(time.to_string());
        row.extend(output.values().iter().map(|v| v.to_string()));
        self.writer.write_record(&row)?;
        Ok(())
    }

    fn finish(&mut self) -> ResultsResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Read a left-vector log back into columns.
pub fn read_left_vector(path: &Path) -> ResultsResult<TimeSeries> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let mut fields = headers.iter();
    match fields.next() {
        Some("time") => {}
        _ => {
            return Err(ResultsError::Format {
                path: path.display().to_string(),
                message: "first column must be `time`".to_string(),
            });
        }
    }
    let labels: Vec<String> = fields.map(str::to_string).collect();

    let mut series = TimeSeries {
        labels,
        ..TimeSeries::default()
    };
    for record in reader.records() {
        let record = record?;
        let mut values = record.iter().map(|f| {
            f.trim().parse::<f64>().map_err(|e| ResultsError::Format {
                path: path.display().to_string(),
                message: format!("{f:?}: {e}"),
            })
        });
        let time = values.next().transpose()?.ok_or_else(|| ResultsError::Format {
            path: path.display().to_string(),
            message: "empty row".to_string(),
        })?;
        let row = values.collect::<ResultsResult<Vec<f64>>>()?;
        series.time.push(time);
        series.rows.push(row);
    }
    Ok(series)
}
