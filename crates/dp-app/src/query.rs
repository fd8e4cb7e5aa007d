//! Query helpers over stored runs.

use std::path::Path;

use dp_results::{RunManifest, RunStore, TimeSeries};

use crate::error::{AppError, AppResult};

/// Summary of a run's time range and columns.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub time_range: (f64, f64),
    pub record_count: usize,
    pub labels: Vec<String>,
}

/// A stored run: its manifest and left-vector log.
#[derive(Debug, Clone)]
pub struct LoadedRun {
    pub manifest: RunManifest,
    pub series: TimeSeries,
}

pub fn list_runs(dir: &Path) -> AppResult<Vec<RunManifest>> {
    let store = RunStore::new(dir.to_path_buf())?;
    Ok(store.list_runs()?)
}

pub fn load_run(dir: &Path, name: &str) -> AppResult<LoadedRun> {
    let store = RunStore::new(dir.to_path_buf())?;
    let manifest = store.load_manifest(name)?;
    let series = store.load_timeseries(name)?;
    Ok(LoadedRun { manifest, series })
}

pub fn get_run_summary(series: &TimeSeries) -> AppResult<RunSummary> {
    let (Some(first), Some(last)) = (series.time.first(), series.time.last()) else {
        return Err(AppError::InvalidInput("No records in run".to_string()));
    };
    Ok(RunSummary {
        time_range: (*first, *last),
        record_count: series.len(),
        labels: series.labels.clone(),
    })
}

/// `(time, value)` pairs for one column.
pub fn extract_series(series: &TimeSeries, label: &str) -> AppResult<Vec<(f64, f64)>> {
    let values = series
        .column(label)
        .ok_or_else(|| AppError::InvalidInput(format!("Unknown column: {label}")))?;
    Ok(series.time.iter().copied().zip(values).collect())
}

/// Magnitude of a dynamic-phasor node voltage from its `.re`/`.im` columns.
pub fn extract_magnitude(series: &TimeSeries, node: &str) -> AppResult<Vec<(f64, f64)>> {
    let re = extract_series(series, &format!("{node}.re"))?;
    let im = extract_series(series, &format!("{node}.im"))?;
    Ok(re
        .into_iter()
        .zip(im)
        .map(|((t, a), (_, b))| (t, a.hypot(b)))
        .collect())
}
