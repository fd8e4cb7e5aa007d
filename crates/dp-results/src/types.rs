//! Result data types.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Labelled vector of computed quantities for one timestep.
///
/// Labels are shared between steps; only the values are per step. A label
/// without a value reads as missing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LabeledVector {
    labels: Arc<[String]>,
    values: Vec<f64>,
}

impl LabeledVector {
    pub fn new(labels: Arc<[String]>, values: Vec<f64>) -> Self {
        Self { labels, values }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.labels
            .iter()
            .position(|l| l == label)
            .and_then(|i| self.values.get(i).copied())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Columnar time series read back from a log.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeSeries {
    pub labels: Vec<String>,
    pub time: Vec<f64>,
    /// One row per entry of `time`.
    pub rows: Vec<Vec<f64>>,
}

impl TimeSeries {
    /// Values of one column, if the label exists and every row has it.
    pub fn column(&self, label: &str) -> Option<Vec<f64>> {
        let idx = self.labels.iter().position(|l| l == label)?;
        self.rows.iter().map(|r| r.get(idx).copied()).collect()
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunManifest {
    pub run_id: String,
    pub name: String,
    pub timestamp: String,
    pub domain: String,
    pub duration_s: f64,
    pub timestep_s: f64,
    pub steps: u64,
    pub final_state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    pub solver_version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labeled_vector_lookup() {
        let labels: Arc<[String]> = vec!["n1".to_string(), "n2".to_string()].into();
        let v = LabeledVector::new(labels, vec![1.0, 2.0]);
        assert_eq!(v.get("n2"), Some(2.0));
        assert_eq!(v.get("n3"), None);
        assert!(LabeledVector::empty().is_empty());
    }

    #[test]
    fn label_without_value_is_missing() {
        let labels: Arc<[String]> = vec!["n1".to_string(), "n2".to_string()].into();
        let v = LabeledVector::new(labels, vec![1.0]);
        assert_eq!(v.get("n1"), Some(1.0));
        assert_eq!(v.get("n2"), None);
    }

    #[test]
    fn time_series_column() {
        let ts = TimeSeries {
            labels: vec!["a".into(), "b".into()],
            time: vec![0.0, 1.0],
            rows: vec![vec![1.0, 2.0], vec![3.0, 4.0]],
        };
        assert_eq!(ts.column("b"), Some(vec![2.0, 4.0]));
        assert_eq!(ts.len(), 2);
    }

    #[test]
    fn short_row_hides_column() {
        let ts = TimeSeries {
            labels: vec!["a".into(), "b".into()],
            time: vec![0.0, 1.0],
            rows: vec![vec![1.0, 2.0], vec![3.0]],
        };
        assert_eq!(ts.column("a"), Some(vec![1.0, 3.0]));
        assert_eq!(ts.column("b"), None);
    }
}
