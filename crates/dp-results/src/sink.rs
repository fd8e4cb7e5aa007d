//! Per-timestep result sinks.

use crate::types::LabeledVector;
use crate::ResultsResult;

/// Receives one labelled vector per completed timestep.
///
/// Rows already recorded stay recorded when a run later fails.
pub trait ResultSink {
    /// Called once before the first step of a run.
    fn begin(&mut self, _name: &str) -> ResultsResult<()> {
        Ok(())
    }

    fn record(&mut self, time: f64, output: &LabeledVector) -> ResultsResult<()>;

    /// Flush buffered rows. Called once when a run stops for any reason.
    fn finish(&mut self) -> ResultsResult<()> {
        Ok(())
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ResultSink for NullSink {
    fn record(&mut self, _time: f64, _output: &LabeledVector) -> ResultsResult<()> {
        Ok(())
    }
}

/// Keeps every row in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub rows: Vec<(f64, LabeledVector)>,
    pub finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultSink for MemorySink {
    fn record(&mut self, time: f64, output: &LabeledVector) -> ResultsResult<()> {
        self.rows.push((time, output.clone()));
        Ok(())
    }

    fn finish(&mut self) -> ResultsResult<()> {
        self.finished = true;
        Ok(())
    }
}

impl<S: ResultSink + ?Sized> ResultSink for Box<S> {
    fn begin(&mut self, name: &str) -> ResultsResult<()> {
        (**self).begin(name)
    }

    fn record(&mut self, time: f64, output: &LabeledVector) -> ResultsResult<()> {
        (**self).record(time, output)
    }

    fn finish(&mut self) -> ResultsResult<()> {
        (**self).finish()
    }
}
