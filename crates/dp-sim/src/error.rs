//! Error types for simulation runs.

use thiserror::Error;

use crate::driver::RunState;
use crate::queue::QueueError;

/// Errors surfaced by the simulation driver.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Invalid configuration: {what}")]
    InvalidConfig { what: String },

    #[error("Solver rejected topology {index}: {message}")]
    SolverInit { index: usize, message: String },

    #[error("Solver failed at step {step} (t={time}): {message}")]
    SolverStep {
        step: u64,
        time: f64,
        message: String,
    },

    #[error("Malformed event at t={time}: {reason}")]
    MalformedEvent { time: f64, reason: String },

    #[error("Run cancelled at t={time}")]
    Cancelled { time: f64 },

    #[error("Run already ended in state {state}; create a new simulation to run again")]
    NotRestartable { state: RunState },

    #[error("Operation not allowed in state {state}: {what}")]
    InvalidState {
        state: RunState,
        what: &'static str,
    },

    #[error("Result sink error: {message}")]
    Sink { message: String },

    #[error("Event queue error: {0}")]
    Queue(#[from] QueueError),
}

pub type SimResult<T> = Result<T, SimError>;

impl From<dp_results::ResultsError> for SimError {
    fn from(e: dp_results::ResultsError) -> Self {
        SimError::Sink {
            message: e.to_string(),
        }
    }
}
