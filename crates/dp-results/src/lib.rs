//! dp-results: result sinks, left-vector CSV logs and run manifests.

pub mod csv_log;
pub mod hash;
pub mod sink;
pub mod store;
pub mod types;

pub use csv_log::{CsvSink, LEFT_VECTOR_SUFFIX, left_vector_path, read_left_vector};
pub use hash::compute_run_id;
pub use sink::{MemorySink, NullSink, ResultSink};
pub use store::RunStore;
pub use types::*;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Run not found: {name}")]
    RunNotFound { name: String },

    #[error("Result labels changed mid-run: expected [{}], got [{}]", expected.join(", "), actual.join(", "))]
    LabelMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("Output has {labels} labels but {values} values")]
    RaggedOutput { labels: usize, values: usize },

    #[error("Malformed result file {path}: {message}")]
    Format { path: String, message: String },
}
