//! Error types for the dp-app service layer.

use std::path::PathBuf;

/// Application error wrapping the backend crates' errors for the CLI.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Scenario error: {0}")]
    Project(String),

    #[error("Failed to read scenario file: {path}")]
    ScenarioRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Scenario compilation failed: {0}")]
    Compile(String),

    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("Results error: {0}")]
    Results(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for dp-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<dp_project::ProjectError> for AppError {
    fn from(err: dp_project::ProjectError) -> Self {
        AppError::Project(err.to_string())
    }
}

impl From<dp_registry::RegistryError> for AppError {
    fn from(err: dp_registry::RegistryError) -> Self {
        AppError::Registry(err.to_string())
    }
}

impl From<dp_topology::TopologyError> for AppError {
    fn from(err: dp_topology::TopologyError) -> Self {
        AppError::Compile(err.to_string())
    }
}

impl From<dp_sim::SimError> for AppError {
    fn from(err: dp_sim::SimError) -> Self {
        AppError::Simulation(err.to_string())
    }
}

impl From<dp_results::ResultsError> for AppError {
    fn from(err: dp_results::ResultsError) -> Self {
        match err {
            dp_results::ResultsError::RunNotFound { name } => AppError::RunNotFound(name),
            other => AppError::Results(other.to_string()),
        }
    }
}
