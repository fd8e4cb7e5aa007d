//! Application service layer shared by the command-line front end.
//!
//! Turns scenario files into simulations, runs them with the MNA solver and
//! stores their logs and manifests.

pub mod compile;
pub mod error;
pub mod project_service;
pub mod query;
pub mod run_service;

pub use compile::{CompiledScenario, compile_scenario};
pub use error::{AppError, AppResult};
pub use project_service::{
    CatalogEntry, ScenarioSummary, list_catalog, load_scenario, save_scenario, summarize,
    validate_file,
};
pub use query::{
    LoadedRun, RunSummary, extract_magnitude, extract_series, get_run_summary, list_runs,
    load_run,
};
pub use run_service::{
    RunOptions, RunRequest, RunResponse, run_file, run_file_with_progress, run_scenario,
    run_scenario_with_progress,
};
