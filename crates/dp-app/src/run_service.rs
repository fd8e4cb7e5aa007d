//! Run execution service.

use std::path::{Path, PathBuf};
use std::time::Instant;

use dp_project::Scenario;
use dp_registry::Registry;
use dp_results::{CsvSink, RunManifest, RunStore};
use dp_sim::{RunState, SimProgress, Simulation};
use dp_solver::{MnaSolver, SOLVER_VERSION};
use tracing::{info, warn};

use crate::compile::compile_scenario;
use crate::error::AppResult;
use crate::project_service;

/// Overrides applied on top of the scenario file.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Log directory; defaults to the scenario's `output.dir`.
    pub output_dir: Option<PathBuf>,
    pub duration: Option<f64>,
    pub timestep: Option<f64>,
}

/// Request to execute a scenario file.
pub struct RunRequest<'a> {
    pub scenario_path: &'a Path,
    pub options: RunOptions,
}

/// Outcome of one run.
#[derive(Debug, Clone)]
pub struct RunResponse {
    pub run_id: String,
    pub manifest: RunManifest,
    pub log_path: PathBuf,
    pub steps: u64,
    pub final_state: RunState,
    pub wall_time_s: f64,
}

impl RunResponse {
    pub fn succeeded(&self) -> bool {
        self.final_state == RunState::Completed
    }
}

/// Load and run a scenario file.
pub fn run_file(request: &RunRequest) -> AppResult<RunResponse> {
    run_file_with_progress(request, None)
}

pub fn run_file_with_progress(
    request: &RunRequest,
    progress_cb: Option<&mut dyn FnMut(SimProgress)>,
) -> AppResult<RunResponse> {
    let scenario = project_service::load_scenario(request.scenario_path)?;
    run_scenario_with_progress(&scenario, &request.options, progress_cb)
}

pub fn run_scenario(scenario: &Scenario, options: &RunOptions) -> AppResult<RunResponse> {
    run_scenario_with_progress(scenario, options, None)
}

/// Compile, run with the MNA solver and write the left-vector log and manifest.
///
/// A run that fails or is cancelled after starting still returns `Ok`: the
/// partial log and the manifest are kept, and `final_state` tells the caller
/// how it ended.
pub fn run_scenario_with_progress(
    scenario: &Scenario,
    options: &RunOptions,
    progress_cb: Option<&mut dyn FnMut(SimProgress)>,
) -> AppResult<RunResponse> {
    let started = Instant::now();

    let mut scenario = scenario.clone();
    if let Some(duration) = options.duration {
        scenario.simulation.duration = duration;
    }
    if let Some(timestep) = options.timestep {
        scenario.simulation.timestep = timestep;
    }

    let registry: &Registry = dp_registry::global()?;
    let compiled = compile_scenario(&scenario, registry)?;
    let run_id = dp_results::compute_run_id(&scenario, SOLVER_VERSION);

    let dir = options
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&scenario.output.dir));
    let store = RunStore::new(dir)?;
    let sink = CsvSink::create(store.root(), &compiled.name)?;
    let log_path = sink.path().to_path_buf();

    let mut topologies = compiled.topologies.into_iter();
    let Some(main) = topologies.next() else {
        return Err(crate::AppError::Compile("scenario has no topology".into()));
    };
    let mut sim = Simulation::new(&compiled.name, main, compiled.config.clone(), MnaSolver::new())?
        .with_sink(sink);
    for alternate in topologies {
        sim.add_topology(alternate)?;
    }
    for event in compiled.events {
        sim.schedule(event)?;
    }

    info!(name = %compiled.name, run_id = %run_id, "running scenario");
    let outcome = match progress_cb {
        Some(cb) => sim.run_with_progress(cb),
        None => sim.run(),
    };
    if let Err(e) = &outcome {
        warn!(name = %compiled.name, error = %e, "run did not complete");
    }
    // Errors before the first step leave the run in Created; surface those.
    if sim.state() == RunState::Created {
        outcome?;
    }

    let manifest = RunManifest {
        run_id: run_id.clone(),
        name: compiled.name.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        domain: compiled.config.domain.to_string(),
        duration_s: compiled.config.duration,
        timestep_s: compiled.config.timestep,
        steps: sim.steps_taken(),
        final_state: sim.state().to_string(),
        failure: sim.failure().map(|f| f.error.to_string()),
        solver_version: SOLVER_VERSION.to_string(),
    };
    store.save_manifest(&manifest)?;

    Ok(RunResponse {
        run_id,
        steps: sim.steps_taken(),
        final_state: sim.state(),
        manifest,
        log_path,
        wall_time_s: started.elapsed().as_secs_f64(),
    })
}
