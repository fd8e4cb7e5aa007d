//! Seam between the driver and a numerical solver.

use dp_results::LabeledVector;
use dp_topology::Topology;
use thiserror::Error;

use crate::config::SimulationConfig;
use crate::event::EventPayload;

/// Errors a solver reports back to the driver.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Unsupported topology: {what}")]
    Unsupported { what: String },

    #[error("Singular system: {what}")]
    Singular { what: String },

    #[error("Solution diverged at t={time}")]
    Diverged { time: f64 },

    #[error("Unknown target: {name}")]
    UnknownTarget { name: String },

    #[error("Invalid value: {what}")]
    InvalidValue { what: String },
}

pub type SolverResult<T> = Result<T, SolverError>;

/// Numerical collaborator driven by [`Simulation`](crate::Simulation).
///
/// The driver calls [`accept`](Solver::accept) once per registered topology
/// during initialization, then alternates event application and
/// [`advance`](Solver::advance) on the handle of the active topology.
/// Topology switches go through [`switch_from`](Solver::switch_from).
pub trait Solver {
    /// Per-topology solver state.
    type Handle;

    /// Prepare a solver handle for `topology`.
    fn accept(
        &mut self,
        topology: &Topology,
        config: &SimulationConfig,
    ) -> SolverResult<Self::Handle>;

    /// Advance the solution from `time` to `time + dt`.
    ///
    /// Returns the labelled solution at `time + dt`; an empty vector is valid.
    fn advance(
        &mut self,
        handle: &mut Self::Handle,
        time: f64,
        dt: f64,
    ) -> SolverResult<LabeledVector>;

    /// Apply a parameter change or external signal before the next advance.
    fn apply_event(
        &mut self,
        handle: &mut Self::Handle,
        payload: &EventPayload,
    ) -> SolverResult<()>;

    /// Carry the dynamic state of `from` over to `to` before `to` becomes active.
    ///
    /// Called by the driver on every topology switch. The default keeps `to`
    /// as it was accepted.
    fn switch_from(&mut self, from: &Self::Handle, to: &mut Self::Handle) -> SolverResult<()> {
        let _ = (from, to);
        Ok(())
    }
}
