//! Simulation driver and event queue for dpsim-rs.
//!
//! Provides:
//! - Run lifecycle (Created → Initialized → Running → Completed | Failed | Cancelled)
//! - Fixed-step stepping with a shortened final step when needed
//! - Time-ordered, thread-safe event queue drained once per timestep
//! - The `Solver` seam the driver steps through

pub mod config;
pub mod driver;
pub mod error;
pub mod event;
pub mod queue;
pub mod solver;

pub use config::SimulationConfig;
pub use driver::{CancelToken, Failure, RunState, SimProgress, Simulation};
pub use error::{SimError, SimResult};
pub use event::{Event, EventPayload};
pub use queue::{EventQueue, EventSender, QueueError};
pub use solver::{Solver, SolverError, SolverResult};
