//! Reference numerical solver for dpsim-rs.
//!
//! `MnaSolver` assembles a complex modified-nodal-analysis system per topology
//! and advances it with trapezoidal companion models. The same code serves both
//! domains: in DP the companions are shifted by the grid angular frequency and
//! node values are phasors; in EMT the shift is zero and values are real.

pub mod companion;
pub mod mna;

pub use companion::Companion;
pub use mna::{MnaHandle, MnaSolver, SOLVER_VERSION};
