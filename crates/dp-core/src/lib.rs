//! dp-core: shared foundation for dpsim-rs.
//!
//! Contains:
//! - domain (simulation domain and phase group tags)
//! - units (uom SI electrical types + constructors)
//! - numeric (Real + tolerances + float helpers)
//! - ids (compact IDs for topology objects)
//! - error (shared error types)

pub mod domain;
pub mod error;
pub mod ids;
pub mod numeric;
pub mod units;

pub use domain::{Domain, PhaseGroup};
pub use error::DpError;
pub use ids::*;
pub use numeric::*;
pub use units::*;
