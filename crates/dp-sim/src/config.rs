//! Run configuration.

use dp_core::{Domain, step_count};

use crate::error::{SimError, SimResult};

/// Fixed-step run configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationConfig {
    /// Simulated time span (seconds).
    pub duration: f64,
    /// Fixed time step (seconds).
    pub timestep: f64,
    pub domain: Domain,
}

impl SimulationConfig {
    pub fn new(duration: f64, timestep: f64, domain: Domain) -> SimResult<Self> {
        let config = Self {
            duration,
            timestep,
            domain,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SimResult<()> {
        if !(self.duration.is_finite() && self.duration > 0.0) {
            return Err(SimError::InvalidConfig {
                what: format!("duration must be positive, got {}", self.duration),
            });
        }
        if !(self.timestep.is_finite() && self.timestep > 0.0) {
            return Err(SimError::InvalidConfig {
                what: format!("timestep must be positive, got {}", self.timestep),
            });
        }
        Ok(())
    }

    /// Number of steps and whether the duration is a whole number of steps.
    pub fn steps(&self) -> (u64, bool) {
        step_count(self.duration, self.timestep)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            duration: 1.0,
            timestep: 1e-3,
            domain: Domain::Dp,
        }
    }
}
