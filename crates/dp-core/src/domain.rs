//! Simulation domain and phase group tags shared by registry, topology and driver.

use core::fmt;
use core::str::FromStr;

use crate::DpError;

/// Simulation domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Domain {
    /// Dynamic phasor: AC quantities as slowly varying complex envelopes.
    #[default]
    Dp,
    /// Electromagnetic transient: instantaneous waveforms.
    Emt,
}

impl Domain {
    pub const ALL: [Domain; 2] = [Domain::Dp, Domain::Emt];

    /// Namespace segment used in catalog keys and lookup paths.
    pub fn segment(self) -> &'static str {
        match self {
            Domain::Dp => "dp",
            Domain::Emt => "emt",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

impl FromStr for Domain {
    type Err = DpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dp" => Ok(Domain::Dp),
            "emt" => Ok(Domain::Emt),
            _ => Err(DpError::Unknown {
                what: "domain",
                name: s.to_string(),
            }),
        }
    }
}

/// Physical phase group of a component model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PhaseGroup {
    /// Single phase.
    #[default]
    Ph1,
    /// Three phase.
    Ph3,
}

impl PhaseGroup {
    pub const ALL: [PhaseGroup; 2] = [PhaseGroup::Ph1, PhaseGroup::Ph3];

    pub fn segment(self) -> &'static str {
        match self {
            PhaseGroup::Ph1 => "ph1",
            PhaseGroup::Ph3 => "ph3",
        }
    }
}

impl fmt::Display for PhaseGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

impl FromStr for PhaseGroup {
    type Err = DpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ph1" => Ok(PhaseGroup::Ph1),
            "ph3" => Ok(PhaseGroup::Ph3),
            _ => Err(DpError::Unknown {
                what: "phase group",
                name: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_parse_round_trip() {
        for d in Domain::ALL {
            assert_eq!(d.segment().parse::<Domain>().unwrap(), d);
        }
        assert_eq!("EMT".parse::<Domain>().unwrap(), Domain::Emt);
        assert!("sp".parse::<Domain>().is_err());
    }

    #[test]
    fn phase_group_parse() {
        assert_eq!("ph3".parse::<PhaseGroup>().unwrap(), PhaseGroup::Ph3);
        assert!("ph2".parse::<PhaseGroup>().is_err());
    }
}
