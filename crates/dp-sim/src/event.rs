//! Timestamped actions applied to a running simulation.

use std::fmt;

/// What an event does when it fires.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    /// Change a named parameter of an entity in the active topology.
    SetParameter {
        entity: String,
        parameter: String,
        value: f64,
    },
    /// Value pushed by an external interface on a named channel.
    ExternalSignal { channel: String, value: f64 },
    /// Make another registered topology the active one.
    SwitchTopology { index: usize },
}

impl fmt::Display for EventPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventPayload::SetParameter {
                entity,
                parameter,
                value,
            } => write!(f, "set {entity}.{parameter} = {value}"),
            EventPayload::ExternalSignal { channel, value } => {
                write!(f, "signal {channel} = {value}")
            }
            EventPayload::SwitchTopology { index } => write!(f, "switch to topology {index}"),
        }
    }
}

/// A payload scheduled at a simulated time.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub time: f64,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(time: f64, payload: EventPayload) -> Self {
        Self { time, payload }
    }

    pub fn set_parameter(
        time: f64,
        entity: impl Into<String>,
        parameter: impl Into<String>,
        value: f64,
    ) -> Self {
        Self::new(
            time,
            EventPayload::SetParameter {
                entity: entity.into(),
                parameter: parameter.into(),
                value,
            },
        )
    }

    pub fn signal(time: f64, channel: impl Into<String>, value: f64) -> Self {
        Self::new(
            time,
            EventPayload::ExternalSignal {
                channel: channel.into(),
                value,
            },
        )
    }

    pub fn switch_topology(time: f64, index: usize) -> Self {
        Self::new(time, EventPayload::SwitchTopology { index })
    }
}
