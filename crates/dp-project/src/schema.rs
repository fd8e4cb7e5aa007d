//! Scenario file schema.

use std::collections::BTreeMap;

use dp_core::Domain;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scenario {
    pub version: u32,
    pub name: String,
    /// Nominal grid frequency (Hz).
    pub frequency: f64,
    pub simulation: SimulationDef,
    /// Default log filter when `RUST_LOG` is unset, e.g. `info` or `debug`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    #[serde(default)]
    pub nodes: Vec<NodeDef>,
    #[serde(default)]
    pub entities: Vec<EntityDef>,
    /// Topologies over the same node set that `switch_topology` events can
    /// activate. Index 0 in events is the main topology, `i` is entry `i - 1`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternate_topologies: Vec<TopologyDef>,
    #[serde(default)]
    pub events: Vec<EventDef>,
    #[serde(default)]
    pub output: OutputDef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationDef {
    /// Simulated time span (s).
    #[serde(default)]
    pub duration: f64,
    /// Fixed time step (s).
    pub timestep: f64,
    #[serde(default)]
    pub domain: Domain,
    /// Version 0 name for `duration`; folded in by migration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_time: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub reference: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityDef {
    pub name: String,
    /// Registry path such as `dp.ph1.Resistor`.
    #[serde(rename = "type")]
    pub type_path: String,
    /// Terminal node names, in order.
    pub nodes: Vec<String>,
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopologyDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub entities: Vec<EntityDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventDef {
    /// Simulated time (s) at which the action fires.
    pub time: f64,
    pub action: ActionDef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionDef {
    SetParameter {
        entity: String,
        parameter: String,
        value: f64,
    },
    ExternalSignal {
        channel: String,
        value: f64,
    },
    SwitchTopology {
        index: usize,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputDef {
    /// Directory for result logs and run manifests.
    #[serde(default = "default_output_dir")]
    pub dir: String,
}

impl Default for OutputDef {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> String {
    "Logs".to_string()
}

fn is_false(v: &bool) -> bool {
    !*v
}

impl Scenario {
    /// Entity lists of every topology, main first.
    pub fn topology_entities(&self) -> impl Iterator<Item = &[EntityDef]> {
        std::iter::once(self.entities.as_slice())
            .chain(self.alternate_topologies.iter().map(|t| t.entities.as_slice()))
    }

    pub fn topology_count(&self) -> usize {
        1 + self.alternate_topologies.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_tag_is_snake_case() {
        let yaml = "time: 0.1\naction: { type: set_parameter, entity: r, parameter: resistance, value: 2 }\n";
        let ev: EventDef = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            ev.action,
            ActionDef::SetParameter {
                entity: "r".into(),
                parameter: "resistance".into(),
                value: 2.0
            }
        );
    }

    #[test]
    fn defaults_fill_optional_sections() {
        let yaml = r#"
version: 1
name: minimal
frequency: 50
simulation: { duration: 1, timestep: 0.001 }
"#;
        let s: Scenario = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(s.simulation.domain, Domain::Dp);
        assert_eq!(s.output.dir, "Logs");
        assert!(s.events.is_empty());
        assert_eq!(s.topology_count(), 1);
    }
}
