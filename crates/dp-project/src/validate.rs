//! Scenario validation.
//!
//! Every rule is checked and every violation is reported, so a user fixing a
//! scenario sees all problems at once.

use std::collections::HashSet;
use std::fmt;

use dp_registry::{Constructor, Registry};
use dp_topology::{EntityType, Params};

use crate::migrate::LATEST_VERSION;
use crate::schema::{ActionDef, EntityDef, Scenario};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },

    #[error("Scenario name must not be empty")]
    EmptyName,

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Duplicate name: {name} in {context}")]
    DuplicateName { name: String, context: String },

    #[error("Missing reference: {name} in {context}")]
    MissingReference { name: String, context: String },

    #[error("Expected exactly one reference node, found {count}")]
    ReferenceCount { count: usize },

    #[error("Unknown entity type '{path}' for entity '{entity}'")]
    UnknownType { entity: String, path: String },

    #[error("Entity '{entity}' is {found} but the simulation domain is {expected}")]
    DomainMismatch {
        entity: String,
        found: String,
        expected: String,
    },

    #[error("Entity '{entity}': {reason}")]
    InvalidEntity { entity: String, reason: String },
}

/// All problems found in one scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationErrors {
    pub errors: Vec<ValidationError>,
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} problem(s)", self.errors.len())?;
        for e in &self.errors {
            write!(f, "\n  - {e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl ValidationErrors {
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter()
    }
}

fn invalid(field: impl Into<String>, value: impl fmt::Display, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Resolve a registry path to the entity type it constructs.
pub fn resolve_entity_type(registry: &Registry, path: &str) -> Option<EntityType> {
    registry.lookup(path).and_then(Constructor::entity_type)
}

pub fn validate_scenario(scenario: &Scenario, registry: &Registry) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();

    if scenario.version > LATEST_VERSION {
        errors.push(ValidationError::UnsupportedVersion {
            version: scenario.version,
        });
    }
    if scenario.name.trim().is_empty() {
        errors.push(ValidationError::EmptyName);
    }
    if !(scenario.frequency.is_finite() && scenario.frequency > 0.0) {
        errors.push(invalid("frequency", scenario.frequency, "must be positive"));
    }

    let sim = &scenario.simulation;
    if !(sim.duration.is_finite() && sim.duration > 0.0) {
        errors.push(invalid("simulation.duration", sim.duration, "must be positive"));
    }
    if !(sim.timestep.is_finite() && sim.timestep > 0.0) {
        errors.push(invalid("simulation.timestep", sim.timestep, "must be positive"));
    }
    if scenario.output.dir.trim().is_empty() {
        errors.push(invalid("output.dir", "''", "must not be empty"));
    }

    let mut node_names = HashSet::new();
    for node in &scenario.nodes {
        if node.name.is_empty() {
            errors.push(invalid("nodes.name", "''", "must not be empty"));
        } else if !node_names.insert(node.name.as_str()) {
            errors.push(ValidationError::DuplicateName {
                name: node.name.clone(),
                context: "nodes".to_string(),
            });
        }
    }
    let references = scenario.nodes.iter().filter(|n| n.reference).count();
    if references != 1 {
        errors.push(ValidationError::ReferenceCount { count: references });
    }

    // entity names across all topologies, for event targets
    let mut entity_names: HashSet<&str> = HashSet::new();
    for (index, entities) in scenario.topology_entities().enumerate() {
        let context = if index == 0 {
            "entities".to_string()
        } else {
            format!("alternate_topologies[{}]", index - 1)
        };
        let mut names = HashSet::new();
        for entity in entities {
            if !names.insert(entity.name.as_str()) {
                errors.push(ValidationError::DuplicateName {
                    name: entity.name.clone(),
                    context: context.clone(),
                });
            }
            entity_names.insert(entity.name.as_str());
            validate_entity(entity, scenario, registry, &node_names, &mut errors);
        }
    }

    for (i, event) in scenario.events.iter().enumerate() {
        let field = format!("events[{i}]");
        if !(event.time.is_finite() && event.time >= 0.0) {
            errors.push(invalid(format!("{field}.time"), event.time, "must be >= 0"));
        }
        match &event.action {
            ActionDef::SetParameter {
                entity, parameter, ..
            } => {
                if !entity_names.contains(entity.as_str()) {
                    errors.push(ValidationError::MissingReference {
                        name: entity.clone(),
                        context: format!("{field} set_parameter"),
                    });
                }
                if parameter.is_empty() {
                    errors.push(invalid(format!("{field}.parameter"), "''", "must not be empty"));
                }
            }
            ActionDef::ExternalSignal { channel, value } => {
                if channel.is_empty() {
                    errors.push(invalid(format!("{field}.channel"), "''", "must not be empty"));
                }
                if !value.is_finite() {
                    errors.push(invalid(format!("{field}.value"), value, "must be finite"));
                }
            }
            ActionDef::SwitchTopology { index } => {
                if *index >= scenario.topology_count() {
                    errors.push(invalid(
                        format!("{field}.index"),
                        index,
                        "no such topology",
                    ));
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors { errors })
    }
}

fn validate_entity(
    entity: &EntityDef,
    scenario: &Scenario,
    registry: &Registry,
    node_names: &HashSet<&str>,
    errors: &mut Vec<ValidationError>,
) {
    for terminal in &entity.nodes {
        if !node_names.contains(terminal.as_str()) {
            errors.push(ValidationError::MissingReference {
                name: terminal.clone(),
                context: format!("entity '{}' nodes", entity.name),
            });
        }
    }

    let Some(ty) = resolve_entity_type(registry, &entity.type_path) else {
        errors.push(ValidationError::UnknownType {
            entity: entity.name.clone(),
            path: entity.type_path.clone(),
        });
        return;
    };

    if ty.domain != scenario.simulation.domain {
        errors.push(ValidationError::DomainMismatch {
            entity: entity.name.clone(),
            found: ty.domain.to_string(),
            expected: scenario.simulation.domain.to_string(),
        });
    }

    let arity = ty.kind.arity();
    if entity.nodes.len() != arity {
        errors.push(ValidationError::InvalidEntity {
            entity: entity.name.clone(),
            reason: format!("{} expects {arity} nodes, got {}", ty.kind, entity.nodes.len()),
        });
    } else if entity.nodes.iter().collect::<HashSet<_>>().len() != arity {
        errors.push(ValidationError::InvalidEntity {
            entity: entity.name.clone(),
            reason: "terminals must be distinct nodes".to_string(),
        });
    }

    let params: Params = entity.params.iter().map(|(k, v)| (k.clone(), *v)).collect();
    let outcome = dp_topology::Entity::new(ty, &entity.name, &entity.nodes, params);
    if let Err(e) = outcome {
        errors.push(ValidationError::InvalidEntity {
            entity: entity.name.clone(),
            reason: e.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EventDef, NodeDef, OutputDef, SimulationDef};
    use dp_core::Domain;
    use std::collections::BTreeMap;

    fn entity(name: &str, ty: &str, nodes: [&str; 2], params: &[(&str, f64)]) -> EntityDef {
        EntityDef {
            name: name.to_string(),
            type_path: ty.to_string(),
            nodes: nodes.iter().map(|s| s.to_string()).collect(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    fn base() -> Scenario {
        Scenario {
            version: LATEST_VERSION,
            name: "divider".to_string(),
            frequency: 50.0,
            simulation: SimulationDef {
                duration: 0.1,
                timestep: 1e-3,
                domain: Domain::Dp,
                final_time: None,
            },
            log_level: None,
            nodes: vec![
                NodeDef {
                    name: "gnd".into(),
                    reference: true,
                },
                NodeDef {
                    name: "n1".into(),
                    reference: false,
                },
            ],
            entities: vec![
                entity(
                    "vs",
                    "dp.ph1.VoltageSource",
                    ["gnd", "n1"],
                    &[("voltage_ref", 1.0)],
                ),
                entity("r1", "dp.ph1.Resistor", ["n1", "gnd"], &[("resistance", 1.0)]),
            ],
            alternate_topologies: vec![],
            events: vec![],
            output: OutputDef::default(),
        }
    }

    #[test]
    fn valid_scenario_passes() {
        let registry = Registry::builtin().unwrap();
        validate_scenario(&base(), &registry).unwrap();
    }

    #[test]
    fn collects_every_problem() {
        let registry = Registry::builtin().unwrap();
        let mut s = base();
        s.name = " ".into();
        s.simulation.timestep = 0.0;
        s.entities.push(entity("r1", "dp.ph1.Resistor", ["n1", "n9"], &[("resistance", 1.0)]));
        s.entities
            .push(entity("x", "dp.ph1.Flux", ["n1", "gnd"], &[]));

        let errs = validate_scenario(&s, &registry).unwrap_err();
        assert!(errs.iter().any(|e| *e == ValidationError::EmptyName));
        assert!(errs.iter().any(|e| matches!(e, ValidationError::InvalidValue { field, .. } if field == "simulation.timestep")));
        assert!(errs.iter().any(|e| matches!(e, ValidationError::DuplicateName { .. })));
        assert!(errs.iter().any(|e| matches!(e, ValidationError::MissingReference { name, .. } if name == "n9")));
        assert!(errs.iter().any(|e| matches!(e, ValidationError::UnknownType { .. })));
        assert!(errs.len() >= 5);
    }

    #[test]
    fn domain_mismatch_reported() {
        let registry = Registry::builtin().unwrap();
        let mut s = base();
        s.entities[1].type_path = "emt.ph1.Resistor".into();
        let errs = validate_scenario(&s, &registry).unwrap_err();
        assert!(matches!(errs.errors[0], ValidationError::DomainMismatch { .. }));
    }

    #[test]
    fn missing_parameter_reported() {
        let registry = Registry::builtin().unwrap();
        let mut s = base();
        s.entities[1].params.clear();
        let errs = validate_scenario(&s, &registry).unwrap_err();
        assert!(matches!(errs.errors[0], ValidationError::InvalidEntity { .. }));
    }

    #[test]
    fn event_targets_checked() {
        let registry = Registry::builtin().unwrap();
        let mut s = base();
        s.events = vec![
            EventDef {
                time: 0.05,
                action: ActionDef::SetParameter {
                    entity: "ghost".into(),
                    parameter: "resistance".into(),
                    value: 1.0,
                },
            },
            EventDef {
                time: 0.05,
                action: ActionDef::SwitchTopology { index: 1 },
            },
        ];
        let errs = validate_scenario(&s, &registry).unwrap_err();
        assert_eq!(errs.len(), 2);
    }

    #[test]
    fn reference_count_enforced() {
        let registry = Registry::builtin().unwrap();
        let mut s = base();
        s.nodes[1].reference = true;
        let errs = validate_scenario(&s, &registry).unwrap_err();
        assert!(errs.iter().any(|e| *e == ValidationError::ReferenceCount { count: 2 }));
    }
}
