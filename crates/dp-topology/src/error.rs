//! Topology construction and validation errors.

use thiserror::Error;

use crate::entity::EntityKind;

/// Reasons a network is rejected before it can reach a solver.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TopologyError {
    #[error("Topology has no reference node")]
    NoReferenceNode,

    #[error("Topology has {} reference nodes ({}), expected exactly one", nodes.len(), nodes.join(", "))]
    MultipleReferenceNodes { nodes: Vec<String> },

    #[error("Duplicate node name: {name}")]
    DuplicateNodeName { name: String },

    #[error("Duplicate entity name: {name}")]
    DuplicateEntityName { name: String },

    #[error("Entity {entity} references node {node} which is not part of the topology")]
    DanglingNode { entity: String, node: String },

    #[error("Entity {entity} ({kind}) has {actual} terminals, expected {expected}")]
    ArityMismatch {
        entity: String,
        kind: EntityKind,
        expected: usize,
        actual: usize,
    },

    #[error("Entity {entity} connects node {node} to itself")]
    RepeatedTerminal { entity: String, node: String },

    #[error("Invalid base frequency: {value}")]
    InvalidFrequency { value: f64 },

    #[error("Empty {what} name")]
    EmptyName { what: &'static str },

    #[error("{kind} has no parameter named {parameter}")]
    UnknownParameter { kind: EntityKind, parameter: String },

    #[error("{kind} requires parameter {parameter}")]
    MissingParameter {
        kind: EntityKind,
        parameter: &'static str,
    },

    #[error("Invalid value {value} for {kind}.{parameter}: {reason}")]
    InvalidParameter {
        kind: EntityKind,
        parameter: String,
        value: f64,
        reason: &'static str,
    },
}

pub type TopologyResult<T> = Result<T, TopologyError>;
