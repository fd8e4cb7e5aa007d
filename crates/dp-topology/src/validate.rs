//! Topology validation rules.

use std::collections::{HashMap, HashSet};

use dp_core::{EntityId, NodeId};

use crate::entity::Entity;
use crate::error::{TopologyError, TopologyResult};
use crate::topology::Node;

pub(crate) fn validate_frequency(frequency: f64) -> TopologyResult<()> {
    if frequency.is_finite() && frequency > 0.0 {
        Ok(())
    } else {
        Err(TopologyError::InvalidFrequency { value: frequency })
    }
}

/// Exactly one node carries the reference flag.
pub(crate) fn validate_reference(nodes: &[Node]) -> TopologyResult<NodeId> {
    let refs: Vec<usize> = nodes
        .iter()
        .enumerate()
        .filter(|(_, n)| n.is_reference())
        .map(|(i, _)| i)
        .collect();
    match refs.as_slice() {
        [] => Err(TopologyError::NoReferenceNode),
        [only] => Ok(NodeId::from_index(*only as u32)),
        many => Err(TopologyError::MultipleReferenceNodes {
            nodes: many.iter().map(|&i| nodes[i].name().to_string()).collect(),
        }),
    }
}

pub(crate) fn validate_node_names(nodes: &[Node]) -> TopologyResult<HashMap<String, NodeId>> {
    let mut lookup = HashMap::with_capacity(nodes.len());
    for (i, node) in nodes.iter().enumerate() {
        if node.name().is_empty() {
            return Err(TopologyError::EmptyName { what: "node" });
        }
        if lookup
            .insert(node.name().to_string(), NodeId::from_index(i as u32))
            .is_some()
        {
            return Err(TopologyError::DuplicateNodeName {
                name: node.name().to_string(),
            });
        }
    }
    Ok(lookup)
}

pub(crate) fn validate_entity_names(
    entities: &[Entity],
) -> TopologyResult<HashMap<String, EntityId>> {
    let mut lookup = HashMap::with_capacity(entities.len());
    for (i, entity) in entities.iter().enumerate() {
        if lookup
            .insert(entity.name().to_string(), EntityId::from_index(i as u32))
            .is_some()
        {
            return Err(TopologyError::DuplicateEntityName {
                name: entity.name().to_string(),
            });
        }
    }
    Ok(lookup)
}

/// Every terminal names a known node; terminal count matches arity; terminals are distinct.
pub(crate) fn validate_incidence(
    entities: &[Entity],
    node_lookup: &HashMap<String, NodeId>,
) -> TopologyResult<()> {
    for entity in entities {
        for terminal in entity.terminals() {
            if !node_lookup.contains_key(terminal) {
                return Err(TopologyError::DanglingNode {
                    entity: entity.name().to_string(),
                    node: terminal.clone(),
                });
            }
        }

        let expected = entity.kind().arity();
        let actual = entity.terminals().len();
        if actual != expected {
            return Err(TopologyError::ArityMismatch {
                entity: entity.name().to_string(),
                kind: entity.kind(),
                expected,
                actual,
            });
        }

        let mut seen = HashSet::with_capacity(actual);
        for terminal in entity.terminals() {
            if !seen.insert(terminal.as_str()) {
                return Err(TopologyError::RepeatedTerminal {
                    entity: entity.name().to_string(),
                    node: terminal.clone(),
                });
            }
        }
    }
    Ok(())
}
