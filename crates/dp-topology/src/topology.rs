//! Core topology data structures.

use std::collections::HashMap;

use dp_core::{EntityId, NodeId};

use crate::entity::Entity;
use crate::error::TopologyResult;
use crate::validate;

/// Conventional name of the reference node.
pub const GROUND_NAME: &str = "gnd";

/// A connection point in the network.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Node {
    name: String,
    reference: bool,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reference: false,
        }
    }

    /// A node flagged as the reference (ground) of the network.
    pub fn reference(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reference: true,
        }
    }

    /// The conventional `gnd` reference node.
    pub fn ground() -> Self {
        Self::reference(GROUND_NAME)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_reference(&self) -> bool {
        self.reference
    }
}

/// A validated, immutable network: base frequency, nodes and entities.
///
/// Besides the owned vectors the topology keeps compact node→entity adjacency
/// (`node_entities[node_offsets[i]..node_offsets[i+1]]` are incident to node `i`).
#[derive(Debug, Clone)]
pub struct Topology {
    frequency: f64,
    nodes: Vec<Node>,
    entities: Vec<Entity>,
    node_lookup: HashMap<String, NodeId>,
    entity_lookup: HashMap<String, EntityId>,
    reference: NodeId,
    node_offsets: Vec<usize>,
    node_entities: Vec<EntityId>,
}

impl Topology {
    /// Validate and assemble a topology.
    ///
    /// Fails when the network does not have exactly one reference node, when
    /// node or entity names repeat, when an entity references a node outside
    /// `nodes`, or when an entity's terminal count does not match its kind.
    pub fn new(frequency: f64, nodes: Vec<Node>, entities: Vec<Entity>) -> TopologyResult<Self> {
        validate::validate_frequency(frequency)?;
        let reference = validate::validate_reference(&nodes)?;
        let node_lookup = validate::validate_node_names(&nodes)?;
        let entity_lookup = validate::validate_entity_names(&entities)?;
        validate::validate_incidence(&entities, &node_lookup)?;

        let (node_offsets, node_entities) = build_adjacency(&nodes, &entities, &node_lookup);

        tracing::debug!(
            nodes = nodes.len(),
            entities = entities.len(),
            frequency,
            "topology validated"
        );

        Ok(Self {
            frequency,
            nodes,
            entities,
            node_lookup,
            entity_lookup,
            reference,
            node_offsets,
            node_entities,
        })
    }

    /// Same nodes and frequency, different entity set.
    pub fn with_entities(&self, entities: Vec<Entity>) -> TopologyResult<Self> {
        Self::new(self.frequency, self.nodes.clone(), entities)
    }

    /// Base frequency in Hz.
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn reference_node(&self) -> &Node {
        &self.nodes[self.reference.index() as usize]
    }

    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.node_lookup.get(name).copied()
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.node_id(name)
            .and_then(|id| self.nodes.get(id.index() as usize))
    }

    pub fn entity_id(&self, name: &str) -> Option<EntityId> {
        self.entity_lookup.get(name).copied()
    }

    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entity_id(name)
            .and_then(|id| self.entities.get(id.index() as usize))
    }

    /// Entities incident to a node, in entity order.
    pub fn incident_entities(&self, node: NodeId) -> &[EntityId] {
        let idx = node.index() as usize;
        if idx >= self.nodes.len() {
            return &[];
        }
        &self.node_entities[self.node_offsets[idx]..self.node_offsets[idx + 1]]
    }
}

fn build_adjacency(
    nodes: &[Node],
    entities: &[Entity],
    node_lookup: &HashMap<String, NodeId>,
) -> (Vec<usize>, Vec<EntityId>) {
    let mut per_node: Vec<Vec<EntityId>> = vec![Vec::new(); nodes.len()];
    for (i, entity) in entities.iter().enumerate() {
        let id = EntityId::from_index(i as u32);
        for terminal in entity.terminals() {
            if let Some(node) = node_lookup.get(terminal) {
                let list = &mut per_node[node.index() as usize];
                if list.last() != Some(&id) {
                    list.push(id);
                }
            }
        }
    }

    let mut offsets = Vec::with_capacity(nodes.len() + 1);
    let mut flat = Vec::new();
    offsets.push(0);
    for list in per_node {
        flat.extend(list);
        offsets.push(flat.len());
    }
    (offsets, flat)
}
