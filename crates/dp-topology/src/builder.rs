//! Incremental topology builder.

use dp_core::{
    Capacitance, Domain, EntityId, Inductance, NodeId, PhaseGroup, Resistance, Voltage,
};
use uom::si::capacitance::farad;
use uom::si::electric_potential::volt;
use uom::si::electrical_resistance::ohm;
use uom::si::inductance::henry;

use crate::entity::{Entity, EntityKind, EntityType, Params};
use crate::error::{TopologyError, TopologyResult};
use crate::topology::{Node, Topology};

/// Builder for constructing a topology incrementally.
///
/// Nodes are addressed by the `NodeId` returned from `add_node`; entities are
/// created in the builder's domain and phase group unless `add_entity` is given
/// an explicit type. `build()` runs the same validation as `Topology::new`.
#[derive(Debug)]
pub struct TopologyBuilder {
    frequency: f64,
    domain: Domain,
    phase: PhaseGroup,
    nodes: Vec<Node>,
    entities: Vec<Entity>,
}

impl TopologyBuilder {
    pub fn new(frequency: f64, domain: Domain) -> Self {
        Self {
            frequency,
            domain,
            phase: PhaseGroup::Ph1,
            nodes: Vec::new(),
            entities: Vec::new(),
        }
    }

    /// Phase group used by the typed helpers.
    pub fn phase(mut self, phase: PhaseGroup) -> Self {
        self.phase = phase;
        self
    }

    /// Add a node and return its ID.
    pub fn add_node(&mut self, name: impl Into<String>) -> NodeId {
        self.push_node(Node::new(name))
    }

    /// Add the reference node and return its ID.
    pub fn add_reference(&mut self, name: impl Into<String>) -> NodeId {
        self.push_node(Node::reference(name))
    }

    fn push_node(&mut self, node: Node) -> NodeId {
        let id = NodeId::from_index(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    fn node_name(&self, entity: &str, id: NodeId) -> TopologyResult<String> {
        self.nodes
            .get(id.index() as usize)
            .map(|n| n.name().to_string())
            .ok_or_else(|| TopologyError::DanglingNode {
                entity: entity.to_string(),
                node: format!("#{id}"),
            })
    }

    /// Add an entity of an explicit type connected to `terminals`.
    pub fn add_entity(
        &mut self,
        ty: EntityType,
        name: impl Into<String>,
        terminals: &[NodeId],
        params: Params,
    ) -> TopologyResult<EntityId> {
        let name = name.into();
        let names = terminals
            .iter()
            .map(|&t| self.node_name(&name, t))
            .collect::<TopologyResult<Vec<_>>>()?;
        let entity = Entity::new(ty, name, names, params)?;
        let id = EntityId::from_index(self.entities.len() as u32);
        self.entities.push(entity);
        Ok(id)
    }

    fn add_kind(
        &mut self,
        kind: EntityKind,
        name: impl Into<String>,
        a: NodeId,
        b: NodeId,
        params: Params,
    ) -> TopologyResult<EntityId> {
        let ty = EntityType::new(self.domain, self.phase, kind);
        self.add_entity(ty, name, &[a, b], params)
    }

    pub fn resistor(
        &mut self,
        name: impl Into<String>,
        a: NodeId,
        b: NodeId,
        r: Resistance,
    ) -> TopologyResult<EntityId> {
        let params = Params::new().with("resistance", r.get::<ohm>());
        self.add_kind(EntityKind::Resistor, name, a, b, params)
    }

    pub fn capacitor(
        &mut self,
        name: impl Into<String>,
        a: NodeId,
        b: NodeId,
        c: Capacitance,
    ) -> TopologyResult<EntityId> {
        let params = Params::new().with("capacitance", c.get::<farad>());
        self.add_kind(EntityKind::Capacitor, name, a, b, params)
    }

    pub fn inductor(
        &mut self,
        name: impl Into<String>,
        a: NodeId,
        b: NodeId,
        l: Inductance,
    ) -> TopologyResult<EntityId> {
        let params = Params::new().with("inductance", l.get::<henry>());
        self.add_kind(EntityKind::Inductor, name, a, b, params)
    }

    pub fn voltage_source(
        &mut self,
        name: impl Into<String>,
        a: NodeId,
        b: NodeId,
        v: Voltage,
    ) -> TopologyResult<EntityId> {
        let params = Params::new().with("voltage_ref", v.get::<volt>());
        self.add_kind(EntityKind::VoltageSource, name, a, b, params)
    }

    /// Validate and freeze into an immutable `Topology`.
    pub fn build(self) -> TopologyResult<Topology> {
        Topology::new(self.frequency, self.nodes, self.entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dp_core::{farad, henry, ohm, volt};

    #[test]
    fn builder_basic() {
        let mut b = TopologyBuilder::new(50.0, Domain::Dp);
        let gnd = b.add_reference("gnd");
        let n1 = b.add_node("n1");
        let r = b.resistor("r1", n1, gnd, ohm(1.0)).unwrap();

        assert_eq!(gnd.index(), 0);
        assert_eq!(n1.index(), 1);
        assert_eq!(r.index(), 0);

        let topo = b.build().unwrap();
        assert_eq!(topo.nodes().len(), 2);
        assert_eq!(topo.entity("r1").unwrap().param("resistance"), Some(1.0));
    }

    #[test]
    fn builder_typed_helpers_use_builder_domain() {
        let mut b = TopologyBuilder::new(60.0, Domain::Emt).phase(PhaseGroup::Ph3);
        let gnd = b.add_reference("gnd");
        let n1 = b.add_node("n1");
        let n2 = b.add_node("n2");
        b.voltage_source("v", gnd, n1, volt(1.0)).unwrap();
        b.capacitor("c", n1, n2, farad(1e-6)).unwrap();
        b.inductor("l", n2, gnd, henry(1e-3)).unwrap();
        let topo = b.build().unwrap();

        let ty = topo.entity("c").unwrap().entity_type();
        assert_eq!(ty.domain, Domain::Emt);
        assert_eq!(ty.phase, PhaseGroup::Ph3);
    }

    #[test]
    fn builder_rejects_unknown_node_id() {
        let mut b = TopologyBuilder::new(50.0, Domain::Dp);
        let gnd = b.add_reference("gnd");
        let err = b
            .resistor("r", gnd, NodeId::from_index(7), ohm(1.0))
            .unwrap_err();
        assert!(matches!(err, TopologyError::DanglingNode { .. }));
    }
}
