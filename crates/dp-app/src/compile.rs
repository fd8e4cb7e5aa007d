//! Scenario → topologies, run configuration and scheduled events.

use dp_project::{ActionDef, EntityDef, Scenario};
use dp_registry::Registry;
use dp_sim::{Event, EventPayload, SimulationConfig};
use dp_topology::{Entity, GROUND_NAME, Node, Params, Topology};
use tracing::debug;

use crate::error::{AppError, AppResult};

/// Everything needed to build a simulation from a scenario.
#[derive(Debug, Clone)]
pub struct CompiledScenario {
    pub name: String,
    pub config: SimulationConfig,
    /// Main topology first, then alternates in file order.
    pub topologies: Vec<Topology>,
    pub events: Vec<Event>,
}

fn build_nodes(scenario: &Scenario, registry: &Registry) -> AppResult<Vec<Node>> {
    let ctor = registry.resolve(&format!("{}.Node", scenario.simulation.domain))?;
    scenario
        .nodes
        .iter()
        .map(|def| -> AppResult<Node> {
            match (def.reference, def.name == GROUND_NAME) {
                (true, true) => Ok(ctor.ground()?),
                (true, false) => Ok(Node::reference(def.name.clone())),
                (false, _) => Ok(ctor.node(def.name.clone())?),
            }
        })
        .collect()
}

fn build_entities(defs: &[EntityDef], registry: &Registry) -> AppResult<Vec<Entity>> {
    defs.iter()
        .map(|def| -> AppResult<Entity> {
            let params: Params = def.params.iter().map(|(k, v)| (k.clone(), *v)).collect();
            let entity = registry
                .resolve(&def.type_path)?
                .entity_by_names(def.name.clone(), &def.nodes, params)
                .map_err(|e| AppError::Compile(format!("entity '{}': {e}", def.name)))?;
            Ok(entity)
        })
        .collect()
}

fn build_event(time: f64, action: &ActionDef) -> Event {
    let payload = match action {
        ActionDef::SetParameter {
            entity,
            parameter,
            value,
        } => EventPayload::SetParameter {
            entity: entity.clone(),
            parameter: parameter.clone(),
            value: *value,
        },
        ActionDef::ExternalSignal { channel, value } => EventPayload::ExternalSignal {
            channel: channel.clone(),
            value: *value,
        },
        ActionDef::SwitchTopology { index } => EventPayload::SwitchTopology { index: *index },
    };
    Event::new(time, payload)
}

/// Compile a validated scenario using registry constructors.
pub fn compile_scenario(scenario: &Scenario, registry: &Registry) -> AppResult<CompiledScenario> {
    dp_project::validate_with(scenario, registry)?;

    let nodes = build_nodes(scenario, registry)?;
    let topologies = scenario
        .topology_entities()
        .map(|defs| -> AppResult<Topology> {
            let entities = build_entities(defs, registry)?;
            Ok(Topology::new(scenario.frequency, nodes.clone(), entities)?)
        })
        .collect::<AppResult<Vec<_>>>()?;

    let sim = &scenario.simulation;
    let config = SimulationConfig::new(sim.duration, sim.timestep, sim.domain)?;
    let events = scenario
        .events
        .iter()
        .map(|e| build_event(e.time, &e.action))
        .collect();

    debug!(
        name = %scenario.name,
        topologies = topologies.len(),
        nodes = nodes.len(),
        "compiled scenario"
    );
    Ok(CompiledScenario {
        name: scenario.name.clone(),
        config,
        topologies,
        events,
    })
}
