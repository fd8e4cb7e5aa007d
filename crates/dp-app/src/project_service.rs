//! Scenario loading, validation and catalog introspection.

use std::path::Path;

use dp_project::{ProjectError, Scenario};
use dp_registry::Constructor;

use crate::error::{AppError, AppResult};

/// Summary of a scenario for listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioSummary {
    pub name: String,
    pub domain: String,
    pub duration: f64,
    pub timestep: f64,
    pub node_count: usize,
    pub entity_count: usize,
    pub topology_count: usize,
    pub event_count: usize,
}

/// One constructible registry path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub path: String,
    pub kind: String,
}

/// Load, migrate and validate a YAML or JSON scenario.
pub fn load_scenario(path: &Path) -> AppResult<Scenario> {
    dp_project::load(path).map_err(|e| match e {
        ProjectError::Io(source) => AppError::ScenarioRead {
            path: path.to_path_buf(),
            source,
        },
        other => other.into(),
    })
}

/// Save a scenario, choosing the format from the file extension.
pub fn save_scenario(path: &Path, scenario: &Scenario) -> AppResult<()> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => dp_project::save_json(path, scenario)?,
        Some("yaml" | "yml") => dp_project::save_yaml(path, scenario)?,
        _ => {
            return Err(AppError::InvalidInput(format!(
                "unsupported scenario extension: {}",
                path.display()
            )));
        }
    }
    Ok(())
}

/// Validate a scenario file and summarise it.
pub fn validate_file(path: &Path) -> AppResult<ScenarioSummary> {
    let scenario = load_scenario(path)?;
    Ok(summarize(&scenario))
}

pub fn summarize(scenario: &Scenario) -> ScenarioSummary {
    ScenarioSummary {
        name: scenario.name.clone(),
        domain: scenario.simulation.domain.to_string(),
        duration: scenario.simulation.duration,
        timestep: scenario.simulation.timestep,
        node_count: scenario.nodes.len(),
        entity_count: scenario.entities.len(),
        topology_count: scenario.topology_count(),
        event_count: scenario.events.len(),
    }
}

/// Every constructible path in the global registry, sorted.
pub fn list_catalog() -> AppResult<Vec<CatalogEntry>> {
    let registry = dp_registry::global()?;
    Ok(registry
        .paths()
        .into_iter()
        .filter_map(|(path, ctor)| {
            let kind = match ctor {
                Constructor::Node { .. } => "node".to_string(),
                Constructor::Entity(ty) => ty.kind.type_name().to_string(),
                Constructor::Opaque(_) => return None,
            };
            Some(CatalogEntry { path, kind })
        })
        .collect())
}
