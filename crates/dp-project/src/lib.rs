//! dp-project: scenario file format, validation and migration.

pub mod migrate;
pub mod schema;
pub mod validate;

use std::path::Path;

use dp_registry::Registry;
use tracing::debug;

pub use migrate::{LATEST_VERSION, migrate_to_latest};
pub use schema::*;
pub use validate::{ValidationError, ValidationErrors, resolve_entity_type, validate_scenario};

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Migration error: {what}")]
    Migration { what: String },

    #[error("Registry error: {0}")]
    Registry(#[from] dp_registry::RegistryError),

    #[error("Unsupported scenario format: {path} (expected .yaml, .yml or .json)")]
    UnsupportedFormat { path: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn finish_load(scenario: Scenario) -> ProjectResult<Scenario> {
    let scenario = migrate_to_latest(scenario)?;
    validate_scenario(&scenario, dp_registry::global()?)?;
    debug!(name = %scenario.name, "scenario loaded");
    Ok(scenario)
}

pub fn parse_yaml(content: &str) -> ProjectResult<Scenario> {
    finish_load(serde_yaml::from_str(content)?)
}

pub fn parse_json(content: &str) -> ProjectResult<Scenario> {
    finish_load(serde_json::from_str(content)?)
}

pub fn load_yaml(path: &Path) -> ProjectResult<Scenario> {
    parse_yaml(&std::fs::read_to_string(path)?)
}

pub fn save_yaml(path: &Path, scenario: &Scenario) -> ProjectResult<()> {
    validate_scenario(scenario, dp_registry::global()?)?;
    let content = serde_yaml::to_string(scenario)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &Path) -> ProjectResult<Scenario> {
    parse_json(&std::fs::read_to_string(path)?)
}

pub fn save_json(path: &Path, scenario: &Scenario) -> ProjectResult<()> {
    validate_scenario(scenario, dp_registry::global()?)?;
    let content = serde_json::to_string_pretty(scenario)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Load a scenario, choosing the format from the file extension.
pub fn load(path: &Path) -> ProjectResult<Scenario> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => load_yaml(path),
        Some("json") => load_json(path),
        _ => Err(ProjectError::UnsupportedFormat {
            path: path.display().to_string(),
        }),
    }
}

/// Validate against a caller-supplied registry, e.g. one with extra catalogs.
pub fn validate_with(scenario: &Scenario, registry: &Registry) -> ProjectResult<()> {
    Ok(validate_scenario(scenario, registry)?)
}
