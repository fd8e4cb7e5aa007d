//! Scenario schema migration.

use crate::ProjectError;
use crate::schema::Scenario;

pub const LATEST_VERSION: u32 = 1;

pub fn migrate_to_latest(mut scenario: Scenario) -> Result<Scenario, ProjectError> {
    while scenario.version < LATEST_VERSION {
        scenario = migrate_one_version(scenario)?;
    }
    Ok(scenario)
}

fn migrate_one_version(scenario: Scenario) -> Result<Scenario, ProjectError> {
    match scenario.version {
        0 => migrate_v0_to_v1(scenario),
        v => Err(ProjectError::Migration {
            what: format!("No migration path from version {}", v),
        }),
    }
}

/// Version 0 stored the run length as `simulation.final_time`.
fn migrate_v0_to_v1(mut scenario: Scenario) -> Result<Scenario, ProjectError> {
    if let Some(final_time) = scenario.simulation.final_time.take() {
        if scenario.simulation.duration != 0.0 && scenario.simulation.duration != final_time {
            return Err(ProjectError::Migration {
                what: format!(
                    "both duration ({}) and final_time ({}) are set",
                    scenario.simulation.duration, final_time
                ),
            });
        }
        scenario.simulation.duration = final_time;
    }
    scenario.version = 1;
    Ok(scenario)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{OutputDef, SimulationDef};
    use dp_core::Domain;

    fn scenario(version: u32, duration: f64, final_time: Option<f64>) -> Scenario {
        Scenario {
            version,
            name: "m".to_string(),
            frequency: 50.0,
            simulation: SimulationDef {
                duration,
                timestep: 1e-3,
                domain: Domain::Dp,
                final_time,
            },
            log_level: None,
            nodes: vec![],
            entities: vec![],
            alternate_topologies: vec![],
            events: vec![],
            output: OutputDef::default(),
        }
    }

    #[test]
    fn migrate_latest_is_noop() {
        let s = scenario(LATEST_VERSION, 1.0, None);
        assert_eq!(migrate_to_latest(s.clone()).unwrap(), s);
    }

    #[test]
    fn migrate_final_time_to_duration() {
        let migrated = migrate_to_latest(scenario(0, 0.0, Some(0.2))).unwrap();
        assert_eq!(migrated.version, LATEST_VERSION);
        assert_eq!(migrated.simulation.duration, 0.2);
        assert_eq!(migrated.simulation.final_time, None);
    }

    #[test]
    fn conflicting_run_length_rejected() {
        assert!(matches!(
            migrate_to_latest(scenario(0, 0.5, Some(0.2))),
            Err(ProjectError::Migration { .. })
        ));
    }
}
