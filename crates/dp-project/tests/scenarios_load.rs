use std::path::Path;

#[test]
fn bundled_scenarios_load_and_validate() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../scenarios");
    let scenarios = [
        "IdealVS_RLC_1.yaml",
        "RXLine_LoadStep.yaml",
        "DP_Switch_Signal.json",
    ];

    for name in scenarios {
        let path = root.join(name);
        let scenario =
            dp_project::load(&path).unwrap_or_else(|e| panic!("Failed to load {}: {}", name, e));
        assert_eq!(scenario.version, dp_project::LATEST_VERSION);
        assert!(scenario.simulation.duration > 0.0, "{name}");
    }
}

#[test]
fn v0_scenario_is_migrated_on_load() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../scenarios");
    let scenario = dp_project::load_json(&root.join("DP_Switch_Signal.json")).unwrap();
    assert_eq!(scenario.simulation.duration, 0.05);
    assert_eq!(scenario.simulation.final_time, None);
}

#[test]
fn unknown_extension_rejected() {
    let err = dp_project::load(Path::new("scenario.toml")).unwrap_err();
    assert!(matches!(err, dp_project::ProjectError::UnsupportedFormat { .. }));
}

#[test]
fn invalid_scenario_reports_all_problems() {
    let yaml = r#"
version: 1
name: ""
frequency: -50
simulation: { duration: 0.1, timestep: 0.001 }
nodes: [ { name: n1 } ]
entities:
  - { name: r, type: dp.ph1.Nope, nodes: [n1, gnd] }
"#;
    let err = dp_project::parse_yaml(yaml).unwrap_err();
    match err {
        dp_project::ProjectError::Validation(errs) => {
            // empty name, frequency, reference count, missing gnd, unknown type
            assert_eq!(errs.len(), 5, "{errs}");
        }
        other => panic!("unexpected error: {other}"),
    }
}
