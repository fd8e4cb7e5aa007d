use dp_core::{Domain, PhaseGroup};
use dp_topology::*;

fn ty(kind: EntityKind) -> EntityType {
    EntityType::new(Domain::Dp, PhaseGroup::Ph1, kind)
}

fn rlc_entities(gnd: &Node, n1: &Node, n2: &Node, n3: &Node) -> Vec<Entity> {
    vec![
        Entity::connect(
            ty(EntityKind::VoltageSource),
            "v_1",
            &[gnd, n1],
            Params::new().with("voltage_ref", 10.0),
        )
        .unwrap(),
        Entity::connect(
            ty(EntityKind::Resistor),
            "r_1",
            &[n1, n2],
            Params::new().with("resistance", 1.0),
        )
        .unwrap(),
        Entity::connect(
            ty(EntityKind::Capacitor),
            "c_1",
            &[n2, n3],
            Params::new().with("capacitance", 0.001),
        )
        .unwrap(),
        Entity::connect(
            ty(EntityKind::Inductor),
            "l_1",
            &[n3, gnd],
            Params::new().with("inductance", 0.001),
        )
        .unwrap(),
        Entity::connect(
            ty(EntityKind::Resistor),
            "r_2",
            &[n3, gnd],
            Params::new().with("resistance", 1.0),
        )
        .unwrap(),
    ]
}

#[test]
fn rlc_reference_circuit_validates() {
    let (gnd, n1, n2, n3) = (Node::ground(), Node::new("n1"), Node::new("n2"), Node::new("n3"));
    let entities = rlc_entities(&gnd, &n1, &n2, &n3);
    let topo = Topology::new(50.0, vec![gnd, n1, n2, n3], entities).unwrap();

    assert_eq!(topo.nodes().len(), 4);
    assert_eq!(topo.entities().len(), 5);
    let n3_id = topo.node_id("n3").unwrap();
    assert_eq!(topo.incident_entities(n3_id).len(), 3);
}

#[test]
fn rejects_zero_reference_nodes() {
    let (n1, n2) = (Node::new("n1"), Node::new("n2"));
    let r = Entity::connect(
        ty(EntityKind::Resistor),
        "r",
        &[&n1, &n2],
        Params::new().with("resistance", 1.0),
    )
    .unwrap();
    let err = Topology::new(50.0, vec![n1, n2], vec![r]).unwrap_err();
    assert_eq!(err, TopologyError::NoReferenceNode);
}

#[test]
fn rejects_two_reference_nodes() {
    let err = Topology::new(
        50.0,
        vec![Node::ground(), Node::reference("earth"), Node::new("n1")],
        vec![],
    )
    .unwrap_err();
    match err {
        TopologyError::MultipleReferenceNodes { nodes } => {
            assert_eq!(nodes, vec!["gnd".to_string(), "earth".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn rejects_dangling_node_reference() {
    let gnd = Node::ground();
    let stray = Node::new("stray");
    let r = Entity::connect(
        ty(EntityKind::Resistor),
        "r",
        &[&stray, &gnd],
        Params::new().with("resistance", 1.0),
    )
    .unwrap();
    let err = Topology::new(50.0, vec![gnd], vec![r]).unwrap_err();
    assert_eq!(
        err,
        TopologyError::DanglingNode {
            entity: "r".to_string(),
            node: "stray".to_string()
        }
    );
}

#[test]
fn rejects_duplicate_names() {
    let err = Topology::new(50.0, vec![Node::ground(), Node::new("gnd")], vec![]).unwrap_err();
    assert!(matches!(err, TopologyError::DuplicateNodeName { .. }));

    let (gnd, n1) = (Node::ground(), Node::new("n1"));
    let make = || {
        Entity::connect(
            ty(EntityKind::Resistor),
            "r",
            &[&n1, &gnd],
            Params::new().with("resistance", 1.0),
        )
        .unwrap()
    };
    let err = Topology::new(50.0, vec![gnd.clone(), n1.clone()], vec![make(), make()]).unwrap_err();
    assert!(matches!(err, TopologyError::DuplicateEntityName { .. }));
}

#[test]
fn rejects_single_terminal_entity() {
    let gnd = Node::ground();
    let r = Entity::connect(
        ty(EntityKind::Resistor),
        "r",
        &[&gnd],
        Params::new().with("resistance", 1.0),
    )
    .unwrap();
    let err = Topology::new(50.0, vec![gnd], vec![r]).unwrap_err();
    assert!(matches!(err, TopologyError::ArityMismatch { actual: 1, .. }));
}

mod props {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn exactly_one_reference_is_required(refs in proptest::collection::vec(any::<bool>(), 1..8)) {
            let nodes: Vec<Node> = refs
                .iter()
                .enumerate()
                .map(|(i, &r)| {
                    if r {
                        Node::reference(format!("n{i}"))
                    } else {
                        Node::new(format!("n{i}"))
                    }
                })
                .collect();
            let count = refs.iter().filter(|&&r| r).count();
            let result = Topology::new(50.0, nodes, Vec::new());
            match count {
                0 => prop_assert!(matches!(result, Err(TopologyError::NoReferenceNode))),
                1 => prop_assert!(result.is_ok()),
                _ => prop_assert!(matches!(result, Err(TopologyError::MultipleReferenceNodes { .. })), "expected MultipleReferenceNodes, got {:?}", result),
            }
        }

        #[test]
        fn non_positive_resistance_is_rejected(r in -1.0e6..=0.0f64) {
            let err = EntityKind::Resistor.check_parameter("resistance", r).unwrap_err();
            prop_assert!(
                matches!(err, TopologyError::InvalidParameter { .. }),
                "unexpected error: {}",
                err
            );
        }
    }
}
