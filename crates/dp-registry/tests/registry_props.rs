//! Order-independence and idempotence of namespace registration.

use dp_registry::*;
use proptest::prelude::*;

fn builtin_entries() -> Vec<(String, Constructor)> {
    let cat = BuiltinCatalog::new();
    cat.keys()
        .into_iter()
        .filter_map(|k| cat.get(&k).map(|c| (k, c)))
        .collect()
}

proptest! {
    #[test]
    fn any_registration_order_yields_same_tree(
        entries in Just(builtin_entries()).prop_shuffle()
    ) {
        let reference = Registry::builtin().unwrap();
        let shuffled: TableCatalog = entries.into_iter().collect();
        let registry = Registry::from_catalog(&shuffled).unwrap();
        prop_assert_eq!(registry.paths(), reference.paths());
        prop_assert_eq!(registry.module_paths(), reference.module_paths());
        prop_assert!(registry == reference);
    }
}

#[test]
fn registering_twice_is_idempotent() {
    let catalog = BuiltinCatalog::new();
    let mut registry = Registry::from_catalog(&catalog).unwrap();
    let first = registry.clone();

    let added = registry.register_catalog(&catalog).unwrap();
    assert_eq!(added, 0);
    assert_eq!(registry, first);
}

#[test]
fn every_domain_and_phase_group_is_addressable() {
    let registry = Registry::builtin().unwrap();
    for path in [
        "dp.ph1.VoltageSource",
        "dp.ph3.Inductor",
        "emt.ph1.Capacitor",
        "emt.ph3.Switch",
        "dp.Node",
        "emt.Node",
    ] {
        assert!(registry.lookup(path).is_some(), "missing {path}");
    }
    assert!(registry.lookup("sp.ph1.Resistor").is_none());
    assert!(matches!(
        registry.resolve("dp.ph1.Nope"),
        Err(RegistryError::NotFound { .. })
    ));
}

#[test]
fn global_registry_matches_builtin() {
    let global = global().unwrap();
    assert_eq!(*global, Registry::builtin().unwrap());
    assert!(std::ptr::eq(global, dp_registry::global().unwrap()));
}

#[test]
fn extending_with_a_custom_catalog() {
    let mut registry = Registry::builtin().unwrap();
    let extra = TableCatalog::new().with("_emt_ph1_Custom_Thing", Constructor::Opaque("thing"));
    registry.register_catalog(&extra).unwrap();
    assert_eq!(
        registry.lookup("emt.ph1.Custom.Thing"),
        Some(&Constructor::Opaque("thing"))
    );
    assert!(registry.namespace("emt.ph1").unwrap().child("Custom").is_some());
}
