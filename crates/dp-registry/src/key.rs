//! Catalog key decomposition.
//!
//! A flat key such as `_dp_ph1_Resistor` decomposes into the namespace path
//! `["dp", "ph1"]` and the leaf `Resistor`. The leading `_` is the catalog
//! prefix marker; repeated delimiters (`__`) do not produce empty segments.

use std::fmt;

use crate::catalog::{Constructor, EntityCatalog};
use crate::error::{RegistryError, RegistryResult};

pub const DELIMITER: char = '_';

/// Key prefixes that are placed into the namespace tree.
pub const NAMESPACED_PREFIXES: [&str; 2] = ["_dp", "_emt"];

/// Namespace path plus leaf name derived from a flat catalog key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey {
    pub path: Vec<String>,
    pub leaf: String,
}

impl EntityKey {
    /// Dotted module path, empty for root-level leaves.
    pub fn module_path(&self) -> String {
        self.path.join(".")
    }

    /// Fully qualified dotted name.
    pub fn qualified(&self) -> String {
        if self.path.is_empty() {
            self.leaf.clone()
        } else {
            format!("{}.{}", self.module_path(), self.leaf)
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified())
    }
}

/// Whether a catalog key belongs in the namespace tree.
pub fn is_namespaced(key: &str) -> bool {
    NAMESPACED_PREFIXES.iter().any(|p| key.starts_with(p))
}

/// Split a flat key into namespace path and leaf.
pub fn decompose_key(key: &str) -> RegistryResult<EntityKey> {
    let mut segments: Vec<String> = key
        .split(DELIMITER)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    let leaf = segments
        .pop()
        .ok_or_else(|| RegistryError::MalformedCatalogKey {
            key: key.to_string(),
        })?;

    Ok(EntityKey {
        path: segments,
        leaf,
    })
}

/// Explicit `flat key → (path, leaf, constructor)` table for a catalog.
///
/// Building the manifest is where decomposition and filtering happen;
/// registration only walks its entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogManifest {
    entries: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ManifestEntry {
    pub flat: String,
    pub key: EntityKey,
    pub ctor: Constructor,
}

impl CatalogManifest {
    pub fn from_catalog(catalog: &dyn EntityCatalog) -> RegistryResult<Self> {
        let mut entries = Vec::new();
        for flat in catalog.keys() {
            if !is_namespaced(&flat) {
                continue;
            }
            let key = decompose_key(&flat)?;
            let ctor = catalog
                .get(&flat)
                .ok_or_else(|| RegistryError::MissingConstructor { key: flat.clone() })?;
            entries.push(ManifestEntry { flat, key, ctor });
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TableCatalog;

    #[test]
    fn decompose_entity_key() {
        let key = decompose_key("_dp_ph1_Resistor").unwrap();
        assert_eq!(key.path, vec!["dp", "ph1"]);
        assert_eq!(key.leaf, "Resistor");
        assert_eq!(key.qualified(), "dp.ph1.Resistor");
    }

    #[test]
    fn decompose_node_key() {
        let key = decompose_key("_emt_Node").unwrap();
        assert_eq!(key.path, vec!["emt"]);
        assert_eq!(key.leaf, "Node");
    }

    #[test]
    fn double_delimiter_before_type_name() {
        let key = decompose_key("_dp_ph3__VoltageSource").unwrap();
        assert_eq!(key.path, vec!["dp", "ph3"]);
        assert_eq!(key.leaf, "VoltageSource");
    }

    #[test]
    fn single_segment_binds_at_root() {
        let key = decompose_key("_dp").unwrap();
        assert!(key.path.is_empty());
        assert_eq!(key.qualified(), "dp");
    }

    #[test]
    fn delimiter_only_keys_are_malformed() {
        for bad in ["", "_", "___"] {
            assert!(matches!(
                decompose_key(bad),
                Err(RegistryError::MalformedCatalogKey { .. })
            ));
        }
    }

    #[test]
    fn namespace_filter() {
        assert!(is_namespaced("_dp_ph1_Resistor"));
        assert!(is_namespaced("_emt_Node"));
        assert!(!is_namespaced("SystemTopology"));
        assert!(!is_namespaced("load_cim"));
    }

    #[test]
    fn manifest_skips_non_namespaced_keys() {
        let cat = TableCatalog::new()
            .with("Component", Constructor::Opaque("Component"))
            .with("_dp_Node", Constructor::Opaque("node"));
        let manifest = CatalogManifest::from_catalog(&cat).unwrap();
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.entries()[0].key.qualified(), "dp.Node");
    }
}
