//! dp-registry: namespace construction over the entity catalog.
//!
//! Flat catalog keys such as `_dp_ph1_Resistor` are decomposed into a
//! namespace path and a leaf, then bound into a [`Registry`] tree so the
//! constructor is reachable as `dp.ph1.Resistor`.
//!
//! # Example
//!
//! ```
//! use dp_registry::Registry;
//! use dp_topology::Params;
//!
//! let registry = Registry::builtin().unwrap();
//! let node = registry.resolve("dp.Node").unwrap();
//! let gnd = node.ground().unwrap();
//! let n1 = node.node("n1").unwrap();
//! let r = registry
//!     .resolve("dp.ph1.Resistor")
//!     .unwrap()
//!     .entity("r_1", &[&n1, &gnd], Params::new().with("resistance", 1.0))
//!     .unwrap();
//! assert_eq!(r.terminals(), ["n1", "gnd"]);
//! ```

pub mod catalog;
pub mod error;
pub mod key;
pub mod namespace;

use std::sync::OnceLock;

pub use catalog::{BuiltinCatalog, Constructor, EntityCatalog, TableCatalog};
pub use error::{RegistryError, RegistryResult};
pub use key::{CatalogManifest, EntityKey, ManifestEntry, decompose_key, is_namespaced};
pub use namespace::{Namespace, NamespaceEntry, Registry};

static GLOBAL: OnceLock<RegistryResult<Registry>> = OnceLock::new();

/// Process-wide registry over the builtin catalog.
///
/// Built on first call; every later call observes the completed build.
pub fn global() -> RegistryResult<&'static Registry> {
    GLOBAL
        .get_or_init(Registry::builtin)
        .as_ref()
        .map_err(Clone::clone)
}
