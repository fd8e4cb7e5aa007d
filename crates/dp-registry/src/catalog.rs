//! Flat entity catalog: constructible kinds keyed by structured names.

use std::collections::BTreeMap;
use std::fmt;

use dp_core::{Domain, PhaseGroup};
use dp_topology::{Entity, EntityKind, EntityType, Node, Params};

use crate::error::{RegistryError, RegistryResult};

/// Constructor handle bound to a catalog key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Constructor {
    /// Builds electrical nodes for a domain.
    Node { domain: Domain },
    /// Builds entities of one fully qualified type.
    Entity(EntityType),
    /// Catalog member that is not part of any namespace.
    Opaque(&'static str),
}

impl Constructor {
    pub fn entity_type(&self) -> Option<EntityType> {
        match self {
            Constructor::Entity(ty) => Some(*ty),
            _ => None,
        }
    }

    fn describe(&self) -> String {
        self.to_string()
    }

    /// Build a plain node.
    pub fn node(&self, name: impl Into<String>) -> RegistryResult<Node> {
        match self {
            Constructor::Node { .. } => Ok(Node::new(name)),
            _ => Err(RegistryError::NotConstructible {
                path: self.describe(),
                what: "a node",
            }),
        }
    }

    /// Build the `gnd` reference node.
    pub fn ground(&self) -> RegistryResult<Node> {
        match self {
            Constructor::Node { .. } => Ok(Node::ground()),
            _ => Err(RegistryError::NotConstructible {
                path: self.describe(),
                what: "a reference node",
            }),
        }
    }

    /// Build an entity connected to `nodes`.
    pub fn entity(
        &self,
        name: impl Into<String>,
        nodes: &[&Node],
        params: Params,
    ) -> RegistryResult<Entity> {
        match self {
            Constructor::Entity(ty) => Ok(Entity::connect(*ty, name, nodes, params)?),
            _ => Err(RegistryError::NotConstructible {
                path: self.describe(),
                what: "an entity",
            }),
        }
    }

    /// Build an entity whose terminals are given by node name.
    pub fn entity_by_names<S: Into<String>>(
        &self,
        name: impl Into<String>,
        terminals: impl IntoIterator<Item = S>,
        params: Params,
    ) -> RegistryResult<Entity> {
        match self {
            Constructor::Entity(ty) => Ok(Entity::new(*ty, name, terminals, params)?),
            _ => Err(RegistryError::NotConstructible {
                path: self.describe(),
                what: "an entity",
            }),
        }
    }
}

impl fmt::Display for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constructor::Node { domain } => write!(f, "{domain}.Node"),
            Constructor::Entity(ty) => write!(f, "{ty}"),
            Constructor::Opaque(name) => f.write_str(name),
        }
    }
}

/// Read access to a flat key → constructor table.
pub trait EntityCatalog {
    /// All keys, in catalog order.
    fn keys(&self) -> Vec<String>;

    fn get(&self, key: &str) -> Option<Constructor>;
}

/// Catalog backed by an explicit key list.
#[derive(Debug, Clone, Default)]
pub struct TableCatalog {
    entries: Vec<(String, Constructor)>,
}

impl TableCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. A repeated key replaces the earlier constructor in `get`.
    pub fn insert(&mut self, key: impl Into<String>, ctor: Constructor) {
        self.entries.push((key.into(), ctor));
    }

    pub fn with(mut self, key: impl Into<String>, ctor: Constructor) -> Self {
        self.insert(key, ctor);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Constructor)> for TableCatalog {
    fn from_iter<I: IntoIterator<Item = (String, Constructor)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl EntityCatalog for TableCatalog {
    fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|(k, _)| k.clone()).collect()
    }

    fn get(&self, key: &str) -> Option<Constructor> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, c)| *c)
    }
}

/// The constructors shipped with the crate.
///
/// Keys follow `_<domain>_<phase>_<Type>` for entities and `_<domain>_Node` for
/// nodes; `Component` and `SystemTopology` are catalog members outside the
/// namespaces.
#[derive(Debug, Clone)]
pub struct BuiltinCatalog {
    entries: BTreeMap<String, Constructor>,
}

impl BuiltinCatalog {
    pub fn new() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert("Component".to_string(), Constructor::Opaque("Component"));
        entries.insert(
            "SystemTopology".to_string(),
            Constructor::Opaque("SystemTopology"),
        );
        for domain in Domain::ALL {
            entries.insert(format!("_{domain}_Node"), Constructor::Node { domain });
            for phase in PhaseGroup::ALL {
                for kind in EntityKind::ALL {
                    entries.insert(
                        format!("_{domain}_{phase}_{kind}"),
                        Constructor::Entity(EntityType::new(domain, phase, kind)),
                    );
                }
            }
        }
        Self { entries }
    }
}

impl Default for BuiltinCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityCatalog for BuiltinCatalog {
    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn get(&self, key: &str) -> Option<Constructor> {
        self.entries.get(key).copied()
    }
}
