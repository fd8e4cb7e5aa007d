//! Hierarchical namespace built from catalog keys.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::catalog::{BuiltinCatalog, Constructor, EntityCatalog};
use crate::error::{RegistryError, RegistryResult};
use crate::key::{CatalogManifest, EntityKey};

const ROOT: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Module(usize),
    Leaf(Constructor),
}

#[derive(Debug, Clone)]
struct NamespaceNode {
    path: String,
    entries: BTreeMap<String, Slot>,
}

/// An entry of a namespace node, as seen through [`Namespace::entries`].
#[derive(Debug, Clone, Copy)]
pub enum NamespaceEntry<'a> {
    Module(Namespace<'a>),
    Leaf(&'a Constructor),
}

/// Namespace tree of constructors.
///
/// Nodes live in an arena and are created on first use. `modules` maps each
/// fully qualified module path to its arena slot, so two keys sharing a prefix
/// always populate the same node.
#[derive(Debug, Clone)]
pub struct Registry {
    nodes: Vec<NamespaceNode>,
    modules: HashMap<String, usize>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Empty registry holding only the root namespace.
    pub fn new() -> Self {
        let mut modules = HashMap::new();
        modules.insert(String::new(), ROOT);
        Self {
            nodes: vec![NamespaceNode {
                path: String::new(),
                entries: BTreeMap::new(),
            }],
            modules,
        }
    }

    pub fn from_catalog(catalog: &dyn EntityCatalog) -> RegistryResult<Self> {
        let mut registry = Self::new();
        registry.register_catalog(catalog)?;
        Ok(registry)
    }

    /// Registry over [`BuiltinCatalog`].
    pub fn builtin() -> RegistryResult<Self> {
        Self::from_catalog(&BuiltinCatalog::new())
    }

    /// Register every namespaced key of `catalog`.
    ///
    /// All-or-nothing: on error the registry is left unchanged. Returns the
    /// number of leaves that were newly bound; re-registering an identical
    /// constructor is a no-op.
    pub fn register_catalog(&mut self, catalog: &dyn EntityCatalog) -> RegistryResult<usize> {
        let manifest = CatalogManifest::from_catalog(catalog)?;
        let mut staged = self.clone();
        let mut added = 0;
        for entry in manifest.entries() {
            if staged.bind(&entry.key, entry.ctor)? {
                tracing::debug!(path = %entry.key, "registered");
                added += 1;
            }
        }
        *self = staged;
        tracing::info!(
            keys = manifest.len(),
            added,
            modules = self.nodes.len() - 1,
            "namespace registry updated"
        );
        Ok(added)
    }

    /// Bind one leaf, creating intermediate modules as needed.
    fn bind(&mut self, key: &EntityKey, ctor: Constructor) -> RegistryResult<bool> {
        let mut current = ROOT;
        for depth in 0..key.path.len() {
            current = self.ensure_module(&key.path[..=depth], current)?;
        }

        let node = &mut self.nodes[current];
        let existing = node.entries.get(&key.leaf).copied();
        match existing {
            None => {
                node.entries.insert(key.leaf.clone(), Slot::Leaf(ctor));
                Ok(true)
            }
            Some(Slot::Leaf(existing)) if existing == ctor => Ok(false),
            Some(Slot::Leaf(existing)) => Err(RegistryError::NamespaceCollision {
                path: key.qualified(),
                existing: existing.to_string(),
                incoming: ctor.to_string(),
            }),
            Some(Slot::Module(_)) => Err(RegistryError::NamespaceCollision {
                path: key.qualified(),
                existing: "a namespace".to_string(),
                incoming: ctor.to_string(),
            }),
        }
    }

    /// Return the module at `segments`, creating it under `parent` if absent.
    fn ensure_module(&mut self, segments: &[String], parent: usize) -> RegistryResult<usize> {
        let full = segments.join(".");
        if let Some(&existing) = self.modules.get(&full) {
            return Ok(existing);
        }

        let name = segments[segments.len() - 1].clone();
        if let Some(Slot::Leaf(existing)) = self.nodes[parent].entries.get(&name) {
            return Err(RegistryError::NamespaceCollision {
                path: full,
                existing: existing.to_string(),
                incoming: "a namespace".to_string(),
            });
        }

        let index = self.nodes.len();
        self.nodes.push(NamespaceNode {
            path: full.clone(),
            entries: BTreeMap::new(),
        });
        self.nodes[parent].entries.insert(name, Slot::Module(index));
        self.modules.insert(full, index);
        Ok(index)
    }

    pub fn root(&self) -> Namespace<'_> {
        Namespace {
            registry: self,
            index: ROOT,
        }
    }

    /// Module at a dotted path (`""` is the root).
    pub fn namespace(&self, path: &str) -> Option<Namespace<'_>> {
        self.modules.get(path).map(|&index| Namespace {
            registry: self,
            index,
        })
    }

    /// Constructor at a dotted path such as `dp.ph1.Resistor`.
    pub fn lookup(&self, path: &str) -> Option<&Constructor> {
        let (module, leaf) = match path.rsplit_once('.') {
            Some((module, leaf)) => (module, leaf),
            None => ("", path),
        };
        self.namespace(module)?.get(leaf)
    }

    /// Like [`lookup`](Self::lookup) but with an error for missing paths.
    pub fn resolve(&self, path: &str) -> RegistryResult<Constructor> {
        self.lookup(path)
            .copied()
            .ok_or_else(|| RegistryError::NotFound {
                path: path.to_string(),
            })
    }

    /// Every bound leaf keyed by fully qualified path.
    pub fn paths(&self) -> BTreeMap<String, Constructor> {
        let mut out = BTreeMap::new();
        for node in &self.nodes {
            for (name, slot) in &node.entries {
                if let Slot::Leaf(ctor) = slot {
                    let qualified = if node.path.is_empty() {
                        name.clone()
                    } else {
                        format!("{}.{}", node.path, name)
                    };
                    out.insert(qualified, *ctor);
                }
            }
        }
        out
    }

    /// Every module path except the root.
    pub fn module_paths(&self) -> BTreeSet<String> {
        self.modules
            .keys()
            .filter(|p| !p.is_empty())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes
            .iter()
            .map(|n| {
                n.entries
                    .values()
                    .filter(|s| matches!(s, Slot::Leaf(_)))
                    .count()
            })
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Structural equality: same modules, same paths bound to the same constructors.
impl PartialEq for Registry {
    fn eq(&self, other: &Self) -> bool {
        self.module_paths() == other.module_paths() && self.paths() == other.paths()
    }
}

/// Borrowed view of one namespace node.
#[derive(Debug, Clone, Copy)]
pub struct Namespace<'a> {
    registry: &'a Registry,
    index: usize,
}

impl<'a> Namespace<'a> {
    fn node(&self) -> &'a NamespaceNode {
        &self.registry.nodes[self.index]
    }

    /// Dotted path of this module (`""` for the root).
    pub fn path(&self) -> &'a str {
        &self.node().path
    }

    /// Leaf constructor bound directly in this module.
    pub fn get(&self, name: &str) -> Option<&'a Constructor> {
        match self.node().entries.get(name)? {
            Slot::Leaf(ctor) => Some(ctor),
            Slot::Module(_) => None,
        }
    }

    /// Child module.
    pub fn child(&self, name: &str) -> Option<Namespace<'a>> {
        match self.node().entries.get(name)? {
            Slot::Module(index) => Some(Namespace {
                registry: self.registry,
                index: *index,
            }),
            Slot::Leaf(_) => None,
        }
    }

    /// Entries in name order.
    pub fn entries(self) -> impl Iterator<Item = (&'a str, NamespaceEntry<'a>)> + 'a {
        let registry = self.registry;
        self.node().entries.iter().map(move |(name, slot)| {
            let entry = match slot {
                Slot::Module(index) => NamespaceEntry::Module(Namespace {
                    registry,
                    index: *index,
                }),
                Slot::Leaf(ctor) => NamespaceEntry::Leaf(ctor),
            };
            (name.as_str(), entry)
        })
    }

    /// Whether this view and `other` point at the same namespace node.
    pub fn same_node(&self, other: &Namespace<'_>) -> bool {
        std::ptr::eq(self.registry, other.registry) && self.index == other.index
    }
}
