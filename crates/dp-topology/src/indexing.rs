//! Contiguous indexing for solver integration.
//!
//! Maps node names to matrix rows. The reference node has no row; every other
//! node gets an index in `0..node_count()` in topology order.

use crate::topology::Topology;

#[derive(Debug, Clone)]
pub struct IndexMap {
    /// Non-reference node names in index order.
    names: Vec<String>,
    /// Row per topology node; `None` for the reference node.
    rows: Vec<Option<usize>>,
}

impl IndexMap {
    pub fn from_topology(topology: &Topology) -> Self {
        let mut names = Vec::new();
        let mut rows = Vec::with_capacity(topology.nodes().len());
        for node in topology.nodes() {
            if node.is_reference() {
                rows.push(None);
            } else {
                rows.push(Some(names.len()));
                names.push(node.name().to_string());
            }
        }
        Self { names, rows }
    }

    /// Number of non-reference nodes.
    pub fn node_count(&self) -> usize {
        self.names.len()
    }

    /// Matrix row of a node, `None` for the reference node or unknown names.
    pub fn row(&self, topology: &Topology, name: &str) -> Option<usize> {
        let id = topology.node_id(name)?;
        self.rows.get(id.index() as usize).copied().flatten()
    }

    /// Node name for a row (panics if out of bounds).
    pub fn name(&self, row: usize) -> &str {
        &self.names[row]
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}
