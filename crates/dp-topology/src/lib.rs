//! dp-topology: network data model for dpsim-rs.
//!
//! Provides:
//! - Nodes, entities (components) and per-kind parameter rules
//! - `Topology::new`, which validates and freezes a network
//! - Incremental builder with typed unit helpers
//! - Contiguous indexing for solver matrix assembly
//!
//! # Example
//!
//! ```
//! use dp_core::{Domain, PhaseGroup};
//! use dp_topology::{Entity, EntityKind, EntityType, Node, Params, Topology};
//!
//! let gnd = Node::ground();
//! let n1 = Node::new("n1");
//! let r = Entity::connect(
//!     EntityType::new(Domain::Dp, PhaseGroup::Ph1, EntityKind::Resistor),
//!     "r1",
//!     &[&n1, &gnd],
//!     Params::new().with("resistance", 1.0),
//! )
//! .unwrap();
//! let topo = Topology::new(50.0, vec![gnd, n1], vec![r]).unwrap();
//! assert_eq!(topo.entities().len(), 1);
//! ```

pub mod builder;
pub mod entity;
pub mod error;
pub mod indexing;
pub mod topology;
pub(crate) mod validate;

pub use builder::TopologyBuilder;
pub use entity::{Entity, EntityKind, EntityType, ParamRule, ParamSpec, Params};
pub use error::{TopologyError, TopologyResult};
pub use indexing::IndexMap;
pub use topology::{GROUND_NAME, Node, Topology};
