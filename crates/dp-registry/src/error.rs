//! Registry error types.

use dp_topology::TopologyError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Malformed catalog key: {key:?}")]
    MalformedCatalogKey { key: String },

    #[error("Namespace collision at {path}: {existing} is already bound, cannot bind {incoming}")]
    NamespaceCollision {
        path: String,
        existing: String,
        incoming: String,
    },

    #[error("Catalog key {key} has no constructor")]
    MissingConstructor { key: String },

    #[error("{path} cannot construct {what}")]
    NotConstructible { path: String, what: &'static str },

    #[error("No entry registered at {path}")]
    NotFound { path: String },

    #[error(transparent)]
    Topology(#[from] TopologyError),
}

pub type RegistryResult<T> = Result<T, RegistryError>;
