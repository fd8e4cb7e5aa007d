//! Content-based hashing for run IDs.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Hash of a serialisable scenario plus the solver version.
pub fn compute_run_id<T: Serialize>(scenario: &T, solver_version: &str) -> String {
    let mut hasher = Sha256::new();

    let scenario_json = serde_json::to_string(scenario).unwrap_or_default();
    hasher.update(scenario_json.as_bytes());
    hasher.update(solver_version.as_bytes());

    format!("{:x}", hasher.finalize())
}
