//! Run manifest storage next to the left-vector logs.

use std::fs;
use std::path::{Path, PathBuf};

use crate::csv_log::left_vector_path;
use crate::types::{RunManifest, TimeSeries};
use crate::{ResultsError, ResultsResult, read_left_vector};

/// A log directory holding `<name>_LeftVector.csv` and `<name>.manifest.json` pairs.
#[derive(Debug, Clone)]
pub struct RunStore {
    root_dir: PathBuf,
}

impl RunStore {
    pub fn new(root_dir: PathBuf) -> ResultsResult<Self> {
        if !root_dir.exists() {
            fs::create_dir_all(&root_dir)?;
        }
        Ok(Self { root_dir })
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    fn manifest_path(&self, name: &str) -> PathBuf {
        self.root_dir.join(format!("{name}.manifest.json"))
    }

    pub fn log_path(&self, name: &str) -> PathBuf {
        left_vector_path(&self.root_dir, name)
    }

    pub fn save_manifest(&self, manifest: &RunManifest) -> ResultsResult<()> {
        let json = serde_json::to_string_pretty(manifest)?;
        fs::write(self.manifest_path(&manifest.name), json)?;
        Ok(())
    }

    pub fn load_manifest(&self, name: &str) -> ResultsResult<RunManifest> {
        let path = self.manifest_path(name);
        if !path.exists() {
            return Err(ResultsError::RunNotFound {
                name: name.to_string(),
            });
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn load_timeseries(&self, name: &str) -> ResultsResult<TimeSeries> {
        let path = self.log_path(name);
        if !path.exists() {
            return Err(ResultsError::RunNotFound {
                name: name.to_string(),
            });
        }
        read_left_vector(&path)
    }

    /// Manifests of every run in the directory, sorted by name.
    pub fn list_runs(&self) -> ResultsResult<Vec<RunManifest>> {
        let mut runs = Vec::new();
        for entry in fs::read_dir(&self.root_dir)? {
            let entry = entry?;
            let file_name = entry.file_name().to_string_lossy().to_string();
            if let Some(name) = file_name.strip_suffix(".manifest.json")
                && let Ok(manifest) = self.load_manifest(name)
            {
                runs.push(manifest);
            }
        }
        runs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(runs)
    }
}
