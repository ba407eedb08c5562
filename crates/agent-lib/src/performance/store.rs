//! Durable counter store
//!
//! Keeps the CPU counter samples of the previous cycle, one snapshot per
//! store key (usually the cluster name). Each cycle reads the old snapshot
//! and then overwrites it wholesale.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::models::UsageSample;
use crate::temporal::sanitize_file_name;

/// Storage of the previous cycle's counter samples
pub trait CounterStore {
    /// Samples persisted by the previous cycle; empty on first run
    fn load(&self, key: &str) -> Result<Vec<UsageSample>, StoreError>;

    /// Replace the snapshot for `key`
    fn persist(&mut self, key: &str, samples: &[UsageSample]) -> Result<(), StoreError>;
}

/// On-disk layout of one snapshot
#[derive(Debug, Default, Serialize, Deserialize)]
struct ContainersStore {
    containers: Vec<UsageSample>,
}

/// Counter store writing one JSON file per key
#[derive(Debug, Clone)]
pub struct FileCounterStore {
    dir: PathBuf,
}

impl FileCounterStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Snapshot file of `key`, always directly inside the store directory
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}_containers_counters.json", sanitize_file_name(key)))
    }

    fn io_error(path: &Path, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl CounterStore for FileCounterStore {
    fn load(&self, key: &str) -> Result<Vec<UsageSample>, StoreError> {
        let path = self.path_for(key);
        if !path.exists() {
            debug!(path = %path.display(), "No counter snapshot found, cold start");
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path).map_err(|e| Self::io_error(&path, e))?;

        match serde_json::from_str::<ContainersStore>(&content) {
            Ok(store) => Ok(store.containers),
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to parse counter snapshot, starting fresh"
                );
                Ok(Vec::new())
            }
        }
    }

    fn persist(&mut self, key: &str, samples: &[UsageSample]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| Self::io_error(&self.dir, e))?;

        let path = self.path_for(key);
        let tmp_path = path.with_extension("json.tmp");
        let content = serde_json::to_string(&ContainersStore {
            containers: samples.to_vec(),
        })
        .map_err(|source| StoreError::Serialize {
            key: key.to_string(),
            source,
        })?;

        fs::write(&tmp_path, content).map_err(|e| Self::io_error(&tmp_path, e))?;
        fs::rename(&tmp_path, &path).map_err(|e| Self::io_error(&path, e))?;

        debug!(path = %path.display(), samples = samples.len(), "Persisted counter snapshot");
        Ok(())
    }
}

/// In-memory counter store
#[derive(Debug, Clone, Default)]
pub struct MemoryCounterStore {
    snapshots: HashMap<String, Vec<UsageSample>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CounterStore for MemoryCounterStore {
    fn load(&self, key: &str) -> Result<Vec<UsageSample>, StoreError> {
        Ok(self.snapshots.get(key).cloned().unwrap_or_default())
    }

    fn persist(&mut self, key: &str, samples: &[UsageSample]) -> Result<(), StoreError> {
        self.snapshots.insert(key.to_string(), samples.to_vec());
        Ok(())
    }
}
