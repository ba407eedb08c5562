//! Per-object value stores
//!
//! A value store is a small JSON map that survives between check runs. Each
//! monitored object (pod, controller, claim, node) owns exactly one store.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::StoreError;

/// Durable key-value mapping of one monitored object
pub trait ValueStore {
    fn get(&self, key: &str) -> Option<&Value>;

    fn set(&mut self, key: &str, value: Value);

    fn remove(&mut self, key: &str) -> Option<Value>;

    /// Numeric value of `key`; `None` when absent, null or not a number
    fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }
}

/// Value store kept in memory only
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryValueStore {
    values: BTreeMap<String, Value>,
}

impl MemoryValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ValueStore for MemoryValueStore {
    fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }
}

/// Value store backed by a JSON file
///
/// The file is read once on [`FileValueStore::open`]; changes stay in memory
/// until [`FileValueStore::save`] writes them back.
#[derive(Debug, Clone)]
pub struct FileValueStore {
    path: PathBuf,
    values: MemoryValueStore,
}

impl FileValueStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let values = Self::load(&path)?;
        Ok(Self { path, values })
    }

    fn load(path: &Path) -> Result<MemoryValueStore, StoreError> {
        if !path.exists() {
            debug!(path = %path.display(), "No value store found, starting empty");
            return Ok(MemoryValueStore::new());
        }

        let content = fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        match serde_json::from_str::<BTreeMap<String, Value>>(&content) {
            Ok(values) => Ok(MemoryValueStore { values }),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Discarding unreadable value store");
                Ok(MemoryValueStore::new())
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self) -> Result<(), StoreError> {
        let io_error = |path: &Path, source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }

        let content = serde_json::to_string_pretty(&self.values.values).map_err(|source| {
            StoreError::Serialize {
                key: self.path.display().to_string(),
                source,
            }
        })?;

        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, content).map_err(|e| io_error(&tmp_path, e))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| io_error(&self.path, e))?;
        Ok(())
    }
}

impl ValueStore for FileValueStore {
    fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    fn set(&mut self, key: &str, value: Value) {
        self.values.set(key, value);
    }

    fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }
}

/// Replace every character that is not safe in a file name with `_`
///
/// Names made of dots only are replaced entirely, so the result never
/// refers to the current or parent directory.
pub fn sanitize_file_name(name: &str) -> String {
    if name.chars().all(|c| c == '.') {
        return "_".repeat(name.len().max(1));
    }
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// File of the value store for `check` on `item` of `host`
///
/// Path components are sanitized so that host and item names cannot escape
/// `dir`.
pub fn object_store_path(dir: &Path, host: &str, check: &str, item: Option<&str>) -> PathBuf {
    let host = if host.is_empty() {
        "_cluster".to_string()
    } else {
        sanitize_file_name(host)
    };
    let file = match item {
        Some(item) => format!("{}.{}.json", sanitize_file_name(check), sanitize_file_name(item)),
        None => format!("{}.json", sanitize_file_name(check)),
    };
    dir.join(host).join(file)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_file_store_persists_between_opens() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pod").join("kube_pod_status.json");

        let mut store = FileValueStore::open(&path).unwrap();
        store.set("previous_time", json!(100.0));
        store.save().unwrap();

        let reopened = FileValueStore::open(&path).unwrap();
        assert_eq!(reopened.get_f64("previous_time"), Some(100.0));
    }

    #[test]
    fn test_unreadable_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{").unwrap();

        let store = FileValueStore::open(&path).unwrap();
        assert!(store.get("anything").is_none());
    }

    #[test]
    fn test_null_is_not_a_number() {
        let mut store = MemoryValueStore::new();
        store.set("since", Value::Null);
        assert_eq!(store.get_f64("since"), None);
        assert!(store.get("since").is_some());
    }

    #[test]
    fn test_store_path_is_sanitized() {
        let dir = Path::new("/var/lib");
        let path = object_store_path(dir, "pod_c_ns/../x", "kube_pvc", Some("data"));
        assert_eq!(path, PathBuf::from("/var/lib/pod_c_ns_.._x/kube_pvc.data.json"));

        let parent = object_store_path(dir, "..", "kube_pvc", None);
        assert_eq!(parent, PathBuf::from("/var/lib/__/kube_pvc.json"));

        let cluster = object_store_path(Path::new("/var/lib"), "", "kube_node_count", None);
        assert_eq!(cluster, PathBuf::from("/var/lib/_cluster/kube_node_count.json"));
    }
}
