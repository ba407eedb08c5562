//! Agent configuration

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use kubemon_lib::selection::{NamespaceFilter, DEFAULT_CONTROL_PLANE_ROLES};
use kubemon_lib::{ComposeOptions, MonitoredObject};
use serde::Deserialize;

/// Environment variable naming an optional configuration file
pub const CONFIG_PATH_ENV: &str = "KUBEMON_CONFIG";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Checkmk,
    Json,
}

/// Agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Cluster name used in piggyback host names and as counter store key
    #[serde(default = "default_cluster_name")]
    pub cluster_name: String,

    /// API snapshot to read; stdin when unset
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,

    /// Directory of the counter store
    #[serde(default = "default_counter_store_dir")]
    pub counter_store_dir: PathBuf,

    #[serde(default = "default_control_plane_roles")]
    pub control_plane_roles: Vec<String>,

    #[serde(default = "default_monitored_objects")]
    pub monitored_objects: Vec<MonitoredObject>,

    #[serde(default)]
    pub namespace_include_patterns: Option<Vec<String>>,

    #[serde(default)]
    pub namespace_exclude_patterns: Option<Vec<String>>,

    #[serde(default)]
    pub output_format: OutputFormat,

    /// Prometheus textfile written after each cycle
    #[serde(default)]
    pub metrics_textfile: Option<PathBuf>,
}

fn default_cluster_name() -> String {
    "kubernetes".to_string()
}

fn default_counter_store_dir() -> PathBuf {
    std::env::temp_dir().join("kubemon")
}

fn default_control_plane_roles() -> Vec<String> {
    DEFAULT_CONTROL_PLANE_ROLES
        .iter()
        .map(|role| role.to_string())
        .collect()
}

fn default_monitored_objects() -> Vec<MonitoredObject> {
    ComposeOptions::new("")
        .monitored_objects
        .into_iter()
        .collect()
}

impl AgentConfig {
    /// Load configuration from the file named by `KUBEMON_CONFIG` and the
    /// environment
    pub fn load() -> Result<Self> {
        let file = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        Self::load_from(file.as_deref())
    }

    /// Load configuration from `file` (if any), overridden by `KUBEMON_*`
    /// environment variables
    pub fn load_from(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("KUBEMON")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("control_plane_roles")
                .with_list_parse_key("monitored_objects")
                .with_list_parse_key("namespace_include_patterns")
                .with_list_parse_key("namespace_exclude_patterns"),
        );

        let config: AgentConfig = builder
            .build()
            .context("failed to read agent configuration")?
            .try_deserialize()
            .context("invalid agent configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.cluster_name.is_empty() {
            bail!("cluster_name must not be empty");
        }
        if self.namespace_include_patterns.is_some() && self.namespace_exclude_patterns.is_some() {
            bail!("namespace_include_patterns and namespace_exclude_patterns are mutually exclusive");
        }
        Ok(())
    }

    pub fn namespace_filter(&self) -> NamespaceFilter {
        match (&self.namespace_include_patterns, &self.namespace_exclude_patterns) {
            (Some(patterns), _) => NamespaceFilter::Include(patterns.clone()),
            (None, Some(patterns)) => NamespaceFilter::Exclude(patterns.clone()),
            (None, None) => NamespaceFilter::All,
        }
    }

    pub fn compose_options(&self) -> ComposeOptions {
        ComposeOptions {
            cluster_name: self.cluster_name.clone(),
            monitored_objects: self.monitored_objects.iter().copied().collect(),
            namespace_filter: self.namespace_filter(),
            control_plane_roles: self.control_plane_roles.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("agent.json");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_file_values_and_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"{"cluster_name": "prod", "monitored_objects": ["nodes", "pods"], "output_format": "json"}"#,
        );

        let config = AgentConfig::load_from(Some(&path)).unwrap();

        assert_eq!(config.cluster_name, "prod");
        assert_eq!(config.output_format, OutputFormat::Json);
        assert_eq!(config.control_plane_roles, vec!["master", "control_plane"]);
        let options = config.compose_options();
        assert_eq!(
            options.monitored_objects,
            [MonitoredObject::Nodes, MonitoredObject::Pods].into()
        );
        assert_eq!(options.namespace_filter, NamespaceFilter::All);
    }

    #[test]
    fn test_include_and_exclude_are_exclusive() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"{"namespace_include_patterns": ["shop"], "namespace_exclude_patterns": ["kube-"]}"#,
        );

        assert!(AgentConfig::load_from(Some(&path)).is_err());
    }

    #[test]
    fn test_exclude_patterns_become_filter() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, r#"{"namespace_exclude_patterns": ["kube-"]}"#);

        let config = AgentConfig::load_from(Some(&path)).unwrap();

        assert_eq!(
            config.namespace_filter(),
            NamespaceFilter::Exclude(vec!["kube-".to_string()])
        );
    }
}
