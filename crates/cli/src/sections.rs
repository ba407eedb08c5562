//! Loading agent output for check evaluation

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use kubemon_lib::checks::HostSections;
use kubemon_lib::piggyback::parse_checkmk;
use kubemon_lib::EvalError;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SectionsError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON agent output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid agent output: {0}")]
    Checkmk(#[from] EvalError),

    #[error("expected an object of hosts, found {0}")]
    Layout(&'static str),

    #[error("no sections for host {0:?}")]
    UnknownHost(String),
}

/// Sections of every host in agent output
#[derive(Debug, Clone, Default)]
pub struct AgentOutput {
    hosts: BTreeMap<String, HostSections>,
}

impl AgentOutput {
    /// Read agent output in Checkmk format or as a JSON document
    pub fn load(path: &Path) -> Result<Self, SectionsError> {
        let text = fs::read_to_string(path).map_err(|source| SectionsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, SectionsError> {
        if !text.trim_start().starts_with('{') {
            return Ok(Self {
                hosts: parse_checkmk(text)?,
            });
        }

        let Value::Object(document) = serde_json::from_str::<Value>(text)? else {
            return Err(SectionsError::Layout("a non-object document"));
        };
        let mut hosts = BTreeMap::new();
        for (host, sections) in document {
            let Value::Object(sections) = sections else {
                return Err(SectionsError::Layout("a non-object host entry"));
            };
            hosts.insert(host, sections.into_iter().collect());
        }
        Ok(Self { hosts })
    }

    pub fn host(&self, host: &str) -> Result<&HostSections, SectionsError> {
        self.hosts
            .get(host)
            .ok_or_else(|| SectionsError::UnknownHost(host.to_string()))
    }

    pub fn hosts(&self) -> impl Iterator<Item = (&String, &HostSections)> {
        self.hosts.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_checkmk_output() {
        let text = "<<<kube_node_count_v1:sep(0)>>>\n{\"worker\":{\"ready\":1,\"not_ready\":0}}\n\
                    <<<<pod_c_shop_web>>>>\n<<<kube_pod_lifecycle_v1:sep(0)>>>\n{\"phase\":\"running\"}\n<<<<>>>>\n";

        let output = AgentOutput::parse(text).unwrap();

        assert!(output.host("").unwrap().contains_key("kube_node_count_v1"));
        assert_eq!(
            output.host("pod_c_shop_web").unwrap()["kube_pod_lifecycle_v1"]["phase"],
            "running"
        );
    }

    #[test]
    fn test_parse_json_document() {
        let text = r#"{"node_c_n1": {"kube_node_conditions_v1": {"conditions": []}}}"#;

        let output = AgentOutput::parse(text).unwrap();

        assert_eq!(output.hosts().count(), 1);
        assert!(matches!(
            output.host("node_c_n2"),
            Err(SectionsError::UnknownHost(_))
        ));
    }

    #[test]
    fn test_rejects_malformed_host_entry() {
        assert!(matches!(
            AgentOutput::parse(r#"{"node_c_n1": []}"#),
            Err(SectionsError::Layout(_))
        ));
    }
}
