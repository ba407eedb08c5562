//! Piggyback routing and agent output
//!
//! Sections are produced in composition order and tagged with the monitored
//! host they belong to. [`route`] groups them per host, hosts sorted by
//! name, sections in their original order. The writers serialize the groups
//! either in Checkmk agent format or as one JSON document.

use std::collections::BTreeMap;
use std::io::{self, Write};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{EvalError, EvalResult};
use crate::schemata::api::{MetaData, Node};

/// One section destined for one monitored host
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionRecord {
    /// Piggyback host name; empty for the host the agent runs for
    pub target: String,
    pub name: String,
    pub payload: Value,
}

impl SectionRecord {
    pub fn new<T: Serialize>(
        target: impl Into<String>,
        name: &str,
        payload: &T,
    ) -> EvalResult<Self> {
        let payload = serde_json::to_value(payload).map_err(|source| EvalError::SectionEncode {
            section: name.to_string(),
            source,
        })?;
        Ok(Self {
            target: target.into(),
            name: name.to_string(),
            payload,
        })
    }
}

/// All sections of one target
#[derive(Debug, Clone, PartialEq)]
pub struct PiggybackBatch {
    pub target: String,
    pub sections: Vec<SectionRecord>,
}

/// Group sections by target
///
/// Targets are ordered by name and appear at most once; sections keep their
/// insertion order within a target. Targets without sections produce no
/// batch.
pub fn route<I>(records: I) -> Vec<PiggybackBatch>
where
    I: IntoIterator<Item = SectionRecord>,
{
    let mut grouped: BTreeMap<String, Vec<SectionRecord>> = BTreeMap::new();
    for record in records {
        grouped.entry(record.target.clone()).or_default().push(record);
    }
    grouped
        .into_iter()
        .map(|(target, sections)| PiggybackBatch { target, sections })
        .collect()
}

/// Write batches in Checkmk agent format
///
/// ```text
/// <<<<target>>>>
/// <<<section_name:sep(0)>>>
/// {"json":"payload"}
/// <<<<>>>>
/// ```
///
/// Sections of the empty target are written without piggyback markers.
pub fn write_checkmk<W: Write>(batches: &[PiggybackBatch], writer: &mut W) -> io::Result<()> {
    for batch in batches {
        let piggybacked = !batch.target.is_empty();
        if piggybacked {
            writeln!(writer, "<<<<{}>>>>", batch.target)?;
        }
        for section in &batch.sections {
            writeln!(writer, "<<<{}:sep(0)>>>", section.name)?;
            serde_json::to_writer(&mut *writer, &section.payload)?;
            writeln!(writer)?;
        }
        if piggybacked {
            writeln!(writer, "<<<<>>>>")?;
        }
    }
    Ok(())
}

/// All batches as `{target: {section: payload}}`
pub fn to_json(batches: &[PiggybackBatch]) -> Value {
    let hosts: Map<String, Value> = batches
        .iter()
        .map(|batch| {
            let sections: Map<String, Value> = batch
                .sections
                .iter()
                .map(|section| (section.name.clone(), section.payload.clone()))
                .collect();
            (batch.target.clone(), Value::Object(sections))
        })
        .collect();
    Value::Object(hosts)
}

pub fn write_json<W: Write>(batches: &[PiggybackBatch], writer: &mut W) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, &to_json(batches))?;
    writeln!(writer)
}

/// Parse Checkmk agent output back into sections per host
///
/// Lines outside of a section and sections whose payload is not valid JSON
/// are reported as errors.
pub fn parse_checkmk(text: &str) -> EvalResult<BTreeMap<String, BTreeMap<String, Value>>> {
    let mut hosts: BTreeMap<String, BTreeMap<String, Value>> = BTreeMap::new();
    let mut target = String::new();
    let mut section: Option<String> = None;

    for line in text.lines().filter(|line| !line.trim().is_empty()) {
        if line == "<<<<>>>>" {
            target.clear();
            section = None;
        } else if let Some(name) = line.strip_prefix("<<<<").and_then(|l| l.strip_suffix(">>>>")) {
            target = name.to_string();
            section = None;
        } else if let Some(header) = line.strip_prefix("<<<").and_then(|l| l.strip_suffix(">>>")) {
            let name = header.split(':').next().unwrap_or(header);
            section = Some(name.to_string());
        } else {
            let name = section
                .clone()
                .ok_or_else(|| EvalError::MissingSection(format!("header for line {line:?}")))?;
            let payload: Value =
                serde_json::from_str(line).map_err(|source| EvalError::SectionDecode {
                    section: name.clone(),
                    source,
                })?;
            hosts.entry(target.clone()).or_default().insert(name, payload);
        }
    }
    Ok(hosts)
}

/// Builds piggyback host names for one cluster
#[derive(Debug, Clone)]
pub struct PiggybackFormatter {
    cluster_name: String,
}

impl PiggybackFormatter {
    pub fn new(cluster_name: impl Into<String>) -> Self {
        Self {
            cluster_name: cluster_name.into(),
        }
    }

    fn format(&self, object_type: &str, name: &str) -> String {
        format!("{object_type}_{}_{name}", self.cluster_name)
    }

    /// The cluster is the host the agent runs for
    pub fn cluster(&self) -> String {
        String::new()
    }

    pub fn node(&self, node: &Node) -> String {
        self.format("node", node.name())
    }

    pub fn namespace(&self, namespace: &str) -> String {
        self.format("namespace", namespace)
    }

    /// Namespaced objects: `pod`, `deployment`, `daemonset`, `statefulset`,
    /// `cronjob`
    pub fn namespaced(&self, object_type: &str, metadata: &MetaData) -> String {
        self.format(object_type, &metadata.namespaced_name())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(target: &str, name: &str) -> SectionRecord {
        SectionRecord {
            target: target.to_string(),
            name: name.to_string(),
            payload: json!({"section": name}),
        }
    }

    #[test]
    fn test_route_groups_sorted_and_stable() {
        let batches = route(vec![
            record("pod_c_ns_b", "s1"),
            record("", "cluster"),
            record("node_c_n1", "s1"),
            record("pod_c_ns_b", "s2"),
            record("node_c_n1", "s0"),
        ]);

        let targets: Vec<&str> = batches.iter().map(|b| b.target.as_str()).collect();
        assert_eq!(targets, vec!["", "node_c_n1", "pod_c_ns_b"]);

        let node_sections: Vec<&str> =
            batches[1].sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(node_sections, vec!["s1", "s0"]);
    }

    #[test]
    fn test_route_without_records_is_empty() {
        assert!(route(Vec::new()).is_empty());
    }

    #[test]
    fn test_checkmk_format() {
        let batches = route(vec![record("", "a"), record("node_c_n1", "b")]);
        let mut out = Vec::new();
        write_checkmk(&batches, &mut out).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "<<<a:sep(0)>>>\n{\"section\":\"a\"}\n\
             <<<<node_c_n1>>>>\n<<<b:sep(0)>>>\n{\"section\":\"b\"}\n<<<<>>>>\n"
        );
    }

    #[test]
    fn test_checkmk_output_parses_back() {
        let batches = route(vec![
            record("", "a"),
            record("node_c_n1", "b"),
            record("node_c_n1", "c"),
        ]);
        let mut out = Vec::new();
        write_checkmk(&batches, &mut out).unwrap();

        let hosts = parse_checkmk(&String::from_utf8(out).unwrap()).unwrap();

        assert_eq!(hosts[""]["a"], json!({"section": "a"}));
        assert_eq!(hosts["node_c_n1"].len(), 2);
    }

    #[test]
    fn test_json_document() {
        let batches = route(vec![record("", "a"), record("node_c_n1", "b")]);
        let doc = to_json(&batches);
        assert_eq!(doc["node_c_n1"]["b"], json!({"section": "b"}));
        assert_eq!(doc[""]["a"], json!({"section": "a"}));
    }

    #[test]
    fn test_formatter() {
        let formatter = PiggybackFormatter::new("prod");
        let metadata = MetaData {
            name: "web".to_string(),
            namespace: "shop".to_string(),
            ..Default::default()
        };

        assert_eq!(formatter.namespaced("deployment", &metadata), "deployment_prod_shop_web");
        assert_eq!(formatter.namespace("shop"), "namespace_prod_shop");
        assert_eq!(formatter.cluster(), "");
    }
}
