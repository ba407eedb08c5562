//! Core data models for usage samples and derived rates

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a container across collection cycles
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerIdentity {
    pub namespace: String,
    pub pod_name: String,
    pub container_name: String,
}

impl ContainerIdentity {
    pub fn new(
        namespace: impl Into<String>,
        pod_name: impl Into<String>,
        container_name: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            pod_name: pod_name.into(),
            container_name: container_name.into(),
        }
    }

    pub fn pod_lookup(&self) -> PodLookupName {
        PodLookupName::new(&self.namespace, &self.pod_name)
    }
}

/// `<namespace>_<pod>`, joins performance data to API pods
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PodLookupName(String);

impl PodLookupName {
    pub fn new(namespace: &str, pod_name: &str) -> Self {
        Self(format!("{namespace}_{pod_name}"))
    }
}

impl fmt::Display for PodLookupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Cumulative CPU seconds
    Cpu,
    /// Working set bytes
    Memory,
}

/// One sample reported by the cluster collector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSample {
    pub container: ContainerIdentity,
    pub kind: MetricKind,
    pub value: f64,
    pub timestamp: f64,
}

/// CPU usage rate of one container derived from two counter samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSample {
    pub container: ContainerIdentity,
    pub rate: f64,
}
