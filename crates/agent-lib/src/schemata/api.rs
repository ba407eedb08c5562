//! Kubernetes API objects as handed over by the API client
//!
//! These records are validated once at deserialization and are treated as
//! well formed by everything downstream.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::UsageSample;

/// Seconds since the Unix epoch
pub type Timestamp = f64;

/// Label key prefix carrying node roles
pub const NODE_ROLE_LABEL_PREFIX: &str = "node-role.kubernetes.io/";

/// Legacy label carrying a single node role as value
pub const LEGACY_NODE_ROLE_LABEL: &str = "kubernetes.io/role";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaData {
    pub name: String,
    /// Empty for cluster scoped objects (nodes, namespaces)
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub creation_timestamp: Timestamp,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl MetaData {
    /// `<namespace>_<name>`, the host name suffix of namespaced objects
    pub fn namespaced_name(&self) -> String {
        format!("{}_{}", self.namespace, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Running,
    Pending,
    Succeeded,
    Failed,
    Unknown,
}

impl Phase {
    /// Phase name as shown to users, e.g. `Running`
    pub fn title(&self) -> &'static str {
        match self {
            Phase::Running => "Running",
            Phase::Pending => "Pending",
            Phase::Succeeded => "Succeeded",
            Phase::Failed => "Failed",
            Phase::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Requested or limited amount of a resource; `None` means not specified
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourcesRequirements {
    #[serde(default)]
    pub memory: Option<f64>,
    #[serde(default)]
    pub cpu: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerResources {
    #[serde(default)]
    pub limits: ResourcesRequirements,
    #[serde(default)]
    pub requests: ResourcesRequirements,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub name: String,
    #[serde(default)]
    pub resources: ContainerResources,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PodSpec {
    #[serde(default)]
    pub node: Option<String>,
    #[serde(default)]
    pub containers: Vec<ContainerSpec>,
    #[serde(default)]
    pub init_containers: Vec<ContainerSpec>,
    #[serde(default)]
    pub priority_class_name: Option<String>,
    #[serde(default)]
    pub active_deadline_seconds: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContainerState {
    Running {
        #[serde(default)]
        start_time: Option<Timestamp>,
    },
    Waiting {
        #[serde(default)]
        reason: Option<String>,
        #[serde(default)]
        detail: Option<String>,
    },
    Terminated {
        exit_code: i32,
        #[serde(default)]
        start_time: Option<Timestamp>,
        #[serde(default)]
        end_time: Option<Timestamp>,
        #[serde(default)]
        reason: Option<String>,
        #[serde(default)]
        detail: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerStatus {
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub restart_count: u32,
    pub state: ContainerState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionType {
    Scheduled,
    HasNetwork,
    ReadyToStartContainers,
    Initialized,
    ContainersReady,
    Ready,
    DisruptionTarget,
}

impl ConditionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionType::Scheduled => "scheduled",
            ConditionType::HasNetwork => "hasnetwork",
            ConditionType::ReadyToStartContainers => "readytostartcontainers",
            ConditionType::Initialized => "initialized",
            ConditionType::ContainersReady => "containersready",
            ConditionType::Ready => "ready",
            ConditionType::DisruptionTarget => "disruptiontarget",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodCondition {
    pub status: bool,
    #[serde(rename = "type", default)]
    pub type_: Option<ConditionType>,
    /// Set for condition types unknown to this library
    #[serde(default)]
    pub custom_type: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub last_transition_time: Option<Timestamp>,
}

impl PodCondition {
    pub fn name(&self) -> String {
        match (&self.type_, &self.custom_type) {
            (Some(type_), _) => type_.as_str().to_string(),
            (None, Some(custom)) => custom.to_lowercase(),
            (None, None) => "unknown".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QosClass {
    Burstable,
    BestEffort,
    Guaranteed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodStatus {
    pub phase: Phase,
    #[serde(default)]
    pub conditions: Option<Vec<PodCondition>>,
    #[serde(default)]
    pub start_time: Option<Timestamp>,
    #[serde(default)]
    pub qos_class: Option<QosClass>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pod {
    pub uid: String,
    pub metadata: MetaData,
    #[serde(default)]
    pub spec: PodSpec,
    pub status: PodStatus,
    /// Container statuses in declaration order
    #[serde(default)]
    pub containers: Vec<ContainerStatus>,
    #[serde(default)]
    pub init_containers: Vec<ContainerStatus>,
}

impl Pod {
    pub fn phase(&self) -> Phase {
        self.status.phase
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionStatus::True => f.write_str("True"),
            ConditionStatus::False => f.write_str("False"),
            ConditionStatus::Unknown => f.write_str("Unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeCondition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: ConditionStatus,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeResources {
    #[serde(default)]
    pub cpu: f64,
    #[serde(default)]
    pub memory: f64,
    #[serde(default)]
    pub pods: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeStatus {
    #[serde(default)]
    pub allocatable: NodeResources,
    #[serde(default)]
    pub capacity: NodeResources,
    #[serde(default)]
    pub conditions: Option<Vec<NodeCondition>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub metadata: MetaData,
    #[serde(default)]
    pub status: NodeStatus,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Roles from `node-role.kubernetes.io/<role>` labels and the legacy
    /// `kubernetes.io/role` label
    pub fn roles(&self) -> Vec<String> {
        let mut roles: Vec<String> = self
            .metadata
            .labels
            .keys()
            .filter_map(|key| key.strip_prefix(NODE_ROLE_LABEL_PREFIX))
            .filter(|role| !role.is_empty())
            .map(str::to_string)
            .collect();
        if let Some(role) = self.metadata.labels.get(LEGACY_NODE_ROLE_LABEL) {
            if !roles.contains(role) {
                roles.push(role.clone());
            }
        }
        roles
    }

    /// A node is ready iff its `Ready` condition is `True`
    pub fn is_ready(&self) -> bool {
        self.status
            .conditions
            .as_deref()
            .unwrap_or_default()
            .iter()
            .any(|c| c.type_ == "Ready" && c.status == ConditionStatus::True)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IntOrString {
    Int(i64),
    String(String),
}

impl fmt::Display for IntOrString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntOrString::Int(value) => write!(f, "{value}"),
            IntOrString::String(value) => f.write_str(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UpdateStrategy {
    RollingUpdate {
        max_surge: Option<IntOrString>,
        max_unavailable: Option<IntOrString>,
    },
    StatefulSetRollingUpdate {
        #[serde(default)]
        partition: i64,
        #[serde(default)]
        max_unavailable: Option<IntOrString>,
    },
    Recreate,
    OnDelete,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replicas {
    #[serde(default)]
    pub replicas: u32,
    #[serde(default)]
    pub updated: u32,
    #[serde(default)]
    pub available: u32,
    #[serde(default)]
    pub ready: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerSpec {
    /// Desired number of replicas
    #[serde(default)]
    pub replicas: u32,
    pub strategy: UpdateStrategy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub metadata: MetaData,
    pub spec: ControllerSpec,
    pub status: Replicas,
    /// UIDs of the pods managed by the deployment
    #[serde(default)]
    pub pods: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonSetStatus {
    pub desired_number_scheduled: u32,
    pub updated_number_scheduled: u32,
    pub number_misscheduled: u32,
    pub number_ready: u32,
    pub number_available: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonSet {
    pub metadata: MetaData,
    pub spec: ControllerSpec,
    pub status: DaemonSetStatus,
    #[serde(default)]
    pub pods: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatefulSetStatus {
    #[serde(default)]
    pub updated_replicas: u32,
    #[serde(default)]
    pub ready_replicas: u32,
    #[serde(default)]
    pub available_replicas: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatefulSet {
    pub metadata: MetaData,
    pub spec: ControllerSpec,
    pub status: StatefulSetStatus,
    #[serde(default)]
    pub pods: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Namespace {
    pub metadata: MetaData,
}

impl Namespace {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuotaScope {
    BestEffort,
    NotBestEffort,
    Terminating,
    NotTerminating,
    PriorityClass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScopeOperator {
    In,
    NotIn,
    Exists,
    DoesNotExist,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopedResourceMatchExpression {
    pub operator: ScopeOperator,
    pub scope_name: QuotaScope,
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopeSelector {
    #[serde(default)]
    pub match_expressions: Vec<ScopedResourceMatchExpression>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HardResourceRequirement {
    #[serde(default)]
    pub limit: Option<f64>,
    #[serde(default)]
    pub request: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HardRequirement {
    #[serde(default)]
    pub memory: Option<HardResourceRequirement>,
    #[serde(default)]
    pub cpu: Option<HardResourceRequirement>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceQuotaSpec {
    #[serde(default)]
    pub hard: Option<HardRequirement>,
    #[serde(default)]
    pub scope_selector: Option<ScopeSelector>,
    #[serde(default)]
    pub scopes: Option<Vec<QuotaScope>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceQuota {
    pub metadata: MetaData,
    #[serde(default)]
    pub spec: ResourceQuotaSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CronJobSpec {
    pub schedule: String,
    #[serde(default)]
    pub suspend: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CronJobStatus {
    #[serde(default)]
    pub last_schedule_time: Option<Timestamp>,
    #[serde(default)]
    pub last_successful_time: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CronJob {
    pub uid: String,
    pub metadata: MetaData,
    pub spec: CronJobSpec,
    #[serde(default)]
    pub status: CronJobStatus,
    #[serde(default)]
    pub pod_uids: Vec<String>,
    #[serde(default)]
    pub job_uids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobConditionType {
    Complete,
    Failed,
    Suspended,
    SuccessCriteriaMet,
    FailureTarget,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobCondition {
    #[serde(rename = "type")]
    pub type_: JobConditionType,
    pub status: ConditionStatus,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    #[serde(default)]
    pub start_time: Option<Timestamp>,
    #[serde(default)]
    pub completion_time: Option<Timestamp>,
    #[serde(default)]
    pub conditions: Option<Vec<JobCondition>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub uid: String,
    pub metadata: MetaData,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub pod_uids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PersistentVolumeClaimPhase {
    Pending,
    Bound,
    Lost,
}

impl fmt::Display for PersistentVolumeClaimPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistentVolumeClaimPhase::Pending => f.write_str("Pending"),
            PersistentVolumeClaimPhase::Bound => f.write_str("Bound"),
            PersistentVolumeClaimPhase::Lost => f.write_str("Lost"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistentVolumeClaimSpec {
    #[serde(default)]
    pub storage_class_name: Option<String>,
    #[serde(default)]
    pub volume_name: Option<String>,
    /// Requested storage in bytes
    #[serde(default)]
    pub requested_storage: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistentVolumeClaimStatus {
    #[serde(default)]
    pub phase: Option<PersistentVolumeClaimPhase>,
    /// Actual capacity in bytes
    #[serde(default)]
    pub capacity: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistentVolumeClaim {
    pub metadata: MetaData,
    #[serde(default)]
    pub spec: PersistentVolumeClaimSpec,
    #[serde(default)]
    pub status: PersistentVolumeClaimStatus,
}

/// Kubelet volume statistics of one claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeStats {
    pub namespace: String,
    pub claim: String,
    pub capacity_bytes: f64,
    pub used_bytes: f64,
}

/// Everything fetched from the cluster in one cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiData {
    #[serde(default)]
    pub pods: Vec<Pod>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub deployments: Vec<Deployment>,
    #[serde(default)]
    pub daemonsets: Vec<DaemonSet>,
    #[serde(default)]
    pub statefulsets: Vec<StatefulSet>,
    #[serde(default)]
    pub namespaces: Vec<Namespace>,
    #[serde(default)]
    pub resource_quotas: Vec<ResourceQuota>,
    #[serde(default)]
    pub cron_jobs: Vec<CronJob>,
    #[serde(default)]
    pub jobs: Vec<Job>,
    #[serde(default)]
    pub persistent_volume_claims: Vec<PersistentVolumeClaim>,
    #[serde(default)]
    pub volume_stats: Vec<VolumeStats>,
    /// Samples from the cluster collector; CPU values are cumulative counters
    #[serde(default)]
    pub usage_samples: Vec<UsageSample>,
}
