//! Section payloads written by the agent and read by the checks

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::api::{
    ContainerStatus, HardResourceRequirement, NodeCondition, PersistentVolumeClaimPhase, Phase,
    PodCondition, Timestamp, UpdateStrategy,
};

/// Section names as they appear in the agent output
pub mod names {
    pub const CPU_RESOURCES: &str = "kube_cpu_resources_v1";
    pub const MEMORY_RESOURCES: &str = "kube_memory_resources_v1";
    pub const ALLOCATABLE_CPU: &str = "kube_allocatable_cpu_resource_v1";
    pub const ALLOCATABLE_MEMORY: &str = "kube_allocatable_memory_resource_v1";
    pub const POD_RESOURCES: &str = "kube_pod_resources_v1";
    pub const ALLOCATABLE_PODS: &str = "kube_allocatable_pods_v1";
    pub const PERFORMANCE_CPU: &str = "kube_performance_cpu_v1";
    pub const PERFORMANCE_MEMORY: &str = "kube_performance_memory_v1";
    pub const POD_LIFECYCLE: &str = "kube_pod_lifecycle_v1";
    pub const POD_CONTAINERS: &str = "kube_pod_containers_v1";
    pub const POD_INIT_CONTAINERS: &str = "kube_pod_init_containers_v1";
    pub const POD_CONDITIONS: &str = "kube_pod_conditions_v1";
    pub const REPLICAS: &str = "kube_replicas_v1";
    pub const UPDATE_STRATEGY: &str = "kube_update_strategy_v1";
    pub const NODE_CONDITIONS: &str = "kube_node_conditions_v1";
    pub const NODE_COUNT: &str = "kube_node_count_v1";
    pub const CRON_JOB_STATUS: &str = "kube_cron_job_status_v1";
    pub const PVC: &str = "kube_pvc_v1";
    pub const RESOURCE_QUOTA_CPU: &str = "kube_resource_quota_cpu_resources_v1";
    pub const RESOURCE_QUOTA_MEMORY: &str = "kube_resource_quota_memory_resources_v1";
}

/// Summed requests and limits of a set of containers
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Resources {
    pub request: f64,
    pub limit: f64,
    pub count_unspecified_requests: usize,
    pub count_unspecified_limits: usize,
    pub count_zeroed_limits: usize,
    pub count_total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocatableContext {
    Cluster,
    Node,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AllocatableResource {
    pub context: AllocatableContext,
    pub value: f64,
}

/// Pod names grouped by lifecycle phase
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodResources {
    #[serde(default)]
    pub running: Vec<String>,
    #[serde(default)]
    pub pending: Vec<String>,
    #[serde(default)]
    pub succeeded: Vec<String>,
    #[serde(default)]
    pub failed: Vec<String>,
    #[serde(default)]
    pub unknown: Vec<String>,
}

impl PodResources {
    pub fn push(&mut self, phase: Phase, name: String) {
        match phase {
            Phase::Running => self.running.push(name),
            Phase::Pending => self.pending.push(name),
            Phase::Succeeded => self.succeeded.push(name),
            Phase::Failed => self.failed.push(name),
            Phase::Unknown => self.unknown.push(name),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatablePods {
    pub capacity: u32,
    pub allocatable: u32,
}

/// Usage derived from the cluster collector samples
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceUsage {
    pub usage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodLifeCycle {
    pub phase: Phase,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PodContainers {
    pub containers: Vec<ContainerStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PodConditions {
    pub conditions: Vec<PodCondition>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaCount {
    pub desired: u32,
    pub ready: u32,
    pub updated: u32,
    pub available: u32,
}

/// Replica figures of a controller, tagged by controller kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ControllerReplicas {
    Deployment(ReplicaCount),
    StatefulSet(ReplicaCount),
    DaemonSet {
        #[serde(flatten)]
        replicas: ReplicaCount,
        misscheduled: u32,
    },
}

impl ControllerReplicas {
    pub fn counts(&self) -> &ReplicaCount {
        match self {
            ControllerReplicas::Deployment(counts) | ControllerReplicas::StatefulSet(counts) => {
                counts
            }
            ControllerReplicas::DaemonSet { replicas, .. } => replicas,
        }
    }

    pub fn misscheduled(&self) -> Option<u32> {
        match self {
            ControllerReplicas::DaemonSet { misscheduled, .. } => Some(*misscheduled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStrategySection {
    pub strategy: UpdateStrategy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeConditions {
    pub conditions: Vec<NodeCondition>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyCount {
    pub ready: u32,
    pub not_ready: u32,
}

impl ReadyCount {
    pub fn total(&self) -> u32 {
        self.ready + self.not_ready
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeCount {
    pub worker: ReadyCount,
    pub control_plane: ReadyCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatusType {
    Completed,
    Failed,
    Running,
    Pending,
    Unknown,
}

impl JobStatusType {
    pub fn title(&self) -> &'static str {
        match self {
            JobStatusType::Completed => "Completed",
            JobStatusType::Failed => "Failed",
            JobStatusType::Running => "Running",
            JobStatusType::Pending => "Pending",
            JobStatusType::Unknown => "Unknown",
        }
    }
}

/// Classified status of a job with the condition that decided it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatusInfo {
    #[serde(rename = "type")]
    pub type_: JobStatusType,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobInfo {
    pub uid: String,
    pub name: String,
    pub status: JobStatusInfo,
    pub creation_timestamp: Timestamp,
    #[serde(default)]
    pub start_time: Option<Timestamp>,
    #[serde(default)]
    pub completion_time: Option<Timestamp>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CronJobLatestJob {
    #[serde(default)]
    pub latest_job: Option<JobInfo>,
    #[serde(default)]
    pub last_schedule_time: Option<Timestamp>,
    #[serde(default)]
    pub last_successful_time: Option<Timestamp>,
    #[serde(default)]
    pub suspend: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeUsage {
    pub capacity_bytes: f64,
    pub used_bytes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistentVolumeClaimSection {
    pub name: String,
    #[serde(default)]
    pub phase: Option<PersistentVolumeClaimPhase>,
    #[serde(default)]
    pub volume_name: Option<String>,
    #[serde(default)]
    pub requested_storage: Option<u64>,
    #[serde(default)]
    pub capacity: Option<u64>,
    #[serde(default)]
    pub volume: Option<VolumeUsage>,
}

/// Claims of one namespace or controller keyed by claim name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistentVolumeClaims {
    pub claims: BTreeMap<String, PersistentVolumeClaimSection>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceQuotaResources {
    pub hard: HardResourceRequirement,
    /// Requests and limits of the running pods selected by the quota
    pub scoped: Resources,
}
