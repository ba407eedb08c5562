//! Section composition
//!
//! Turns one snapshot of API objects plus this cycle's CPU rates into the
//! sections of every monitored host: the cluster, its nodes, controllers,
//! namespaces, cron jobs and pods.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::aggregation::{
    allocatable_pods, cluster_allocatable, node_allocatable, pod_resources_of, pods_by_phase,
    ResourceKind,
};
use crate::classify::job_status;
use crate::error::EvalResult;
use crate::models::{PodLookupName, RateSample};
use crate::performance::{filter_outdated_and_non_monitored_pods, group_by_pod, sum_usage};
use crate::piggyback::{PiggybackFormatter, SectionRecord};
use crate::schemata::api::{
    ApiData, ControllerSpec, CronJob, MetaData, Node, Phase, Pod, PersistentVolumeClaim,
};
use crate::schemata::section::{
    names, ControllerReplicas, CronJobLatestJob, JobInfo, NodeConditions, NodeCount,
    PersistentVolumeClaimSection, PersistentVolumeClaims, PodConditions, PodContainers,
    PodLifeCycle, ReadyCount, ReplicaCount, ResourceQuotaResources, UpdateStrategySection,
    VolumeUsage,
};
use crate::selection::{
    filter_matching_namespace_resource_quota, filter_monitored_namespaces,
    filter_pods_by_cron_job, filter_pods_by_namespace, filter_pods_by_phase,
    filter_pods_by_resource_quota_criteria, partition_nodes, NamespaceFilter,
    DEFAULT_CONTROL_PLANE_ROLES,
};

/// Object kinds that get their own piggyback host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitoredObject {
    Deployments,
    Daemonsets,
    Statefulsets,
    Namespaces,
    Nodes,
    Pods,
    Cronjobs,
    /// Pods created by cron jobs; without it they are left out of `Pods`
    CronjobsPods,
    Pvcs,
}

impl MonitoredObject {
    pub const ALL: [MonitoredObject; 9] = [
        MonitoredObject::Deployments,
        MonitoredObject::Daemonsets,
        MonitoredObject::Statefulsets,
        MonitoredObject::Namespaces,
        MonitoredObject::Nodes,
        MonitoredObject::Pods,
        MonitoredObject::Cronjobs,
        MonitoredObject::CronjobsPods,
        MonitoredObject::Pvcs,
    ];
}

/// What to compose and for which cluster
///
/// By default every object kind except cron job pods is monitored.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposeOptions {
    pub cluster_name: String,
    pub monitored_objects: BTreeSet<MonitoredObject>,
    pub namespace_filter: NamespaceFilter,
    pub control_plane_roles: Vec<String>,
}

impl ComposeOptions {
    pub fn new(cluster_name: impl Into<String>) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            monitored_objects: MonitoredObject::ALL
                .into_iter()
                .filter(|object| *object != MonitoredObject::CronjobsPods)
                .collect(),
            namespace_filter: NamespaceFilter::All,
            control_plane_roles: DEFAULT_CONTROL_PLANE_ROLES
                .iter()
                .map(|role| role.to_string())
                .collect(),
        }
    }

    fn monitors(&self, object: MonitoredObject) -> bool {
        self.monitored_objects.contains(&object)
    }
}

/// Appends sections for one target
struct SectionWriter<'a> {
    target: String,
    sections: &'a mut Vec<SectionRecord>,
}

impl<'a> SectionWriter<'a> {
    fn new(target: String, sections: &'a mut Vec<SectionRecord>) -> Self {
        Self { target, sections }
    }

    fn push<T: Serialize>(&mut self, name: &str, payload: &T) -> EvalResult<()> {
        self.sections
            .push(SectionRecord::new(self.target.clone(), name, payload)?);
        Ok(())
    }

    /// CPU and memory figures plus the pod phase listing of `pods`
    fn push_workload(&mut self, pods: &[&Pod]) -> EvalResult<()> {
        self.push(
            names::CPU_RESOURCES,
            &pod_resources_of(ResourceKind::Cpu, pods.iter().copied()),
        )?;
        self.push(
            names::MEMORY_RESOURCES,
            &pod_resources_of(ResourceKind::Memory, pods.iter().copied()),
        )?;
        self.push(names::POD_RESOURCES, &pods_by_phase(pods.iter().copied()))
    }
}

pub fn pod_lookup_name(pod: &Pod) -> PodLookupName {
    PodLookupName::new(&pod.metadata.namespace, &pod.metadata.name)
}

fn running_lookup_names(pods: &[&Pod]) -> Vec<PodLookupName> {
    filter_pods_by_phase(pods.iter().copied(), Phase::Running)
        .into_iter()
        .map(pod_lookup_name)
        .collect()
}

fn pods_of<'a>(pods_by_uid: &HashMap<&str, &'a Pod>, uids: &[String]) -> Vec<&'a Pod> {
    uids.iter()
        .filter_map(|uid| pods_by_uid.get(uid.as_str()).copied())
        .collect()
}

fn ready_count(nodes: &[&Node]) -> ReadyCount {
    nodes.iter().fold(ReadyCount::default(), |mut count, node| {
        if node.is_ready() {
            count.ready += 1;
        } else {
            count.not_ready += 1;
        }
        count
    })
}

fn update_strategy(spec: &ControllerSpec) -> UpdateStrategySection {
    UpdateStrategySection {
        strategy: spec.strategy.clone(),
    }
}

fn latest_job_section(
    api: &ApiData,
    cron_job: &CronJob,
    pods_by_uid: &HashMap<&str, &Pod>,
) -> EvalResult<CronJobLatestJob> {
    let latest = api
        .jobs
        .iter()
        .filter(|job| cron_job.job_uids.contains(&job.uid))
        .max_by(|a, b| {
            a.metadata
                .creation_timestamp
                .total_cmp(&b.metadata.creation_timestamp)
        });

    let latest_job = match latest {
        Some(job) => {
            let pods = pods_of(pods_by_uid, &job.pod_uids);
            Some(JobInfo {
                uid: job.uid.clone(),
                name: job.metadata.name.clone(),
                status: job_status(job, &pods)?,
                creation_timestamp: job.metadata.creation_timestamp,
                start_time: job.status.start_time,
                completion_time: job.status.completion_time,
            })
        }
        None => None,
    };

    Ok(CronJobLatestJob {
        latest_job,
        last_schedule_time: cron_job.status.last_schedule_time,
        last_successful_time: cron_job.status.last_successful_time,
        suspend: cron_job.spec.suspend,
    })
}

fn claims_section(api: &ApiData, claims: &[&PersistentVolumeClaim]) -> PersistentVolumeClaims {
    let claims = claims
        .iter()
        .map(|claim| {
            let volume = api
                .volume_stats
                .iter()
                .find(|stats| {
                    stats.namespace == claim.metadata.namespace
                        && stats.claim == claim.metadata.name
                })
                .map(|stats| VolumeUsage {
                    capacity_bytes: stats.capacity_bytes,
                    used_bytes: stats.used_bytes,
                });
            let section = PersistentVolumeClaimSection {
                name: claim.metadata.name.clone(),
                phase: claim.status.phase,
                volume_name: claim.spec.volume_name.clone(),
                requested_storage: claim.spec.requested_storage,
                capacity: claim.status.capacity,
                volume,
            };
            (claim.metadata.name.clone(), section)
        })
        .collect();
    PersistentVolumeClaims { claims }
}

/// Compose the sections of all monitored hosts
///
/// Cluster level figures only include pods and nodes outside the control
/// plane. Performance sections are written for every host with at least one
/// running pod that reported usage.
pub fn compose_sections(
    api: &ApiData,
    rates: &[RateSample],
    options: &ComposeOptions,
) -> EvalResult<Vec<SectionRecord>> {
    let formatter = PiggybackFormatter::new(&options.cluster_name);
    let mut sections = Vec::new();
    let mut hosts_pods: Vec<(String, Vec<PodLookupName>)> = Vec::new();

    let monitored_namespaces =
        filter_monitored_namespaces(&api.namespaces, &options.namespace_filter)?;
    let namespace_names: HashSet<&str> = monitored_namespaces.iter().map(|ns| ns.name()).collect();
    let is_monitored = |metadata: &MetaData| namespace_names.contains(metadata.namespace.as_str());

    let pods_by_uid: HashMap<&str, &Pod> = api
        .pods
        .iter()
        .map(|pod| (pod.uid.as_str(), pod))
        .collect();

    // Cluster
    let partition = partition_nodes(&api.nodes, &options.control_plane_roles);
    let control_plane: HashSet<&str> = partition
        .control_plane
        .iter()
        .map(|node| node.name())
        .collect();
    let aggregation_pods: Vec<&Pod> = api
        .pods
        .iter()
        .filter(|pod| {
            pod.spec
                .node
                .as_deref()
                .map_or(true, |node| !control_plane.contains(node))
        })
        .collect();

    let mut cluster = SectionWriter::new(formatter.cluster(), &mut sections);
    cluster.push_workload(&aggregation_pods)?;
    cluster.push(
        names::ALLOCATABLE_CPU,
        &cluster_allocatable(ResourceKind::Cpu, partition.worker.iter().copied()),
    )?;
    cluster.push(
        names::ALLOCATABLE_MEMORY,
        &cluster_allocatable(ResourceKind::Memory, partition.worker.iter().copied()),
    )?;
    cluster.push(
        names::ALLOCATABLE_PODS,
        &allocatable_pods(partition.worker.iter().copied()),
    )?;
    cluster.push(
        names::NODE_COUNT,
        &NodeCount {
            worker: ready_count(&partition.worker),
            control_plane: ready_count(&partition.control_plane),
        },
    )?;
    hosts_pods.push((formatter.cluster(), running_lookup_names(&aggregation_pods)));
    debug!(
        worker_nodes = partition.worker.len(),
        control_plane_nodes = partition.control_plane.len(),
        aggregation_pods = aggregation_pods.len(),
        "Composed cluster sections"
    );

    // Nodes
    if options.monitors(MonitoredObject::Nodes) {
        for node in &api.nodes {
            let target = formatter.node(node);
            let node_pods: Vec<&Pod> = api
                .pods
                .iter()
                .filter(|pod| pod.spec.node.as_deref() == Some(node.name()))
                .collect();

            let mut writer = SectionWriter::new(target.clone(), &mut sections);
            writer.push_workload(&node_pods)?;
            writer.push(names::ALLOCATABLE_CPU, &node_allocatable(ResourceKind::Cpu, node))?;
            writer.push(names::ALLOCATABLE_MEMORY, &node_allocatable(ResourceKind::Memory, node))?;
            writer.push(names::ALLOCATABLE_PODS, &allocatable_pods([node]))?;
            if let Some(conditions) = &node.status.conditions {
                writer.push(
                    names::NODE_CONDITIONS,
                    &NodeConditions {
                        conditions: conditions.clone(),
                    },
                )?;
            }
            hosts_pods.push((target, running_lookup_names(&node_pods)));
        }
    }

    // Controllers
    if options.monitors(MonitoredObject::Deployments) {
        for deployment in api.deployments.iter().filter(|d| is_monitored(&d.metadata)) {
            let target = formatter.namespaced("deployment", &deployment.metadata);
            let pods = pods_of(&pods_by_uid, &deployment.pods);
            let replicas = ControllerReplicas::Deployment(ReplicaCount {
                desired: deployment.spec.replicas,
                ready: deployment.status.ready,
                updated: deployment.status.updated,
                available: deployment.status.available,
            });

            let mut writer = SectionWriter::new(target.clone(), &mut sections);
            writer.push_workload(&pods)?;
            writer.push(names::REPLICAS, &replicas)?;
            writer.push(names::UPDATE_STRATEGY, &update_strategy(&deployment.spec))?;
            hosts_pods.push((target, running_lookup_names(&pods)));
        }
    }

    if options.monitors(MonitoredObject::Statefulsets) {
        for statefulset in api.statefulsets.iter().filter(|s| is_monitored(&s.metadata)) {
            let target = formatter.namespaced("statefulset", &statefulset.metadata);
            let pods = pods_of(&pods_by_uid, &statefulset.pods);
            let replicas = ControllerReplicas::StatefulSet(ReplicaCount {
                desired: statefulset.spec.replicas,
                ready: statefulset.status.ready_replicas,
                updated: statefulset.status.updated_replicas,
                available: statefulset.status.available_replicas,
            });

            let mut writer = SectionWriter::new(target.clone(), &mut sections);
            writer.push_workload(&pods)?;
            writer.push(names::REPLICAS, &replicas)?;
            writer.push(names::UPDATE_STRATEGY, &update_strategy(&statefulset.spec))?;
            hosts_pods.push((target, running_lookup_names(&pods)));
        }
    }

    if options.monitors(MonitoredObject::Daemonsets) {
        for daemonset in api.daemonsets.iter().filter(|d| is_monitored(&d.metadata)) {
            let target = formatter.namespaced("daemonset", &daemonset.metadata);
            let pods = pods_of(&pods_by_uid, &daemonset.pods);
            let status = &daemonset.status;
            let replicas = ControllerReplicas::DaemonSet {
                replicas: ReplicaCount {
                    desired: status.desired_number_scheduled,
                    ready: status.number_ready,
                    updated: status.updated_number_scheduled,
                    available: status.number_available,
                },
                misscheduled: status.number_misscheduled,
            };

            let mut writer = SectionWriter::new(target.clone(), &mut sections);
            writer.push_workload(&pods)?;
            writer.push(names::REPLICAS, &replicas)?;
            writer.push(names::UPDATE_STRATEGY, &update_strategy(&daemonset.spec))?;
            hosts_pods.push((target, running_lookup_names(&pods)));
        }
    }

    // Namespaces
    if options.monitors(MonitoredObject::Namespaces) {
        for namespace in &monitored_namespaces {
            let target = formatter.namespace(namespace.name());
            let namespace_pods = filter_pods_by_namespace(&api.pods, namespace.name());
            let running = filter_pods_by_phase(namespace_pods.iter().copied(), Phase::Running);

            let mut writer = SectionWriter::new(target.clone(), &mut sections);
            writer.push_workload(&namespace_pods)?;

            if let Some(quota) =
                filter_matching_namespace_resource_quota(namespace.name(), &api.resource_quotas)
            {
                let selected =
                    filter_pods_by_resource_quota_criteria(running.iter().copied(), quota)?;
                debug!(
                    namespace = %namespace.name(),
                    quota = %quota.metadata.name,
                    selected = selected.len(),
                    "Selected pods for resource quota"
                );
                let hard = quota.spec.hard.unwrap_or_default();
                if let Some(cpu) = hard.cpu {
                    writer.push(
                        names::RESOURCE_QUOTA_CPU,
                        &ResourceQuotaResources {
                            hard: cpu,
                            scoped: pod_resources_of(ResourceKind::Cpu, selected.iter().copied()),
                        },
                    )?;
                }
                if let Some(memory) = hard.memory {
                    writer.push(
                        names::RESOURCE_QUOTA_MEMORY,
                        &ResourceQuotaResources {
                            hard: memory,
                            scoped: pod_resources_of(
                                ResourceKind::Memory,
                                selected.iter().copied(),
                            ),
                        },
                    )?;
                }
            }

            if options.monitors(MonitoredObject::Pvcs) {
                let claims: Vec<&PersistentVolumeClaim> = api
                    .persistent_volume_claims
                    .iter()
                    .filter(|claim| claim.metadata.namespace == namespace.name())
                    .collect();
                if !claims.is_empty() {
                    writer.push(names::PVC, &claims_section(api, &claims))?;
                }
            }

            hosts_pods.push((target, running.into_iter().map(pod_lookup_name).collect()));
        }
    }

    // CronJobs
    if options.monitors(MonitoredObject::Cronjobs) {
        for cron_job in api.cron_jobs.iter().filter(|c| is_monitored(&c.metadata)) {
            let target = formatter.namespaced("cronjob", &cron_job.metadata);
            let pods = filter_pods_by_cron_job(&api.pods, cron_job);

            let mut writer = SectionWriter::new(target.clone(), &mut sections);
            writer.push(
                names::CRON_JOB_STATUS,
                &latest_job_section(api, cron_job, &pods_by_uid)?,
            )?;
            writer.push_workload(&pods)?;
            hosts_pods.push((target, running_lookup_names(&pods)));
        }
    }

    // Pods
    if options.monitors(MonitoredObject::Pods) {
        let cron_job_pods: HashSet<&str> = if options.monitors(MonitoredObject::CronjobsPods) {
            HashSet::new()
        } else {
            api.cron_jobs
                .iter()
                .flat_map(|cron_job| cron_job.pod_uids.iter().map(String::as_str))
                .collect()
        };

        for pod in api
            .pods
            .iter()
            .filter(|pod| is_monitored(&pod.metadata))
            .filter(|pod| !cron_job_pods.contains(pod.uid.as_str()))
        {
            let target = formatter.namespaced("pod", &pod.metadata);
            let mut writer = SectionWriter::new(target.clone(), &mut sections);

            writer.push(names::POD_LIFECYCLE, &PodLifeCycle { phase: pod.phase() })?;
            if let Some(conditions) = &pod.status.conditions {
                writer.push(
                    names::POD_CONDITIONS,
                    &PodConditions {
                        conditions: conditions.clone(),
                    },
                )?;
            }
            if !pod.containers.is_empty() {
                writer.push(
                    names::POD_CONTAINERS,
                    &PodContainers {
                        containers: pod.containers.clone(),
                    },
                )?;
            }
            if !pod.init_containers.is_empty() {
                writer.push(
                    names::POD_INIT_CONTAINERS,
                    &PodContainers {
                        containers: pod.init_containers.clone(),
                    },
                )?;
            }
            writer.push(
                names::CPU_RESOURCES,
                &pod_resources_of(ResourceKind::Cpu, [pod]),
            )?;
            writer.push(
                names::MEMORY_RESOURCES,
                &pod_resources_of(ResourceKind::Memory, [pod]),
            )?;
            hosts_pods.push((target, running_lookup_names(&[pod])));
        }
    }

    // Performance
    let monitored_pods: HashSet<PodLookupName> = hosts_pods
        .iter()
        .flat_map(|(_, names)| names.iter().cloned())
        .collect();
    let performance_pods = filter_outdated_and_non_monitored_pods(
        group_by_pod(&api.usage_samples, rates),
        &monitored_pods,
    );
    for (target, pod_names) in &hosts_pods {
        let totals = sum_usage(&performance_pods, pod_names);
        let mut writer = SectionWriter::new(target.clone(), &mut sections);
        if let Some(cpu) = &totals.cpu {
            writer.push(names::PERFORMANCE_CPU, cpu)?;
        }
        if let Some(memory) = &totals.memory {
            writer.push(names::PERFORMANCE_MEMORY, memory)?;
        }
    }

    info!(
        cluster = %options.cluster_name,
        sections = sections.len(),
        hosts = hosts_pods.len(),
        performance_pods = performance_pods.len(),
        "Composed sections"
    );

    Ok(sections)
}

#[cfg(test)]
mod tests;
