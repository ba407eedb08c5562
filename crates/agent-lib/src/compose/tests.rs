//! Tests for section composition
//!
//! A small cluster with one worker, one control-plane node, a deployment,
//! a cron job and two namespaces.

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::*;
use crate::models::{ContainerIdentity, MetricKind, UsageSample};
use crate::schemata::section::{AllocatableResource, JobStatusType, PerformanceUsage, Resources};

fn pod(
    uid: &str,
    namespace: &str,
    name: &str,
    node: Option<&str>,
    phase: &str,
    cpu_request: Option<f64>,
) -> Value {
    let resources = match cpu_request {
        Some(cpu) => json!({"requests": {"cpu": cpu}, "limits": {"cpu": cpu * 2.0}}),
        None => json!({}),
    };
    json!({
        "uid": uid,
        "metadata": {"name": name, "namespace": namespace, "creation_timestamp": 100.0},
        "spec": {"node": node, "containers": [{"name": "app", "resources": resources}]},
        "status": {"phase": phase},
        "containers": [{"name": "app", "ready": true, "state": {"type": "running", "start_time": 90.0}}]
    })
}

fn node(name: &str, labels: Value) -> Value {
    json!({
        "metadata": {"name": name, "labels": labels},
        "status": {
            "allocatable": {"cpu": 4.0, "memory": 8_000_000_000.0, "pods": 100},
            "capacity": {"cpu": 4.0, "memory": 8_000_000_000.0, "pods": 110},
            "conditions": [{"type": "Ready", "status": "True"}]
        }
    })
}

fn sample(namespace: &str, pod_name: &str, kind: MetricKind, value: f64) -> UsageSample {
    UsageSample {
        container: ContainerIdentity::new(namespace, pod_name, "app"),
        kind,
        value,
        timestamp: 100.0,
    }
}

fn cluster() -> ApiData {
    let mut api: ApiData = serde_json::from_value(json!({
        "pods": [
            pod("p1", "shop", "web-1", Some("worker-1"), "running", Some(0.5)),
            pod("p2", "shop", "web-2", None, "pending", Some(0.25)),
            pod("p3", "shop", "backup-1-abc", Some("worker-1"), "running", None),
            pod("p4", "kube-system", "apiserver", Some("cp-1"), "running", Some(1.0)),
        ],
        "nodes": [
            node("worker-1", json!({})),
            node("cp-1", json!({"node-role.kubernetes.io/control-plane": ""})),
        ],
        "deployments": [{
            "metadata": {"name": "web", "namespace": "shop"},
            "spec": {"replicas": 2, "strategy": {"type": "Recreate"}},
            "status": {"replicas": 2, "updated": 2, "available": 1, "ready": 1},
            "pods": ["p1", "p2"]
        }],
        "namespaces": [
            {"metadata": {"name": "shop"}},
            {"metadata": {"name": "kube-system"}}
        ],
        "resource_quotas": [{
            "metadata": {"name": "compute", "namespace": "shop"},
            "spec": {"hard": {"cpu": {"request": 2.0}}}
        }],
        "cron_jobs": [{
            "uid": "cj1",
            "metadata": {"name": "backup", "namespace": "shop"},
            "spec": {"schedule": "0 * * * *"},
            "status": {"last_schedule_time": 60.0},
            "pod_uids": ["p3"],
            "job_uids": ["j1"]
        }],
        "jobs": [{
            "uid": "j1",
            "metadata": {"name": "backup-1", "namespace": "shop", "creation_timestamp": 60.0},
            "status": {"start_time": 61.0},
            "pod_uids": ["p3"]
        }],
        "persistent_volume_claims": [{
            "metadata": {"name": "data", "namespace": "shop"},
            "spec": {"volume_name": "pv-1", "requested_storage": 1000},
            "status": {"phase": "Bound", "capacity": 1000}
        }],
        "volume_stats": [{"namespace": "shop", "claim": "data", "capacity_bytes": 1000.0, "used_bytes": 250.0}]
    }))
    .unwrap();
    api.usage_samples = vec![
        sample("shop", "web-1", MetricKind::Memory, 500.0),
        sample("kube-system", "apiserver", MetricKind::Memory, 700.0),
        sample("gone", "old-pod", MetricKind::Memory, 900.0),
    ];
    api
}

fn rates() -> Vec<RateSample> {
    vec![RateSample {
        container: ContainerIdentity::new("shop", "web-1", "app"),
        rate: 0.25,
    }]
}

fn section<T: DeserializeOwned>(records: &[SectionRecord], target: &str, name: &str) -> Option<T> {
    records
        .iter()
        .find(|r| r.target == target && r.name == name)
        .map(|r| serde_json::from_value(r.payload.clone()).unwrap())
}

fn targets(records: &[SectionRecord]) -> BTreeSet<&str> {
    records.iter().map(|r| r.target.as_str()).collect()
}

#[test]
fn test_cluster_excludes_control_plane() {
    let records = compose_sections(&cluster(), &rates(), &ComposeOptions::new("c")).unwrap();

    let cpu: Resources = section(&records, "", names::CPU_RESOURCES).unwrap();
    assert_eq!(cpu.request, 0.75);
    assert_eq!(cpu.count_total, 3);
    assert_eq!(cpu.count_unspecified_requests, 1);

    let allocatable: AllocatableResource = section(&records, "", names::ALLOCATABLE_CPU).unwrap();
    assert_eq!(allocatable.value, 4.0);

    let count: NodeCount = section(&records, "", names::NODE_COUNT).unwrap();
    assert_eq!(count.worker, ReadyCount { ready: 1, not_ready: 0 });
    assert_eq!(count.control_plane, ReadyCount { ready: 1, not_ready: 0 });
}

#[test]
fn test_hosts_per_object() {
    let records = compose_sections(&cluster(), &rates(), &ComposeOptions::new("c")).unwrap();

    let expected: BTreeSet<&str> = [
        "",
        "node_c_worker-1",
        "node_c_cp-1",
        "deployment_c_shop_web",
        "namespace_c_shop",
        "namespace_c_kube-system",
        "cronjob_c_shop_backup",
        "pod_c_shop_web-1",
        "pod_c_shop_web-2",
        "pod_c_kube-system_apiserver",
    ]
    .into();
    assert_eq!(targets(&records), expected);
}

#[test]
fn test_cron_job_pods_need_their_own_selection() {
    let mut options = ComposeOptions::new("c");
    let records = compose_sections(&cluster(), &rates(), &options).unwrap();
    assert!(!targets(&records).contains("pod_c_shop_backup-1-abc"));

    options.monitored_objects.insert(MonitoredObject::CronjobsPods);
    let records = compose_sections(&cluster(), &rates(), &options).unwrap();
    assert!(targets(&records).contains("pod_c_shop_backup-1-abc"));
}

#[test]
fn test_namespace_filter_limits_namespaced_hosts() {
    let mut options = ComposeOptions::new("c");
    options.namespace_filter = NamespaceFilter::Exclude(vec!["kube-".to_string()]);

    let records = compose_sections(&cluster(), &rates(), &options).unwrap();
    let targets = targets(&records);

    assert!(!targets.contains("namespace_c_kube-system"));
    assert!(!targets.contains("pod_c_kube-system_apiserver"));
    assert!(targets.contains("node_c_cp-1"));
    assert!(targets.contains("namespace_c_shop"));
}

#[test]
fn test_only_selected_objects() {
    let mut options = ComposeOptions::new("c");
    options.monitored_objects = [MonitoredObject::Nodes].into();

    let records = compose_sections(&cluster(), &rates(), &options).unwrap();

    assert_eq!(
        targets(&records),
        BTreeSet::from(["", "node_c_worker-1", "node_c_cp-1"])
    );
}

#[test]
fn test_controller_sections() {
    let records = compose_sections(&cluster(), &rates(), &ComposeOptions::new("c")).unwrap();

    let replicas: ControllerReplicas =
        section(&records, "deployment_c_shop_web", names::REPLICAS).unwrap();
    assert_eq!(
        replicas,
        ControllerReplicas::Deployment(ReplicaCount {
            desired: 2,
            ready: 1,
            updated: 2,
            available: 1,
        })
    );

    let pods: crate::schemata::section::PodResources =
        section(&records, "deployment_c_shop_web", names::POD_RESOURCES).unwrap();
    assert_eq!(pods.running, vec!["web-1"]);
    assert_eq!(pods.pending, vec!["web-2"]);
}

#[test]
fn test_quota_uses_running_pods_of_namespace() {
    let records = compose_sections(&cluster(), &rates(), &ComposeOptions::new("c")).unwrap();

    let quota: ResourceQuotaResources =
        section(&records, "namespace_c_shop", names::RESOURCE_QUOTA_CPU).unwrap();
    assert_eq!(quota.hard.request, Some(2.0));
    assert_eq!(quota.scoped.request, 0.5);
    assert_eq!(quota.scoped.count_total, 2);

    assert!(section::<Value>(&records, "namespace_c_shop", names::RESOURCE_QUOTA_MEMORY).is_none());
}

#[test]
fn test_cron_job_latest_job() {
    let records = compose_sections(&cluster(), &rates(), &ComposeOptions::new("c")).unwrap();

    let status: CronJobLatestJob =
        section(&records, "cronjob_c_shop_backup", names::CRON_JOB_STATUS).unwrap();
    let job = status.latest_job.unwrap();
    assert_eq!(job.uid, "j1");
    assert_eq!(job.status.type_, JobStatusType::Running);
    assert_eq!(status.last_schedule_time, Some(60.0));
}

#[test]
fn test_pvc_section_joins_volume_stats() {
    let records = compose_sections(&cluster(), &rates(), &ComposeOptions::new("c")).unwrap();

    let claims: PersistentVolumeClaims = section(&records, "namespace_c_shop", names::PVC).unwrap();
    let usage = claims.claims["data"].volume.unwrap();
    assert_eq!(usage.used_bytes, 250.0);
    assert!(section::<Value>(&records, "namespace_c_kube-system", names::PVC).is_none());
}

#[test]
fn test_performance_sections_follow_running_pods() {
    let records = compose_sections(&cluster(), &rates(), &ComposeOptions::new("c")).unwrap();

    let targets = [
        "",
        "node_c_worker-1",
        "deployment_c_shop_web",
        "namespace_c_shop",
        "pod_c_shop_web-1",
    ];
    for target in targets {
        let cpu: PerformanceUsage = section(&records, target, names::PERFORMANCE_CPU).unwrap();
        let memory: PerformanceUsage =
            section(&records, target, names::PERFORMANCE_MEMORY).unwrap();
        assert_eq!(cpu.usage, 0.25, "cpu of {target}");
        assert_eq!(memory.usage, 500.0, "memory of {target}");
    }

    let memory: PerformanceUsage =
        section(&records, "node_c_cp-1", names::PERFORMANCE_MEMORY).unwrap();
    assert_eq!(memory.usage, 700.0);
    assert!(section::<Value>(&records, "node_c_cp-1", names::PERFORMANCE_CPU).is_none());

    assert!(section::<Value>(&records, "pod_c_shop_web-2", names::PERFORMANCE_MEMORY).is_none());
}
