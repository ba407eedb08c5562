//! Check evaluation commands

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::ValueEnum;
use kubemon_lib::aggregation::ResourceKind;
use kubemon_lib::checks::{
    cronjob_status, decode_optional, decode_required, node_conditions, node_count, pod_conditions,
    pod_status, pvc, replicas, resources, HostSections,
};
use kubemon_lib::schemata::section::names;
use kubemon_lib::temporal::{object_store_path, FileValueStore, ValueStore};
use kubemon_lib::verdict::worst_state;
use kubemon_lib::{CheckOutput, EvalResult, State};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::output::{print_check, OutputFormat};
use crate::sections::AgentOutput;

/// Resource evaluated by the resources check
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Resource {
    Cpu,
    Memory,
}

impl From<Resource> for ResourceKind {
    fn from(resource: Resource) -> Self {
        match resource {
            Resource::Cpu => ResourceKind::Cpu,
            Resource::Memory => ResourceKind::Memory,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckKind {
    PodStatus,
    PodConditions,
    Replicas,
    CronJobStatus,
    NodeConditions,
    NodeCount,
    Pvc { item: String },
    Resources(Resource),
}

impl CheckKind {
    /// Service name, also names the value store file
    pub fn service_name(&self) -> &'static str {
        match self {
            CheckKind::PodStatus => "kube_pod_status",
            CheckKind::PodConditions => "kube_pod_conditions",
            CheckKind::Replicas => "kube_replicas",
            CheckKind::CronJobStatus => "kube_cron_job_status",
            CheckKind::NodeConditions => "kube_node_conditions",
            CheckKind::NodeCount => "kube_node_count",
            CheckKind::Pvc { .. } => "kube_pvc",
            CheckKind::Resources(Resource::Cpu) => "kube_cpu",
            CheckKind::Resources(Resource::Memory) => "kube_memory",
        }
    }

    pub fn item(&self) -> Option<&str> {
        match self {
            CheckKind::Pvc { item } => Some(item),
            _ => None,
        }
    }
}

/// Inputs shared by all check commands
#[derive(Debug, Clone)]
pub struct CheckContext {
    pub sections: PathBuf,
    pub host: String,
    pub params: Option<PathBuf>,
    pub now: Option<f64>,
    pub store_dir: PathBuf,
    pub format: OutputFormat,
}

impl CheckContext {
    fn now(&self) -> f64 {
        self.now
            .unwrap_or_else(|| Utc::now().timestamp_micros() as f64 / 1_000_000.0)
    }

    /// Run `evaluate` against the object's value store and persist it
    fn with_store<F>(&self, kind: &CheckKind, evaluate: F) -> Result<Vec<CheckOutput>>
    where
        F: FnOnce(&mut dyn ValueStore) -> EvalResult<Vec<CheckOutput>>,
    {
        let path = object_store_path(&self.store_dir, &self.host, kind.service_name(), kind.item());
        let mut store = FileValueStore::open(&path)
            .with_context(|| format!("Failed to open value store {}", path.display()))?;

        let outputs = evaluate(&mut store)?;

        store
            .save()
            .with_context(|| format!("Failed to save value store {}", path.display()))?;
        debug!(path = %path.display(), "Saved value store");
        Ok(outputs)
    }
}

fn load_params<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T> {
    let Some(path) = path else {
        return Ok(T::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read parameters {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid parameters in {}", path.display()))
}

fn evaluate(
    kind: &CheckKind,
    ctx: &CheckContext,
    sections: &HostSections,
) -> Result<Vec<CheckOutput>> {
    let params_path = ctx.params.as_deref();
    let now = ctx.now();

    let outputs = match kind {
        CheckKind::PodStatus => {
            let params: pod_status::Params = load_params(params_path)?;
            let lifecycle = decode_required(sections, names::POD_LIFECYCLE)?;
            let containers = decode_optional(sections, names::POD_CONTAINERS)?;
            let init_containers = decode_optional(sections, names::POD_INIT_CONTAINERS)?;
            ctx.with_store(kind, |store| {
                pod_status::check(
                    &params,
                    containers.as_ref(),
                    init_containers.as_ref(),
                    &lifecycle,
                    store,
                    now,
                )
            })?
        }
        CheckKind::PodConditions => {
            let params: pod_conditions::Params = load_params(params_path)?;
            let section = decode_required(sections, names::POD_CONDITIONS)?;
            ctx.with_store(kind, |store| {
                Ok(pod_conditions::check(&params, &section, store, now))
            })?
        }
        CheckKind::Replicas => {
            let params: replicas::Params = load_params(params_path)?;
            let section = decode_required(sections, names::REPLICAS)?;
            let strategy = decode_optional(sections, names::UPDATE_STRATEGY)?;
            ctx.with_store(kind, |store| {
                Ok(replicas::check(&params, &section, strategy.as_ref(), store, now))
            })?
        }
        CheckKind::CronJobStatus => {
            let params: cronjob_status::Params = load_params(params_path)?;
            let section = decode_required(sections, names::CRON_JOB_STATUS)?;
            ctx.with_store(kind, |store| {
                Ok(cronjob_status::check(&params, &section, store, now))
            })?
        }
        CheckKind::NodeConditions => {
            let params: node_conditions::Params = load_params(params_path)?;
            let section = decode_required(sections, names::NODE_CONDITIONS)?;
            node_conditions::check(&params, &section)
        }
        CheckKind::NodeCount => {
            let params: node_count::Params = load_params(params_path)?;
            let section = decode_required(sections, names::NODE_COUNT)?;
            node_count::check(&params, &section)
        }
        CheckKind::Pvc { item } => {
            let params: pvc::Params = load_params(params_path)?;
            let section = decode_required(sections, names::PVC)?;
            ctx.with_store(kind, |store| Ok(pvc::check(item, &params, &section, store, now)))?
        }
        CheckKind::Resources(resource) => {
            let params: resources::Params = load_params(params_path)?;
            let (resources_name, usage_name, allocatable_name) = match resource {
                Resource::Cpu => (
                    names::CPU_RESOURCES,
                    names::PERFORMANCE_CPU,
                    names::ALLOCATABLE_CPU,
                ),
                Resource::Memory => (
                    names::MEMORY_RESOURCES,
                    names::PERFORMANCE_MEMORY,
                    names::ALLOCATABLE_MEMORY,
                ),
            };
            let section = decode_required(sections, resources_name)?;
            let usage = decode_optional(sections, usage_name)?;
            let allocatable = decode_optional(sections, allocatable_name)?;
            resources::check(
                (*resource).into(),
                &params,
                &section,
                usage.as_ref(),
                allocatable.as_ref(),
            )
        }
    };
    Ok(outputs)
}

/// Evaluate one check for one host and print its outputs
///
/// Returns the worst state of the outputs.
pub fn run_check(kind: CheckKind, ctx: &CheckContext) -> Result<State> {
    let agent_output = AgentOutput::load(&ctx.sections)?;
    let sections = agent_output.host(&ctx.host)?;

    let outputs = evaluate(&kind, ctx, sections)
        .with_context(|| format!("Check {} failed", kind.service_name()))?;

    print_check(kind.service_name(), &ctx.host, kind.item(), &outputs, ctx.format)?;
    Ok(worst_state(&outputs))
}
