//! CPU and memory resource check
//!
//! Reports usage and its utilization of requests, limits and allocatable
//! resources. Limit utilization is only shown if every container declares a
//! non-zero limit; otherwise the summed limit does not bound the usage.

use serde::{Deserialize, Serialize};

use crate::aggregation::ResourceKind;
use crate::render;
use crate::schemata::section::{
    AllocatableContext, AllocatableResource, PerformanceUsage, Resources,
};
use crate::temporal::{render_with_levels, Levels};
use crate::verdict::{CheckOutput, State};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Params {
    #[serde(default)]
    pub request: Levels,
    #[serde(default = "default_limit")]
    pub limit: Levels,
    #[serde(default = "default_limit")]
    pub node: Levels,
    #[serde(default)]
    pub cluster: Levels,
}

fn default_limit() -> Levels {
    Levels::fixed(80.0, 90.0)
}

impl Default for Params {
    fn default() -> Self {
        Self {
            request: Levels::NoLevels,
            limit: default_limit(),
            node: default_limit(),
            cluster: Levels::NoLevels,
        }
    }
}

fn kind_name(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Cpu => "cpu",
        ResourceKind::Memory => "memory",
    }
}

fn render_amount(kind: ResourceKind, value: f64) -> String {
    match kind {
        ResourceKind::Cpu => render::cpu(value),
        ResourceKind::Memory => render::bytes(value),
    }
}

fn utilization(
    kind: ResourceKind,
    label: &str,
    usage: f64,
    total: f64,
    levels: &Levels,
    metric: String,
) -> [CheckOutput; 2] {
    let percent = usage / total * 100.0;
    let (state, text) = render_with_levels(percent, levels, render::percent);
    [
        CheckOutput::summary(
            state,
            format!(
                "{label} utilization: {text} - {} of {}",
                render_amount(kind, usage),
                render_amount(kind, total)
            ),
        ),
        CheckOutput::metric(metric, percent, levels.as_tuple()),
    ]
}

/// Whether the summed limit is an actual bound for all containers
pub fn limit_applies(resources: &Resources) -> bool {
    resources.count_unspecified_limits == 0
        && resources.count_zeroed_limits == 0
        && resources.limit > 0.0
}

pub fn check(
    kind: ResourceKind,
    params: &Params,
    resources: &Resources,
    usage: Option<&PerformanceUsage>,
    allocatable: Option<&AllocatableResource>,
) -> Vec<CheckOutput> {
    let name = kind_name(kind);
    let usage = usage.map(|u| u.usage);
    let mut outputs = Vec::new();

    if let Some(usage) = usage {
        outputs.push(CheckOutput::summary(
            State::Ok,
            format!("Usage: {}", render_amount(kind, usage)),
        ));
        outputs.push(CheckOutput::metric(format!("kube_{name}_usage"), usage, None));
    }

    outputs.push(CheckOutput::metric(
        format!("kube_{name}_request"),
        resources.request,
        None,
    ));
    match usage {
        Some(usage) if resources.request > 0.0 => outputs.extend(utilization(
            kind,
            "Requests",
            usage,
            resources.request,
            &params.request,
            format!("kube_{name}_request_utilization"),
        )),
        _ => outputs.push(CheckOutput::summary(
            State::Ok,
            format!("Requests: {}", render_amount(kind, resources.request)),
        )),
    }

    if limit_applies(resources) {
        outputs.push(CheckOutput::metric(
            format!("kube_{name}_limit"),
            resources.limit,
            None,
        ));
        match usage {
            Some(usage) => outputs.extend(utilization(
                kind,
                "Limits",
                usage,
                resources.limit,
                &params.limit,
                format!("kube_{name}_limit_utilization"),
            )),
            None => outputs.push(CheckOutput::summary(
                State::Ok,
                format!("Limits: {}", render_amount(kind, resources.limit)),
            )),
        }
    } else {
        outputs.push(CheckOutput::summary(State::Ok, "Limits: n/a"));
    }

    if let Some(allocatable) = allocatable {
        let (label, levels) = match allocatable.context {
            AllocatableContext::Node => ("Node", &params.node),
            AllocatableContext::Cluster => ("Cluster", &params.cluster),
        };
        outputs.push(CheckOutput::metric(
            format!("kube_{name}_allocatable"),
            allocatable.value,
            None,
        ));
        match usage {
            Some(usage) if allocatable.value > 0.0 => outputs.extend(utilization(
                kind,
                label,
                usage,
                allocatable.value,
                levels,
                format!("kube_{name}_{}_allocatable_utilization", label.to_lowercase()),
            )),
            _ => outputs.push(CheckOutput::notice(
                State::Ok,
                format!("Allocatable: {}", render_amount(kind, allocatable.value)),
            )),
        }
    }

    let total = resources.count_total;
    if resources.count_unspecified_requests > 0 {
        outputs.push(CheckOutput::notice(
            State::Ok,
            format!(
                "Requests: {}/{total} containers with no request set",
                resources.count_unspecified_requests
            ),
        ));
    }
    if resources.count_unspecified_limits > 0 {
        outputs.push(CheckOutput::notice(
            State::Ok,
            format!(
                "Limits: {}/{total} containers with no limit set",
                resources.count_unspecified_limits
            ),
        ));
    }
    if resources.count_zeroed_limits > 0 {
        outputs.push(CheckOutput::notice(
            State::Ok,
            format!(
                "Limits: {}/{total} containers with zero limit",
                resources.count_zeroed_limits
            ),
        ));
    }

    outputs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verdict::{summaries, worst_state};

    fn resources(request: f64, limit: f64, unspecified_limits: usize, zeroed: usize) -> Resources {
        Resources {
            request,
            limit,
            count_unspecified_requests: 0,
            count_unspecified_limits: unspecified_limits,
            count_zeroed_limits: zeroed,
            count_total: 2,
        }
    }

    #[test]
    fn test_full_utilization_report() {
        let outputs = check(
            ResourceKind::Cpu,
            &Params::default(),
            &resources(1.0, 1.0, 0, 0),
            Some(&PerformanceUsage { usage: 0.85 }),
            Some(&AllocatableResource {
                context: AllocatableContext::Node,
                value: 4.0,
            }),
        );

        assert_eq!(
            summaries(&outputs),
            vec![
                "Usage: 0.850",
                "Requests utilization: 85.00% - 0.850 of 1.000",
                "Limits utilization: 85.00% (warn/crit at 80.00%/90.00%) - 0.850 of 1.000",
                "Node utilization: 21.25% - 0.850 of 4.000",
            ]
        );
        assert_eq!(worst_state(&outputs), State::Warn);
    }

    #[test]
    fn test_zeroed_limit_disables_limit_utilization() {
        let outputs = check(
            ResourceKind::Cpu,
            &Params::default(),
            &resources(1.0, 2.0, 0, 1),
            Some(&PerformanceUsage { usage: 1.9 }),
            None,
        );

        assert!(summaries(&outputs).contains(&"Limits: n/a"));
        assert!(!outputs
            .iter()
            .filter_map(CheckOutput::as_metric)
            .any(|m| m.name == "kube_cpu_limit_utilization"));
        assert!(outputs.contains(&CheckOutput::notice(
            State::Ok,
            "Limits: 1/2 containers with zero limit"
        )));
    }

    #[test]
    fn test_missing_usage_skips_utilization() {
        let outputs = check(
            ResourceKind::Memory,
            &Params::default(),
            &resources(1_073_741_824.0, 2_147_483_648.0, 0, 0),
            None,
            None,
        );

        assert_eq!(
            summaries(&outputs),
            vec!["Requests: 1.00 GiB", "Limits: 2.00 GiB"]
        );
        assert!(!outputs
            .iter()
            .filter_map(CheckOutput::as_metric)
            .any(|m| m.name == "kube_memory_usage"));
    }
}
