//! Resource aggregation
//!
//! Rolls container requests and limits up to pods, controllers, nodes and
//! the cluster. Unspecified values are counted, never treated as zero.

use serde::{Deserialize, Serialize};

use crate::schemata::api::{ContainerSpec, Node, Pod, ResourcesRequirements};
use crate::schemata::section::{
    AllocatableContext, AllocatablePods, AllocatableResource, PodResources, Resources,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Cpu,
    Memory,
}

impl ResourceKind {
    fn pick(&self, requirements: &ResourcesRequirements) -> Option<f64> {
        match self {
            ResourceKind::Cpu => requirements.cpu,
            ResourceKind::Memory => requirements.memory,
        }
    }
}

/// Sum requests and limits of `containers` for one resource kind
///
/// A limit of exactly zero is part of the summed limit and additionally
/// counted in `count_zeroed_limits`.
pub fn aggregate_resources<'a, I>(kind: ResourceKind, containers: I) -> Resources
where
    I: IntoIterator<Item = &'a ContainerSpec>,
{
    let mut resources = Resources::default();

    for container in containers {
        resources.count_total += 1;

        match kind.pick(&container.resources.requests) {
            Some(request) => resources.request += request,
            None => resources.count_unspecified_requests += 1,
        }

        match kind.pick(&container.resources.limits) {
            Some(limit) => {
                if limit == 0.0 {
                    resources.count_zeroed_limits += 1;
                }
                resources.limit += limit;
            }
            None => resources.count_unspecified_limits += 1,
        }
    }

    resources
}

/// Aggregate over the regular containers of all `pods`
pub fn pod_resources_of<'a, I>(kind: ResourceKind, pods: I) -> Resources
where
    I: IntoIterator<Item = &'a Pod>,
{
    aggregate_resources(
        kind,
        pods.into_iter().flat_map(|pod| pod.spec.containers.iter()),
    )
}

/// Pod names grouped by phase
pub fn pods_by_phase<'a, I>(pods: I) -> PodResources
where
    I: IntoIterator<Item = &'a Pod>,
{
    let mut resources = PodResources::default();
    for pod in pods {
        resources.push(pod.phase(), pod.metadata.name.clone());
    }
    resources
}

/// Allocatable amount of one node
pub fn node_allocatable(kind: ResourceKind, node: &Node) -> AllocatableResource {
    let allocatable = &node.status.allocatable;
    AllocatableResource {
        context: AllocatableContext::Node,
        value: match kind {
            ResourceKind::Cpu => allocatable.cpu,
            ResourceKind::Memory => allocatable.memory,
        },
    }
}

/// Allocatable amount summed over `nodes`
pub fn cluster_allocatable<'a, I>(kind: ResourceKind, nodes: I) -> AllocatableResource
where
    I: IntoIterator<Item = &'a Node>,
{
    let value = nodes
        .into_iter()
        .map(|node| node_allocatable(kind, node).value)
        .sum();
    AllocatableResource {
        context: AllocatableContext::Cluster,
        value,
    }
}

/// Pod capacity summed over `nodes`
pub fn allocatable_pods<'a, I>(nodes: I) -> AllocatablePods
where
    I: IntoIterator<Item = &'a Node>,
{
    nodes
        .into_iter()
        .fold(AllocatablePods::default(), |acc, node| AllocatablePods {
            capacity: acc.capacity + node.status.capacity.pods,
            allocatable: acc.allocatable + node.status.allocatable.pods,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemata::api::ContainerResources;

    fn container(request: Option<f64>, limit: Option<f64>) -> ContainerSpec {
        ContainerSpec {
            name: "c".to_string(),
            resources: ContainerResources {
                requests: ResourcesRequirements {
                    cpu: request,
                    memory: None,
                },
                limits: ResourcesRequirements {
                    cpu: limit,
                    memory: None,
                },
            },
        }
    }

    #[test]
    fn test_unspecified_requests_are_counted() {
        let containers = vec![
            container(None, None),
            container(Some(1.0), None),
            container(Some(1.0), None),
        ];

        let resources = aggregate_resources(ResourceKind::Cpu, &containers);

        assert_eq!(resources.request, 2.0);
        assert_eq!(resources.count_unspecified_requests, 1);
        assert_eq!(resources.count_unspecified_limits, 3);
        assert_eq!(resources.count_total, 3);
    }

    #[test]
    fn test_zeroed_limits_are_summed_and_counted() {
        let containers = vec![
            container(Some(0.5), Some(0.0)),
            container(Some(0.5), Some(2.0)),
            container(None, None),
        ];

        let resources = aggregate_resources(ResourceKind::Cpu, &containers);

        assert_eq!(resources.limit, 2.0);
        assert_eq!(resources.count_zeroed_limits, 1);
        assert_eq!(resources.count_unspecified_limits, 1);
        assert!(
            resources.count_total
                >= resources.count_unspecified_limits + resources.count_zeroed_limits
        );
    }

    #[test]
    fn test_empty_input_yields_zero_figure() {
        let containers: Vec<ContainerSpec> = Vec::new();
        let resources = aggregate_resources(ResourceKind::Memory, &containers);
        assert_eq!(resources, Resources::default());
    }

    #[test]
    fn test_memory_kind_ignores_cpu_values() {
        let containers = vec![container(Some(1.0), Some(1.0))];
        let resources = aggregate_resources(ResourceKind::Memory, &containers);

        assert_eq!(resources.request, 0.0);
        assert_eq!(resources.count_unspecified_requests, 1);
        assert_eq!(resources.count_unspecified_limits, 1);
    }
}
