//! Scope and selection matching
//!
//! Pure filters deciding which pods feed a ResourceQuota aggregate, which
//! nodes belong to the control plane and which namespaces are monitored.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EvalError, EvalResult};
use crate::schemata::api::{
    CronJob, Namespace, Node, Phase, Pod, QosClass, QuotaScope, ResourceQuota, ScopeOperator,
    ScopeSelector, ScopedResourceMatchExpression,
};

/// Default role names marking a control-plane node
pub const DEFAULT_CONTROL_PLANE_ROLES: [&str; 2] = ["master", "control_plane"];

pub fn filter_pods_by_namespace<'a>(pods: &'a [Pod], namespace: &str) -> Vec<&'a Pod> {
    pods.iter()
        .filter(|pod| pod.metadata.namespace == namespace)
        .collect()
}

pub fn filter_pods_by_phase<'a, I>(pods: I, phase: Phase) -> Vec<&'a Pod>
where
    I: IntoIterator<Item = &'a Pod>,
{
    pods.into_iter().filter(|pod| pod.phase() == phase).collect()
}

pub fn filter_pods_by_cron_job<'a>(pods: &'a [Pod], cron_job: &CronJob) -> Vec<&'a Pod> {
    pods.iter()
        .filter(|pod| cron_job.pod_uids.contains(&pod.uid))
        .collect()
}

// ----------------------------------------------------------------------------
// Resource quota scopes
// ----------------------------------------------------------------------------

/// First quota defined in `namespace`
///
/// Kubernetes accepts several quotas per namespace but convention is one;
/// only the first one is considered.
pub fn filter_matching_namespace_resource_quota<'a>(
    namespace: &str,
    resource_quotas: &'a [ResourceQuota],
) -> Option<&'a ResourceQuota> {
    resource_quotas
        .iter()
        .find(|quota| quota.metadata.namespace == namespace)
}

/// Pods selected by both the `scopes` and the `scope_selector` of `quota`
pub fn filter_pods_by_resource_quota_criteria<'a, I>(
    pods: I,
    quota: &ResourceQuota,
) -> EvalResult<Vec<&'a Pod>>
where
    I: IntoIterator<Item = &'a Pod>,
{
    let scoped = filter_pods_by_resource_quota_scopes(pods, quota.spec.scopes.as_deref())?;
    filter_pods_by_resource_quota_scope_selector(scoped, quota.spec.scope_selector.as_ref())
}

/// Pods matching every scope; all pods when no scopes are set
pub fn filter_pods_by_resource_quota_scopes<'a, I>(
    pods: I,
    scopes: Option<&[QuotaScope]>,
) -> EvalResult<Vec<&'a Pod>>
where
    I: IntoIterator<Item = &'a Pod>,
{
    let Some(scopes) = scopes else {
        return Ok(pods.into_iter().collect());
    };

    let mut selected = Vec::new();
    for pod in pods {
        if all_match(scopes, |scope| matches_scope(pod, *scope, None))? {
            selected.push(pod);
        }
    }
    Ok(selected)
}

/// Pods matching every match expression; all pods when no selector is set
pub fn filter_pods_by_resource_quota_scope_selector<'a, I>(
    pods: I,
    scope_selector: Option<&ScopeSelector>,
) -> EvalResult<Vec<&'a Pod>>
where
    I: IntoIterator<Item = &'a Pod>,
{
    let Some(selector) = scope_selector else {
        return Ok(pods.into_iter().collect());
    };

    let mut selected = Vec::new();
    for pod in pods {
        if all_match(&selector.match_expressions, |expression| {
            matches_match_expression(pod, expression)
        })? {
            selected.push(pod);
        }
    }
    Ok(selected)
}

fn all_match<T>(
    items: &[T],
    mut predicate: impl FnMut(&T) -> EvalResult<bool>,
) -> EvalResult<bool> {
    for item in items {
        if !predicate(item)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn matches_match_expression(
    pod: &Pod,
    expression: &ScopedResourceMatchExpression,
) -> EvalResult<bool> {
    match (expression.scope_name, expression.operator) {
        (QuotaScope::PriorityClass, ScopeOperator::In | ScopeOperator::NotIn) => {
            Ok(matches_priority_class_value(pod, expression))
        }
        (scope, operator) => matches_scope(pod, scope, Some(operator)),
    }
}

fn matches_priority_class_value(pod: &Pod, expression: &ScopedResourceMatchExpression) -> bool {
    let in_values = pod
        .spec
        .priority_class_name
        .as_ref()
        .is_some_and(|name| expression.values.contains(name));
    xnor(in_values, expression.operator == ScopeOperator::In)
}

/// Whether `pod` belongs to `scope`
///
/// `operator` is `None` for entries of the plain `scopes` list, which behave
/// like `Exists`.
pub fn matches_scope(
    pod: &Pod,
    scope: QuotaScope,
    operator: Option<ScopeOperator>,
) -> EvalResult<bool> {
    let unsupported = || EvalError::UnsupportedScope { scope, operator };

    match scope {
        QuotaScope::Terminating | QuotaScope::NotTerminating => match operator {
            None | Some(ScopeOperator::Exists) => Ok(xnor(
                pod.spec.active_deadline_seconds.is_some(),
                scope == QuotaScope::Terminating,
            )),
            Some(_) => Err(unsupported()),
        },
        QuotaScope::BestEffort | QuotaScope::NotBestEffort => match operator {
            None | Some(ScopeOperator::Exists) => Ok(xnor(
                pod.status.qos_class == Some(QosClass::BestEffort),
                scope == QuotaScope::BestEffort,
            )),
            Some(_) => Err(unsupported()),
        },
        QuotaScope::PriorityClass => {
            let has_priority_class = pod.spec.priority_class_name.is_some();
            match operator {
                None | Some(ScopeOperator::Exists) => Ok(has_priority_class),
                Some(ScopeOperator::DoesNotExist) => Ok(!has_priority_class),
                Some(ScopeOperator::In | ScopeOperator::NotIn) => Err(unsupported()),
            }
        }
    }
}

fn xnor(a: bool, b: bool) -> bool {
    a == b
}

// ----------------------------------------------------------------------------
// Node partitioning
// ----------------------------------------------------------------------------

/// Nodes split into control plane and workers
#[derive(Debug, Clone, Default)]
pub struct NodePartition<'a> {
    pub control_plane: Vec<&'a Node>,
    pub worker: Vec<&'a Node>,
}

fn normalize_role(role: &str) -> String {
    role.replace('-', "_")
}

/// Whether any role of `node` is one of `control_plane_roles`
///
/// `control-plane` and `control_plane` are treated as the same role.
pub fn is_control_plane<S: AsRef<str>>(node: &Node, control_plane_roles: &[S]) -> bool {
    node.roles().iter().any(|role| {
        let role = normalize_role(role);
        control_plane_roles
            .iter()
            .any(|configured| normalize_role(configured.as_ref()) == role)
    })
}

/// Split `nodes` into disjoint control-plane and worker partitions
pub fn partition_nodes<'a, S: AsRef<str>>(
    nodes: &'a [Node],
    control_plane_roles: &[S],
) -> NodePartition<'a> {
    let (control_plane, worker): (Vec<&Node>, Vec<&Node>) = nodes
        .iter()
        .partition(|node| is_control_plane(node, control_plane_roles));
    NodePartition {
        control_plane,
        worker,
    }
}

// ----------------------------------------------------------------------------
// Namespace filtering
// ----------------------------------------------------------------------------

/// Which namespaces get monitored
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "patterns", rename_all = "lowercase")]
pub enum NamespaceFilter {
    #[default]
    All,
    Include(Vec<String>),
    Exclude(Vec<String>),
}

fn compile_patterns(patterns: &[String]) -> EvalResult<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(&format!("^(?:{pattern})")).map_err(|source| EvalError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })
        })
        .collect()
}

/// Namespaces selected by `filter`
///
/// A pattern matches a namespace if it matches at the start of its name.
pub fn filter_monitored_namespaces<'a>(
    namespaces: &'a [Namespace],
    filter: &NamespaceFilter,
) -> EvalResult<Vec<&'a Namespace>> {
    let (patterns, include) = match filter {
        NamespaceFilter::All => return Ok(namespaces.iter().collect()),
        NamespaceFilter::Include(patterns) => (patterns, true),
        NamespaceFilter::Exclude(patterns) => (patterns, false),
    };

    let regexes = compile_patterns(patterns)?;
    debug!(
        include,
        patterns = patterns.len(),
        "Filtering namespaces by pattern"
    );

    Ok(namespaces
        .iter()
        .filter(|namespace| {
            let matched = regexes.iter().any(|re| re.is_match(namespace.name()));
            matched == include
        })
        .collect())
}
