//! Pod status message from container states

use crate::schemata::api::{ContainerState, ContainerStatus, Phase, Pod};

/// Waiting reason that is part of every normal container start
const CONTAINER_CREATING: &str = "ContainerCreating";

/// Message of the first container in an interesting state
///
/// The first waiting container with a reason other than `ContainerCreating`
/// wins. Otherwise the first terminated container with a reason wins.
pub fn container_message(containers: &[ContainerStatus]) -> Option<String> {
    let waiting = containers.iter().find_map(|container| match &container.state {
        ContainerState::Waiting {
            reason: Some(reason),
            ..
        } if reason != CONTAINER_CREATING => Some(reason.clone()),
        _ => None,
    });
    if waiting.is_some() {
        return waiting;
    }

    containers.iter().find_map(|container| match &container.state {
        ContainerState::Terminated {
            reason: Some(reason),
            ..
        } => Some(reason.clone()),
        _ => None,
    })
}

/// Init containers that still matter for the pod status
///
/// An init container that terminated with exit code 0 did its job and is
/// not reported.
fn pending_init_containers(init_containers: &[ContainerStatus]) -> Vec<ContainerStatus> {
    init_containers
        .iter()
        .filter(|container| {
            !matches!(
                container.state,
                ContainerState::Terminated { exit_code: 0, .. }
            )
        })
        .cloned()
        .collect()
}

/// Status message of a pod as shown by the pod status check
///
/// Init containers are scanned first and their message, prefixed with
/// `Init:`, supersedes anything the regular containers report. Without any
/// container message the lifecycle phase is used.
pub fn pod_status_message(
    containers: &[ContainerStatus],
    init_containers: &[ContainerStatus],
    phase: Phase,
) -> String {
    if let Some(message) = container_message(&pending_init_containers(init_containers)) {
        return format!("Init:{message}");
    }
    if let Some(message) = container_message(containers) {
        return message;
    }
    phase.title().to_string()
}

pub fn pod_status_message_of(pod: &Pod) -> String {
    pod_status_message(&pod.containers, &pod.init_containers, pod.phase())
}

/// Notice line describing a container that is not running and ready
pub fn container_detail(container: &ContainerStatus) -> Option<String> {
    match &container.state {
        ContainerState::Running { .. } if container.ready => None,
        ContainerState::Running { .. } => Some(format!("{}: running, not ready", container.name)),
        ContainerState::Waiting { reason, detail } => Some(format!(
            "{}: waiting ({}: {})",
            container.name,
            reason.as_deref().unwrap_or("None"),
            detail.as_deref().unwrap_or("None"),
        )),
        ContainerState::Terminated {
            exit_code,
            reason,
            detail,
            ..
        } => Some(format!(
            "{}: terminated with exit code {} ({}: {})",
            container.name,
            exit_code,
            reason.as_deref().unwrap_or("None"),
            detail.as_deref().unwrap_or("None"),
        )),
    }
}
