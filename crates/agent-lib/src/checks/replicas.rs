//! Replica convergence check for deployments, stateful sets and daemon sets

use serde::{Deserialize, Serialize};

use crate::render;
use crate::schemata::api::{IntOrString, UpdateStrategy};
use crate::schemata::section::{ControllerReplicas, UpdateStrategySection};
use crate::temporal::{check_levels_result, DurationTracker, Levels, ValueStore};
use crate::verdict::{CheckOutput, State};

pub const NOT_READY_KEY: &str = "not_ready_started_timestamp";
pub const NOT_UPDATED_KEY: &str = "not_updated_started_timestamp";
pub const MISSCHEDULED_KEY: &str = "misscheduled_started_timestamp";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Params {
    #[serde(default = "default_not_ready")]
    pub not_ready: Levels,
    #[serde(default = "default_update")]
    pub update: Levels,
    #[serde(default = "default_misscheduled")]
    pub misscheduled: Levels,
}

fn default_not_ready() -> Levels {
    Levels::fixed(300.0, 600.0)
}

fn default_update() -> Levels {
    Levels::fixed(600.0, 1800.0)
}

fn default_misscheduled() -> Levels {
    Levels::fixed(300.0, 600.0)
}

impl Default for Params {
    fn default() -> Self {
        Self {
            not_ready: default_not_ready(),
            update: default_update(),
            misscheduled: default_misscheduled(),
        }
    }
}

fn describe_strategy(strategy: &UpdateStrategy) -> String {
    let or_none = |value: &Option<IntOrString>| {
        value
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "None".to_string())
    };
    match strategy {
        UpdateStrategy::RollingUpdate {
            max_surge,
            max_unavailable,
        } => format!(
            "Strategy: RollingUpdate (max surge: {}, max unavailable: {})",
            or_none(max_surge),
            or_none(max_unavailable)
        ),
        UpdateStrategy::StatefulSetRollingUpdate {
            partition,
            max_unavailable,
        } => format!(
            "Strategy: RollingUpdate (partitioned at: {}, max unavailable: {})",
            partition,
            or_none(max_unavailable)
        ),
        UpdateStrategy::Recreate => "Strategy: Recreate".to_string(),
        UpdateStrategy::OnDelete => "Strategy: OnDelete".to_string(),
    }
}

pub fn check(
    params: &Params,
    replicas: &ControllerReplicas,
    strategy: Option<&UpdateStrategySection>,
    store: &mut dyn ValueStore,
    now: f64,
) -> Vec<CheckOutput> {
    let counts = replicas.counts();
    let mut outputs = vec![
        CheckOutput::summary(State::Ok, format!("Ready: {}/{}", counts.ready, counts.desired)),
        CheckOutput::summary(
            State::Ok,
            format!("Up-to-date: {}/{}", counts.updated, counts.desired),
        ),
    ];
    if let Some(misscheduled) = replicas.misscheduled() {
        outputs.push(CheckOutput::summary(
            State::Ok,
            format!("Misscheduled: {misscheduled}"),
        ));
    }

    outputs.push(CheckOutput::metric("kube_desired_replicas", counts.desired.into(), None));
    outputs.push(CheckOutput::metric("kube_ready_replicas", counts.ready.into(), None));
    outputs.push(CheckOutput::metric("kube_updated_replicas", counts.updated.into(), None));
    if let Some(misscheduled) = replicas.misscheduled() {
        outputs.push(CheckOutput::metric(
            "kube_misscheduled_replicas",
            misscheduled.into(),
            None,
        ));
    }

    let not_ready = DurationTracker::new(NOT_READY_KEY);
    if let Some(elapsed) = not_ready.observe(store, counts.ready < counts.desired, now) {
        outputs.push(check_levels_result(
            elapsed,
            &params.not_ready,
            "Not ready for",
            render::timespan,
        ));
    }

    let not_updated = DurationTracker::new(NOT_UPDATED_KEY);
    let on_delete = matches!(
        strategy.map(|s| &s.strategy),
        Some(UpdateStrategy::OnDelete)
    );
    if on_delete {
        not_updated.reset(store);
    } else if let Some(elapsed) = not_updated.observe(store, counts.updated < counts.desired, now) {
        outputs.push(check_levels_result(
            elapsed,
            &params.update,
            "Not updated for",
            render::timespan,
        ));
    }

    let misscheduled = DurationTracker::new(MISSCHEDULED_KEY);
    let is_misscheduled = replicas.misscheduled().is_some_and(|count| count > 0);
    if let Some(elapsed) = misscheduled.observe(store, is_misscheduled, now) {
        outputs.push(check_levels_result(
            elapsed,
            &params.misscheduled,
            "Misscheduled for",
            render::timespan,
        ));
    }

    if let Some(strategy) = strategy {
        outputs.push(CheckOutput::notice(
            State::Ok,
            describe_strategy(&strategy.strategy),
        ));
    }

    outputs
}
