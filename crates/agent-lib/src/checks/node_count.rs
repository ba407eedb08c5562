//! Ready node count check of the cluster

use serde::{Deserialize, Serialize};

use crate::schemata::section::{NodeCount, ReadyCount};
use crate::temporal::{check_levels_lower, Levels};
use crate::verdict::{CheckOutput, State};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Params {
    /// Lower levels on ready worker nodes
    #[serde(default)]
    pub worker_levels_lower: Levels,
    /// Lower levels on ready control plane nodes
    #[serde(default)]
    pub control_plane_levels_lower: Levels,
}

fn ready_summary(label: &str, count: &ReadyCount, levels: &Levels) -> CheckOutput {
    let state = check_levels_lower(count.ready.into(), levels);
    let text = format!("{label} {}/{}", count.ready, count.total());
    match (state, levels) {
        (State::Ok, _) | (_, Levels::NoLevels) => CheckOutput::summary(state, text),
        (_, Levels::Fixed { warn, crit }) => {
            CheckOutput::summary(state, format!("{text} (warn/crit below {warn}/{crit})"))
        }
    }
}

fn count_metrics(prefix: &str, count: &ReadyCount) -> [CheckOutput; 3] {
    [
        CheckOutput::metric(format!("kube_node_count_{prefix}_ready"), count.ready.into(), None),
        CheckOutput::metric(
            format!("kube_node_count_{prefix}_not_ready"),
            count.not_ready.into(),
            None,
        ),
        CheckOutput::metric(format!("kube_node_count_{prefix}_total"), count.total().into(), None),
    ]
}

pub fn check(params: &Params, section: &NodeCount) -> Vec<CheckOutput> {
    let mut outputs = vec![ready_summary(
        "Worker nodes",
        &section.worker,
        &params.worker_levels_lower,
    )];

    if section.control_plane.total() == 0 {
        outputs.push(CheckOutput::summary(State::Ok, "No control plane nodes found"));
    } else {
        outputs.push(ready_summary(
            "Control plane nodes",
            &section.control_plane,
            &params.control_plane_levels_lower,
        ));
    }

    outputs.extend(count_metrics("worker", &section.worker));
    outputs.extend(count_metrics("control_plane", &section.control_plane));
    outputs
}
