//! Pod conditions check

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::render;
use crate::schemata::api::PodCondition;
use crate::schemata::section::PodConditions;
use crate::temporal::{render_with_levels, DurationTracker, Levels, ValueStore};
use crate::verdict::{CheckOutput, State};

/// Condition that signals a problem when it is true
const DISRUPTION_TARGET: &str = "disruptiontarget";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Params {
    /// Levels on the time a condition has been failing
    #[serde(default = "default_levels")]
    pub default: Levels,
    /// Overrides per lowercase condition name
    #[serde(default)]
    pub conditions: BTreeMap<String, Levels>,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            default: default_levels(),
            conditions: BTreeMap::new(),
        }
    }
}

fn default_levels() -> Levels {
    Levels::fixed(300.0, 600.0)
}

impl Params {
    fn levels_for(&self, name: &str) -> &Levels {
        self.conditions.get(name).unwrap_or(&self.default)
    }
}

fn is_failing(name: &str, condition: &PodCondition) -> bool {
    if name == DISRUPTION_TARGET {
        condition.status
    } else {
        !condition.status
    }
}

fn status_text(status: bool) -> &'static str {
    if status {
        "True"
    } else {
        "False"
    }
}

pub fn check(
    params: &Params,
    section: &PodConditions,
    store: &mut dyn ValueStore,
    now: f64,
) -> Vec<CheckOutput> {
    if section.conditions.is_empty() {
        return vec![CheckOutput::summary(State::Ok, "No conditions reported")];
    }

    let mut all_passed = true;
    let mut details = Vec::with_capacity(section.conditions.len());

    for condition in &section.conditions {
        let name = condition.name();
        let tracker = DurationTracker::new(format!("{name}_failing_since"));
        let failing = is_failing(&name, condition);
        let tracked = tracker.observe(store, failing, now);

        if !failing {
            details.push((
                State::Ok,
                format!("{}: {}", name.to_uppercase(), status_text(condition.status)),
            ));
            continue;
        }

        all_passed = false;
        let elapsed = condition
            .last_transition_time
            .map(|since| now - since)
            .or(tracked)
            .unwrap_or(0.0);
        let (state, text) = render_with_levels(elapsed, params.levels_for(&name), render::timespan);
        details.push((
            state,
            format!(
                "{}: {} ({}: {}) for {}",
                name.to_uppercase(),
                status_text(condition.status),
                condition.reason.as_deref().unwrap_or("None"),
                condition.detail.as_deref().unwrap_or("None"),
                text
            ),
        ));
    }

    if all_passed {
        let mut outputs = vec![CheckOutput::summary(State::Ok, "Ready, all conditions passed")];
        outputs.extend(
            details
                .into_iter()
                .map(|(state, text)| CheckOutput::notice(state, text)),
        );
        return outputs;
    }

    details
        .into_iter()
        .map(|(state, text)| CheckOutput::summary(state, text))
        .collect()
}
