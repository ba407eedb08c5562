//! Node conditions check

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::classify::node_conditions::{
    classify_node_condition, default_states, describe_node_condition, ConditionStates,
};
use crate::schemata::section::NodeConditions;
use crate::verdict::{CheckOutput, State};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Params {
    /// State tables per lowercase condition type, overriding the built-in ones
    #[serde(default)]
    pub conditions: BTreeMap<String, ConditionStates>,
}

impl Params {
    pub fn states_for(&self, condition_type: &str) -> ConditionStates {
        self.conditions
            .get(&condition_type.to_lowercase())
            .copied()
            .unwrap_or_else(|| default_states(condition_type))
    }
}

pub fn check(params: &Params, section: &NodeConditions) -> Vec<CheckOutput> {
    if section.conditions.is_empty() {
        return vec![CheckOutput::summary(State::Ok, "No conditions reported")];
    }

    let evaluated: Vec<(State, String)> = section
        .conditions
        .iter()
        .map(|condition| {
            let state = classify_node_condition(condition, &params.states_for(&condition.type_));
            (state, describe_node_condition(condition))
        })
        .collect();

    if evaluated.iter().all(|(state, _)| *state == State::Ok) {
        let mut outputs = vec![CheckOutput::summary(State::Ok, "Ready, all conditions passed")];
        outputs.extend(
            evaluated
                .into_iter()
                .map(|(state, text)| CheckOutput::notice(state, text)),
        );
        return outputs;
    }

    evaluated
        .into_iter()
        .map(|(state, text)| CheckOutput::summary(state, text))
        .collect()
}
