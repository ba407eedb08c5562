//! Node condition verdicts

use serde::{Deserialize, Serialize};

use crate::schemata::api::{ConditionStatus, NodeCondition};
use crate::verdict::State;

/// State for each possible status of one condition type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionStates {
    #[serde(rename = "true")]
    pub on_true: State,
    #[serde(rename = "false")]
    pub on_false: State,
    pub unknown: State,
}

impl ConditionStates {
    pub const fn new(on_true: State, on_false: State, unknown: State) -> Self {
        Self {
            on_true,
            on_false,
            unknown,
        }
    }

    /// `Ready` must be true
    pub const READY: Self = Self::new(State::Ok, State::Crit, State::Crit);

    /// Pressure and custom conditions must be false
    pub const PROBLEM: Self = Self::new(State::Crit, State::Ok, State::Crit);

    pub fn state_for(&self, status: ConditionStatus) -> State {
        match status {
            ConditionStatus::True => self.on_true,
            ConditionStatus::False => self.on_false,
            ConditionStatus::Unknown => self.unknown,
        }
    }
}

/// Built-in table for a condition type
///
/// Only `Ready` is a positive condition; every other type, including
/// conditions added by node problem detectors, signals a problem when true.
pub fn default_states(condition_type: &str) -> ConditionStates {
    if condition_type.eq_ignore_ascii_case("ready") {
        ConditionStates::READY
    } else {
        ConditionStates::PROBLEM
    }
}

pub fn classify_node_condition(condition: &NodeCondition, states: &ConditionStates) -> State {
    states.state_for(condition.status)
}

/// `TYPE: status (reason: message)`
pub fn describe_node_condition(condition: &NodeCondition) -> String {
    format!(
        "{}: {} ({}: {})",
        condition.type_.to_uppercase(),
        condition.status,
        condition.reason.as_deref().unwrap_or("None"),
        condition.message.as_deref().unwrap_or("None"),
    )
}
