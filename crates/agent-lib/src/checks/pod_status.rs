//! Pod status check
//!
//! The status message of the pod is matched against an ordered list of
//! status groups. Time spent in the matching group accumulates across
//! messages of the same group and is compared against the group's levels.
//!
//! Value store layout:
//! - `group`: position, levels and patterns of the group matched in the
//!   previous run
//! - `duration_per_status`: `[[message, seconds], ...]` in first-seen order
//! - `previous_status`, `previous_time`: message and time of the previous run
//!
//! The group total is the sum of per-run deltas, not the wall clock time
//! since the group was entered.

use regex::{Regex, RegexSet};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::classify::container_status::{container_detail, pod_status_message};
use crate::error::{EvalError, EvalResult};
use crate::render;
use crate::schemata::section::{PodContainers, PodLifeCycle};
use crate::temporal::{render_with_levels, Levels, ValueStore};
use crate::verdict::{CheckOutput, State};

const KEY_GROUP: &str = "group";
const KEY_DURATION_PER_STATUS: &str = "duration_per_status";
const KEY_PREVIOUS_STATUS: &str = "previous_status";
const KEY_PREVIOUS_TIME: &str = "previous_time";

/// Status messages sharing one set of levels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusGroup {
    pub levels: Levels,
    /// Regular expressions matched at the start of the status message
    pub patterns: Vec<String>,
}

impl StatusGroup {
    fn new(levels: Levels, patterns: &[&str]) -> Self {
        Self {
            levels,
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Params {
    #[serde(default = "default_groups")]
    pub groups: Vec<StatusGroup>,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            groups: default_groups(),
        }
    }
}

fn default_groups() -> Vec<StatusGroup> {
    let levels = Levels::fixed(300.0, 600.0);
    vec![
        StatusGroup::new(levels, &["ContainerCreating", "PodInitializing", "Pending"]),
        StatusGroup::new(
            levels,
            &[
                "CrashLoopBackOff",
                "ImagePullBackOff",
                "ErrImagePull",
                "InvalidImageName",
                "CreateContainerConfigError",
                "CreateContainerError",
                "RunContainerError",
                "ContainerCannotRun",
                "OOMKilled",
                "Error",
                "DeadlineExceeded",
                "Evicted",
                "Failed",
                "Unknown",
            ],
        ),
        StatusGroup::new(levels, &["Init:"]),
        StatusGroup::new(Levels::NoLevels, &["Running", "Completed", "Succeeded"]),
    ]
}

/// Matcher of status messages against every group pattern at once
///
/// Patterns are matched at the start of the message. A message belongs to
/// the first group with a matching pattern.
#[derive(Debug, Clone)]
pub struct StatusMatcher {
    patterns: RegexSet,
    /// Group index of every pattern in `patterns`
    group_of: Vec<usize>,
}

impl StatusMatcher {
    pub fn new(groups: &[StatusGroup]) -> EvalResult<Self> {
        let (group_of, anchored): (Vec<usize>, Vec<String>) = groups
            .iter()
            .enumerate()
            .flat_map(|(index, group)| {
                group
                    .patterns
                    .iter()
                    .map(move |pattern| (index, format!("^(?:{pattern})")))
            })
            .unzip();

        let patterns = RegexSet::new(&anchored).map_err(|source| invalid_pattern(groups, source))?;
        Ok(Self { patterns, group_of })
    }

    /// Index of the group `message` belongs to; `None` for the default group
    pub fn group_index(&self, message: &str) -> Option<usize> {
        self.patterns
            .matches(message)
            .iter()
            .next()
            .map(|pattern| self.group_of[pattern])
    }
}

/// Error naming the first pattern that does not compile
fn invalid_pattern(groups: &[StatusGroup], source: regex::Error) -> EvalError {
    let pattern = groups
        .iter()
        .flat_map(|group| group.patterns.iter())
        .find(|pattern| Regex::new(&format!("^(?:{pattern})")).is_err())
        .cloned()
        .unwrap_or_default();
    EvalError::InvalidPattern { pattern, source }
}

/// Value store identity of a group
///
/// Groups with equal patterns but different levels or positions do not
/// share durations. Messages matching no group belong to the default group,
/// which has no patterns and no levels.
fn group_identity(index: Option<usize>, group: Option<&StatusGroup>) -> Value {
    match (index, group) {
        (Some(index), Some(group)) => json!({
            "index": index,
            "levels": group.levels,
            "patterns": group.patterns,
        }),
        _ => json!({ "index": null }),
    }
}

fn load_durations(store: &dyn ValueStore) -> Vec<(String, f64)> {
    store
        .get(KEY_DURATION_PER_STATUS)
        .cloned()
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default()
}

fn add_duration(durations: &mut Vec<(String, f64)>, status: &str, delta: f64) {
    match durations.iter_mut().find(|(name, _)| name == status) {
        Some((_, duration)) => *duration += delta,
        None => durations.push((status.to_string(), delta)),
    }
}

/// Update the per-status durations for this run and return them
fn update_durations(
    store: &mut dyn ValueStore,
    group: &Value,
    message: &str,
    now: f64,
) -> Vec<(String, f64)> {
    let durations = if store.get(KEY_GROUP) != Some(group) {
        vec![(message.to_string(), 0.0)]
    } else {
        let mut durations = load_durations(store);
        let previous_status = store
            .get(KEY_PREVIOUS_STATUS)
            .and_then(Value::as_str)
            .map(str::to_string);
        if let (Some(previous_status), Some(previous_time)) =
            (previous_status, store.get_f64(KEY_PREVIOUS_TIME))
        {
            add_duration(&mut durations, &previous_status, now - previous_time);
        }
        add_duration(&mut durations, message, 0.0);
        durations
    };

    store.set(KEY_GROUP, group.clone());
    store.set(KEY_DURATION_PER_STATUS, json!(durations));
    store.set(KEY_PREVIOUS_TIME, json!(now));
    store.set(KEY_PREVIOUS_STATUS, json!(message));
    durations
}

pub fn check(
    params: &Params,
    containers: Option<&PodContainers>,
    init_containers: Option<&PodContainers>,
    lifecycle: &PodLifeCycle,
    store: &mut dyn ValueStore,
    now: f64,
) -> EvalResult<Vec<CheckOutput>> {
    let containers = containers.map(|c| c.containers.as_slice()).unwrap_or_default();
    let init_containers = init_containers
        .map(|c| c.containers.as_slice())
        .unwrap_or_default();

    let message = pod_status_message(containers, init_containers, lifecycle.phase);
    let index = StatusMatcher::new(&params.groups)?.group_index(&message);
    let group = index.and_then(|index| params.groups.get(index));
    let levels = group.map_or(Levels::NoLevels, |group| group.levels);
    let group_id = group_identity(index, group);

    let durations = update_durations(store, &group_id, &message, now);

    let mut outputs = Vec::new();
    match levels {
        Levels::NoLevels => outputs.push(CheckOutput::summary(State::Ok, message)),
        Levels::Fixed { .. } => {
            let total: f64 = durations.iter().map(|(_, duration)| duration).sum();
            let (state, text) = render_with_levels(total, &levels, render::timespan);
            outputs.push(CheckOutput::summary(state, format!("{message}: since {text}")));

            if durations.len() > 1 {
                let seen = durations
                    .iter()
                    .map(|(status, duration)| {
                        format!("{status} ({})", render::timespan(*duration))
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                outputs.push(CheckOutput::notice(State::Ok, format!("Seen: {seen}")));
            }
        }
    }

    outputs.extend(
        init_containers
            .iter()
            .chain(containers)
            .filter_map(container_detail)
            .map(|detail| CheckOutput::notice(State::Ok, detail)),
    );

    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemata::api::{ContainerState, ContainerStatus, Phase};
    use crate::temporal::MemoryValueStore;
    use crate::verdict::{summaries, worst_state};

    fn waiting(reason: &str) -> PodContainers {
        PodContainers {
            containers: vec![ContainerStatus {
                name: "app".to_string(),
                image: "img".to_string(),
                ready: false,
                restart_count: 3,
                state: ContainerState::Waiting {
                    reason: Some(reason.to_string()),
                    detail: Some("back-off".to_string()),
                },
            }],
        }
    }

    fn lifecycle(phase: Phase) -> PodLifeCycle {
        PodLifeCycle { phase }
    }

    #[test]
    fn test_running_pod_has_no_levels() {
        let mut store = MemoryValueStore::new();
        let outputs = check(
            &Params::default(),
            None,
            None,
            &lifecycle(Phase::Running),
            &mut store,
            100.0,
        )
        .unwrap();

        assert_eq!(summaries(&outputs), vec!["Running"]);
        assert_eq!(worst_state(&outputs), State::Ok);
    }

    #[test]
    fn test_duration_accumulates_within_group() {
        let params = Params::default();
        let mut store = MemoryValueStore::new();
        let pending = lifecycle(Phase::Pending);

        let mut run = |reason: &str, now: f64| {
            check(&params, Some(&waiting(reason)), None, &pending, &mut store, now).unwrap()
        };

        run("ErrImagePull", 0.0);
        run("ImagePullBackOff", 200.0);
        let outputs = run("ErrImagePull", 300.0);

        assert_eq!(
            summaries(&outputs),
            vec![
                "ErrImagePull: since 5 minutes 0 seconds \
                 (warn/crit at 5 minutes 0 seconds/10 minutes 0 seconds)"
            ]
        );
        assert_eq!(worst_state(&outputs), State::Warn);
        assert!(outputs.contains(&CheckOutput::notice(
            State::Ok,
            "Seen: ErrImagePull (3 minutes 20 seconds), ImagePullBackOff (1 minute 40 seconds)"
        )));
    }

    #[test]
    fn test_group_change_resets_durations() {
        let params = Params::default();
        let mut store = MemoryValueStore::new();

        let crashing = waiting("CrashLoopBackOff");
        check(&params, Some(&crashing), None, &lifecycle(Phase::Running), &mut store, 0.0).unwrap();
        check(&params, None, None, &lifecycle(Phase::Pending), &mut store, 1000.0).unwrap();

        let durations = load_durations(&store);
        assert_eq!(durations, vec![("Pending".to_string(), 0.0)]);
        assert_eq!(store.get_f64(KEY_PREVIOUS_TIME), Some(1000.0));
    }

    #[test]
    fn test_changed_levels_start_a_new_group() {
        let pending = lifecycle(Phase::Pending);
        let relaxed = Params {
            groups: vec![StatusGroup::new(Levels::fixed(300.0, 600.0), &["Pending"])],
        };
        let strict = Params {
            groups: vec![StatusGroup::new(Levels::fixed(100.0, 200.0), &["Pending"])],
        };
        let mut store = MemoryValueStore::new();

        check(&relaxed, None, None, &pending, &mut store, 0.0).unwrap();
        let outputs = check(&strict, None, None, &pending, &mut store, 500.0).unwrap();

        assert_eq!(summaries(&outputs), vec!["Pending: since 0 seconds"]);
        assert_eq!(worst_state(&outputs), State::Ok);
        assert_eq!(load_durations(&store), vec![("Pending".to_string(), 0.0)]);
    }

    #[test]
    fn test_first_matching_group_wins() {
        let groups = vec![
            StatusGroup::new(Levels::NoLevels, &["Running"]),
            StatusGroup::new(Levels::fixed(1.0, 2.0), &["Err", "Running"]),
        ];
        let matcher = StatusMatcher::new(&groups).unwrap();

        assert_eq!(matcher.group_index("Running"), Some(0));
        assert_eq!(matcher.group_index("ErrImagePull"), Some(1));
        assert_eq!(matcher.group_index("Error in Running"), Some(1));
        assert_eq!(matcher.group_index("Waiting"), None);
    }

    #[test]
    fn test_repeated_evaluation_is_idempotent() {
        let params = Params::default();
        let mut store = MemoryValueStore::new();
        let pending = lifecycle(Phase::Pending);

        check(&params, None, None, &pending, &mut store, 0.0).unwrap();
        let first = check(&params, None, None, &pending, &mut store, 400.0).unwrap();
        let snapshot = store.clone();
        let second = check(&params, None, None, &pending, &mut store, 400.0).unwrap();

        assert_eq!(first, second);
        assert_eq!(store, snapshot);
    }

    #[test]
    fn test_init_container_group() {
        let params = Params::default();
        let mut store = MemoryValueStore::new();

        let outputs = check(
            &params,
            None,
            Some(&waiting("CrashLoopBackOff")),
            &lifecycle(Phase::Pending),
            &mut store,
            0.0,
        )
        .unwrap();

        assert_eq!(summaries(&outputs), vec!["Init:CrashLoopBackOff: since 0 seconds"]);
        assert!(outputs.contains(&CheckOutput::notice(
            State::Ok,
            "app: waiting (CrashLoopBackOff: back-off)"
        )));
    }

    #[test]
    fn test_invalid_group_pattern() {
        let params = Params {
            groups: vec![StatusGroup::new(Levels::NoLevels, &["("])],
        };
        let mut store = MemoryValueStore::new();

        let result = check(&params, None, None, &lifecycle(Phase::Running), &mut store, 0.0);
        assert!(matches!(
            result,
            Err(EvalError::InvalidPattern { ref pattern, .. }) if pattern == "("
        ));
    }
}
