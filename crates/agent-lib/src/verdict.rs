//! Verdicts produced by check evaluation

use std::fmt;

use serde::{Deserialize, Serialize};

/// Monitoring state of a single result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum State {
    #[default]
    Ok,
    Warn,
    Crit,
    Unknown,
}

impl State {
    /// Numeric state as used by monitoring cores
    pub fn code(&self) -> u8 {
        match self {
            State::Ok => 0,
            State::Warn => 1,
            State::Crit => 2,
            State::Unknown => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            State::Ok => "OK",
            State::Warn => "WARN",
            State::Crit => "CRIT",
            State::Unknown => "UNKNOWN",
        }
    }

    fn severity(&self) -> u8 {
        match self {
            State::Ok => 0,
            State::Warn => 1,
            State::Unknown => 2,
            State::Crit => 3,
        }
    }

    /// The worse of two states; CRIT outranks UNKNOWN outranks WARN
    pub fn worst(self, other: State) -> State {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summaries appear in the service output, notices only in the details
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    Summary,
    Notice,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub state: State,
    pub kind: ResultKind,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub levels: Option<(f64, f64)>,
}

/// One element of a check's ordered output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CheckOutput {
    Result(CheckResult),
    Metric(Metric),
}

impl CheckOutput {
    pub fn summary(state: State, text: impl Into<String>) -> Self {
        CheckOutput::Result(CheckResult {
            state,
            kind: ResultKind::Summary,
            text: text.into(),
        })
    }

    pub fn notice(state: State, text: impl Into<String>) -> Self {
        CheckOutput::Result(CheckResult {
            state,
            kind: ResultKind::Notice,
            text: text.into(),
        })
    }

    pub fn metric(name: impl Into<String>, value: f64, levels: Option<(f64, f64)>) -> Self {
        CheckOutput::Metric(Metric {
            name: name.into(),
            value,
            levels,
        })
    }

    pub fn as_result(&self) -> Option<&CheckResult> {
        match self {
            CheckOutput::Result(result) => Some(result),
            CheckOutput::Metric(_) => None,
        }
    }

    pub fn as_metric(&self) -> Option<&Metric> {
        match self {
            CheckOutput::Metric(metric) => Some(metric),
            CheckOutput::Result(_) => None,
        }
    }
}

/// Overall state of a check output; OK when there are no results
pub fn worst_state(outputs: &[CheckOutput]) -> State {
    outputs
        .iter()
        .filter_map(CheckOutput::as_result)
        .fold(State::Ok, |acc, result| acc.worst(result.state))
}

/// Texts of all summary results in order
pub fn summaries(outputs: &[CheckOutput]) -> Vec<&str> {
    outputs
        .iter()
        .filter_map(CheckOutput::as_result)
        .filter(|result| result.kind == ResultKind::Summary)
        .map(|result| result.text.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crit_outranks_unknown() {
        assert_eq!(State::Unknown.worst(State::Crit), State::Crit);
        assert_eq!(State::Crit.worst(State::Unknown), State::Crit);
        assert_eq!(State::Warn.worst(State::Unknown), State::Unknown);
        assert_eq!(State::Ok.worst(State::Warn), State::Warn);
    }

    #[test]
    fn test_worst_state_ignores_metrics() {
        let outputs = vec![
            CheckOutput::summary(State::Ok, "fine"),
            CheckOutput::metric("m", 1.0, None),
            CheckOutput::notice(State::Warn, "hmm"),
        ];
        assert_eq!(worst_state(&outputs), State::Warn);
        assert_eq!(summaries(&outputs), vec!["fine"]);
        assert_eq!(worst_state(&[]), State::Ok);
    }

    #[test]
    fn test_output_serialization_is_tagged() {
        let json = serde_json::to_value(CheckOutput::summary(State::Crit, "down")).unwrap();
        assert_eq!(json["type"], "result");
        assert_eq!(json["state"], "CRIT");
        assert_eq!(json["kind"], "summary");
    }
}
