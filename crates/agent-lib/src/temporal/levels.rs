//! Warn/crit levels and their evaluation

use serde::{Deserialize, Serialize};

use crate::verdict::{CheckOutput, State};

/// Warn/crit thresholds, or none at all
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Levels {
    #[default]
    NoLevels,
    Fixed {
        warn: f64,
        crit: f64,
    },
}

impl Levels {
    pub fn fixed(warn: f64, crit: f64) -> Self {
        Levels::Fixed { warn, crit }
    }

    pub fn as_tuple(&self) -> Option<(f64, f64)> {
        match self {
            Levels::NoLevels => None,
            Levels::Fixed { warn, crit } => Some((*warn, *crit)),
        }
    }
}

/// State of `value` against upper levels
///
/// Both thresholds are inclusive: reaching `warn` is WARN, reaching `crit`
/// is CRIT.
pub fn check_levels(value: f64, levels: &Levels) -> State {
    match levels {
        Levels::NoLevels => State::Ok,
        Levels::Fixed { crit, .. } if value >= *crit => State::Crit,
        Levels::Fixed { warn, .. } if value >= *warn => State::Warn,
        Levels::Fixed { .. } => State::Ok,
    }
}

/// State of `value` against lower levels
///
/// Falling below `warn` is WARN, falling below `crit` is CRIT.
pub fn check_levels_lower(value: f64, levels: &Levels) -> State {
    match levels {
        Levels::NoLevels => State::Ok,
        Levels::Fixed { crit, .. } if value < *crit => State::Crit,
        Levels::Fixed { warn, .. } if value < *warn => State::Warn,
        Levels::Fixed { .. } => State::Ok,
    }
}

/// `value` rendered with the thresholds appended when it is not OK
///
/// Produces e.g. `5 minutes 0 seconds (warn/crit at 5 minutes 0 seconds/10
/// minutes 0 seconds)`.
pub fn render_with_levels(
    value: f64,
    levels: &Levels,
    render: impl Fn(f64) -> String,
) -> (State, String) {
    let state = check_levels(value, levels);
    let text = match (state, levels) {
        (State::Ok, _) | (_, Levels::NoLevels) => render(value),
        (_, Levels::Fixed { warn, crit }) => format!(
            "{} (warn/crit at {}/{})",
            render(value),
            render(*warn),
            render(*crit)
        ),
    };
    (state, text)
}

/// Summary result `"{label}: {value}"` evaluated against `levels`
pub fn check_levels_result(
    value: f64,
    levels: &Levels,
    label: &str,
    render: impl Fn(f64) -> String,
) -> CheckOutput {
    let (state, text) = render_with_levels(value, levels, render);
    CheckOutput::summary(state, format!("{label}: {text}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render;

    #[test]
    fn test_boundaries_are_inclusive_upwards() {
        let levels = Levels::fixed(300.0, 600.0);
        assert_eq!(check_levels(299.9, &levels), State::Ok);
        assert_eq!(check_levels(300.0, &levels), State::Warn);
        assert_eq!(check_levels(599.9, &levels), State::Warn);
        assert_eq!(check_levels(600.0, &levels), State::Crit);
    }

    #[test]
    fn test_lower_levels_trigger_below_thresholds() {
        let levels = Levels::fixed(2.0, 1.0);
        assert_eq!(check_levels_lower(2.0, &levels), State::Ok);
        assert_eq!(check_levels_lower(1.0, &levels), State::Warn);
        assert_eq!(check_levels_lower(0.0, &levels), State::Crit);
        assert_eq!(check_levels_lower(0.0, &Levels::NoLevels), State::Ok);
    }

    #[test]
    fn test_no_levels_is_always_ok() {
        assert_eq!(check_levels(1e12, &Levels::NoLevels), State::Ok);
    }

    #[test]
    fn test_levels_text_only_when_not_ok() {
        let levels = Levels::fixed(300.0, 600.0);

        let (state, text) = render_with_levels(100.0, &levels, render::timespan);
        assert_eq!(state, State::Ok);
        assert_eq!(text, "1 minute 40 seconds");

        let (state, text) = render_with_levels(300.0, &levels, render::timespan);
        assert_eq!(state, State::Warn);
        assert_eq!(
            text,
            "5 minutes 0 seconds (warn/crit at 5 minutes 0 seconds/10 minutes 0 seconds)"
        );
    }

    #[test]
    fn test_levels_deserialize_tagged() {
        let levels: Levels =
            serde_json::from_str(r#"{"type":"fixed","warn":1,"crit":2}"#).unwrap();
        assert_eq!(levels, Levels::fixed(1.0, 2.0));
        let none: Levels = serde_json::from_str(r#"{"type":"no_levels"}"#).unwrap();
        assert_eq!(none, Levels::NoLevels);
    }
}
