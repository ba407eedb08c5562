//! Check evaluators
//!
//! Every check turns one or more sections of a monitored host into an
//! ordered list of [`CheckOutput`](crate::verdict::CheckOutput). Checks that
//! judge durations additionally take the object's value store and the
//! evaluation time.

pub mod cronjob_status;
pub mod node_conditions;
pub mod node_count;
pub mod pod_conditions;
pub mod pod_status;
pub mod pvc;
pub mod replicas;
pub mod resources;

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{EvalError, EvalResult};

/// Sections of one monitored host keyed by section name
pub type HostSections = BTreeMap<String, Value>;

/// Decode an optional section; absent sections yield `None`
pub fn decode_optional<T: DeserializeOwned>(
    sections: &HostSections,
    name: &str,
) -> EvalResult<Option<T>> {
    sections
        .get(name)
        .map(|payload| {
            serde_json::from_value(payload.clone()).map_err(|source| EvalError::SectionDecode {
                section: name.to_string(),
                source,
            })
        })
        .transpose()
}

/// Decode a section the check cannot run without
pub fn decode_required<T: DeserializeOwned>(
    sections: &HostSections,
    name: &str,
) -> EvalResult<T> {
    decode_optional(sections, name)?
        .ok_or_else(|| EvalError::MissingSection(name.to_string()))
}
