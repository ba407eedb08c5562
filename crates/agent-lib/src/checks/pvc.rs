//! PersistentVolumeClaim check

use serde::{Deserialize, Serialize};

use crate::render;
use crate::schemata::api::PersistentVolumeClaimPhase;
use crate::schemata::section::{PersistentVolumeClaimSection, PersistentVolumeClaims};
use crate::temporal::{render_with_levels, DurationTracker, Levels, ValueStore};
use crate::verdict::{CheckOutput, State};

const PENDING_KEY: &str = "pending_since";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Params {
    #[serde(default = "default_pending")]
    pub pending: Levels,
    /// Levels on used space in percent of capacity
    #[serde(default = "default_used_space")]
    pub used_space: Levels,
}

fn default_pending() -> Levels {
    Levels::fixed(300.0, 600.0)
}

fn default_used_space() -> Levels {
    Levels::fixed(80.0, 90.0)
}

impl Default for Params {
    fn default() -> Self {
        Self {
            pending: default_pending(),
            used_space: default_used_space(),
        }
    }
}

fn phase_result(
    params: &Params,
    claim: &PersistentVolumeClaimSection,
    store: &mut dyn ValueStore,
    now: f64,
) -> CheckOutput {
    let tracker = DurationTracker::new(PENDING_KEY);
    let pending = claim.phase == Some(PersistentVolumeClaimPhase::Pending);
    let pending_for = tracker.observe(store, pending, now);

    match (claim.phase, pending_for) {
        (None, _) => CheckOutput::summary(State::Ok, "Status: not reported"),
        (Some(PersistentVolumeClaimPhase::Pending), Some(elapsed)) => {
            let (state, text) = render_with_levels(elapsed, &params.pending, render::timespan);
            CheckOutput::summary(state, format!("Status: Pending for {text}"))
        }
        (Some(PersistentVolumeClaimPhase::Lost), _) => {
            CheckOutput::summary(State::Crit, "Status: Lost")
        }
        (Some(phase), _) => CheckOutput::summary(State::Ok, format!("Status: {phase}")),
    }
}

/// Check the claim named `item`; an unknown item yields no output
pub fn check(
    item: &str,
    params: &Params,
    section: &PersistentVolumeClaims,
    store: &mut dyn ValueStore,
    now: f64,
) -> Vec<CheckOutput> {
    let Some(claim) = section.claims.get(item) else {
        return Vec::new();
    };

    let mut outputs = vec![phase_result(params, claim, store, now)];

    if let Some(volume) = claim.volume.filter(|v| v.capacity_bytes > 0.0) {
        let used_percent = volume.used_bytes / volume.capacity_bytes * 100.0;
        let (state, text) = render_with_levels(used_percent, &params.used_space, render::percent);
        outputs.push(CheckOutput::summary(
            state,
            format!(
                "Used: {text} - {} of {}",
                render::bytes(volume.used_bytes),
                render::bytes(volume.capacity_bytes)
            ),
        ));
        outputs.push(CheckOutput::metric(
            "fs_used_percent",
            used_percent,
            params.used_space.as_tuple(),
        ));
        outputs.push(CheckOutput::metric("fs_used", volume.used_bytes, None));
        outputs.push(CheckOutput::metric("fs_size", volume.capacity_bytes, None));
    }

    if let Some(requested) = claim.requested_storage {
        outputs.push(CheckOutput::notice(
            State::Ok,
            format!("Requested: {}", render::bytes(requested as f64)),
        ));
    }
    if let Some(capacity) = claim.capacity {
        outputs.push(CheckOutput::notice(
            State::Ok,
            format!("Capacity: {}", render::bytes(capacity as f64)),
        ));
    }
    if let Some(volume_name) = &claim.volume_name {
        outputs.push(CheckOutput::notice(State::Ok, format!("Volume: {volume_name}")));
    }

    outputs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemata::section::VolumeUsage;
    use crate::temporal::MemoryValueStore;
    use crate::verdict::{summaries, worst_state};

    fn claims(
        phase: Option<PersistentVolumeClaimPhase>,
        volume: Option<VolumeUsage>,
    ) -> PersistentVolumeClaims {
        let claim = PersistentVolumeClaimSection {
            name: "data".to_string(),
            phase,
            volume_name: Some("pv-1".to_string()),
            requested_storage: Some(1_073_741_824),
            capacity: None,
            volume,
        };
        PersistentVolumeClaims {
            claims: [("data".to_string(), claim)].into(),
        }
    }

    #[test]
    fn test_bound_with_usage() {
        let mut store = MemoryValueStore::new();
        let section = claims(
            Some(PersistentVolumeClaimPhase::Bound),
            Some(VolumeUsage {
                capacity_bytes: 1_073_741_824.0,
                used_bytes: 1_020_054_732.8,
            }),
        );

        let outputs = check("data", &Params::default(), &section, &mut store, 0.0);

        assert_eq!(
            summaries(&outputs),
            vec![
                "Status: Bound",
                "Used: 95.00% (warn/crit at 80.00%/90.00%) - 972.80 MiB of 1.00 GiB",
            ]
        );
        assert_eq!(worst_state(&outputs), State::Crit);
    }

    #[test]
    fn test_pending_is_tracked() {
        let mut store = MemoryValueStore::new();
        let section = claims(Some(PersistentVolumeClaimPhase::Pending), None);

        check("data", &Params::default(), &section, &mut store, 0.0);
        let outputs = check("data", &Params::default(), &section, &mut store, 301.0);

        assert_eq!(worst_state(&outputs), State::Warn);
        assert!(summaries(&outputs)[0].starts_with("Status: Pending for 5 minutes 1 second"));
    }

    #[test]
    fn test_lost_is_crit() {
        let mut store = MemoryValueStore::new();
        let section = claims(Some(PersistentVolumeClaimPhase::Lost), None);
        let outputs = check("data", &Params::default(), &section, &mut store, 0.0);
        assert_eq!(worst_state(&outputs), State::Crit);
    }

    #[test]
    fn test_missing_phase_is_not_reported() {
        let mut store = MemoryValueStore::new();
        let section = claims(None, None);
        let outputs = check("data", &Params::default(), &section, &mut store, 0.0);
        assert_eq!(summaries(&outputs), vec!["Status: not reported"]);
        assert_eq!(worst_state(&outputs), State::Ok);
    }

    #[test]
    fn test_unknown_item() {
        let mut store = MemoryValueStore::new();
        let section = claims(None, None);
        assert!(check("other", &Params::default(), &section, &mut store, 0.0).is_empty());
    }
}
