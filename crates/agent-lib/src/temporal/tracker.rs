//! Duration tracking of undesired states

use serde_json::{json, Value};

use super::store::ValueStore;

/// Remembers since when an undesired state holds
///
/// The start timestamp lives in the object's value store under `key`. It is
/// set at the first observation, never overwritten while the state persists
/// and reset to null as soon as the state resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurationTracker {
    key: String,
}

impl DurationTracker {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Start timestamp of the tracked state, if it is persisting
    pub fn started(&self, store: &dyn ValueStore) -> Option<f64> {
        store.get_f64(&self.key)
    }

    /// Record an observation at `now`
    ///
    /// Returns the elapsed time since the first undesired observation, or
    /// `None` if the state is not undesired.
    pub fn observe(&self, store: &mut dyn ValueStore, undesired: bool, now: f64) -> Option<f64> {
        if !undesired {
            self.reset(store);
            return None;
        }

        let started = match self.started(store) {
            Some(started) => started,
            None => {
                store.set(&self.key, json!(now));
                now
            }
        };
        Some(now - started)
    }

    pub fn reset(&self, store: &mut dyn ValueStore) {
        store.set(&self.key, Value::Null);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::temporal::levels::{check_levels, Levels};
    use crate::temporal::store::MemoryValueStore;
    use crate::verdict::State;

    #[test]
    fn test_clock_starts_at_first_observation() {
        let mut store = MemoryValueStore::new();
        let tracker = DurationTracker::new("not_ready_started_timestamp");

        assert_eq!(tracker.observe(&mut store, false, 0.0), None);
        assert_eq!(store.get("not_ready_started_timestamp"), Some(&Value::Null));

        assert_eq!(tracker.observe(&mut store, true, 100.0), Some(0.0));
        assert_eq!(tracker.started(&store), Some(100.0));

        let elapsed = tracker.observe(&mut store, true, 400.0).unwrap();
        assert_eq!(elapsed, 300.0);
        assert_eq!(check_levels(elapsed, &Levels::fixed(300.0, 600.0)), State::Warn);
    }

    #[test]
    fn test_start_is_never_overwritten_while_persisting() {
        let mut store = MemoryValueStore::new();
        let tracker = DurationTracker::new("pending");

        for now in [10.0, 20.0, 30.0, 40.0] {
            tracker.observe(&mut store, true, now);
            assert_eq!(tracker.started(&store), Some(10.0));
        }
    }

    #[test]
    fn test_resolution_clears_and_restarts() {
        let mut store = MemoryValueStore::new();
        let tracker = DurationTracker::new("pending");

        tracker.observe(&mut store, true, 10.0);
        tracker.observe(&mut store, false, 20.0);
        assert_eq!(tracker.started(&store), None);

        assert_eq!(tracker.observe(&mut store, true, 50.0), Some(0.0));
        assert_eq!(tracker.started(&store), Some(50.0));
    }

    #[test]
    fn test_trackers_with_different_keys_are_independent() {
        let mut store = MemoryValueStore::new();
        let ready = DurationTracker::new("not_ready_started_timestamp");
        let updated = DurationTracker::new("not_updated_started_timestamp");

        ready.observe(&mut store, true, 10.0);
        updated.observe(&mut store, true, 30.0);
        ready.observe(&mut store, false, 40.0);

        assert_eq!(ready.started(&store), None);
        assert_eq!(updated.started(&store), Some(30.0));
    }
}
