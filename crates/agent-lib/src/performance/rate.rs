//! CPU rate computation from cumulative counters

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use super::store::CounterStore;
use crate::error::StoreError;
use crate::models::{ContainerIdentity, MetricKind, RateSample, UsageSample};

/// Outcome of one rate cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateCycle {
    pub rates: Vec<RateSample>,
    /// Current samples without a usable previous counterpart
    pub dropped: usize,
    /// No previous snapshot was stored for the key
    pub cold_start: bool,
}

/// Rate between two counter samples of the same container
///
/// `None` when both samples carry the same timestamp, i.e. the collector
/// has not refreshed its data since the previous cycle.
pub fn calculate_rate(current: &UsageSample, previous: &UsageSample) -> Option<f64> {
    let time_delta = current.timestamp - previous.timestamp;
    if time_delta == 0.0 {
        return None;
    }
    Some((current.value - previous.value) / time_delta)
}

/// Latest CPU sample per container identity
fn latest_cpu_samples(samples: &[UsageSample]) -> BTreeMap<&ContainerIdentity, &UsageSample> {
    let mut latest: BTreeMap<&ContainerIdentity, &UsageSample> = BTreeMap::new();
    for sample in samples.iter().filter(|s| s.kind == MetricKind::Cpu) {
        match latest.get(&sample.container) {
            Some(existing) if existing.timestamp >= sample.timestamp => {}
            _ => {
                latest.insert(&sample.container, sample);
            }
        }
    }
    latest
}

/// Rates for every container present in both sample sets
///
/// Counter resets are not detected: a decreasing counter yields a negative
/// rate. Output is ordered by container identity.
pub fn compute_rates(current: &[UsageSample], previous: &[UsageSample]) -> RateCycle {
    let previous_by_container: HashMap<&ContainerIdentity, &UsageSample> =
        latest_cpu_samples(previous).into_iter().collect();

    let mut cycle = RateCycle::default();
    for (container, sample) in latest_cpu_samples(current) {
        let rate = previous_by_container
            .get(container)
            .and_then(|old| calculate_rate(sample, old));

        match rate {
            Some(rate) => cycle.rates.push(RateSample {
                container: container.clone(),
                rate,
            }),
            None => cycle.dropped += 1,
        }
    }
    cycle
}

/// Compute rates against the stored snapshot and replace it with `samples`
///
/// The latest CPU sample of every container is persisted, ordered by
/// container identity, even for containers that produced no rate. The next
/// cycle always compares against the most recent observation.
pub fn run_rate_cycle(
    store: &mut dyn CounterStore,
    key: &str,
    samples: &[UsageSample],
) -> Result<RateCycle, StoreError> {
    let previous = store.load(key)?;
    let current: Vec<UsageSample> = latest_cpu_samples(samples).into_values().cloned().collect();

    let mut cycle = compute_rates(&current, &previous);
    cycle.cold_start = previous.is_empty();
    store.persist(key, &current)?;

    debug!(
        key = %key,
        previous = previous.len(),
        current = current.len(),
        rates = cycle.rates.len(),
        dropped = cycle.dropped,
        "Determined rate metrics from counter snapshot"
    );

    Ok(cycle)
}
