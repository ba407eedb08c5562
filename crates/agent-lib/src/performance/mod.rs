//! Performance data from the cluster collector
//!
//! CPU samples are cumulative counters and are turned into rates against the
//! previous cycle's snapshot (see [`rate`]). Memory samples are gauges and are
//! used as delivered. Both are then summed per pod and per monitored host.

pub mod rate;
pub mod store;


use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::models::{MetricKind, PodLookupName, RateSample, UsageSample};
use crate::schemata::section::PerformanceUsage;

pub use rate::{calculate_rate, compute_rates, run_rate_cycle, RateCycle};
pub use store::{CounterStore, FileCounterStore, MemoryCounterStore};

/// Usage of one pod summed over its containers
#[derive(Debug, Clone, PartialEq)]
pub struct PerformancePod {
    pub lookup_name: PodLookupName,
    /// Summed CPU rate; `None` if no container produced a rate this cycle
    pub cpu: Option<f64>,
    /// Summed working set bytes
    pub memory: Option<f64>,
}

impl PerformancePod {
    fn new(lookup_name: PodLookupName) -> Self {
        Self {
            lookup_name,
            cpu: None,
            memory: None,
        }
    }
}

fn add(total: &mut Option<f64>, value: f64) {
    *total = Some(total.unwrap_or(0.0) + value);
}

/// Sum container rates and memory gauges per pod
pub fn group_by_pod(
    samples: &[UsageSample],
    rates: &[RateSample],
) -> BTreeMap<PodLookupName, PerformancePod> {
    let mut pods: BTreeMap<PodLookupName, PerformancePod> = BTreeMap::new();

    for sample in samples.iter().filter(|s| s.kind == MetricKind::Memory) {
        let lookup_name = sample.container.pod_lookup();
        let pod = pods
            .entry(lookup_name.clone())
            .or_insert_with(|| PerformancePod::new(lookup_name));
        add(&mut pod.memory, sample.value);
    }

    for rate in rates {
        let lookup_name = rate.container.pod_lookup();
        let pod = pods
            .entry(lookup_name.clone())
            .or_insert_with(|| PerformancePod::new(lookup_name));
        add(&mut pod.cpu, rate.rate);
    }

    pods
}

/// Keep only performance pods that belong to a monitored running pod
pub fn filter_outdated_and_non_monitored_pods(
    pods: BTreeMap<PodLookupName, PerformancePod>,
    monitored: &HashSet<PodLookupName>,
) -> BTreeMap<PodLookupName, PerformancePod> {
    pods.into_iter()
        .filter(|(name, _)| {
            let keep = monitored.contains(name);
            if !keep {
                debug!(pod = %name, "Dropping performance data of pod that is not monitored");
            }
            keep
        })
        .collect()
}

/// Summed usage over a set of pods
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UsageTotals {
    pub cpu: Option<PerformanceUsage>,
    pub memory: Option<PerformanceUsage>,
}

impl UsageTotals {
    pub fn is_empty(&self) -> bool {
        self.cpu.is_none() && self.memory.is_none()
    }
}

/// Sum the usage of the named pods that have performance data
///
/// A kind is `None` when none of the pods reported it.
pub fn sum_usage<'a, I>(
    performance_pods: &BTreeMap<PodLookupName, PerformancePod>,
    pod_names: I,
) -> UsageTotals
where
    I: IntoIterator<Item = &'a PodLookupName>,
{
    let mut cpu = None;
    let mut memory = None;
    for pod in pod_names
        .into_iter()
        .filter_map(|name| performance_pods.get(name))
    {
        if let Some(value) = pod.cpu {
            add(&mut cpu, value);
        }
        if let Some(value) = pod.memory {
            add(&mut memory, value);
        }
    }
    UsageTotals {
        cpu: cpu.map(|usage| PerformanceUsage { usage }),
        memory: memory.map(|usage| PerformanceUsage { usage }),
    }
}
