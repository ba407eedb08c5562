//! Observability infrastructure for the monitoring agent
//!
//! Provides:
//! - Prometheus metrics (cycle duration, sections written, rate samples)
//! - Structured JSON logging with tracing

use std::fs;
use std::path::Path;

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Opts, Registry, TextEncoder,
};
use tracing::{info, warn};

use crate::performance::RateCycle;
use crate::piggyback::PiggybackBatch;
use crate::schemata::section::names;

/// Histogram buckets for one collection cycle (in seconds)
const CYCLE_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Agent metrics for Prometheus exposition
///
/// Every instance owns its registry, so several agents (or tests) in one
/// process do not collide.
#[derive(Clone)]
pub struct AgentMetrics {
    registry: Registry,
    cycle_duration_seconds: Histogram,
    sections_written: IntGauge,
    piggyback_targets: IntGauge,
    resource_quota_sections: IntGauge,
    rate_samples_emitted: IntGauge,
    rate_samples_dropped: IntGauge,
    cycle_errors: IntCounter,
}

impl AgentMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let cycle_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "kubemon_agent_cycle_duration_seconds",
                "Time spent composing and writing one collection cycle",
            )
            .buckets(CYCLE_BUCKETS.to_vec()),
        )?;
        let sections_written = IntGauge::with_opts(Opts::new(
            "kubemon_agent_sections_written",
            "Number of sections written in the last cycle",
        ))?;
        let piggyback_targets = IntGauge::with_opts(Opts::new(
            "kubemon_agent_piggyback_targets",
            "Number of piggyback hosts written in the last cycle",
        ))?;
        let resource_quota_sections = IntGauge::with_opts(Opts::new(
            "kubemon_agent_resource_quota_sections",
            "Number of resource quota sections written in the last cycle",
        ))?;
        let rate_samples_emitted = IntGauge::with_opts(Opts::new(
            "kubemon_agent_rate_samples_emitted",
            "CPU rate samples derived in the last cycle",
        ))?;
        let rate_samples_dropped = IntGauge::with_opts(Opts::new(
            "kubemon_agent_rate_samples_dropped",
            "CPU counter samples without usable previous sample in the last cycle",
        ))?;
        let cycle_errors = IntCounter::with_opts(Opts::new(
            "kubemon_agent_cycle_errors_total",
            "Total number of aborted collection cycles",
        ))?;

        registry.register(Box::new(cycle_duration_seconds.clone()))?;
        registry.register(Box::new(sections_written.clone()))?;
        registry.register(Box::new(piggyback_targets.clone()))?;
        registry.register(Box::new(resource_quota_sections.clone()))?;
        registry.register(Box::new(rate_samples_emitted.clone()))?;
        registry.register(Box::new(rate_samples_dropped.clone()))?;
        registry.register(Box::new(cycle_errors.clone()))?;

        Ok(Self {
            registry,
            cycle_duration_seconds,
            sections_written,
            piggyback_targets,
            resource_quota_sections,
            rate_samples_emitted,
            rate_samples_dropped,
            cycle_errors,
        })
    }

    pub fn observe_cycle_duration(&self, duration_secs: f64) {
        self.cycle_duration_seconds.observe(duration_secs);
    }

    pub fn record_rates(&self, cycle: &RateCycle) {
        self.rate_samples_emitted.set(cycle.rates.len() as i64);
        self.rate_samples_dropped.set(cycle.dropped as i64);
    }

    /// Update the output gauges from the routed batches of one cycle
    pub fn record_output(&self, batches: &[PiggybackBatch]) {
        let sections = batches.iter().flat_map(|batch| batch.sections.iter());
        let mut total = 0;
        let mut quota = 0;
        for section in sections {
            total += 1;
            if section.name == names::RESOURCE_QUOTA_CPU
                || section.name == names::RESOURCE_QUOTA_MEMORY
            {
                quota += 1;
            }
        }
        self.sections_written.set(total);
        self.resource_quota_sections.set(quota);
        self.piggyback_targets
            .set(batches.iter().filter(|batch| !batch.target.is_empty()).count() as i64);
    }

    pub fn inc_cycle_errors(&self) {
        self.cycle_errors.inc();
    }

    /// Registry contents in Prometheus text format
    pub fn encode_text(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    /// Write the registry for the node exporter textfile collector
    pub fn write_textfile(&self, path: &Path) -> prometheus::Result<()> {
        let text = self.encode_text()?;
        let tmp = path.with_extension("prom.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// Structured logger for agent events
///
/// Provides consistent JSON-formatted logging for collection cycles and
/// counter store state.
#[derive(Clone)]
pub struct StructuredLogger {
    cluster_name: String,
}

impl StructuredLogger {
    pub fn new(cluster_name: impl Into<String>) -> Self {
        Self {
            cluster_name: cluster_name.into(),
        }
    }

    /// Log the start of a collection cycle
    pub fn log_cycle_started(&self, version: &str, snapshot: &str) {
        info!(
            event = "cycle_started",
            cluster = %self.cluster_name,
            agent_version = %version,
            snapshot = %snapshot,
            "Collection cycle started"
        );
    }

    pub fn log_cycle_completed(&self, sections: usize, targets: usize, duration_secs: f64) {
        info!(
            event = "cycle_completed",
            cluster = %self.cluster_name,
            sections = sections,
            targets = targets,
            duration_secs = duration_secs,
            "Collection cycle completed"
        );
    }

    pub fn log_cycle_failed(&self, error: &str) {
        warn!(
            event = "cycle_failed",
            cluster = %self.cluster_name,
            error = %error,
            "Collection cycle aborted"
        );
    }

    pub fn log_rates_computed(&self, cycle: &RateCycle) {
        info!(
            event = "rates_computed",
            cluster = %self.cluster_name,
            rates = cycle.rates.len(),
            dropped = cycle.dropped,
            "Computed CPU rates from counters"
        );
    }

    /// Log a missing counter snapshot; no CPU usage is reported this cycle
    pub fn log_counter_store_reset(&self, path: &Path) {
        warn!(
            event = "counter_store_reset",
            cluster = %self.cluster_name,
            path = %path.display(),
            "No previous counter snapshot, CPU usage available from next cycle"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piggyback::{route, SectionRecord};
    use serde_json::json;
    use tempfile::TempDir;

    fn record(target: &str, name: &str) -> SectionRecord {
        SectionRecord {
            target: target.to_string(),
            name: name.to_string(),
            payload: json!({}),
        }
    }

    #[test]
    fn test_instances_use_separate_registries() {
        let first = AgentMetrics::new().unwrap();
        let second = AgentMetrics::new().unwrap();

        first.observe_cycle_duration(0.02);
        second.inc_cycle_errors();

        assert!(first
            .encode_text()
            .unwrap()
            .contains("kubemon_agent_cycle_errors_total 0"));
        assert!(second
            .encode_text()
            .unwrap()
            .contains("kubemon_agent_cycle_errors_total 1"));
    }

    #[test]
    fn test_output_gauges() {
        let metrics = AgentMetrics::new().unwrap();
        let batches = route(vec![
            record("", names::NODE_COUNT),
            record("namespace_c_shop", names::RESOURCE_QUOTA_CPU),
            record("namespace_c_shop", names::CPU_RESOURCES),
            record("pod_c_shop_web", names::POD_LIFECYCLE),
        ]);

        metrics.record_output(&batches);
        metrics.record_rates(&RateCycle {
            rates: Vec::new(),
            dropped: 3,
            cold_start: false,
        });

        let text = metrics.encode_text().unwrap();
        assert!(text.contains("kubemon_agent_sections_written 4"));
        assert!(text.contains("kubemon_agent_piggyback_targets 2"));
        assert!(text.contains("kubemon_agent_resource_quota_sections 1"));
        assert!(text.contains("kubemon_agent_rate_samples_dropped 3"));
    }

    #[test]
    fn test_write_textfile() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kubemon.prom");
        let metrics = AgentMetrics::new().unwrap();

        metrics.write_textfile(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("# TYPE kubemon_agent_cycle_duration_seconds histogram"));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("prod");
        assert_eq!(logger.cluster_name, "prod");
    }
}
