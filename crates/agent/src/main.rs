//! Kubemon Agent - Kubernetes special agent
//!
//! Runs one collection cycle per invocation: reads an API snapshot, derives
//! CPU rates against the persisted counters, composes the sections of every
//! monitored object and writes them as piggyback output to stdout.

use std::fs;
use std::io::{self, BufWriter, Read, Write};
use std::time::Instant;

use anyhow::{Context, Result};
use kubemon_lib::performance::{run_rate_cycle, FileCounterStore};
use kubemon_lib::piggyback::{write_checkmk, write_json};
use kubemon_lib::{compose_sections, route, AgentMetrics, ApiData, StructuredLogger};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;

use config::{AgentConfig, OutputFormat};

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> Result<()> {
    // JSON logs on stderr, stdout carries the agent output
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json().with_writer(io::stderr))
        .init();

    let config = AgentConfig::load()?;
    info!(cluster = %config.cluster_name, "Agent configured");

    let metrics = AgentMetrics::new().context("failed to create metrics registry")?;
    let logger = StructuredLogger::new(&config.cluster_name);

    let result = run_cycle(&config, &metrics, &logger);
    if let Err(err) = &result {
        metrics.inc_cycle_errors();
        logger.log_cycle_failed(&format!("{err:#}"));
    }

    if let Some(path) = &config.metrics_textfile {
        metrics
            .write_textfile(path)
            .with_context(|| format!("failed to write metrics to {}", path.display()))?;
    }

    result
}

fn read_snapshot(config: &AgentConfig) -> Result<ApiData> {
    let raw = match &config.snapshot_path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read snapshot {}", path.display()))?,
        None => {
            let mut raw = String::new();
            io::stdin()
                .read_to_string(&mut raw)
                .context("failed to read snapshot from stdin")?;
            raw
        }
    };
    serde_json::from_str(&raw).context("invalid API snapshot")
}

fn run_cycle(
    config: &AgentConfig,
    metrics: &AgentMetrics,
    logger: &StructuredLogger,
) -> Result<()> {
    let started = Instant::now();
    let snapshot = config
        .snapshot_path
        .as_ref()
        .map_or_else(|| "-".to_string(), |path| path.display().to_string());
    logger.log_cycle_started(AGENT_VERSION, &snapshot);

    let api_data = read_snapshot(config)?;

    let mut store = FileCounterStore::new(&config.counter_store_dir);
    let rate_cycle = run_rate_cycle(&mut store, &config.cluster_name, &api_data.usage_samples)
        .context("failed to update counter store")?;
    if rate_cycle.cold_start {
        logger.log_counter_store_reset(&store.path_for(&config.cluster_name));
    }
    logger.log_rates_computed(&rate_cycle);
    metrics.record_rates(&rate_cycle);

    let sections = compose_sections(&api_data, &rate_cycle.rates, &config.compose_options())
        .context("failed to compose sections")?;
    let section_count = sections.len();
    let batches = route(sections);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    match config.output_format {
        OutputFormat::Checkmk => write_checkmk(&batches, &mut out),
        OutputFormat::Json => write_json(&batches, &mut out),
    }
    .and_then(|()| out.flush())
    .context("failed to write agent output")?;

    metrics.record_output(&batches);
    let duration = started.elapsed().as_secs_f64();
    metrics.observe_cycle_duration(duration);
    logger.log_cycle_completed(section_count, batches.len(), duration);

    Ok(())
}
