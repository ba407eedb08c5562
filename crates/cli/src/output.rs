//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use kubemon_lib::verdict::{worst_state, CheckOutput, ResultKind};
use kubemon_lib::State;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Row for check results table
#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Kind")]
    kind: &'static str,
    #[tabled(rename = "Text")]
    text: String,
}

/// Row for metrics table
#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Warn/Crit")]
    levels: String,
}

/// Evaluated check as printed in JSON format
#[derive(Serialize)]
struct CheckReport<'a> {
    check: &'a str,
    host: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    item: Option<&'a str>,
    state: State,
    outputs: &'a [CheckOutput],
}

/// Color a state the way monitoring UIs do
pub fn color_state(state: State) -> String {
    match state {
        State::Ok => state.as_str().green().to_string(),
        State::Warn => state.as_str().yellow().to_string(),
        State::Crit => state.as_str().red().bold().to_string(),
        State::Unknown => state.as_str().magenta().to_string(),
    }
}

/// Service output line: worst state and all summary texts
pub fn service_summary(outputs: &[CheckOutput]) -> String {
    let texts: Vec<&str> = outputs
        .iter()
        .filter_map(CheckOutput::as_result)
        .filter(|result| result.kind == ResultKind::Summary)
        .map(|result| result.text.as_str())
        .collect();
    format!("{} - {}", worst_state(outputs), texts.join(", "))
}

/// Print the outputs of one check evaluation
pub fn print_check(
    check: &str,
    host: &str,
    item: Option<&str>,
    outputs: &[CheckOutput],
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let report = CheckReport {
                check,
                host,
                item,
                state: worst_state(outputs),
                outputs,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Table => {
            if outputs.is_empty() {
                print_warning("Check produced no output");
                return Ok(());
            }

            let state = worst_state(outputs);
            let host = if host.is_empty() { "<cluster>" } else { host };
            let service = match item {
                Some(item) => format!("{check} {item}"),
                None => check.to_string(),
            };
            println!("{} {} on {}", color_state(state), service.bold(), host.cyan());
            println!("{}", service_summary(outputs));
            println!();

            let results: Vec<ResultRow> = outputs
                .iter()
                .filter_map(CheckOutput::as_result)
                .map(|result| ResultRow {
                    state: color_state(result.state),
                    kind: match result.kind {
                        ResultKind::Summary => "summary",
                        ResultKind::Notice => "notice",
                    },
                    text: result.text.clone(),
                })
                .collect();
            println!("{}", Table::new(results).with(Style::rounded()));

            let metrics: Vec<MetricRow> = outputs
                .iter()
                .filter_map(CheckOutput::as_metric)
                .map(|metric| MetricRow {
                    name: metric.name.clone(),
                    value: format!("{:.3}", metric.value),
                    levels: metric
                        .levels
                        .map(|(warn, crit)| format!("{warn}/{crit}"))
                        .unwrap_or_default(),
                })
                .collect();
            if !metrics.is_empty() {
                println!("{}", Table::new(metrics).with(Style::rounded()));
            }
        }
    }
    Ok(())
}

/// Print a table from a list of items
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(&items) {
                println!("{}", json);
            }
        }
    }
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}
