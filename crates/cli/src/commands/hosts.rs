//! Listing the hosts contained in agent output

use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{print_table, OutputFormat};
use crate::sections::AgentOutput;

/// Row for hosts table
#[derive(Tabled, Serialize)]
struct HostRow {
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "Sections")]
    sections: usize,
    #[tabled(rename = "Section names")]
    names: String,
}

/// Show every host with its sections
pub fn list_hosts(path: &Path, format: OutputFormat) -> Result<()> {
    let agent_output = AgentOutput::load(path)?;

    let rows: Vec<HostRow> = agent_output
        .hosts()
        .map(|(host, sections)| HostRow {
            host: if host.is_empty() {
                "<cluster>".to_string()
            } else {
                host.clone()
            },
            sections: sections.len(),
            names: sections.keys().cloned().collect::<Vec<_>>().join(", "),
        })
        .collect();

    print_table(&rows, format);
    Ok(())
}
