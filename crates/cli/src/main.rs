//! Kubemon CLI
//!
//! A command-line tool for evaluating Kubernetes checks against the
//! sections written by the kubemon agent.

mod commands;
mod config;
mod output;
mod sections;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use commands::check::{run_check, CheckContext, CheckKind, Resource};
use commands::hosts;
use tracing_subscriber::EnvFilter;

/// Kubemon CLI
#[derive(Parser)]
#[command(name = "kubemon")]
#[command(author, version, about = "Evaluate Kubernetes monitoring checks", long_about = None)]
pub struct Cli {
    /// Directory of the per-object value stores
    #[arg(long, env = "KUBEMON_STORE_DIR", global = true)]
    pub store: Option<PathBuf>,

    /// Output format
    #[arg(long, short, global = true)]
    pub format: Option<output::OutputFormat>,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate a check for one monitored host
    #[command(subcommand)]
    Check(CheckCommands),

    /// List the hosts and sections in agent output
    Hosts {
        /// Agent output file (Checkmk format or JSON)
        #[arg(long, short)]
        sections: PathBuf,
    },
}

#[derive(Args)]
pub struct CheckArgs {
    /// Agent output file (Checkmk format or JSON)
    #[arg(long, short)]
    pub sections: PathBuf,

    /// Piggyback host to evaluate; the cluster host when omitted
    #[arg(long, default_value = "")]
    pub host: String,

    /// JSON file with check parameters
    #[arg(long)]
    pub params: Option<PathBuf>,

    /// Evaluation time as Unix timestamp (defaults to now)
    #[arg(long)]
    pub now: Option<f64>,
}

#[derive(Subcommand)]
pub enum CheckCommands {
    /// Pod status with per status group durations
    PodStatus(CheckArgs),

    /// Pod conditions
    PodConditions(CheckArgs),

    /// Replicas of a deployment, daemonset or statefulset
    Replicas(CheckArgs),

    /// Latest job of a cron job
    CronjobStatus(CheckArgs),

    /// Node conditions
    NodeConditions(CheckArgs),

    /// Ready worker and control plane nodes of the cluster
    NodeCount(CheckArgs),

    /// One PersistentVolumeClaim of a namespace
    Pvc {
        #[command(flatten)]
        args: CheckArgs,

        /// Claim name
        #[arg(long)]
        item: String,
    },

    /// CPU or memory requests, limits and utilization
    Resources {
        #[command(flatten)]
        args: CheckArgs,

        /// Resource to evaluate
        #[arg(long, value_enum)]
        resource: Resource,
    },
}

impl CheckCommands {
    fn split(self) -> (CheckKind, CheckArgs) {
        match self {
            CheckCommands::PodStatus(args) => (CheckKind::PodStatus, args),
            CheckCommands::PodConditions(args) => (CheckKind::PodConditions, args),
            CheckCommands::Replicas(args) => (CheckKind::Replicas, args),
            CheckCommands::CronjobStatus(args) => (CheckKind::CronJobStatus, args),
            CheckCommands::NodeConditions(args) => (CheckKind::NodeConditions, args),
            CheckCommands::NodeCount(args) => (CheckKind::NodeCount, args),
            CheckCommands::Pvc { args, item } => (CheckKind::Pvc { item }, args),
            CheckCommands::Resources { args, resource } => (CheckKind::Resources(resource), args),
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = config::Config::load()?;
    let format = config.format(cli.format)?;

    match cli.command {
        Commands::Hosts { sections } => {
            hosts::list_hosts(&sections, format)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check(check_cmd) => {
            let (kind, args) = check_cmd.split();
            let ctx = CheckContext {
                sections: args.sections,
                host: args.host,
                params: args.params,
                now: args.now,
                store_dir: config.store_dir(cli.store)?,
                format,
            };
            let state = run_check(kind, &ctx)?;
            Ok(ExitCode::from(state.code()))
        }
    }
}
