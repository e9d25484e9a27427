//! wirelab - container network lab deployer
//!
//! Entry point for the wirelab CLI.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use wirelab_common::LabError;
use wirelab_links::ShellNetOps;
use wirelab_nodes::NodeRegistry;
use wirelab_runtime::DockerRuntime;
use wirelab_topo::{resolve, DeployOptions, Deployer, Topology, TopologyFile};

#[derive(Parser)]
#[command(name = "wirelab", version, about = "Deploys container network labs")]
struct Cli {
    /// Log verbosity: error, warn, info or debug.
    #[arg(long, global = true, default_value = "info")]
    log_level: Level,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Deploys a lab from a topology file.
    Deploy {
        /// Path to the topology file.
        #[arg(short, long)]
        topo: PathBuf,
        /// Maximum number of concurrent node workers.
        #[arg(long)]
        max_workers: Option<usize>,
        /// Per-stage deadline in seconds.
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Destroys a previously deployed lab.
    Destroy {
        /// Path to the topology file.
        #[arg(short, long)]
        topo: PathBuf,
    },
}

/// Initializes tracing/logging subsystem
fn init_logging(level: Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

fn load_topology(path: &PathBuf) -> anyhow::Result<Topology> {
    let file = TopologyFile::load(path)
        .with_context(|| format!("loading topology file {}", path.display()))?;
    let registry = NodeRegistry::with_default_kinds();
    let topo_dir = path
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let topo = resolve(&file, &registry, &topo_dir).context("resolving topology")?;
    Ok(topo)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    match run(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            // configuration errors are user-fixable, nothing was touched
            if e.downcast_ref::<LabError>().is_some_and(LabError::is_config) {
                eprintln!("no changes were made, fix the topology file and retry");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> anyhow::Result<ExitCode> {
    match command {
        Command::Deploy {
            topo,
            max_workers,
            timeout,
        } => {
            let topology = load_topology(&topo)?;
            info!(lab = %topology.name(), nodes = topology.nodes().len(), "deploying lab");

            let mut opts = DeployOptions {
                max_workers,
                ..Default::default()
            };
            if let Some(secs) = timeout {
                opts.stage_timeout = Duration::from_secs(secs);
            }

            let deployer = Deployer::new(
                Arc::new(DockerRuntime::new()),
                Arc::new(ShellNetOps::new()),
                opts,
            );
            let summary = deployer.deploy(&topology).await?;
            print!("{}", summary.render());

            if summary.has_failures() {
                Ok(ExitCode::FAILURE)
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
        Command::Destroy { topo } => {
            let topology = load_topology(&topo)?;
            info!(lab = %topology.name(), "destroying lab");

            let deployer = Deployer::new(
                Arc::new(DockerRuntime::new()),
                Arc::new(ShellNetOps::new()),
                DeployOptions::default(),
            );
            deployer.destroy(&topology).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
