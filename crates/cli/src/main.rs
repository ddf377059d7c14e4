//! Autoscout CLI - automated reconnaissance workflows.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;

use autoscout_core::{DiscoveryOutcome, ScanContext, ScanRegistry, Workflow};
use autoscout_scans::workflows::{PentestWorkflow, ScanListWorkflow};
use autoscout_scans::ContextExt;
use autoscout_storage::{render_summary, ResultStore};

#[derive(Parser)]
#[command(name = "autoscout")]
#[command(about = "Automated reconnaissance framework", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a workflow against a target
    Scan {
        /// Target IP address or hostname
        target: String,
        /// Output directory for results
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,
        /// Workflow to run
        #[arg(short, long, default_value = "pentest")]
        workflow: String,
        /// Directory of plugin scan definitions
        #[arg(long)]
        plugins: Option<PathBuf>,
        /// Run only these registered scans (comma-separated), in parallel
        #[arg(long, value_delimiter = ',')]
        only: Vec<String>,
    },
    /// List registered scans
    Scans {
        /// Directory of plugin scan definitions
        #[arg(long)]
        plugins: Option<PathBuf>,
    },
    /// Print a previously saved results file
    Report {
        /// Path to results.json
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    match cli.command {
        Commands::Scan { target, output, workflow, plugins, only } => {
            let registry = build_registry(plugins.as_deref());
            run_scan(&registry, &target, output, &workflow, &only).await?;
        }
        Commands::Scans { plugins } => {
            let registry = build_registry(plugins.as_deref());
            list_scans(&registry);
        }
        Commands::Report { path } => {
            let snapshot = ResultStore::load(&path).await?;
            println!("{}", render_summary(&snapshot));
        }
    }

    Ok(())
}

fn build_registry(plugins: Option<&Path>) -> ScanRegistry {
    let mut registry = ScanRegistry::new();
    autoscout_scans::register_builtin(&mut registry);
    if let Some(dir) = plugins {
        for (unit, outcome) in registry.discover(dir) {
            if let DiscoveryOutcome::Failed(e) = outcome {
                eprintln!("warning: plugin unit '{unit}' failed to load: {e}");
            }
        }
    }
    registry
}

fn list_scans(registry: &ScanRegistry) {
    let names = registry.names();
    println!("Available Scans ({})", names.len());
    for name in names {
        let Some(scan) = registry.instantiate(&name) else {
            continue;
        };
        let root = if scan.requires_root() { "root" } else { "    " };
        println!("  {name:<16} {root}  {}", scan.description());
    }
}

async fn run_scan(
    registry: &ScanRegistry,
    target: &str,
    output: PathBuf,
    workflow_name: &str,
    only: &[String],
) -> Result<()> {
    println!("Target: {target}");
    println!("Output Directory: {}", output.display());

    let workflow: Box<dyn Workflow> = if !only.is_empty() {
        let mut scans = Vec::with_capacity(only.len());
        for name in only {
            let Some(scan) = registry.instantiate(name) else {
                anyhow::bail!("unknown scan: {name}");
            };
            scans.push(Arc::from(scan));
        }
        Box::new(ScanListWorkflow::new(target, output, scans)?)
    } else {
        match workflow_name {
            "pentest" => Box::new(PentestWorkflow::new(target, output)?),
            other => anyhow::bail!("unknown workflow: {other}"),
        }
    };

    let ctx = workflow.run().await?;

    print_summary(&ctx).await;
    ResultStore::save(&ctx).await?;
    ResultStore::save_summary(&ctx).await?;
    println!("\nResults saved to: {}", ctx.output_dir().display());
    Ok(())
}

async fn print_summary(ctx: &ScanContext) {
    let results = ctx.results().await;
    println!("\nScan Summary ({})", results.len());
    for (name, result) in &results {
        let status = if result.success { "ok" } else { "failed" };
        let detail = result.error.clone().unwrap_or_default();
        println!(
            "  {name:<16} {status:<8} {:>8.2}s  {detail}",
            result.duration().as_secs_f64()
        );
    }

    let services = ctx.services().await;
    if !services.is_empty() {
        println!("\nOpen Ports ({})", services.len());
        for (port, service) in services {
            println!("  {port:>5}  {service}");
        }
    }
}
