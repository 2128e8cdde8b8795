//! pxm-meta - photo metadata maintenance worker
//!
//! Runs the maintenance pipeline once (`run`) or on a fixed interval
//! (`watch`) against the shared pxm database. Ctrl-C requests cooperative
//! cancellation of the active run.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pxm_common::config::{resolve_database_path, CompiledDefaults, RootFolderResolver, TomlConfig};
use pxm_common::db::init_database;
use pxm_common::events::EventBus;
use pxm_meta::services::{PipelineOutcome, TaskRegistry};
use pxm_meta::{MetaWorker, PipelineError};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const MODULE_NAME: &str = "pxm-meta";

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    ", ",
    env!("BUILD_PROFILE"),
    ")"
);

#[derive(Debug, Parser)]
#[command(name = "pxm-meta", version = VERSION, about = "Photo metadata maintenance worker")]
struct Cli {
    /// Bootstrap TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Root folder holding pxm.db
    #[arg(long, global = true)]
    root_folder: Option<PathBuf>,

    /// Database file, overrides the root folder location
    #[arg(long, global = true, env = "PXM_DATABASE")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the pipeline once
    Run {
        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the pipeline repeatedly until interrupted
    Watch {
        /// Seconds between runs
        #[arg(long)]
        interval: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let toml_config = TomlConfig::load_or_default(MODULE_NAME, cli.config.as_deref())
        .context("Failed to load config file")?;
    init_tracing(&toml_config.logging.level)?;

    info!("Starting pxm-meta {}", VERSION);
    info!("Built {}", env!("BUILD_TIMESTAMP"));

    let root_folder = RootFolderResolver::new(MODULE_NAME)
        .with_toml(&toml_config)
        .resolve_with(cli.root_folder.as_deref());
    let db_path = resolve_database_path(cli.database.as_deref(), &toml_config, &root_folder);
    info!("Database: {}", db_path.display());

    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let events = EventBus::new(100);
    let registry = TaskRegistry::new();
    let worker = MetaWorker::new(pool, events, &registry, None)
        .await
        .context("Failed to initialize metadata worker")?;

    let shutdown = CancellationToken::new();
    spawn_ctrl_c_handler(&worker, shutdown.clone());

    match cli.command {
        Command::Run { json } => {
            let result = worker.start().await;
            if json {
                if let Ok(PipelineOutcome::Completed(report)) = &result {
                    println!("{}", serde_json::to_string_pretty(report)?);
                }
            }
            report_outcome(result)?;
        }
        Command::Watch { interval } => {
            let secs = interval
                .or(toml_config.interval_secs)
                .unwrap_or_else(|| CompiledDefaults::for_current_platform().interval_secs);
            let interval = Duration::from_secs(secs.max(1));
            info!("Running every {}s", interval.as_secs());

            loop {
                if let Err(e) = report_outcome(worker.start().await) {
                    warn!("{:#}", e);
                }

                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
        }
    }

    info!("pxm-meta stopped");
    Ok(())
}

fn init_tracing(configured_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured_level))
        .context("Invalid log level")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
    Ok(())
}

fn spawn_ctrl_c_handler(worker: &MetaWorker, shutdown: CancellationToken) {
    let guard = worker.guard().clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, canceling");
                guard.cancel();
                shutdown.cancel();
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });
}

/// Print the operator message of a finished run
///
/// Failures are returned, not printed, so they are reported exactly once by
/// the caller.
fn report_outcome(result: Result<PipelineOutcome, PipelineError>) -> Result<()> {
    let outcome = result?;
    println!("{}", outcome);
    Ok(())
}
