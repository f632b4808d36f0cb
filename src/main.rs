//! Trains the dungeon explorer and records a demonstration after every
//! iteration.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use delver::config::RunConfig;

#[derive(Parser)]
#[command(name = "delver-train")]
#[command(version, about = "Train an exploring agent on shaped dungeon rewards", long_about = None)]
struct Cli {
    /// JSON run config; missing fields take their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of training iterations
    #[arg(long)]
    iterations: Option<usize>,

    /// Number of rollout workers
    #[arg(long)]
    workers: Option<usize>,

    /// Seed for environments and policy
    #[arg(long)]
    seed: Option<u64>,

    /// Directory for checkpoints (cleared at startup)
    #[arg(long)]
    checkpoint_root: Option<PathBuf>,

    /// Skip the experiment tracker
    #[arg(long)]
    no_tracking: bool,
}

impl Cli {
    fn into_config(self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::load(path)?,
            None => RunConfig::default(),
        };
        if let Some(iterations) = self.iterations {
            config.iterations = iterations;
        }
        if let Some(workers) = self.workers {
            config.trainer.num_workers = workers;
        }
        if self.seed.is_some() {
            config.trainer.seed = self.seed;
        }
        if let Some(root) = self.checkpoint_root {
            config.checkpoint_root = root;
        }
        if self.no_tracking {
            config.tracking = false;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_config()?;
    let summary = delver::train::run(config)
        .await
        .context("training run failed")?;

    match &summary.last_checkpoint {
        Some(path) => tracing::info!(
            iterations = summary.iterations,
            checkpoint = %path.display(),
            "training finished"
        ),
        None => tracing::info!(iterations = summary.iterations, "training finished"),
    }
    Ok(())
}
