//! Vantage Run - renders a synthetic heated sphere through a controller.
//!
//! Every rank runs on its own thread and composites over in-process
//! channels; images and tables land in the adaptor's output directory.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vantage_lens::VisRunConfig;
use vantage_run::{HeatedSphere, run_rank};
use vantage_runtime::LocalGroup;

#[derive(Parser, Debug)]
#[command(name = "vantage-run")]
#[command(about = "Render a synthetic heated sphere through a vantage controller")]
struct Cli {
    /// Run document (YAML); built-in defaults when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of in-process ranks
    #[arg(long, default_value = "2")]
    ranks: usize,

    /// Number of simulation steps
    #[arg(long, default_value = "40")]
    steps: u64,

    /// Override the output directory of the run document
    #[arg(long)]
    output: Option<PathBuf>,

    /// Lattice points per axis
    #[arg(long, default_value = "24")]
    resolution: usize,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "vantage_run=info,vantage_lens=info,vantage_runtime=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    if cli.ranks == 0 {
        anyhow::bail!("--ranks must be at least 1");
    }

    let mut config = match &cli.config {
        Some(path) => VisRunConfig::load(path)
            .with_context(|| format!("cannot load run document {}", path.display()))?,
        None => VisRunConfig::default(),
    };
    if let Some(output) = cli.output {
        config.adaptor.output_dir = output;
    }
    config.validate()?;

    let sphere = HeatedSphere {
        resolution: cli.resolution,
        ..HeatedSphere::default()
    };
    info!(
        ranks = cli.ranks,
        steps = cli.steps,
        controller = config.controller.name(),
        output = %config.adaptor.output_dir.display(),
        "starting run"
    );

    let results = LocalGroup::run(cli.ranks, |rank| {
        run_rank(&config, &sphere, cli.steps, Arc::new(rank))
    })?;
    for (rank, result) in results.into_iter().enumerate() {
        let summary = result.with_context(|| format!("rank {rank} failed"))?;
        info!(
            rank = summary.rank,
            particles = summary.particles,
            "rank finished"
        );
    }
    Ok(())
}
