//! beamline-sim - Main Entry Point
//!
//! Loads a project file, builds its pipeline on the dry-run engine and runs
//! it, logging what was recomputed.

use anyhow::Context;
use beamline_sim::{config::BeamlineProject, physics::DryRunEngine};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "beamline-sim")]
#[command(about = "Position a beamline and recompute only what changed")]
struct Cli {
    /// Project file (.toml or .json)
    project: PathBuf,

    /// Rebuild every component on the first run
    #[arg(long)]
    force: bool,

    /// Number of runs
    #[arg(long, default_value_t = 1)]
    runs: u32,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Parse before logging is up so the project's filter can apply
    let project = BeamlineProject::load(&cli.project);
    let fallback = project
        .as_ref()
        .map(|p| p.logging.filter.clone())
        .unwrap_or_else(|_| beamline_sim::config::DEFAULT_LOG_FILTER.to_string());

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let project = project.with_context(|| format!("loading {:?}", cli.project))?;
    tracing::info!("Starting beamline-sim for '{}'", project.name);

    let mut pipeline = project
        .build_pipeline(DryRunEngine::new())
        .context("building pipeline")?;

    for run in 0..cli.runs {
        let force = cli.force && run == 0;
        let changed = pipeline
            .run(force)
            .with_context(|| format!("run {} of {}", run + 1, cli.runs))?;

        for name in pipeline.changed_in_last_run() {
            if let Ok(Some(trace)) = pipeline.artifact(name) {
                tracing::info!(
                    "  {} ({}): {:?} via {}",
                    name,
                    trace.operation,
                    trace.pose.to_array(),
                    trace.lineage.join(" -> ")
                );
            }
        }
        tracing::debug!("Run {} changed: {}", run + 1, changed);
    }

    let totals = pipeline.totals();
    tracing::info!(
        "Done: {} run(s), {} activations, {} recomputes, {} physics calls in {:?}",
        pipeline.run_count(),
        totals.activated,
        totals.recomputed,
        totals.physics_calls,
        totals.duration
    );

    Ok(())
}
