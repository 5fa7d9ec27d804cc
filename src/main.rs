//! oilsense - Lubricant-Analysis Operational Intelligence
//!
//! Batch pipeline: harmonized oil samples in, classified reports, machine
//! health statuses, and AI maintenance recommendations out.
//!
//! # Usage
//!
//! ```bash
//! # Classify with stored thresholds, no recommendations
//! oilsense --no-ai
//!
//! # Recompute thresholds for all configured clients and generate
//! # recommendations (needs OPENAI_API_KEY)
//! oilsense --recalculate-limits
//!
//! # One client only, custom worker count
//! oilsense --client CDA --workers 8
//! ```
//!
//! # Environment Variables
//!
//! - `OILSENSE_CONFIG`: Path to a TOML config file (default: ./oilsense.toml)
//! - `OPENAI_API_KEY`: Key for the recommendation service
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};

use oilsense::pipeline::{ClientOutcome, Orchestrator, RunOptions};
use oilsense::recommend::{ChatClient, Recommender};
use oilsense::PipelineConfig;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "oilsense")]
#[command(about = "Lubricant-analysis operational intelligence pipeline")]
#[command(version)]
struct CliArgs {
    /// Path to a TOML config file (overrides OILSENSE_CONFIG)
    #[arg(long)]
    config: Option<String>,

    /// Recompute Stewart limits from this run's samples instead of loading
    /// the stored ones
    #[arg(long)]
    recalculate_limits: bool,

    /// Skip AI recommendation generation
    #[arg(long)]
    no_ai: bool,

    /// Process only these clients (repeatable; default: all configured)
    #[arg(long = "client")]
    clients: Vec<String>,

    /// Override the recommendation worker-pool size
    #[arg(long)]
    workers: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();

    let mut config = match &args.config {
        Some(path) => PipelineConfig::load_from_file(std::path::Path::new(path))
            .with_context(|| format!("loading config from {path}"))?,
        None => PipelineConfig::load(),
    };

    if !args.clients.is_empty() {
        config.clients.names = args.clients.clone();
    }
    if let Some(workers) = args.workers {
        config.recommend.max_workers = workers;
    }
    config.validate().context("invalid configuration")?;

    // The recommendation collaborator is optional: without a key the
    // pipeline still classifies and aggregates.
    let recommender: Option<Arc<dyn Recommender>> = if args.no_ai {
        None
    } else {
        match ChatClient::from_config(&config.recommend) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                warn!(error = %e, "Recommendation service unavailable, continuing without AI");
                None
            }
        }
    };

    let options = RunOptions {
        recalculate_limits: args.recalculate_limits,
        skip_recommendations: args.no_ai || recommender.is_none(),
    };

    let orchestrator = Orchestrator::new(config, recommender);
    let outcomes = orchestrator
        .run(&options)
        .await
        .context("pipeline invocation")?;

    // Final per-client summary.
    info!("===== Pipeline execution summary =====");
    let mut failures = 0usize;
    for outcome in &outcomes {
        match outcome {
            ClientOutcome::Success(s) => {
                let distribution: Vec<String> = s
                    .status_counts
                    .iter()
                    .map(|(status, count)| format!("{status}={count}"))
                    .collect();
                info!(
                    client = %s.client,
                    samples = s.samples,
                    machines = s.machines,
                    thresholds = s.thresholds,
                    recommendations = s.recommendations_generated,
                    recommendation_failures = s.recommendation_failures,
                    status = %distribution.join(" "),
                    "SUCCESS"
                );
            }
            ClientOutcome::Failure { client, error } => {
                failures += 1;
                warn!(client = %client, error = %error, "FAILED");
            }
        }
    }

    if failures == outcomes.len() {
        anyhow::bail!("all {} client runs failed", failures);
    }
    Ok(())
}
