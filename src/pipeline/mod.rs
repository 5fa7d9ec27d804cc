//! Pipeline Orchestrator — per-client processing sequence
//!
//! ```text
//! STEP 1: Load harmonized samples (JSONL) + resolve essay schema
//! STEP 2: Resolve thresholds (recompute + merge into store, or load)
//! STEP 3: Classify every sample (essay + report tier)
//! STEP 4: Recommendation fan-out (non-Normal samples only)
//! STEP 5: Aggregate machine statuses
//! STEP 6: Export classified reports, machine statuses, summaries
//! ```
//!
//! Clients run sequentially and independently: a failure anywhere in one
//! client's run is captured in that client's outcome and the next client
//! starts untouched. Threshold recomputation sees only the running
//! client's samples — populations never mix across clients.

use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::aggregate;
use crate::classify;
use crate::config::PipelineConfig;
use crate::data::{self, EssaySchema, ExportError, LoadError};
use crate::limits::{self, StoreError, ThresholdStore};
use crate::recommend::{self, Recommender};
use crate::types::ReportStatus;

/// Errors that end one client's run. Never escapes past the client
/// boundary — [`Orchestrator::run`] converts them into [`ClientOutcome`]s.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No clients configured")]
    NoClients,

    #[error("No samples for client {0} in {1}")]
    EmptyInput(String, String),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Per-run options resolved from the CLI.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Recompute this run's thresholds instead of loading the stored ones
    pub recalculate_limits: bool,
    /// Skip recommendation generation entirely
    pub skip_recommendations: bool,
}

/// Success summary for one client.
#[derive(Debug, Clone)]
pub struct ClientSummary {
    pub client: String,
    pub samples: usize,
    pub thresholds: usize,
    pub machines: usize,
    /// Report-status distribution, e.g. {Normal: 120, Alerta: 7, Anormal: 2}
    pub status_counts: BTreeMap<ReportStatus, usize>,
    pub recommendations_generated: usize,
    pub recommendation_failures: usize,
}

/// Terminal outcome of one client's run.
#[derive(Debug)]
pub enum ClientOutcome {
    Success(ClientSummary),
    Failure { client: String, error: String },
}

/// Sequences the per-client pipeline. Configuration and the recommendation
/// collaborator are injected at construction; the orchestrator owns no
/// other state.
pub struct Orchestrator {
    config: PipelineConfig,
    recommender: Option<Arc<dyn Recommender>>,
}

impl Orchestrator {
    pub fn new(config: PipelineConfig, recommender: Option<Arc<dyn Recommender>>) -> Self {
        Self {
            config,
            recommender,
        }
    }

    /// Run the pipeline for every configured client.
    ///
    /// Returns one outcome per client; the only error is an empty client
    /// list.
    pub async fn run(&self, options: &RunOptions) -> Result<Vec<ClientOutcome>, PipelineError> {
        let clients = &self.config.clients.names;
        if clients.is_empty() {
            return Err(PipelineError::NoClients);
        }

        let mut outcomes = Vec::with_capacity(clients.len());
        for client in clients {
            info!(client = %client, "===== Starting pipeline =====");
            match self.run_client(client, options).await {
                Ok(summary) => {
                    info!(
                        client = %client,
                        samples = summary.samples,
                        machines = summary.machines,
                        "Pipeline complete"
                    );
                    outcomes.push(ClientOutcome::Success(summary));
                }
                Err(e) => {
                    error!(client = %client, error = %e, "Pipeline failed");
                    outcomes.push(ClientOutcome::Failure {
                        client: client.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
        Ok(outcomes)
    }

    /// Run the six-step sequence for one client.
    async fn run_client(
        &self,
        client: &str,
        options: &RunOptions,
    ) -> Result<ClientSummary, PipelineError> {
        let client_upper = client.to_uppercase();
        let paths = &self.config.paths;

        // STEP 1: Load samples and resolve the essay schema.
        let input_path = paths.input_path(&client_upper);
        let all_samples = data::load_samples(&input_path)?;

        // Isolation: everything downstream sees this client's samples only,
        // even if the input file carries stray rows from another client.
        let samples: Vec<_> = all_samples
            .into_iter()
            .filter(|s| s.client.eq_ignore_ascii_case(&client_upper))
            .collect();

        if samples.is_empty() {
            return Err(PipelineError::EmptyInput(
                client_upper,
                input_path.display().to_string(),
            ));
        }

        let schema = EssaySchema::discover(&samples);
        info!(
            client = %client_upper,
            samples = samples.len(),
            essays = schema.len(),
            "STEP 1: samples loaded"
        );

        // STEP 2: Resolve thresholds.
        let store_path = paths.threshold_store_path();
        let client_limits = if options.recalculate_limits {
            info!(client = %client_upper, "STEP 2: recomputing Stewart limits");
            let computed =
                limits::compute_client_limits(&samples, &schema.essays, &self.config.limits);

            let mut store = ThresholdStore::load_or_default(&store_path);
            store.replace_client(&client_upper, computed.clone());
            store.save_to_file(&store_path)?;
            computed
        } else {
            info!(client = %client_upper, path = %store_path.display(), "STEP 2: loading Stewart limits");
            let store = ThresholdStore::load_or_default(&store_path);
            let loaded = store.client_limits(&client_upper);
            if loaded.is_empty() {
                warn!(client = %client_upper, "No stored limits for client; all samples will classify Normal");
            }
            loaded
        };

        // STEP 3: Classify every sample.
        let classified: Vec<_> = samples
            .iter()
            .map(|s| {
                classify::classify_sample(s, &client_limits, &schema.essays, &self.config.classification)
            })
            .collect();
        info!(
            client = %client_upper,
            reports = classified.len(),
            "STEP 3: classification complete"
        );

        // STEP 4: Recommendation fan-out.
        let classified = match (&self.recommender, options.skip_recommendations) {
            (Some(recommender), false) => {
                info!(client = %client_upper, "STEP 4: generating recommendations");
                recommend::generate_all(
                    classified,
                    recommender.clone(),
                    self.config.recommend.max_workers,
                )
                .await
            }
            _ => {
                info!(client = %client_upper, "STEP 4: recommendation generation skipped");
                classified
            }
        };

        let recommendations_generated = classified
            .iter()
            .filter(|c| c.recommendation.is_some())
            .count();
        let recommendation_failures = classified
            .iter()
            .filter(|c| c.recommendation_error.is_some())
            .count();

        // STEP 5: Aggregate machine statuses.
        let machines = aggregate::machine_statuses(&classified, &self.config.classification);
        let summaries = aggregate::component_summaries(&classified);
        let priority = aggregate::priority_table(&machines, 10);
        info!(client = %client_upper, machines = machines.len(), "STEP 5: aggregation complete");

        // STEP 6: Export.
        let export_dir = paths.export_dir(&client_upper);
        data::export_classified(&export_dir.join("classified.jsonl"), &classified)?;
        data::export_machine_status(&export_dir.join("machine_status.json"), &machines)?;
        data::export_component_summary(&export_dir.join("component_summary.json"), &summaries)?;
        data::export_priority_table(&export_dir.join("priority_table.json"), &priority)?;
        info!(client = %client_upper, dir = %export_dir.display(), "STEP 6: exports written");

        let mut status_counts = BTreeMap::new();
        for report in &classified {
            *status_counts.entry(report.status).or_insert(0) += 1;
        }

        Ok(ClientSummary {
            client: client_upper,
            samples: classified.len(),
            thresholds: client_limits.len(),
            machines: machines.len(),
            status_counts,
            recommendations_generated,
            recommendation_failures,
        })
    }
}
