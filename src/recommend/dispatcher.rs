//! Bounded-concurrency recommendation fan-out
//!
//! One task per eligible sample, a semaphore bounding in-flight requests,
//! and a single merge by sample id after every task has finished. Tasks
//! share nothing mutable: each owns its request data and returns its
//! outcome. A failed task marks its own sample and nothing else.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use super::client::{RecommendError, RecommendationRequest, Recommender};
use crate::types::ClassifiedSample;

type TaskOutcome = Result<(String, chrono::DateTime<Utc>), RecommendError>;

/// Generate recommendations for every eligible sample in the batch.
///
/// Eligible: status ≠ Normal AND at least one breach. Everything else
/// passes through untouched. Returns only after every dispatched task has
/// either produced text or failed — no partial batches.
pub async fn generate_all(
    mut classified: Vec<ClassifiedSample>,
    recommender: Arc<dyn Recommender>,
    max_workers: usize,
) -> Vec<ClassifiedSample> {
    let eligible: Vec<RecommendationRequest> = classified
        .iter()
        .filter(|c| c.needs_recommendation())
        .map(|c| RecommendationRequest {
            sample_number: c.sample.sample_number.clone(),
            component: c.sample.component_name.clone(),
            machine: c.sample.machine_name.clone(),
            machine_model: c.sample.machine_model.clone(),
            breaches: c.breaches.clone(),
        })
        .collect();

    if eligible.is_empty() {
        info!("No samples need recommendations");
        return classified;
    }

    info!(
        tasks = eligible.len(),
        workers = max_workers.max(1),
        "Dispatching recommendation generation"
    );

    let semaphore = Arc::new(Semaphore::new(max_workers.max(1)));
    let mut handles = Vec::with_capacity(eligible.len());

    for request in eligible {
        let sem = semaphore.clone();
        let recommender = recommender.clone();
        handles.push(tokio::spawn(async move {
            let _permit = sem.acquire().await;
            let outcome = recommender
                .generate(&request)
                .await
                .map(|text| (text, Utc::now()));
            (request.sample_number, outcome)
        }));
    }

    // Full fan-in: every task either produced a result or failed before the
    // batch is merged.
    let mut outcomes: HashMap<String, TaskOutcome> = HashMap::new();
    for handle in handles {
        match handle.await {
            Ok((sample_number, outcome)) => {
                outcomes.insert(sample_number, outcome);
            }
            Err(e) => {
                // A panicked/cancelled task has no sample id to attach the
                // failure to; its sample keeps empty recommendation fields.
                warn!(error = %e, "Recommendation task aborted");
            }
        }
    }

    let mut generated = 0usize;
    let mut failed = 0usize;

    for sample in &mut classified {
        match outcomes.remove(&sample.sample.sample_number) {
            Some(Ok((text, generated_at))) => {
                sample.recommendation = Some(text);
                sample.recommendation_at = Some(generated_at);
                generated += 1;
            }
            Some(Err(e)) => {
                warn!(
                    sample = %sample.sample.sample_number,
                    error = %e,
                    "Recommendation failed"
                );
                sample.recommendation_error = Some(e.to_string());
                failed += 1;
            }
            // Not dispatched (Normal / no breaches) or task aborted.
            None => {}
        }
    }

    info!(generated, failed, "Recommendation fan-out complete");
    classified
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BreachRecord, BreachTier, ReportStatus, Sample};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fake collaborator: counts calls, fails on request, tracks the peak
    /// number of concurrent in-flight requests.
    struct FakeRecommender {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak_in_flight: AtomicUsize,
        fail_for: Option<String>,
    }

    impl FakeRecommender {
        fn new(fail_for: Option<&str>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                peak_in_flight: AtomicUsize::new(0),
                fail_for: fail_for.map(String::from),
            }
        }
    }

    #[async_trait]
    impl Recommender for FakeRecommender {
        async fn generate(
            &self,
            request: &RecommendationRequest,
        ) -> Result<String, RecommendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_for.as_deref() == Some(request.sample_number.as_str()) {
                return Err(RecommendError::MalformedResponse("boom".to_string()));
            }
            Ok(format!("Recomendación para {}", request.sample_number))
        }
    }

    fn classified(n: &str, status: ReportStatus, with_breach: bool) -> ClassifiedSample {
        let breaches = if with_breach {
            vec![BreachRecord {
                essay: "hierro".to_string(),
                value: 45.0,
                tier: BreachTier::Condenatorio,
                limit: 40.0,
                points: 3,
            }]
        } else {
            Vec::new()
        };
        ClassifiedSample {
            sample: Sample {
                sample_number: n.to_string(),
                unit_id: "U-1".to_string(),
                machine_name: "Camion".to_string(),
                machine_model: None,
                component_name: "Motor".to_string(),
                sample_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                client: "CDA".to_string(),
                essays: HashMap::new(),
            },
            breach_count: breaches.len(),
            severity_score: breaches.iter().map(|b| b.points).sum(),
            status,
            breaches,
            recommendation: None,
            recommendation_at: None,
            recommendation_error: None,
        }
    }

    #[tokio::test]
    async fn test_only_non_normal_with_breaches_dispatched() {
        let recommender = Arc::new(FakeRecommender::new(None));
        let batch = vec![
            classified("S-1", ReportStatus::Normal, false),
            classified("S-2", ReportStatus::Alerta, true),
            classified("S-3", ReportStatus::Anormal, true),
            // Non-Normal but zero breaches: passes through untouched.
            classified("S-4", ReportStatus::Alerta, false),
        ];

        let out = generate_all(batch, recommender.clone(), 4).await;

        assert_eq!(recommender.calls.load(Ordering::SeqCst), 2);
        assert!(out[0].recommendation.is_none());
        assert!(out[1].recommendation.is_some());
        assert!(out[1].recommendation_at.is_some());
        assert!(out[2].recommendation.is_some());
        assert!(out[3].recommendation.is_none());
    }

    #[tokio::test]
    async fn test_one_failure_does_not_block_siblings() {
        let recommender = Arc::new(FakeRecommender::new(Some("S-2")));
        let batch = vec![
            classified("S-1", ReportStatus::Alerta, true),
            classified("S-2", ReportStatus::Anormal, true),
            classified("S-3", ReportStatus::Alerta, true),
        ];

        let out = generate_all(batch, recommender, 4).await;

        assert!(out[0].recommendation.is_some());
        assert!(out[1].recommendation.is_none());
        assert!(out[1].recommendation_error.is_some());
        assert!(out[2].recommendation.is_some());
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let recommender = Arc::new(FakeRecommender::new(None));
        let batch: Vec<ClassifiedSample> = (0..12)
            .map(|i| classified(&format!("S-{i}"), ReportStatus::Alerta, true))
            .collect();

        let out = generate_all(batch, recommender.clone(), 3).await;

        assert_eq!(out.iter().filter(|c| c.recommendation.is_some()).count(), 12);
        assert!(recommender.peak_in_flight.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_merge_is_by_sample_id_not_order() {
        let recommender = Arc::new(FakeRecommender::new(None));
        let batch = vec![
            classified("S-9", ReportStatus::Alerta, true),
            classified("S-1", ReportStatus::Normal, false),
            classified("S-5", ReportStatus::Anormal, true),
        ];
        let out = generate_all(batch, recommender, 2).await;
        assert_eq!(
            out[0].recommendation.as_deref(),
            Some("Recomendación para S-9")
        );
        assert!(out[1].recommendation.is_none());
        assert_eq!(
            out[2].recommendation.as_deref(),
            Some("Recomendación para S-5")
        );
    }
}
