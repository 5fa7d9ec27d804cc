//! Essay-breach and report-level classification types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Sample;

/// Threshold tier an essay value has reached.
///
/// Tier names follow the lab convention used across the fleet reports
/// (Spanish): Marginal < Condenatorio < Critico.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BreachTier {
    Marginal,
    Condenatorio,
    Critico,
}

impl std::fmt::Display for BreachTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BreachTier::Marginal => write!(f, "Marginal"),
            BreachTier::Condenatorio => write!(f, "Condenatorio"),
            BreachTier::Critico => write!(f, "Critico"),
        }
    }
}

/// One essay at or above its `normal` bound.
///
/// Essays below `normal` are never reported — there is no "Normal tier"
/// breach record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreachRecord {
    /// Essay name (e.g. "hierro", "viscosidad_100")
    pub essay: String,
    /// Measured value
    pub value: f64,
    /// Tier reached
    pub tier: BreachTier,
    /// The threshold bound that was met or exceeded
    pub limit: f64,
    /// Severity points contributed by this breach
    pub points: u32,
}

/// Report-level status of a single sample.
///
/// Ordering is severity ordering: Normal < Alerta < Anormal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReportStatus {
    Normal,
    Alerta,
    Anormal,
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportStatus::Normal => write!(f, "Normal"),
            ReportStatus::Alerta => write!(f, "Alerta"),
            ReportStatus::Anormal => write!(f, "Anormal"),
        }
    }
}

impl Default for ReportStatus {
    fn default() -> Self {
        ReportStatus::Normal
    }
}

/// A sample plus everything the classification engine derived from it.
///
/// `severity_score` and `status` are pure functions of `breaches` — there is
/// no hidden state. Recommendation fields stay `None` until the dispatcher
/// fills them (and remain `None` for Normal reports).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedSample {
    /// The input record, unchanged
    pub sample: Sample,
    /// Essays at or above their `normal` bound
    pub breaches: Vec<BreachRecord>,
    /// Number of breached essays
    pub breach_count: usize,
    /// Sum of breach points
    pub severity_score: u32,
    /// Report-level status
    pub status: ReportStatus,
    /// Generated maintenance recommendation, when the sample was dispatched
    #[serde(default)]
    pub recommendation: Option<String>,
    /// When the recommendation was generated
    #[serde(default)]
    pub recommendation_at: Option<DateTime<Utc>>,
    /// Error captured if the recommendation task failed for this sample
    #[serde(default)]
    pub recommendation_error: Option<String>,
}

impl ClassifiedSample {
    /// Whether this sample qualifies for recommendation dispatch.
    pub fn needs_recommendation(&self) -> bool {
        self.status != ReportStatus::Normal && !self.breaches.is_empty()
    }
}
