//! Machine-level aggregation types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ReportStatus;

/// Snapshot of one component's latest classified sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentSnapshot {
    pub component: String,
    pub status: ReportStatus,
    pub severity_score: u32,
    pub sample_date: NaiveDate,
    pub sample_number: String,
}

/// Health status of one machine, derived from the latest sample of each of
/// its components. Recomputed fully on every run — never mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineStatus {
    pub unit_id: String,
    pub client: String,
    /// Most recent sample date across all components
    pub latest_sample_date: NaiveDate,
    pub overall_status: ReportStatus,
    /// Sum of component status points (Normal=0, Alerta=2, Anormal=5)
    pub machine_score: u32,
    pub total_components: usize,
    pub components_normal: usize,
    pub components_alerta: usize,
    pub components_anormal: usize,
    /// Fixed rank per status tier (Normal=1, Alerta=5, Anormal=10).
    /// Not a function of `machine_score`.
    pub priority: u8,
    pub components: Vec<ComponentSnapshot>,
}

/// Per (client, unit, component) rollup across the whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentSummary {
    pub client: String,
    pub unit_id: String,
    pub component: String,
    pub total_samples: usize,
    pub first_sample_date: NaiveDate,
    pub latest_sample_date: NaiveDate,
    pub max_severity_score: u32,
    pub avg_severity_score: f64,
    pub max_essays_broken: usize,
}
