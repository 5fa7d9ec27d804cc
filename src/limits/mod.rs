//! Stewart Limits — statistical wear/contamination thresholds
//!
//! For each (machine, component, essay) population within one client's
//! history, three ascending bounds are derived from percentiles of the
//! measured values:
//!
//! - `normal`  → Marginal tier boundary (default 90th percentile)
//! - `alert`   → Condenatorio tier boundary (default 95th)
//! - `critic`  → Critico tier boundary (default 98th)
//!
//! Exact zeros are a sensor floor ("not measured") and are dropped before
//! any statistics. Populations with too few distinct non-zero values carry
//! no threshold at all — an absent key, not a null entry.
//!
//! The calculator never filters by client: callers hand it a single
//! client's population. That isolation contract is what keeps one client's
//! fleet from shifting another's limits.

mod store;

pub use store::{StoreError, ThresholdStore, STORE_SCHEMA_VERSION};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info};

use crate::config::LimitsConfig;
use crate::normalize::{canonical_component, canonical_machine};
use crate::types::Sample;

// ============================================================================
// Threshold Key & Set
// ============================================================================

/// Composite key for one threshold population: normalized machine and
/// component names plus the essay name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ThresholdKey {
    pub machine: String,
    pub component: String,
    pub essay: String,
}

impl ThresholdKey {
    /// Build a key from raw (possibly accented / mixed-case) names.
    pub fn from_raw(machine: &str, component: &str, essay: &str) -> Self {
        Self {
            machine: canonical_machine(machine),
            component: canonical_component(component),
            essay: essay.to_string(),
        }
    }
}

impl std::fmt::Display for ThresholdKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.machine, self.component, self.essay)
    }
}

/// Three-tier threshold set with the strict ordering invariant
/// `normal < alert < critic`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSet {
    pub normal: f64,
    pub alert: f64,
    pub critic: f64,
}

impl ThresholdSet {
    /// Build a set from three raw percentile values, repairing ties by
    /// pushing each violating bound to the smallest integer above its
    /// predecessor.
    pub fn from_percentiles(normal: f64, alert: f64, critic: f64) -> Self {
        let mut alert = alert;
        let mut critic = critic;
        if alert <= normal {
            alert = normal + 1.0;
        }
        if critic <= alert {
            critic = alert + 1.0;
        }
        Self {
            normal,
            alert,
            critic,
        }
    }

    /// Whether the strict ordering invariant holds.
    pub fn is_strictly_ordered(&self) -> bool {
        self.normal < self.alert && self.alert < self.critic
    }
}

/// One client's computed limits, keyed by (machine, component, essay).
pub type ClientLimits = HashMap<ThresholdKey, ThresholdSet>;

// ============================================================================
// Percentile
// ============================================================================

/// Nearest-rank percentile over an ascending-sorted slice:
/// `sorted[round(p/100 * (n-1))]`.
///
/// This is the rank definition the fleet's calibration data was validated
/// against (90th of [10x7, 12, 15, 20] is 15, 95th is 20).
fn nearest_rank(sorted: &[f64], percentile: u8) -> f64 {
    debug_assert!(!sorted.is_empty());
    let pos = f64::from(percentile) / 100.0 * (sorted.len() - 1) as f64;
    let idx = (pos.round() as usize).min(sorted.len() - 1);
    sorted[idx]
}

/// Stewart limits for a single essay population.
///
/// Returns `None` when fewer than `min_population` non-zero values remain —
/// too thin a statistical basis for any bound.
pub fn stewart_limits(
    values: &[f64],
    percentiles: (u8, u8, u8),
    min_population: usize,
) -> Option<ThresholdSet> {
    let mut retained: Vec<f64> = values
        .iter()
        .copied()
        .filter(|v| v.is_finite() && *v != 0.0)
        .collect();

    if retained.len() < min_population {
        return None;
    }

    retained.sort_by(|a, b| a.total_cmp(b));

    let normal = nearest_rank(&retained, percentiles.0).ceil();
    let alert = nearest_rank(&retained, percentiles.1).ceil();
    let critic = nearest_rank(&retained, percentiles.2).ceil();

    Some(ThresholdSet::from_percentiles(normal, alert, critic))
}

// ============================================================================
// Per-client calculator
// ============================================================================

/// Compute Stewart limits for every (machine, component, essay) population
/// in one client's samples.
///
/// The input MUST already be restricted to a single client; this function
/// performs no client filtering itself. Deterministic: identical population
/// and config always yield identical output.
pub fn compute_client_limits(
    population: &[Sample],
    essays: &[String],
    config: &LimitsConfig,
) -> ClientLimits {
    // Group samples by normalized (machine, component). BTreeMap keeps
    // iteration (and therefore logging) order stable across runs.
    let mut groups: BTreeMap<(String, String), Vec<&Sample>> = BTreeMap::new();
    for sample in population {
        let key = (
            canonical_machine(&sample.machine_name),
            canonical_component(&sample.component_name),
        );
        groups.entry(key).or_default().push(sample);
    }

    info!(
        groups = groups.len(),
        samples = population.len(),
        "Computing Stewart limits"
    );

    let percentiles = (
        config.percentile_marginal,
        config.percentile_condenatorio,
        config.percentile_critico,
    );

    let mut limits = ClientLimits::new();

    for ((machine, component), group) in &groups {
        for essay in essays {
            let values: Vec<f64> = group
                .iter()
                .filter_map(|s| s.essay_value(essay))
                .filter(|v| v.is_finite())
                .collect();

            // Distinct non-zero values gate: at most `min_unique_values`
            // distinct readings is an insufficient statistical basis.
            let distinct: HashSet<u64> = values
                .iter()
                .filter(|v| **v != 0.0)
                .map(|v| v.to_bits())
                .collect();
            if distinct.len() <= config.min_unique_values {
                debug!(
                    machine = %machine,
                    component = %component,
                    essay = %essay,
                    distinct = distinct.len(),
                    "Skipping essay: not enough distinct values"
                );
                continue;
            }

            if let Some(set) = stewart_limits(&values, percentiles, config.min_population) {
                limits.insert(
                    ThresholdKey {
                        machine: machine.clone(),
                        component: component.clone(),
                        essay: essay.clone(),
                    },
                    set,
                );
            }
        }
    }

    info!(thresholds = limits.len(), "Stewart limits computed");
    limits
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    fn sample(machine: &str, component: &str, essay: &str, value: f64, n: u32) -> Sample {
        Sample {
            sample_number: format!("S-{n}"),
            unit_id: "U-1".to_string(),
            machine_name: machine.to_string(),
            machine_model: None,
            component_name: component.to_string(),
            sample_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            client: "CDA".to_string(),
            essays: HashMap::from([(essay.to_string(), value)]),
        }
    }

    #[test]
    fn test_nearest_rank_worked_example() {
        let sorted = [10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 12.0, 15.0, 20.0];
        assert_eq!(nearest_rank(&sorted, 90), 15.0);
        assert_eq!(nearest_rank(&sorted, 95), 20.0);
        assert_eq!(nearest_rank(&sorted, 98), 20.0);
    }

    #[test]
    fn test_stewart_limits_tie_push() {
        // 98th percentile ties the 95th at 20 -> critic pushed to 21.
        let values = [10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 12.0, 15.0, 20.0];
        let set = stewart_limits(&values, (90, 95, 98), 3).unwrap();
        assert_eq!(set.normal, 15.0);
        assert_eq!(set.alert, 20.0);
        assert!(set.critic >= 21.0);
        assert!(set.is_strictly_ordered());
    }

    #[test]
    fn test_stewart_limits_drops_zeros() {
        // Zeros are sensor floor: with them removed only 2 values remain.
        let values = [0.0, 0.0, 0.0, 5.0, 7.0];
        assert!(stewart_limits(&values, (90, 95, 98), 3).is_none());
    }

    #[test]
    fn test_stewart_limits_strict_ordering_always_holds() {
        // A constant-ish population collapses all percentiles to one value.
        let values = [4.0, 4.0, 4.0, 4.0, 4.0, 4.0, 5.0];
        let set = stewart_limits(&values, (90, 95, 98), 3).unwrap();
        assert!(set.is_strictly_ordered());
        assert_eq!(set.alert, set.normal + 1.0);
        assert_eq!(set.critic, set.alert + 1.0);
    }

    #[test]
    fn test_compute_skips_low_cardinality_essays() {
        let config = LimitsConfig::default();
        // Only 3 distinct non-zero values (<= min_unique_values) -> skipped.
        let population: Vec<Sample> = [10.0, 10.0, 12.0, 12.0, 15.0]
            .iter()
            .enumerate()
            .map(|(i, v)| sample("Camion", "Motor", "hierro", *v, i as u32))
            .collect();
        let limits =
            compute_client_limits(&population, &["hierro".to_string()], &config);
        assert!(limits.is_empty());
    }

    #[test]
    fn test_compute_pools_accent_variants() {
        let config = LimitsConfig::default();
        let mut population = Vec::new();
        for (i, v) in [10.0, 11.0, 12.0, 13.0, 14.0, 15.0].iter().enumerate() {
            let machine = if i % 2 == 0 { "CAMIÓN" } else { "camion" };
            population.push(sample(machine, "Motor", "hierro", *v, i as u32));
        }
        let limits =
            compute_client_limits(&population, &["hierro".to_string()], &config);
        // One pooled population, not two per-spelling ones.
        assert_eq!(limits.len(), 1);
        let key = limits.keys().next().unwrap();
        assert_eq!(key.machine, "camion");
    }

    #[test]
    fn test_compute_is_deterministic() {
        let config = LimitsConfig::default();
        let population: Vec<Sample> = (0..20)
            .map(|i| sample("Pala", "Hidraulico", "cobre", 5.0 + i as f64, i))
            .collect();
        let essays = vec!["cobre".to_string()];
        let a = compute_client_limits(&population, &essays, &config);
        let b = compute_client_limits(&population, &essays, &config);
        assert_eq!(a.len(), b.len());
        for (key, set) in &a {
            assert_eq!(b.get(key), Some(set));
        }
    }

    #[test]
    fn test_missing_essays_do_not_contribute() {
        let config = LimitsConfig::default();
        let mut population: Vec<Sample> = (0..6)
            .map(|i| sample("Camion", "Motor", "hierro", 10.0 + i as f64, i))
            .collect();
        // A sample without the essay at all must not affect the population.
        population.push(Sample {
            essays: HashMap::new(),
            ..sample("Camion", "Motor", "hierro", 0.0, 99)
        });
        let limits =
            compute_client_limits(&population, &["hierro".to_string()], &config);
        assert_eq!(limits.len(), 1);
    }
}
