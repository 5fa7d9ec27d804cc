//! Three-tier classification engine
//!
//! ```text
//! Essay tier   : measured value vs ThresholdSet -> BreachRecord (or nothing)
//! Report tier  : severity score -> Normal | Alerta | Anormal
//! Machine tier : latest component statuses -> MachineStatus
//! ```
//!
//! Every function here is pure: output depends only on the arguments.
//! Missing thresholds and missing values are data, not errors — a sample
//! with no computable limits classifies as Normal with zero breaches.

use std::collections::HashMap;
use tracing::debug;

use crate::config::ClassificationConfig;
use crate::limits::{ClientLimits, ThresholdKey, ThresholdSet};
use crate::types::{
    BreachRecord, BreachTier, ClassifiedSample, ComponentSnapshot, MachineStatus, ReportStatus,
    Sample,
};

/// Severity points for a breach tier.
pub fn tier_points(tier: BreachTier, config: &ClassificationConfig) -> u32 {
    match tier {
        BreachTier::Marginal => config.essay_points_marginal,
        BreachTier::Condenatorio => config.essay_points_condenatorio,
        BreachTier::Critico => config.essay_points_critico,
    }
}

/// Machine-tier points contributed by a component in a given status.
fn component_points(status: ReportStatus, config: &ClassificationConfig) -> u32 {
    match status {
        ReportStatus::Normal => 0,
        ReportStatus::Alerta => config.component_points_alerta,
        ReportStatus::Anormal => config.component_points_anormal,
    }
}

// ============================================================================
// Essay tier
// ============================================================================

/// Which tier, if any, a measured value reaches.
///
/// Bounds are inclusive at the lower edge of each tier: a value exactly at
/// `alert` is Condenatorio, not Marginal. Values below `normal` produce no
/// breach at all.
pub fn classify_essay(value: f64, thresholds: &ThresholdSet) -> Option<(BreachTier, f64)> {
    if !value.is_finite() {
        return None;
    }
    if value >= thresholds.critic {
        Some((BreachTier::Critico, thresholds.critic))
    } else if value >= thresholds.alert {
        Some((BreachTier::Condenatorio, thresholds.alert))
    } else if value >= thresholds.normal {
        Some((BreachTier::Marginal, thresholds.normal))
    } else {
        None
    }
}

// ============================================================================
// Report tier
// ============================================================================

/// Report status from a sample's total severity score.
///
/// Monotonic in the score: raising it never lowers the status.
pub fn classify_report(severity_score: u32, config: &ClassificationConfig) -> ReportStatus {
    if severity_score < config.report_normal_cutoff {
        ReportStatus::Normal
    } else if severity_score >= config.report_anormal_cutoff {
        ReportStatus::Anormal
    } else {
        ReportStatus::Alerta
    }
}

/// Classify one sample against a client's limits: breach list, severity
/// score, and report status.
///
/// Essays without a threshold entry for this sample's (machine, component)
/// are skipped silently, as are essays the lab did not run.
pub fn classify_sample(
    sample: &Sample,
    limits: &ClientLimits,
    essays: &[String],
    config: &ClassificationConfig,
) -> ClassifiedSample {
    let mut breaches = Vec::new();

    for essay in essays {
        let Some(value) = sample.essay_value(essay) else {
            continue;
        };
        let key = ThresholdKey::from_raw(&sample.machine_name, &sample.component_name, essay);
        let Some(thresholds) = limits.get(&key) else {
            continue;
        };
        if let Some((tier, limit)) = classify_essay(value, thresholds) {
            breaches.push(BreachRecord {
                essay: essay.clone(),
                value,
                tier,
                limit,
                points: tier_points(tier, config),
            });
        }
    }

    let severity_score: u32 = breaches.iter().map(|b| b.points).sum();
    let status = classify_report(severity_score, config);

    debug!(
        sample = %sample.sample_number,
        breaches = breaches.len(),
        severity = severity_score,
        status = %status,
        "Sample classified"
    );

    ClassifiedSample {
        sample: sample.clone(),
        breach_count: breaches.len(),
        severity_score,
        status,
        breaches,
        recommendation: None,
        recommendation_at: None,
        recommendation_error: None,
    }
}

// ============================================================================
// Machine tier
// ============================================================================

/// Latest classified sample per component for one unit.
///
/// Greatest sample date wins; equal dates fall back to the greatest sample
/// number, so the selection is deterministic regardless of input order.
pub fn latest_per_component<'a>(
    reports: &'a [ClassifiedSample],
    unit_id: &str,
) -> Vec<&'a ClassifiedSample> {
    let mut latest: HashMap<&str, &ClassifiedSample> = HashMap::new();

    for report in reports.iter().filter(|r| r.sample.unit_id == unit_id) {
        let component = report.sample.component_name.as_str();
        match latest.get(component) {
            Some(current) => {
                let newer = (report.sample.sample_date, &report.sample.sample_number)
                    > (current.sample.sample_date, &current.sample.sample_number);
                if newer {
                    latest.insert(component, report);
                }
            }
            None => {
                latest.insert(component, report);
            }
        }
    }

    let mut selected: Vec<&ClassifiedSample> = latest.into_values().collect();
    selected.sort_by(|a, b| a.sample.component_name.cmp(&b.sample.component_name));
    selected
}

/// Aggregate one unit's latest component statuses into a machine status.
///
/// Returns `None` when the unit has no classified samples at all.
pub fn classify_machine(
    reports: &[ClassifiedSample],
    unit_id: &str,
    config: &ClassificationConfig,
) -> Option<MachineStatus> {
    let latest = latest_per_component(reports, unit_id);
    if latest.is_empty() {
        return None;
    }

    let machine_score: u32 = latest
        .iter()
        .map(|r| component_points(r.status, config))
        .sum();

    let (overall_status, priority) = if machine_score < config.machine_normal_cutoff {
        (ReportStatus::Normal, 1)
    } else if machine_score >= config.machine_anormal_cutoff {
        (ReportStatus::Anormal, 10)
    } else {
        (ReportStatus::Alerta, 5)
    };

    let count = |status: ReportStatus| latest.iter().filter(|r| r.status == status).count();

    let latest_sample_date = latest
        .iter()
        .map(|r| r.sample.sample_date)
        .max()
        .unwrap_or_default();

    let components = latest
        .iter()
        .map(|r| ComponentSnapshot {
            component: r.sample.component_name.clone(),
            status: r.status,
            severity_score: r.severity_score,
            sample_date: r.sample.sample_date,
            sample_number: r.sample.sample_number.clone(),
        })
        .collect();

    Some(MachineStatus {
        unit_id: unit_id.to_string(),
        client: latest[0].sample.client.clone(),
        latest_sample_date,
        overall_status,
        machine_score,
        total_components: latest.len(),
        components_normal: count(ReportStatus::Normal),
        components_alerta: count(ReportStatus::Alerta),
        components_anormal: count(ReportStatus::Anormal),
        priority,
        components,
    })
}
