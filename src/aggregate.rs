//! Run-level aggregations over classified reports
//!
//! Machine statuses (one per unit), component summaries, and the priority
//! table the maintenance planners work from.

use std::collections::BTreeMap;
use tracing::info;

use crate::classify;
use crate::config::ClassificationConfig;
use crate::types::{ClassifiedSample, ComponentSummary, MachineStatus, ReportStatus};

/// Machine status for every unit present in the classified reports.
///
/// Units are processed in sorted order so output ordering is stable.
pub fn machine_statuses(
    reports: &[ClassifiedSample],
    config: &ClassificationConfig,
) -> Vec<MachineStatus> {
    let units: BTreeMap<&str, ()> = reports
        .iter()
        .map(|r| (r.sample.unit_id.as_str(), ()))
        .collect();

    let statuses: Vec<MachineStatus> = units
        .keys()
        .filter_map(|unit| classify::classify_machine(reports, unit, config))
        .collect();

    info!(machines = statuses.len(), "Machine statuses aggregated");
    statuses
}

/// Per (client, unit, component) rollup of the run.
pub fn component_summaries(reports: &[ClassifiedSample]) -> Vec<ComponentSummary> {
    let mut groups: BTreeMap<(String, String, String), Vec<&ClassifiedSample>> = BTreeMap::new();
    for report in reports {
        let key = (
            report.sample.client.clone(),
            report.sample.unit_id.clone(),
            report.sample.component_name.clone(),
        );
        groups.entry(key).or_default().push(report);
    }

    groups
        .into_iter()
        .map(|((client, unit_id, component), group)| {
            let severity_sum: u32 = group.iter().map(|r| r.severity_score).sum();
            ComponentSummary {
                client,
                unit_id,
                component,
                total_samples: group.len(),
                first_sample_date: group
                    .iter()
                    .map(|r| r.sample.sample_date)
                    .min()
                    .unwrap_or_default(),
                latest_sample_date: group
                    .iter()
                    .map(|r| r.sample.sample_date)
                    .max()
                    .unwrap_or_default(),
                max_severity_score: group.iter().map(|r| r.severity_score).max().unwrap_or(0),
                avg_severity_score: severity_sum as f64 / group.len() as f64,
                max_essays_broken: group.iter().map(|r| r.breach_count).max().unwrap_or(0),
            }
        })
        .collect()
}

/// Machines needing attention, worst first: non-Normal only, sorted by
/// priority rank then latest sample date (both descending), capped at
/// `top_n`.
pub fn priority_table(machines: &[MachineStatus], top_n: usize) -> Vec<MachineStatus> {
    let mut flagged: Vec<MachineStatus> = machines
        .iter()
        .filter(|m| m.overall_status != ReportStatus::Normal)
        .cloned()
        .collect();

    flagged.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then(b.latest_sample_date.cmp(&a.latest_sample_date))
    });
    flagged.truncate(top_n);
    flagged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Sample;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    fn report(unit: &str, component: &str, day: u32, status: ReportStatus) -> ClassifiedSample {
        ClassifiedSample {
            sample: Sample {
                sample_number: format!("S-{unit}-{component}-{day}"),
                unit_id: unit.to_string(),
                machine_name: "Camion".to_string(),
                machine_model: None,
                component_name: component.to_string(),
                sample_date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
                client: "CDA".to_string(),
                essays: HashMap::new(),
            },
            breaches: Vec::new(),
            breach_count: 0,
            severity_score: match status {
                ReportStatus::Normal => 0,
                ReportStatus::Alerta => 4,
                ReportStatus::Anormal => 9,
            },
            status,
            recommendation: None,
            recommendation_at: None,
            recommendation_error: None,
        }
    }

    #[test]
    fn test_one_status_per_unit() {
        let config = ClassificationConfig::default();
        let reports = vec![
            report("U-1", "motor", 1, ReportStatus::Normal),
            report("U-1", "hidraulico", 2, ReportStatus::Normal),
            report("U-2", "motor", 3, ReportStatus::Anormal),
        ];
        let statuses = machine_statuses(&reports, &config);
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].unit_id, "U-1");
        assert_eq!(statuses[1].unit_id, "U-2");
    }

    #[test]
    fn test_priority_table_orders_worst_first() {
        let config = ClassificationConfig::default();
        let reports = vec![
            // U-1: one Anormal + one Alerta component -> score 7 -> Alerta
            report("U-1", "motor", 5, ReportStatus::Anormal),
            report("U-1", "hidraulico", 5, ReportStatus::Alerta),
            // U-2: two Anormal components -> score 10 -> Anormal
            report("U-2", "motor", 1, ReportStatus::Anormal),
            report("U-2", "hidraulico", 1, ReportStatus::Anormal),
            // U-3: all Normal -> excluded
            report("U-3", "motor", 9, ReportStatus::Normal),
        ];
        let statuses = machine_statuses(&reports, &config);
        let table = priority_table(&statuses, 10);
        assert_eq!(table.len(), 2);
        assert_eq!(table[0].unit_id, "U-2");
        assert_eq!(table[1].unit_id, "U-1");
    }

    #[test]
    fn test_priority_table_caps_at_top_n() {
        let config = ClassificationConfig::default();
        let mut reports = Vec::new();
        for i in 0..5u32 {
            let unit = format!("U-{i}");
            reports.push(report(&unit, "motor", 1 + i, ReportStatus::Anormal));
            reports.push(report(&unit, "hidraulico", 1 + i, ReportStatus::Anormal));
        }
        let statuses = machine_statuses(&reports, &config);
        let table = priority_table(&statuses, 3);
        assert_eq!(table.len(), 3);
        // Most recent sample dates first within equal priority.
        assert_eq!(table[0].unit_id, "U-4");
    }

    #[test]
    fn test_component_summary_rollup() {
        let reports = vec![
            report("U-1", "motor", 1, ReportStatus::Normal),
            report("U-1", "motor", 15, ReportStatus::Anormal),
        ];
        let summaries = component_summaries(&reports);
        assert_eq!(summaries.len(), 1);
        let s = &summaries[0];
        assert_eq!(s.total_samples, 2);
        assert_eq!(s.first_sample_date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(s.latest_sample_date, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert_eq!(s.max_severity_score, 9);
        assert!((s.avg_severity_score - 4.5).abs() < 1e-9);
    }
}
