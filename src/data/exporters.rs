//! Run exports
//!
//! Classified reports go out as JSON Lines (row-per-sample, same shape the
//! dashboard collaborator consumes); machine statuses, component summaries,
//! and the priority table as pretty JSON documents.

use std::io::Write;
use std::path::Path;
use thiserror::Error;
use tracing::info;

use serde::Serialize;

use crate::types::{ClassifiedSample, ComponentSummary, MachineStatus};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn ensure_parent(path: &Path) -> Result<(), ExportError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Write classified reports as JSON Lines.
pub fn export_classified(
    path: &Path,
    reports: &[ClassifiedSample],
) -> Result<(), ExportError> {
    ensure_parent(path)?;
    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
    for report in reports {
        serde_json::to_writer(&mut file, report)?;
        file.write_all(b"\n")?;
    }
    file.flush()?;
    info!(path = %path.display(), reports = reports.len(), "Classified reports exported");
    Ok(())
}

fn export_pretty<T: Serialize>(path: &Path, value: &T, what: &str) -> Result<(), ExportError> {
    ensure_parent(path)?;
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    info!(path = %path.display(), "{} exported", what);
    Ok(())
}

/// Write machine statuses as one pretty JSON document.
pub fn export_machine_status(
    path: &Path,
    machines: &[MachineStatus],
) -> Result<(), ExportError> {
    export_pretty(path, &machines, "Machine statuses")
}

/// Write component summaries as one pretty JSON document.
pub fn export_component_summary(
    path: &Path,
    summaries: &[ComponentSummary],
) -> Result<(), ExportError> {
    export_pretty(path, &summaries, "Component summaries")
}

/// Write the priority table as one pretty JSON document.
pub fn export_priority_table(
    path: &Path,
    machines: &[MachineStatus],
) -> Result<(), ExportError> {
    export_pretty(path, &machines, "Priority table")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ReportStatus, Sample};
    use chrono::NaiveDate;
    use std::collections::HashMap;

    fn report(n: &str) -> ClassifiedSample {
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
            breaches: Vec::new(),
            breach_count: 0,
            severity_score: 0,
            status: ReportStatus::Normal,
            recommendation: None,
            recommendation_at: None,
            recommendation_error: None,
        }
    }

    #[test]
    fn test_classified_roundtrip_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("golden").join("classified.jsonl");
        export_classified(&path, &[report("S-1"), report("S-2")]).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: ClassifiedSample = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.sample.sample_number, "S-1");
    }

    #[test]
    fn test_export_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("machines.json");
        export_machine_status(&path, &[]).unwrap();
        assert!(path.exists());
    }
}
