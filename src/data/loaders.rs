//! Harmonized-sample loading
//!
//! Input is JSON Lines: one harmonized [`Sample`] per line, produced by the
//! upstream lab-ingestion collaborator. Malformed lines are logged and
//! skipped — one bad record must not sink a run.
//!
//! The essay list is an explicit contract, not column sniffing: sample
//! metadata lives in typed struct fields, essay measurements in the
//! `essays` map, and [`EssaySchema::discover`] turns the observed essay
//! names into the list every later stage receives explicitly.

use std::collections::BTreeSet;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use crate::types::Sample;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// The essay measurements present in a dataset, resolved once at load time
/// and passed explicitly between stages.
#[derive(Debug, Clone, Default)]
pub struct EssaySchema {
    /// Sorted, deduplicated essay names
    pub essays: Vec<String>,
}

impl EssaySchema {
    /// Union of essay names across all samples, sorted for determinism.
    pub fn discover(samples: &[Sample]) -> Self {
        let names: BTreeSet<String> = samples
            .iter()
            .flat_map(|s| s.essays.keys().cloned())
            .collect();
        Self {
            essays: names.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.essays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.essays.is_empty()
    }
}

/// Load harmonized samples from a JSON Lines file.
///
/// Blank lines are ignored; lines that fail to parse are logged at warn
/// level and skipped.
pub fn load_samples(path: &Path) -> Result<Vec<Sample>, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let reader = BufReader::new(file);

    let mut samples = Vec::new();
    let mut skipped = 0usize;

    for (lineno, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<Sample>(trimmed) {
            Ok(sample) => samples.push(sample),
            Err(e) => {
                warn!(
                    path = %path.display(),
                    line = lineno + 1,
                    error = %e,
                    "Skipping malformed sample line"
                );
                skipped += 1;
            }
        }
    }

    info!(
        path = %path.display(),
        samples = samples.len(),
        skipped,
        "Samples loaded"
    );
    Ok(samples)
}
