//! Harmonized oil-analysis sample (pipeline input)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One lubricant-analysis record, already harmonized upstream.
///
/// Essay measurements are sparse: an essay the lab did not run is absent from
/// the map, never stored as zero. Samples are immutable once loaded — every
/// pipeline stage reads them, none mutates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    /// Unique sample identifier assigned by the lab
    #[serde(rename = "sampleNumber")]
    pub sample_number: String,

    /// Machine/unit identifier (e.g. "CAEX-017")
    #[serde(rename = "unitId")]
    pub unit_id: String,

    /// Machine family name as reported (may carry accents / casing variants)
    #[serde(rename = "machineName")]
    pub machine_name: String,

    /// Machine model, when the lab reports it (used in recommendation prompts)
    #[serde(rename = "machineModel", default)]
    pub machine_model: Option<String>,

    /// Component the sample was drawn from (e.g. "Motor Diesel")
    #[serde(rename = "componentName")]
    pub component_name: String,

    /// Collection date
    #[serde(rename = "sampleDate")]
    pub sample_date: NaiveDate,

    /// Owning client identifier (e.g. "CDA", "EMIN")
    pub client: String,

    /// Essay name → measured value. Missing essays are absent, not zero.
    #[serde(default)]
    pub essays: HashMap<String, f64>,
}

impl Sample {
    /// Measured value for an essay, if the lab ran it.
    pub fn essay_value(&self, essay: &str) -> Option<f64> {
        self.essays.get(essay).copied()
    }
}
