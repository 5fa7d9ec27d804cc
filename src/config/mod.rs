//! Pipeline Configuration
//!
//! Every tunable that drives threshold computation, classification, and
//! recommendation generation is a field here, loaded from TOML with
//! defaults matching the values the fleet was calibrated against.
//!
//! ## Loading Order
//!
//! 1. `OILSENSE_CONFIG` environment variable (path to TOML file)
//! 2. `oilsense.toml` in the current working directory
//! 3. Built-in defaults
//!
//! The loaded value is passed explicitly into [`crate::pipeline::Orchestrator`]
//! and the stages it drives — there is no process-global config state.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a pipeline deployment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Clients to process, in order
    #[serde(default)]
    pub clients: ClientsConfig,

    /// Data layout on disk
    #[serde(default)]
    pub paths: PathsConfig,

    /// Stewart-limit computation parameters
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Essay / report / machine classification cutoffs
    #[serde(default)]
    pub classification: ClassificationConfig,

    /// Text-generation collaborator settings
    #[serde(default)]
    pub recommend: RecommendConfig,
}

impl PipelineConfig {
    /// Load configuration using the standard search order:
    /// 1. `$OILSENSE_CONFIG` environment variable
    /// 2. `./oilsense.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("OILSENSE_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from OILSENSE_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from OILSENSE_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "OILSENSE_CONFIG points to non-existent file, falling back");
            }
        }

        let local = Path::new("oilsense.toml");
        if local.exists() {
            match Self::load_from_file(local) {
                Ok(config) => {
                    info!(path = %local.display(), "Loaded config from working directory");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to parse ./oilsense.toml, using defaults");
                }
            }
        }

        info!("No config file found, using built-in defaults");
        Self::default()
    }

    /// Parse a specific TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot produce meaningful output.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let l = &self.limits;
        if !(l.percentile_marginal < l.percentile_condenatorio
            && l.percentile_condenatorio < l.percentile_critico)
        {
            return Err(ConfigError::Invalid(format!(
                "percentiles must be strictly increasing, got ({}, {}, {})",
                l.percentile_marginal, l.percentile_condenatorio, l.percentile_critico
            )));
        }
        if l.percentile_critico > 100 {
            return Err(ConfigError::Invalid(format!(
                "percentile_critico must be <= 100, got {}",
                l.percentile_critico
            )));
        }
        let c = &self.classification;
        if c.report_normal_cutoff > c.report_anormal_cutoff {
            return Err(ConfigError::Invalid(format!(
                "report cutoffs out of order: normal {} > anormal {}",
                c.report_normal_cutoff, c.report_anormal_cutoff
            )));
        }
        if self.recommend.max_workers == 0 {
            return Err(ConfigError::Invalid(
                "recommend.max_workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration loading / validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// Sections
// ============================================================================

/// Clients processed per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientsConfig {
    /// Client identifiers, processed sequentially
    pub names: Vec<String>,
}

impl Default for ClientsConfig {
    fn default() -> Self {
        Self {
            names: vec!["CDA".to_string(), "EMIN".to_string()],
        }
    }
}

/// Where the harmonized inputs, threshold store, and exports live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root data directory
    pub data_root: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("data"),
        }
    }
}

impl PathsConfig {
    /// Harmonized samples for a client (JSON Lines, one sample per line).
    pub fn input_path(&self, client: &str) -> PathBuf {
        self.data_root
            .join("silver")
            .join(format!("{}.jsonl", client.to_uppercase()))
    }

    /// Persisted multi-client threshold store.
    pub fn threshold_store_path(&self) -> PathBuf {
        self.data_root.join("processed").join("stewart_limits.json")
    }

    /// Per-client export directory.
    pub fn export_dir(&self, client: &str) -> PathBuf {
        self.data_root.join("golden").join(client.to_lowercase())
    }
}

/// Stewart-limit computation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Percentile for the Marginal (`normal`) bound
    pub percentile_marginal: u8,
    /// Percentile for the Condenatorio (`alert`) bound
    pub percentile_condenatorio: u8,
    /// Percentile for the Critico (`critic`) bound
    pub percentile_critico: u8,
    /// An essay needs more than this many distinct non-zero values
    pub min_unique_values: usize,
    /// Minimum retained (non-zero) population after filtering
    pub min_population: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            percentile_marginal: 90,
            percentile_condenatorio: 95,
            percentile_critico: 98,
            min_unique_values: 3,
            min_population: 3,
        }
    }
}

/// Classification cutoffs and point weights.
///
/// `report_anormal_cutoff` is the single source of truth for the Anormal
/// boundary. The legacy deployment carried a second, never-applied value of
/// 5 in its settings surface; the 9 the classifier actually enforced is the
/// default here (see DESIGN.md).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationConfig {
    /// Points for a Marginal breach
    pub essay_points_marginal: u32,
    /// Points for a Condenatorio breach
    pub essay_points_condenatorio: u32,
    /// Points for a Critico breach
    pub essay_points_critico: u32,

    /// severity_score below this → Normal
    pub report_normal_cutoff: u32,
    /// severity_score at or above this → Anormal
    pub report_anormal_cutoff: u32,

    /// Machine-tier points for an Alerta component
    pub component_points_alerta: u32,
    /// Machine-tier points for an Anormal component
    pub component_points_anormal: u32,

    /// machine_score below this → Normal
    pub machine_normal_cutoff: u32,
    /// machine_score at or above this → Anormal
    pub machine_anormal_cutoff: u32,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            essay_points_marginal: 1,
            essay_points_condenatorio: 3,
            essay_points_critico: 5,
            report_normal_cutoff: 3,
            report_anormal_cutoff: 9,
            component_points_alerta: 2,
            component_points_anormal: 5,
            machine_normal_cutoff: 6,
            machine_anormal_cutoff: 10,
        }
    }
}

/// Text-generation collaborator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendConfig {
    /// OpenAI-compatible API base (no trailing slash)
    pub api_base: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Model name
    pub model: String,
    /// Sampling temperature
    pub temperature: f64,
    /// Response length cap
    pub max_tokens: u32,
    /// Per-request timeout; a timeout is a task failure, not a fatal error
    pub timeout_secs: u64,
    /// Bounded worker-pool size for recommendation fan-out
    pub max_workers: usize,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.9,
            max_tokens: 500,
            timeout_secs: 30,
            max_workers: 18,
        }
    }
}
