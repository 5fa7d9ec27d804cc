//! Oilsense: Lubricant-Analysis Operational Intelligence
//!
//! Threshold-computation and classification engine for periodic oil-analysis
//! samples from heavy mining equipment.
//!
//! ## Architecture
//!
//! - **Limits**: Stewart-limit calculator — per (machine, component, essay)
//!   statistical thresholds from a client's historical population
//! - **Classify**: three-tier state machine (essay → report → machine)
//! - **Recommend**: bounded-concurrency fan-out of maintenance-recommendation
//!   requests to an external text-generation service
//! - **Pipeline**: per-client orchestration with error containment

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod data;
pub mod limits;
pub mod normalize;
pub mod pipeline;
pub mod recommend;
pub mod types;

// Re-export configuration
pub use config::PipelineConfig;

// Re-export commonly used types
pub use types::{
    BreachRecord, BreachTier, ClassifiedSample, ComponentSnapshot, MachineStatus, ReportStatus,
    Sample,
};

// Re-export the threshold engine
pub use limits::{ThresholdKey, ThresholdSet, ThresholdStore};

// Re-export orchestration
pub use pipeline::{ClientOutcome, ClientSummary, Orchestrator, PipelineError, RunOptions};

// Re-export the recommendation layer
pub use recommend::{ChatClient, RecommendError, Recommender};
