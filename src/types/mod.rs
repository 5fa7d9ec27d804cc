//! Shared data structures for the lubricant-analysis pipeline
//!
//! - `Sample`: one harmonized oil-analysis record (pipeline input)
//! - `BreachRecord`, `ClassifiedSample`: essay/report classification output
//! - `MachineStatus`: per-unit aggregation of component statuses

mod machine;
mod report;
mod sample;

pub use machine::*;
pub use report::*;
pub use sample::*;
