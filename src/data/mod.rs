//! Data plumbing: harmonized-sample loading and run exports

mod exporters;
mod loaders;

pub use exporters::*;
pub use loaders::*;
