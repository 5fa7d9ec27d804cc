//! Maintenance-recommendation generation
//!
//! Non-Normal samples are sent to an external text-generation service that
//! writes the short maintenance comment a diagnostics engineer would. The
//! service is slow and can fail; everything here is built around that:
//!
//! - [`Recommender`]: narrow request/response seam (swappable in tests)
//! - [`ChatClient`]: OpenAI-compatible HTTP implementation
//! - [`generate_all`]: bounded fan-out, per-task failure capture, merge by
//!   sample id after full fan-in

mod client;
mod dispatcher;
pub mod prompts;

pub use client::{ChatClient, RecommendError, RecommendationRequest, Recommender};
pub use dispatcher::generate_all;
