//! Core pipeline orchestration and domain logic for Firmscope.
//!
//! This crate ties together search, page fetching, leadership resolution,
//! and model extraction into end-to-end company profile runs.

pub mod assembler;
pub mod leadership;
mod lenient;
pub mod pipeline;
mod profile;
pub mod similar;

pub use assembler::{AssembleConfig, ProfileAssembler, build_profile_prompt};
pub use leadership::{LeadershipConfig, LeadershipOutcome, LeadershipResolver};
pub use pipeline::{ProfilePipeline, ProgressReporter, Providers, SilentProgress};
pub use similar::{MAX_SIMILAR_COMPANIES, SimilarCompanies};
