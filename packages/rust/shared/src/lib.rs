//! Shared types, error model, and configuration for Firmscope.
//!
//! This crate is the foundation depended on by all other Firmscope crates.
//! It provides:
//! - [`FirmscopeError`]: the unified error type
//! - Domain types ([`CompanyProfile`], [`Executive`], [`NewsItem`], [`ProfileReport`])
//! - Configuration ([`AppConfig`], [`FetchConfig`], [`Credentials`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, Credentials, ExtractionSettings, FetchConfig, OpenAiConfig, PipelineSettings,
    RenderSettings, SearchConfig, ServerSettings, config_dir, config_file_path,
    default_excluded_domains, init_config, load_config, load_config_from,
};
pub use error::{FirmscopeError, Result};
pub use types::{
    CompanyProfile, CompanyRequest, Executive, ExtractedExecutive, FetchOutcome, LinkedInProfile,
    MAX_PROFILE_EXECUTIVES, NewsItem, ProfileReport, RunId, SearchQuery, Sentiment,
    SimilarCompany, SourceDocument,
};
