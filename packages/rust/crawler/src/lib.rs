//! Page fetching for Firmscope.
//!
//! This crate provides:
//! - [`PageFetcher`]: the fetch capability, returning HTML or rendered text
//! - [`HttpFetcher`]: static GET with a browser User-Agent and SSRF guard
//! - [`RenderingFetcher`]: headless Chrome over WebDriver, bounded by a session pool
//! - [`fetch_sources`]: bounded-concurrency batch fetch preserving input order

mod batch;
mod fetcher;
mod render;

pub use batch::fetch_sources;
pub use fetcher::{BROWSER_USER_AGENT, HttpFetcher, PageContent, PageFetcher, is_ssrf_target};
pub use render::RenderingFetcher;
