//! Source discovery: web search and official-website lookup.
//!
//! Every downstream stage starts from URLs found here. The search provider is
//! a capability trait so the pipeline can run against a scripted fake in tests.

mod search;
mod website;

pub use search::{GoogleSearch, SearchProvider};
pub use website::{find_company_website, is_excluded_host, pick_website};
