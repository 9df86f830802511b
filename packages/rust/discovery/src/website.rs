//! Official website discovery for a company.

use firmscope_shared::SearchQuery;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::search::SearchProvider;

/// Results inspected when looking for the official site.
const WEBSITE_SEARCH_LIMIT: usize = 3;

/// Whether `url`'s host is one of `excluded`, or a subdomain of one.
pub fn is_excluded_host(url: &Url, excluded: &[String]) -> bool {
    let Some(host) = url.host_str() else {
        return true;
    };
    let host = host.to_ascii_lowercase();
    excluded.iter().any(|domain| {
        let domain = domain.trim().trim_start_matches('.').to_ascii_lowercase();
        !domain.is_empty()
            && (host == domain
                || host
                    .strip_suffix(domain.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.')))
    })
}

/// Pick the first candidate that is an http(s) URL on a non-excluded host.
pub fn pick_website(candidates: &[Url], excluded: &[String]) -> Option<Url> {
    candidates
        .iter()
        .find(|url| matches!(url.scheme(), "http" | "https") && !is_excluded_host(url, excluded))
        .cloned()
}

/// Find the company's own website via search.
///
/// Returns `None` when every result is an excluded directory or the search
/// itself fails; neither is an error for the caller.
#[instrument(skip_all, fields(company = %company))]
pub async fn find_company_website(
    search: &dyn SearchProvider,
    company: &str,
    excluded: &[String],
) -> Option<Url> {
    let query = SearchQuery::new(format!("{company} official website"), WEBSITE_SEARCH_LIMIT);

    let candidates = match search.search(&query).await {
        Ok(urls) => urls,
        Err(e) => {
            warn!(error = %e, "website search failed");
            return None;
        }
    };

    match pick_website(&candidates, excluded) {
        Some(url) => {
            info!(%url, "company website found");
            Some(url)
        }
        None => {
            debug!(candidates = candidates.len(), "no acceptable website candidate");
            None
        }
    }
}
