//! Web search capability and the Google Custom Search client.

use std::time::Duration;

use async_trait::async_trait;
use firmscope_shared::{FirmscopeError, Result, SearchConfig, SearchQuery};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::Url;

/// The Custom Search API never returns more than this many results per call.
const MAX_RESULTS_PER_CALL: usize = 10;

/// Upstream error bodies are cut to this many characters before logging.
const MAX_ERROR_BODY: usize = 300;

const SERVICE: &str = "google-search";

/// A web search provider.
///
/// Returns result URLs in provider relevance order, at most `query.limit`.
/// Implementations do not retry.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Url>>;
}

// ---------------------------------------------------------------------------
// Google Custom Search
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CseResponse {
    #[serde(default)]
    items: Vec<CseItem>,
}

#[derive(Debug, Deserialize)]
struct CseItem {
    link: String,
}

/// Client for the Google Custom Search JSON API.
pub struct GoogleSearch {
    client: Client,
    base_url: String,
    api_key: String,
    engine_id: String,
}

impl GoogleSearch {
    pub fn new(
        config: &SearchConfig,
        api_key: impl Into<String>,
        engine_id: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FirmscopeError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            engine_id: engine_id.into(),
        })
    }
}

#[async_trait]
impl SearchProvider for GoogleSearch {
    #[instrument(skip_all, fields(query = %query.text, limit = query.limit))]
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Url>> {
        if query.limit == 0 {
            return Ok(Vec::new());
        }
        let num = query.limit.clamp(1, MAX_RESULTS_PER_CALL).to_string();
        let endpoint = format!("{}/customsearch/v1", self.base_url);

        let response = self
            .client
            .get(&endpoint)
            .query(&[
                ("q", query.text.as_str()),
                ("cx", self.engine_id.as_str()),
                ("key", self.api_key.as_str()),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(|e| send_error(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY).collect();
            warn!(status = status.as_u16(), "search request rejected");
            return Err(FirmscopeError::upstream(SERVICE, status.as_u16(), body));
        }

        let parsed: CseResponse = response.json().await.map_err(|e| {
            FirmscopeError::MalformedResponse(format!("{SERVICE}: invalid response body: {e}"))
        })?;

        let urls: Vec<Url> = parsed
            .items
            .into_iter()
            .filter_map(|item| match Url::parse(&item.link) {
                Ok(url) => Some(url),
                Err(e) => {
                    debug!(link = %item.link, error = %e, "skipping unparseable result link");
                    None
                }
            })
            .take(query.limit)
            .collect();

        debug!(results = urls.len(), "search complete");
        Ok(urls)
    }
}

/// Classify a reqwest send failure as a timeout or a transport error.
pub(crate) fn send_error(service: &str, e: reqwest::Error) -> FirmscopeError {
    if e.is_timeout() {
        FirmscopeError::Timeout(format!("{service}: {e}"))
    } else {
        FirmscopeError::Transport(format!("{service}: {e}"))
    }
}
