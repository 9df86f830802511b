//! Leadership resolution: website → leadership page → executives → LinkedIn.
//!
//! Each step can end the walk early with an outcome describing how far it
//! got. Only an exhausted extraction budget is an error.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, instrument, warn};
use url::Url;

use firmscope_crawler::{PageContent, PageFetcher};
use firmscope_discovery::{SearchProvider, find_company_website};
use firmscope_extract::{collect_executive_blocks, find_leadership_link};
use firmscope_llm::{CompletionRequest, StructuredExtractor};
use firmscope_shared::{Executive, ExtractedExecutive, LinkedInProfile, Result, SearchQuery};

const LEADERSHIP_SYSTEM: &str = "You are an AI that extracts structured leadership information.";

const LEADERSHIP_INSTRUCTIONS: &str = "Extract executive names and titles from the following text. \
    Format the response in structured JSON as: \
    [{\"name\": \"John Doe\", \"title\": \"CEO\"}, {\"name\": \"Jane Smith\", \"title\": \"COO\"}] TEXT:";

const LEADERSHIP_TEMPERATURE: f32 = 0.7;

/// How far leadership resolution got for one company.
#[derive(Debug, Clone, PartialEq)]
pub enum LeadershipOutcome {
    NoWebsite,
    NoLeadershipPage {
        website: Url,
    },
    /// A page was reached but yielded no executives.
    NoData {
        website: Url,
        leadership_page: Option<Url>,
    },
    Found {
        website: Url,
        leadership_page: Url,
        executives: Vec<Executive>,
    },
}

impl LeadershipOutcome {
    /// Resolved executives; empty for every outcome but `Found`.
    pub fn executives(&self) -> &[Executive] {
        match self {
            Self::Found { executives, .. } => executives,
            _ => &[],
        }
    }

    pub fn into_executives(self) -> Vec<Executive> {
        match self {
            Self::Found { executives, .. } => executives,
            _ => Vec::new(),
        }
    }

    pub fn website(&self) -> Option<&Url> {
        match self {
            Self::NoWebsite => None,
            Self::NoLeadershipPage { website }
            | Self::NoData { website, .. }
            | Self::Found { website, .. } => Some(website),
        }
    }
}

/// Budgets for one resolution.
#[derive(Debug, Clone)]
pub struct LeadershipConfig {
    pub excluded_domains: Vec<String>,
    /// Character budget for the executive text sent to the model.
    pub max_context_chars: usize,
    pub max_tokens: u32,
}

/// Walks from a company name to its executives.
#[derive(Clone)]
pub struct LeadershipResolver {
    search: Arc<dyn SearchProvider>,
    fetcher: Arc<dyn PageFetcher>,
    extractor: StructuredExtractor,
    config: LeadershipConfig,
}

impl LeadershipResolver {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        fetcher: Arc<dyn PageFetcher>,
        extractor: StructuredExtractor,
        config: LeadershipConfig,
    ) -> Self {
        Self {
            search,
            fetcher,
            extractor,
            config,
        }
    }

    /// Resolve the company's executives.
    ///
    /// Fails only with `FirmscopeError::ExtractionFailed` (or another
    /// non-retriable model error); every other problem ends in an outcome.
    #[instrument(skip_all, fields(company = %company))]
    pub async fn resolve(&self, company: &str) -> Result<LeadershipOutcome> {
        // --- Step 1: official website ---
        let Some(website) =
            find_company_website(self.search.as_ref(), company, &self.config.excluded_domains).await
        else {
            info!("no company website, skipping leadership");
            return Ok(LeadershipOutcome::NoWebsite);
        };

        // --- Step 2: leadership page ---
        let Some(home) = self.fetch_html(&website).await else {
            return Ok(LeadershipOutcome::NoLeadershipPage { website });
        };
        let Some(leadership_page) = find_leadership_link(&home, &website) else {
            info!(%website, "no leadership link on website");
            return Ok(LeadershipOutcome::NoLeadershipPage { website });
        };
        debug!(%leadership_page, "leadership page found");

        // --- Step 3: executive extraction ---
        let Some(page) = self.fetch_html(&leadership_page).await else {
            return Ok(LeadershipOutcome::NoData {
                website,
                leadership_page: Some(leadership_page),
            });
        };
        let Some(blocks) = collect_executive_blocks(&page, self.config.max_context_chars) else {
            info!(%leadership_page, "leadership page has no executive text");
            return Ok(LeadershipOutcome::NoData {
                website,
                leadership_page: Some(leadership_page),
            });
        };

        let extracted = self.extract_executives(&blocks).await?;
        if extracted.is_empty() {
            return Ok(LeadershipOutcome::NoData {
                website,
                leadership_page: Some(leadership_page),
            });
        }

        // --- Step 4: LinkedIn enrichment ---
        let executives = self.enrich_linkedin(extracted).await;
        info!(executives = executives.len(), "leadership resolved");

        Ok(LeadershipOutcome::Found {
            website,
            leadership_page,
            executives,
        })
    }

    /// Fetch a page as HTML. Failures and rendered text are logged as absent.
    async fn fetch_html(&self, url: &Url) -> Option<String> {
        match self.fetcher.fetch(url).await {
            Ok(PageContent::Html(html)) => Some(html),
            Ok(PageContent::Text(_)) => {
                warn!(%url, "fetcher returned text without markup");
                None
            }
            Err(e) => {
                warn!(%url, error = %e, "page fetch failed");
                None
            }
        }
    }

    async fn extract_executives(&self, blocks: &str) -> Result<Vec<ExtractedExecutive>> {
        let request = CompletionRequest::new(format!("{LEADERSHIP_INSTRUCTIONS}{blocks}"))
            .system(LEADERSHIP_SYSTEM)
            .max_tokens(self.config.max_tokens)
            .temperature(LEADERSHIP_TEMPERATURE);

        let parsed = self
            .extractor
            .extract::<Vec<ExtractedExecutive>>("leadership", &request)
            .await?;
        Ok(parsed.valid().unwrap_or_default())
    }

    /// Look up every executive's LinkedIn profile concurrently.
    async fn enrich_linkedin(&self, extracted: Vec<ExtractedExecutive>) -> Vec<Executive> {
        let lookups = extracted.into_iter().map(|exec| async move {
            let linkedin = self.linkedin_profile(&exec.name).await;
            Executive::from_extracted(exec, linkedin)
        });
        join_all(lookups).await
    }

    async fn linkedin_profile(&self, name: &str) -> LinkedInProfile {
        let query = SearchQuery::new(format!("{name} LinkedIn"), 1);
        match self.search.search(&query).await {
            Ok(urls) => urls
                .into_iter()
                .find(|url| url.as_str().contains("linkedin.com/in/"))
                .map(|url| LinkedInProfile::Found(url.to_string()))
                .unwrap_or_default(),
            Err(e) => {
                warn!(executive = %name, error = %e, "LinkedIn search failed");
                LinkedInProfile::NotFound
            }
        }
    }
}
