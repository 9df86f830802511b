//! End-to-end profile run: search → fetch ∥ leadership → assemble → report.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};
use url::Url;

use firmscope_crawler::{HttpFetcher, PageFetcher, RenderingFetcher, fetch_sources};
use firmscope_discovery::{GoogleSearch, SearchProvider};
use firmscope_extract::ParagraphRule;
use firmscope_llm::{CompletionProvider, OpenAiClient, StructuredExtractor};
use firmscope_shared::{
    AppConfig, CompanyRequest, Credentials, FetchConfig, FirmscopeError, ProfileReport, Result,
    RunId, SearchQuery, SimilarCompany, SourceDocument,
};

use crate::assembler::{AssembleConfig, ProfileAssembler};
use crate::leadership::{LeadershipConfig, LeadershipResolver};
use crate::similar::SimilarCompanies;

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once source fetching finishes.
    fn sources_fetched(&self, succeeded: usize, attempted: usize);
    /// Called when the report is ready.
    fn done(&self, report: &ProfileReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn sources_fetched(&self, _succeeded: usize, _attempted: usize) {}
    fn done(&self, _report: &ProfileReport) {}
}

/// External capabilities a pipeline runs against.
#[derive(Clone)]
pub struct Providers {
    pub search: Arc<dyn SearchProvider>,
    /// Static fetcher used for website and leadership pages.
    pub pages: Arc<dyn PageFetcher>,
    /// Fetcher used for search-result sources (static or rendering).
    pub sources: Arc<dyn PageFetcher>,
    pub completions: Arc<dyn CompletionProvider>,
}

impl Providers {
    /// Production providers: Google search, static HTTP fetch, optional
    /// headless rendering for sources, OpenAI completions.
    pub fn from_config(config: &AppConfig, credentials: &Credentials) -> Result<Self> {
        let fetch = FetchConfig::from(config);

        let search = GoogleSearch::new(
            &config.search,
            &credentials.google_api_key,
            &credentials.google_cse_id,
        )?;
        let pages: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new(&fetch)?);
        let sources: Arc<dyn PageFetcher> = if fetch.render {
            info!(webdriver = %fetch.webdriver_url, workers = fetch.render_workers, "rendering sources");
            Arc::new(RenderingFetcher::new(&fetch))
        } else {
            Arc::clone(&pages)
        };
        let completions = OpenAiClient::new(
            &config.openai,
            &credentials.openai_api_key,
            Duration::from_secs(config.extraction.timeout_secs),
        )?;

        Ok(Self {
            search: Arc::new(search),
            pages,
            sources,
            completions: Arc::new(completions),
        })
    }
}

/// Runs company profile and similar-company requests.
#[derive(Clone)]
pub struct ProfilePipeline {
    search: Arc<dyn SearchProvider>,
    sources: Arc<dyn PageFetcher>,
    resolver: LeadershipResolver,
    assembler: ProfileAssembler,
    similar: SimilarCompanies,
    search_limit: usize,
    source_limit: usize,
    fetch_concurrency: usize,
    rule: ParagraphRule,
    deadline: Duration,
}

impl ProfilePipeline {
    pub fn new(config: &AppConfig, providers: Providers) -> Self {
        let fetch = FetchConfig::from(config);
        let extractor =
            StructuredExtractor::from_settings(providers.completions, &config.extraction);

        let resolver = LeadershipResolver::new(
            Arc::clone(&providers.search),
            providers.pages,
            extractor.clone(),
            LeadershipConfig {
                excluded_domains: config.search.excluded_domains.clone(),
                max_context_chars: config.extraction.max_context_chars,
                max_tokens: config.extraction.leadership_max_tokens,
            },
        );
        let assembler =
            ProfileAssembler::new(extractor.clone(), AssembleConfig::from(&config.extraction));
        let similar = SimilarCompanies::new(extractor, config.extraction.similar_max_tokens);

        Self {
            search: providers.search,
            sources: providers.sources,
            resolver,
            assembler,
            similar,
            search_limit: config.pipeline.search_limit,
            source_limit: config.pipeline.source_limit,
            fetch_concurrency: fetch.concurrency,
            rule: ParagraphRule::from(&fetch),
            deadline: Duration::from_secs(config.pipeline.request_timeout_secs),
        }
    }

    /// Build against the production providers.
    pub fn from_config(config: &AppConfig, credentials: &Credentials) -> Result<Self> {
        Ok(Self::new(config, Providers::from_config(config, credentials)?))
    }

    /// Produce a profile report for one company.
    ///
    /// Fails with a validation error on a blank name and with
    /// [`FirmscopeError::Timeout`] when the run outlives its deadline. Every
    /// stage failure inside the run degrades to missing data instead.
    #[instrument(skip_all, fields(company = %request.name))]
    pub async fn run(
        &self,
        request: &CompanyRequest,
        progress: &dyn ProgressReporter,
    ) -> Result<ProfileReport> {
        let request = request.clone().normalized()?;
        match tokio::time::timeout(self.deadline, self.run_inner(&request, progress)).await {
            Ok(report) => Ok(report),
            Err(_) => {
                warn!(deadline_secs = self.deadline.as_secs(), "profile run exceeded deadline");
                Err(FirmscopeError::Timeout(format!(
                    "profile for '{}' exceeded {}s",
                    request.name,
                    self.deadline.as_secs()
                )))
            }
        }
    }

    async fn run_inner(
        &self,
        request: &CompanyRequest,
        progress: &dyn ProgressReporter,
    ) -> ProfileReport {
        let start = Instant::now();
        let run_id = RunId::new();
        info!(%run_id, "starting profile run");

        // --- Phase 1: Search ---
        progress.phase("Searching the web");
        let urls = self.search_sources(request).await;

        // --- Phase 2: Sources and leadership, concurrently ---
        progress.phase("Fetching sources and leadership");
        let (documents, leadership) = tokio::join!(
            fetch_sources(
                Arc::clone(&self.sources),
                &urls,
                self.fetch_concurrency,
                self.rule
            ),
            self.resolver.resolve(&request.name),
        );

        let succeeded = documents.iter().filter(|d| d.text().is_some()).count();
        progress.sources_fetched(succeeded, documents.len());

        let executives = match leadership {
            Ok(outcome) => outcome.into_executives(),
            Err(e) => {
                warn!(error = %e, "leadership resolution failed, continuing without executives");
                Vec::new()
            }
        };

        // --- Phase 3: Assemble ---
        progress.phase("Assembling profile");
        let profile = self
            .assembler
            .assemble(&request.name, &documents, &executives)
            .await;

        let report = ProfileReport {
            company: request.name.clone(),
            profile,
            sources: documents.into_iter().map(|SourceDocument { url, .. }| url).collect(),
            run_id,
            generated_at: chrono::Utc::now(),
        };

        info!(
            %run_id,
            sources = report.sources.len(),
            executives = report.profile.executives.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "profile run complete"
        );
        progress.done(&report);
        report
    }

    /// Search for source URLs. A failed search yields no sources.
    async fn search_sources(&self, request: &CompanyRequest) -> Vec<Url> {
        let query = SearchQuery::new(profile_query(request), self.search_limit);
        match self.search.search(&query).await {
            Ok(mut urls) => {
                urls.truncate(self.source_limit);
                info!(sources = urls.len(), "source URLs found");
                urls
            }
            Err(e) => {
                warn!(error = %e, "source search failed, continuing with no sources");
                Vec::new()
            }
        }
    }

    /// Similar-company suggestions, bounded by the same deadline as a run.
    #[instrument(skip_all, fields(company = %request.name))]
    pub async fn similar(&self, request: &CompanyRequest) -> Result<Vec<SimilarCompany>> {
        let request = request.clone().normalized()?;
        tokio::time::timeout(self.deadline, self.similar.find(&request))
            .await
            .map_err(|_| {
                FirmscopeError::Timeout(format!(
                    "similar companies for '{}' exceeded {}s",
                    request.name,
                    self.deadline.as_secs()
                ))
            })?
    }
}

/// `"{name} {location} {industry} company profile"` with blank parts removed.
fn profile_query(request: &CompanyRequest) -> String {
    [
        Some(request.name.as_str()),
        request.location.as_deref(),
        request.industry.as_deref(),
        Some("company profile"),
    ]
    .into_iter()
    .flatten()
    .map(str::trim)
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}
