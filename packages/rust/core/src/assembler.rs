//! Company profile assembly.
//!
//! Merges the fetched source texts and the resolved executives into one
//! prompt, parses the model's profile, then attaches a sentiment label to
//! every news item that has a summary.

use futures::future::join_all;
use tracing::{info, instrument, warn};

use firmscope_extract::truncate_content;
use firmscope_llm::{CompletionRequest, Parsed, StructuredExtractor};
use firmscope_shared::{
    CompanyProfile, Executive, ExtractionSettings, MAX_PROFILE_EXECUTIVES, NewsItem, Sentiment,
    SourceDocument,
};

use crate::profile::parse_profile;

const PROFILE_SYSTEM: &str = "Extract and structure company data.";

const SENTIMENT_SYSTEM: &str = "Analyze the sentiment of the following text and return either \
    'Positive', 'Negative', or 'Neutral'.";

/// Minimum news items requested from the model.
const MIN_NEWS_ITEMS: usize = 4;

/// Token and context budgets for one assembly.
#[derive(Debug, Clone)]
pub struct AssembleConfig {
    pub profile_max_tokens: u32,
    pub sentiment_max_tokens: u32,
    /// Character budget for the merged source context.
    pub max_context_chars: usize,
}

impl From<&ExtractionSettings> for AssembleConfig {
    fn from(settings: &ExtractionSettings) -> Self {
        Self {
            profile_max_tokens: settings.profile_max_tokens,
            sentiment_max_tokens: settings.sentiment_max_tokens,
            max_context_chars: settings.max_context_chars,
        }
    }
}

/// Builds the final [`CompanyProfile`] from gathered inputs.
#[derive(Clone)]
pub struct ProfileAssembler {
    extractor: StructuredExtractor,
    config: AssembleConfig,
}

impl ProfileAssembler {
    pub fn new(extractor: StructuredExtractor, config: AssembleConfig) -> Self {
        Self { extractor, config }
    }

    /// Produce the profile. Never fails: any extraction problem yields an
    /// empty profile.
    #[instrument(skip_all, fields(company = %company, sources = sources.len(), executives = executives.len()))]
    pub async fn assemble(
        &self,
        company: &str,
        sources: &[SourceDocument],
        executives: &[Executive],
    ) -> CompanyProfile {
        let request = CompletionRequest::new(build_profile_prompt(
            company,
            sources,
            executives,
            self.config.max_context_chars,
        ))
        .system(PROFILE_SYSTEM)
        .max_tokens(self.config.profile_max_tokens)
        .json_object();

        let mut profile = match self
            .extractor
            .extract_with("company profile", &request, parse_profile)
            .await
        {
            Ok(Parsed::Valid(profile)) => profile,
            Ok(Parsed::Malformed(_)) => {
                warn!("profile response malformed, returning empty profile");
                return CompanyProfile::default();
            }
            Err(e) => {
                warn!(error = %e, "profile extraction failed, returning empty profile");
                return CompanyProfile::default();
            }
        };

        self.attach_sentiment(&mut profile.news).await;

        info!(
            executives = profile.executives.len(),
            news = profile.news.len(),
            "profile assembled"
        );
        profile
    }

    /// Label every news item that has a summary. Calls run concurrently and
    /// are single-shot; any failure becomes [`Sentiment::Failed`].
    async fn attach_sentiment(&self, news: &mut [NewsItem]) {
        let pending = news.iter().enumerate().filter_map(|(idx, item)| {
            let summary = item.summary.clone()?;
            let request = CompletionRequest::new(summary)
                .system(SENTIMENT_SYSTEM)
                .max_tokens(self.config.sentiment_max_tokens);
            Some(async move {
                let label = match self.extractor.complete_once(&request).await {
                    Ok(answer) => Sentiment::from_label(&answer),
                    Err(e) => {
                        warn!(error = %e, "sentiment analysis failed");
                        Sentiment::Failed
                    }
                };
                (idx, label)
            })
        });

        for (idx, label) in join_all(pending).await {
            news[idx].sentiment = Some(label);
        }
    }
}

/// Render the profile prompt. Failed sources are omitted; the merged source
/// context is cut to `max_context_chars`.
pub fn build_profile_prompt(
    company: &str,
    sources: &[SourceDocument],
    executives: &[Executive],
    max_context_chars: usize,
) -> String {
    let context = sources
        .iter()
        .filter_map(|doc| doc.text().map(|text| format!("Source: {}\n{text}", doc.url)))
        .collect::<Vec<_>>()
        .join("\n\n");
    let context = truncate_content(&context, max_context_chars);

    let mut prompt = format!(
        "Based on the following extracted information, generate a structured company profile for {company}:\n\n{context}\n"
    );

    if !executives.is_empty() {
        let rendered = serde_json::to_string_pretty(executives).unwrap_or_default();
        prompt.push_str(&format!("\nHere is executive data to use:\n{rendered}\n"));
    }

    prompt.push_str(&format!(
        "\nProvide the profile as a JSON object with fields:\n\
         - Name\n\
         - Location\n\
         - Industry\n\
         - Website\n\
         - LinkedIn\n\
         - Email\n\
         - Founded Year\n\
         - Stock Price (if available)\n\
         - Number of Employees\n\
         - Revenue\n\
         - Top Executives (at most {MAX_PROFILE_EXECUTIVES}, each with Name, Position, LinkedIn, Email if available)\n\
         - Latest News (at least {MIN_NEWS_ITEMS} financial news items from the last 3 months, each with Title, Date and a detailed Summary)\n"
    ));

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use firmscope_llm::{CompletionProvider, RetryPolicy};
    use firmscope_shared::{FetchOutcome, FirmscopeError, LinkedInProfile, Result};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use url::Url;

    /// Answers profile requests with `profile`, sentiment requests by keyword.
    struct FakeModel {
        profile: Result<String>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl FakeModel {
        fn new(profile: Result<String>) -> Arc<Self> {
            Arc::new(Self {
                profile,
                requests: Mutex::new(Vec::new()),
            })
        }

        fn sentiment_calls(&self) -> usize {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.system.as_deref() == Some(SENTIMENT_SYSTEM))
                .count()
        }
    }

    #[async_trait]
    impl CompletionProvider for FakeModel {
        async fn complete(&self, request: &CompletionRequest) -> Result<String> {
            self.requests.lock().unwrap().push(request.clone());
            if request.system.as_deref() == Some(SENTIMENT_SYSTEM) {
                return if request.user.contains("record") {
                    Ok("Positive".into())
                } else if request.user.contains("lawsuit") {
                    Ok("Negative".into())
                } else {
                    Err(FirmscopeError::Transport("reset".into()))
                };
            }
            match &self.profile {
                Ok(text) => Ok(text.clone()),
                Err(_) => Err(FirmscopeError::Timeout("30s".into())),
            }
        }
    }

    fn assembler(model: Arc<FakeModel>) -> ProfileAssembler {
        let extractor =
            StructuredExtractor::new(model, RetryPolicy::fixed(3, Duration::ZERO), Duration::from_secs(5));
        ProfileAssembler::new(extractor, AssembleConfig::from(&ExtractionSettings::default()))
    }

    fn sources() -> Vec<SourceDocument> {
        vec![
            SourceDocument {
                url: Url::parse("https://acme.com/").unwrap(),
                outcome: FetchOutcome::Text("Acme builds robots.".into()),
            },
            SourceDocument {
                url: Url::parse("https://down.example/").unwrap(),
                outcome: FetchOutcome::Failed("connection refused".into()),
            },
        ]
    }

    #[test]
    fn prompt_omits_failed_sources_and_includes_executives() {
        let execs = vec![Executive {
            name: "Jane Doe".into(),
            title: "CEO".into(),
            linkedin: LinkedInProfile::NotFound,
            email: None,
        }];
        let prompt = build_profile_prompt("Acme", &sources(), &execs, 10_000);

        assert!(prompt.contains("Source: https://acme.com/\nAcme builds robots."));
        assert!(!prompt.contains("down.example"));
        assert!(prompt.contains("\"name\": \"Jane Doe\""));
        assert!(prompt.contains("\"linkedin\": \"Not found\""));
        assert!(prompt.contains("at most 6"));
    }

    #[test]
    fn prompt_without_executives_has_no_executive_section() {
        let prompt = build_profile_prompt("Acme", &sources(), &[], 10_000);
        assert!(!prompt.contains("executive data"));
    }

    #[tokio::test]
    async fn sentiment_attached_only_to_items_with_summary() {
        let model = FakeModel::new(Ok(serde_json::json!({
            "Name": "Acme",
            "Latest News": [
                {"Title": "Record quarter", "Summary": "Acme posts record revenue."},
                {"Title": "Lawsuit", "Summary": "Acme faces a patent lawsuit."},
                {"Title": "Outage", "Summary": "Acme site was down for an hour."},
                {"Title": "Trade fair"}
            ]
        })
        .to_string()));

        let profile = assembler(model.clone()).assemble("Acme", &sources(), &[]).await;

        let labels: Vec<Option<Sentiment>> = profile.news.iter().map(|n| n.sentiment).collect();
        assert_eq!(
            labels,
            vec![
                Some(Sentiment::Positive),
                Some(Sentiment::Negative),
                Some(Sentiment::Failed),
                None
            ]
        );
        assert_eq!(model.sentiment_calls(), 3, "sentiment is single-shot per item");
    }

    #[tokio::test]
    async fn malformed_profile_is_empty() {
        let model = FakeModel::new(Ok("I cannot help with that.".into()));
        let profile = assembler(model).assemble("Acme", &sources(), &[]).await;
        assert!(profile.is_empty());
    }

    #[tokio::test]
    async fn extraction_failure_is_empty() {
        let model = FakeModel::new(Err(FirmscopeError::Timeout("30s".into())));
        let profile = assembler(model.clone()).assemble("Acme", &sources(), &[]).await;
        assert!(profile.is_empty());
        assert_eq!(model.requests.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn profile_request_asks_for_json_object() {
        let model = FakeModel::new(Ok("{}".into()));
        let _ = assembler(model.clone()).assemble("Acme", &sources(), &[]).await;
        let requests = model.requests.lock().unwrap();
        assert!(requests[0].json_object);
        assert_eq!(requests[0].max_tokens, Some(3_000));
    }
}
