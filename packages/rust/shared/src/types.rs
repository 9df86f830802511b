//! Core domain types for Firmscope company profiles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use url::Url;
use uuid::Uuid;

use crate::error::{FirmscopeError, Result};

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one pipeline run (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// A company lookup as received from the CLI or HTTP layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRequest {
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
}

impl CompanyRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_industry(mut self, industry: impl Into<String>) -> Self {
        self.industry = Some(industry.into());
        self
    }

    /// Trim every field, turn blank optionals into `None`, and reject a blank name.
    pub fn normalized(self) -> Result<Self> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(FirmscopeError::validation("company name must not be blank"));
        }
        Ok(Self {
            name,
            location: non_blank(self.location),
            industry: non_blank(self.industry),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// One search call. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    pub limit: usize,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>, limit: usize) -> Self {
        Self {
            text: text.into(),
            limit,
        }
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Result of fetching one source URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Visible text extracted from the page.
    Text(String),
    /// The fetch failed; carries the error message.
    Failed(String),
}

/// A source URL attempted during a run, with what came back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub url: Url,
    pub outcome: FetchOutcome,
}

impl SourceDocument {
    /// Extracted text, or `None` when the fetch failed.
    pub fn text(&self) -> Option<&str> {
        match &self.outcome {
            FetchOutcome::Text(text) => Some(text),
            FetchOutcome::Failed(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Executives
// ---------------------------------------------------------------------------

/// An executive as read off a leadership page, before LinkedIn enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedExecutive {
    pub name: String,
    pub title: String,
}

/// LinkedIn profile lookup result. `NotFound` serializes as `"Not found"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LinkedInProfile {
    Found(String),
    #[default]
    NotFound,
}

const NOT_FOUND: &str = "Not found";

impl Serialize for LinkedInProfile {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Found(url) => serializer.serialize_str(url),
            Self::NotFound => serializer.serialize_str(NOT_FOUND),
        }
    }
}

impl<'de> Deserialize<'de> for LinkedInProfile {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(match raw {
            Some(url) if url.contains("linkedin.com/") => Self::Found(url),
            _ => Self::NotFound,
        })
    }
}

/// An executive with LinkedIn enrichment applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Executive {
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub linkedin: LinkedInProfile,
    #[serde(default)]
    pub email: Option<String>,
}

impl Executive {
    pub fn from_extracted(extracted: ExtractedExecutive, linkedin: LinkedInProfile) -> Self {
        Self {
            name: extracted.name,
            title: extracted.title,
            linkedin,
            email: None,
        }
    }
}

// ---------------------------------------------------------------------------
// News & sentiment
// ---------------------------------------------------------------------------

/// Sentiment label attached to a news item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    #[serde(rename = "Sentiment analysis failed")]
    Failed,
}

impl Sentiment {
    /// Map a free-form model answer to a label.
    ///
    /// Exactly one of positive/negative/neutral must appear, otherwise the
    /// answer is treated as failed.
    pub fn from_label(answer: &str) -> Self {
        let lower = answer.to_lowercase();
        let hits: Vec<Self> = [
            ("positive", Self::Positive),
            ("negative", Self::Negative),
            ("neutral", Self::Neutral),
        ]
        .into_iter()
        .filter(|(word, _)| lower.contains(word))
        .map(|(_, label)| label)
        .collect();

        match hits.as_slice() {
            [only] => *only,
            _ => Self::Failed,
        }
    }

    /// Serialized label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Negative => "Negative",
            Self::Neutral => "Neutral",
            Self::Failed => "Sentiment analysis failed",
        }
    }
}

/// One recent news item about the company.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: Option<String>,
    pub date: Option<String>,
    pub summary: Option<String>,
    /// Attached after extraction; `None` when the item has no summary.
    pub sentiment: Option<Sentiment>,
}

// ---------------------------------------------------------------------------
// CompanyProfile / ProfileReport
// ---------------------------------------------------------------------------

/// Maximum executives kept on a profile.
pub const MAX_PROFILE_EXECUTIVES: usize = 6;

/// The structured company record. Every field is a validated value or absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub name: Option<String>,
    pub location: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub linkedin: Option<String>,
    pub email: Option<String>,
    pub founded_year: Option<u16>,
    pub stock_price: Option<String>,
    pub employee_count: Option<String>,
    pub revenue: Option<String>,
    #[serde(default)]
    pub executives: Vec<Executive>,
    #[serde(default)]
    pub news: Vec<NewsItem>,
}

impl CompanyProfile {
    /// True when extraction produced nothing at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// The response of one profile run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileReport {
    pub company: String,
    pub profile: CompanyProfile,
    /// Every attempted source URL, in search order.
    pub sources: Vec<Url>,
    pub run_id: RunId,
    pub generated_at: DateTime<Utc>,
}

/// A company suggested as similar to the queried name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimilarCompany {
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_ids_are_time_ordered() {
        let a = RunId::new();
        let b = RunId::new();
        assert!(a.0 <= b.0);
        assert_eq!(a.to_string().len(), 36);
    }

    #[test]
    fn request_normalization() {
        let req = CompanyRequest::new("  Acme Corp ")
            .with_location("   ")
            .with_industry(" Robotics ")
            .normalized()
            .expect("valid request");
        assert_eq!(req.name, "Acme Corp");
        assert_eq!(req.location, None);
        assert_eq!(req.industry.as_deref(), Some("Robotics"));

        let err = CompanyRequest::new(" \t").normalized().unwrap_err();
        assert!(matches!(err, FirmscopeError::Validation { .. }));
    }

    #[test]
    fn linkedin_not_found_serializes_as_text() {
        let exec = Executive {
            name: "Jane Doe".into(),
            title: "CEO".into(),
            linkedin: LinkedInProfile::NotFound,
            email: None,
        };
        let json = serde_json::to_value(&exec).expect("serialize");
        assert_eq!(json["linkedin"], "Not found");

        let found: LinkedInProfile =
            serde_json::from_str("\"https://www.linkedin.com/in/janedoe\"").expect("parse");
        assert_eq!(
            found,
            LinkedInProfile::Found("https://www.linkedin.com/in/janedoe".into())
        );
        let missing: LinkedInProfile = serde_json::from_str("\"Not found\"").expect("parse");
        assert_eq!(missing, LinkedInProfile::NotFound);
    }

    #[test]
    fn sentiment_labels() {
        assert_eq!(Sentiment::from_label("Positive"), Sentiment::Positive);
        assert_eq!(Sentiment::from_label(" negative.\n"), Sentiment::Negative);
        assert_eq!(
            Sentiment::from_label("The sentiment is neutral"),
            Sentiment::Neutral
        );
        assert_eq!(Sentiment::from_label("mixed"), Sentiment::Failed);
        assert_eq!(
            Sentiment::from_label("positive and negative"),
            Sentiment::Failed
        );

        let json = serde_json::to_string(&Sentiment::Failed).expect("serialize");
        assert_eq!(json, "\"Sentiment analysis failed\"");
    }

    #[test]
    fn empty_profile_detection() {
        assert!(CompanyProfile::default().is_empty());
        let profile = CompanyProfile {
            founded_year: Some(1999),
            ..CompanyProfile::default()
        };
        assert!(!profile.is_empty());
    }

    #[test]
    fn report_fixture_validates() {
        let fixture = std::fs::read_to_string("../../../fixtures/json/report.fixture.json")
            .expect("read fixture");
        let parsed: ProfileReport =
            serde_json::from_str(&fixture).expect("deserialize fixture report");
        assert_eq!(parsed.company, "Acme Corp");
        assert_eq!(parsed.sources.len(), 3);
        assert_eq!(parsed.profile.executives.len(), 2);
        assert_eq!(
            parsed.profile.executives[1].linkedin,
            LinkedInProfile::NotFound
        );
        assert_eq!(parsed.profile.news[0].sentiment, Some(Sentiment::Positive));
        assert_eq!(parsed.profile.news[1].sentiment, None);
    }
}
