//! Similar company suggestions.

use serde_json::Value;
use tracing::{info, instrument, warn};

use firmscope_llm::{CompletionRequest, Parsed, StructuredExtractor};
use firmscope_shared::{CompanyRequest, Result, SimilarCompany};

use crate::lenient::text_field;

const SIMILAR_SYSTEM: &str =
    "Return a JSON list of companies with fields: name, location, industry.";

/// Suggestions kept from one answer.
pub const MAX_SIMILAR_COMPANIES: usize = 10;

/// Asks the model for companies whose names resemble the queried one.
#[derive(Clone)]
pub struct SimilarCompanies {
    extractor: StructuredExtractor,
    max_tokens: u32,
}

impl SimilarCompanies {
    pub fn new(extractor: StructuredExtractor, max_tokens: u32) -> Self {
        Self {
            extractor,
            max_tokens,
        }
    }

    /// Up to ten suggestions. A malformed answer is an empty list; an
    /// exhausted retry budget is an error.
    #[instrument(skip_all, fields(company = %request.name))]
    pub async fn find(&self, request: &CompanyRequest) -> Result<Vec<SimilarCompany>> {
        let completion = CompletionRequest::new(similar_prompt(request))
            .system(SIMILAR_SYSTEM)
            .max_tokens(self.max_tokens)
            .json_object();

        let companies = match self
            .extractor
            .extract_with("similar companies", &completion, parse_similar)
            .await?
        {
            Parsed::Valid(companies) => companies,
            Parsed::Malformed(_) => {
                warn!("similar company answer malformed");
                Vec::new()
            }
        };

        info!(count = companies.len(), "similar companies found");
        Ok(companies)
    }
}

fn similar_prompt(request: &CompanyRequest) -> String {
    let mut prompt = format!(
        "List {MAX_SIMILAR_COMPANIES} companies with name (lexically or semantically) similar to '{}' \
         with name, location, and industry in JSON format. Include the queried company if it exists.",
        request.name
    );
    if let Some(location) = &request.location {
        prompt.push_str(&format!(" Prefer companies in {location}."));
    }
    if let Some(industry) = &request.industry {
        prompt.push_str(&format!(" Prefer companies in the {industry} industry."));
    }
    prompt
}

/// Accepts a top-level array or an object whose first array-valued field
/// holds the list. Items without a name are dropped.
fn parse_similar(cleaned: &str) -> std::result::Result<Vec<SimilarCompany>, String> {
    let value: Value = serde_json::from_str(cleaned).map_err(|e| e.to_string())?;
    let items = match &value {
        Value::Array(items) => items,
        Value::Object(obj) => obj
            .values()
            .find_map(Value::as_array)
            .ok_or("no company list in answer")?,
        _ => return Err("answer is neither a list nor an object".into()),
    };

    Ok(items
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|obj| {
            Some(SimilarCompany {
                name: text_field(obj, &["name", "companyname"])?,
                location: text_field(obj, &["location", "headquarters"]),
                industry: text_field(obj, &["industry", "sector"]),
            })
        })
        .take(MAX_SIMILAR_COMPANIES)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leadership::tests::FixedModel;
    use firmscope_llm::RetryPolicy;
    use firmscope_shared::FirmscopeError;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn finder(model: Arc<FixedModel>) -> SimilarCompanies {
        let extractor = StructuredExtractor::new(
            model,
            RetryPolicy::fixed(3, Duration::ZERO),
            Duration::from_secs(5),
        );
        SimilarCompanies::new(extractor, 600)
    }

    #[test]
    fn prompt_mentions_preferences() {
        let request = CompanyRequest::new("Acme")
            .with_location("Ohio")
            .with_industry("Robotics");
        let prompt = similar_prompt(&request);
        assert!(prompt.contains("similar to 'Acme'"));
        assert!(prompt.contains("Prefer companies in Ohio."));
        assert!(prompt.contains("Robotics"));
    }

    #[test]
    fn object_with_list_field_is_accepted() {
        let raw = json!({
            "companies": [
                {"name": "Acme Corp", "location": "Springfield", "industry": "Robotics"},
                {"name": "Acme Tools", "location": "N/A"},
                {"location": "Nowhere"}
            ]
        })
        .to_string();
        let parsed = parse_similar(&raw).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].location, None);
    }

    #[test]
    fn top_level_array_is_capped() {
        let items: Vec<Value> = (0..14).map(|i| json!({"name": format!("Acme {i}")})).collect();
        let parsed = parse_similar(&Value::Array(items).to_string()).unwrap();
        assert_eq!(parsed.len(), MAX_SIMILAR_COMPANIES);
    }

    #[test]
    fn object_without_list_is_rejected() {
        assert!(parse_similar(r#"{"name": "Acme"}"#).is_err());
        assert!(parse_similar("42").is_err());
    }

    #[tokio::test]
    async fn malformed_answer_is_empty_list() {
        let model = FixedModel::ok("Here are some companies: Acme, Apex");
        let found = finder(model.clone())
            .find(&CompanyRequest::new("Acme"))
            .await
            .unwrap();
        assert!(found.is_empty());
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausted_retries_are_an_error() {
        let err = finder(FixedModel::timing_out())
            .find(&CompanyRequest::new("Acme"))
            .await
            .unwrap_err();
        assert!(matches!(err, FirmscopeError::ExtractionFailed { attempts: 3, .. }));
    }
}
