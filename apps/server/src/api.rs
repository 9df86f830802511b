use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use firmscope_core::{ProfilePipeline, SilentProgress};
use firmscope_shared::{CompanyRequest, FirmscopeError, ProfileReport, SimilarCompany};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ProfilePipeline>,
}

/// Query string shared by both lookup routes.
/// A missing `name` is a 400 with the JSON error body.
#[derive(Debug, Deserialize)]
pub struct CompanyQuery {
    name: Option<String>,
    location: Option<String>,
    industry: Option<String>,
}

impl TryFrom<CompanyQuery> for CompanyRequest {
    type Error = ApiError;

    fn try_from(query: CompanyQuery) -> Result<Self, ApiError> {
        let Some(name) = query.name else {
            return Err(ApiError::new(
                StatusCode::BAD_REQUEST,
                "Missing required query parameter: name.",
            ));
        };
        Ok(Self {
            name,
            location: query.location,
            industry: query.industry,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct SimilarCompaniesBody {
    pub similar_companies: Vec<SimilarCompany>,
}

/// Error body: `{"detail": "..."}`.
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

impl From<FirmscopeError> for ApiError {
    fn from(error: FirmscopeError) -> Self {
        match &error {
            FirmscopeError::Validation { message } => Self::new(StatusCode::BAD_REQUEST, message),
            FirmscopeError::Timeout(_) => {
                tracing::warn!(error = %error, "request deadline expired");
                Self::new(StatusCode::GATEWAY_TIMEOUT, "Request timed out.")
            }
            FirmscopeError::ExtractionFailed { .. } => {
                tracing::error!(error = %error, "structured extraction failed");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to fetch structured data after retries.",
                )
            }
            _ => {
                tracing::error!(error = %error, "request failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self)).into_response()
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/similar_companies/", get(similar_companies))
        .route("/company_profile/", get(company_profile))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn similar_companies(
    State(state): State<AppState>,
    Query(query): Query<CompanyQuery>,
) -> Result<Json<SimilarCompaniesBody>, ApiError> {
    let request = CompanyRequest::try_from(query)?;
    let companies = state.pipeline.similar(&request).await?;
    if companies.is_empty() {
        return Err(ApiError::new(StatusCode::NOT_FOUND, "No similar companies found."));
    }
    Ok(Json(SimilarCompaniesBody {
        similar_companies: companies,
    }))
}

async fn company_profile(
    State(state): State<AppState>,
    Query(query): Query<CompanyQuery>,
) -> Result<Json<ProfileReport>, ApiError> {
    let request = CompanyRequest::try_from(query)?;
    let report = state.pipeline.run(&request, &SilentProgress).await?;
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use firmscope_core::Providers;
    use firmscope_crawler::{PageContent, PageFetcher};
    use firmscope_discovery::SearchProvider;
    use firmscope_llm::{CompletionProvider, CompletionRequest};
    use firmscope_shared::{AppConfig, Result, SearchQuery};
    use std::time::Duration;
    use tower::ServiceExt;
    use url::Url;

    struct NoResults {
        stall: bool,
    }

    #[async_trait]
    impl SearchProvider for NoResults {
        async fn search(&self, _query: &SearchQuery) -> Result<Vec<Url>> {
            if self.stall {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Ok(Vec::new())
        }
    }

    struct Offline;

    #[async_trait]
    impl PageFetcher for Offline {
        async fn fetch(&self, url: &Url) -> Result<PageContent> {
            Err(FirmscopeError::Transport(format!("offline: {url}")))
        }
    }

    /// Answers every completion with the same text, or always times out.
    struct Model(Option<&'static str>);

    #[async_trait]
    impl CompletionProvider for Model {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
            match self.0 {
                Some(text) => Ok(text.to_string()),
                None => Err(FirmscopeError::Timeout("30s".into())),
            }
        }
    }

    fn app(reply: Option<&'static str>, stall: bool) -> Router {
        let mut config = AppConfig::default();
        config.extraction.retry_backoff_ms = 0;
        config.pipeline.request_timeout_secs = 5;
        let fetcher: Arc<dyn PageFetcher> = Arc::new(Offline);
        let pipeline = ProfilePipeline::new(
            &config,
            Providers {
                search: Arc::new(NoResults { stall }),
                pages: Arc::clone(&fetcher),
                sources: fetcher,
                completions: Arc::new(Model(reply)),
            },
        );
        build_app(AppState {
            pipeline: Arc::new(pipeline),
        })
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (status, body) = get_json(app(Some("{}"), false), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn similar_companies_are_wrapped() {
        let reply = r#"{"companies": [{"name": "Acme Corp", "location": "Springfield", "industry": "Robotics"}]}"#;
        let (status, body) = get_json(app(Some(reply), false), "/similar_companies/?name=Acme").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["similar_companies"][0]["name"], "Acme Corp");
    }

    #[tokio::test]
    async fn no_similar_companies_is_404() {
        let (status, body) =
            get_json(app(Some(r#"{"companies": []}"#), false), "/similar_companies/?name=Acme").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "No similar companies found.");
    }

    #[tokio::test]
    async fn exhausted_extraction_is_500() {
        let (status, body) = get_json(app(None, false), "/similar_companies/?name=Acme").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["detail"].as_str().unwrap().contains("after retries"));
    }

    #[tokio::test]
    async fn blank_name_is_400() {
        let (status, body) = get_json(app(Some("{}"), false), "/company_profile/?name=%20").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().is_some());
    }

    #[tokio::test]
    async fn missing_name_is_400_json() {
        for uri in ["/company_profile/?location=Springfield", "/similar_companies/"] {
            let (status, body) = get_json(app(Some("{}"), false), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["detail"], "Missing required query parameter: name.");
        }
    }

    #[tokio::test]
    async fn profile_report_is_returned_when_extraction_fails() {
        let (status, body) =
            get_json(app(None, false), "/company_profile/?name=Acme&location=Springfield").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["company"], "Acme");
        assert_eq!(body["sources"], serde_json::json!([]));
        assert!(body["run_id"].is_string());
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_is_504() {
        let (status, body) = get_json(app(Some("{}"), true), "/company_profile/?name=Acme").await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["detail"], "Request timed out.");
    }
}
