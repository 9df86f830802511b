//! Completion provider capability and the OpenAI-compatible HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use firmscope_shared::{FirmscopeError, OpenAiConfig, Result};

use crate::types::{ChatRequest, ChatResponseRaw, CompletionRequest};

const SERVICE: &str = "openai";

/// Upstream error bodies are cut to this many characters.
const MAX_ERROR_BODY: usize = 500;

/// A chat model that turns one request into one text completion.
///
/// Implementations do not retry; retrying is the caller's decision.
/// Envelope problems (unparseable body, no choices) are reported as
/// [`FirmscopeError::MalformedResponse`].
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// OpenAI `/chat/completions` client. Works with any compatible gateway.
#[derive(Clone)]
pub struct OpenAiClient {
    http_client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(config: &OpenAiConfig, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FirmscopeError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let start = std::time::Instant::now();
        let body = ChatRequest::from_completion(&self.model, request);

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "OpenAI request failed");
                if e.is_timeout() {
                    FirmscopeError::Timeout(format!("{SERVICE}: {e}"))
                } else {
                    FirmscopeError::Transport(format!("{SERVICE}: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let error_text: String = error_text.chars().take(MAX_ERROR_BODY).collect();
            return Err(FirmscopeError::upstream(SERVICE, status.as_u16(), error_text));
        }

        let raw: ChatResponseRaw = response.json().await.map_err(|e| {
            FirmscopeError::MalformedResponse(format!("{SERVICE}: invalid response envelope: {e}"))
        })?;

        let content = raw
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| {
                FirmscopeError::MalformedResponse(format!("{SERVICE}: response contained no choices"))
            })?;

        debug!(
            model = %self.model,
            elapsed_ms = start.elapsed().as_millis() as u64,
            total_tokens = raw.usage.as_ref().map(|u| u.total_tokens),
            "completion received"
        );

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OpenAiClient {
        let config = OpenAiConfig {
            base_url: server.uri(),
            ..OpenAiConfig::default()
        };
        OpenAiClient::new(&config, "sk-test", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn posts_chat_completion_and_returns_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4o-mini",
                "max_tokens": 50
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "Positive"}}],
                "usage": {"prompt_tokens": 12, "completion_tokens": 1, "total_tokens": 13}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let content = client_for(&server)
            .complete(&CompletionRequest::new("Great quarter").max_tokens(50))
            .await
            .unwrap();
        assert_eq!(content, "Positive");
    }

    #[tokio::test]
    async fn empty_choices_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .complete(&CompletionRequest::new("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, FirmscopeError::MalformedResponse(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn error_status_is_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .complete(&CompletionRequest::new("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, FirmscopeError::UpstreamStatus { status: 503, .. }));
        assert!(err.is_transient());
    }
}
